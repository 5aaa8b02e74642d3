//! Masjid admin: mosque administration back office over PostgreSQL.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod format;
pub mod handlers;
pub mod migration;
pub mod policy;
pub mod resource;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod storage;
pub mod store;

pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use resource::Catalog;
pub use routes::app;
pub use settings::Settings;
pub use state::AppState;
pub use storage::{FileStorage, LocalDiskStorage};
pub use store::ensure_database_exists;
