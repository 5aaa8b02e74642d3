//! HTTP handlers: resource CRUD, identity profile, reports and accounts.

pub mod auth;
pub mod identity;
pub mod reports;
pub mod resource;
