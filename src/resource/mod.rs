//! Resource catalog: table definitions, validation rules and list options.

pub mod catalog;
pub mod types;
pub mod validator;

pub use catalog::Catalog;
pub use types::*;
pub use validator::validate;
