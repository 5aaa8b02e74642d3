//! Resource services: list parsing, validation, CRUD execution, presentation and reports.

mod crud;
pub mod listing;
pub mod presenter;
pub mod reports;
mod validation;
mod write;

pub use crud::{CrudService, Row};
pub use listing::ListQuery;
pub(crate) use validation::is_email;
pub use validation::{Attachment, Checked, RequestValidator, Submission, UploadedFile};
pub use write::WriteContext;
