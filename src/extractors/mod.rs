//! Request extractors.

pub mod caller;
pub mod input;

pub use caller::{require_caller, AccessToken, AuthCaller, Viewer};
pub use input::WriteBody;
