//! Core types for memofill
//!
//! - [`MemoError`] - failure cases visible outside the assembly core
//! - [`ErrorContext`] - user-facing wrapper with suggestions and details
//! - [`user_friendly_error`] - convert any error to the user-facing form

pub mod error;

pub use error::{ErrorContext, MemoError, user_friendly_error};
