//! Output file helpers.
//!
//! - [`fs::unique_output_path`] picks a free name for a rendered document
//! - [`fs::atomic_write`] writes it through a temporary file

pub mod fs;

pub use fs::{atomic_write, ensure_dir, unique_output_path};
