//! Integration test suite for memofill
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! - **assemble**: library entry points over the fixture inputs
//! - **cli**: the `memofill` binary end to end
//! - **config**: config file loading and its effect on output

#[path = "../common/mod.rs"]
mod common;

mod assemble;
mod cli;
mod config;
