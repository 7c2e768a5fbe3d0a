//! Configuration management for memofill.
//!
//! A single optional TOML file (`~/.memofill/config.toml`) supplies cover-page
//! defaults, image sizing limits and output placement. The loaded
//! [`MemoConfig`] is passed explicitly into the assembler; nothing in the
//! library reads configuration from ambient state.

pub mod memo;

pub use memo::{CONFIG_ENV_VAR, ImageSettings, MemoConfig, MemoSettings, OutputSettings};
