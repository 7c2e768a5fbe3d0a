//! memofill - deal memo context assembly
//!
//! memofill turns loosely-structured deal data into one canonical,
//! template-safe context and renders document templates with it. Inputs
//! arrive in one of three shapes:
//!
//! - **Extraction records**: a list of `{dd_name, extracted_data}` records,
//!   one per due-diligence document (appraisal, term sheet, PFS, ...)
//! - **Deal records**: one nested deal object, alone or in a
//!   `{"payload": [...], "deal_index": n}` wrapper
//! - **Prepared contexts**: an already-flat context that only needs cleanup
//!
//! Every shape maps to the same nineteen canonical sections, so a template
//! never has to test which shape it was given.
//!
//! # Architecture Overview
//!
//! ```text
//! JSON ──input──▶ DealInput ──mapper──▶ SchemaDocument ──templating──▶ context ──▶ Tera
//! ```
//!
//! # Core Modules
//!
//! - [`input`] - Classify raw JSON into a [`input::DealInput`]
//! - [`record`] - Index extraction records by category
//! - [`mapper`] - Build the canonical sections and direct variables per input shape
//! - [`templating`] - Flatten, make template-safe, merge images, render
//! - [`format`] - Currency, percent and text formatting shared by the mappers
//!
//! ## Supporting Modules
//!
//! - [`cli`] - The `memofill` command line
//! - [`config`] - Optional TOML configuration (`~/.memofill/config.toml`)
//! - [`core`] - Error types and user-facing error display
//! - [`utils`] - Atomic writes and unique output names
//!
//! # Example
//!
//! ```rust
//! use memofill::config::MemoConfig;
//! use memofill::templating::{TeraRenderer, assemble_context};
//! use serde_json::json;
//!
//! # fn example() -> anyhow::Result<()> {
//! let deal = json!({"deal_id": "D1", "property": {"name": "Example Plaza"}});
//! let assembled = assemble_context(deal, &MemoConfig::default())?;
//!
//! let memo = TeraRenderer::new().render_str("# {{ cover.property_name }}", &assembled.to_value())?;
//! assert_eq!(memo, "# Example Plaza");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod format;
pub mod input;
pub mod mapper;
pub mod record;
pub mod templating;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
