//! Template context assembly and rendering.
//!
//! This module turns a [`SchemaDocument`](crate::mapper::SchemaDocument) into
//! the context a Tera template is rendered with, and renders it.
//!
//! # Pipeline
//!
//! ```text
//! DealInput ──mapper──▶ SchemaDocument ──flatten──▶ flat context
//!           ──safety──▶ template-safe context ──images──▶ AssembledContext
//!           ──renderer──▶ document bytes
//! ```
//!
//! - [`flatten`] merges section members into one namespace and applies the
//!   alias and exposure tables
//! - [`safety`] escapes Tera delimiters in string values, forces loop targets
//!   to lists and gives every nested mapping an `items` pair list
//! - [`images`] sizes caller-supplied image handles and merges them last
//! - [`assembler`] runs the stages in order and computes the context checksum
//! - [`renderer`] wraps Tera behind the [`DocumentRenderer`] seam
//! - [`variables`] lists the variables a template reads
//!
//! # Template Context
//!
//! Templates can address the same data at the root or under `sections`:
//!
//! ```text
//! {{ cover.property_name }}
//! {{ sections.transaction_overview.deal_facts }}
//! {% for row in sections.transaction_overview.leverage_metrics %}{{ row.label }}{% endfor %}
//! {{ deal_facts.property_type }}            raw mapping
//! {% for pair in deal_facts.items %}{{ pair.0 }}{% endfor %}
//! ```
//!
//! # Custom Filters
//!
//! - `currency`, `percent`: the value formatters (`{{ loan_amount | currency }}`)
//! - `plain`: strip markdown
//! - `first_line`: first non-empty line

pub mod assembler;
pub mod error;
pub mod filters;
pub mod flatten;
pub mod images;
pub mod renderer;
pub mod safety;
pub mod variables;

#[cfg(test)]
mod renderer_tests;

pub use assembler::{AssembledContext, ContextAssembler, assemble_context, context_checksum};
pub use error::TemplateError;
pub use images::{ImageHandle, ImageManifest};
pub use renderer::{DocumentRenderer, TeraRenderer};
pub use safety::MappingView;
