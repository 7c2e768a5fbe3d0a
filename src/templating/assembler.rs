//! Context assembly: schema mapping, flattening, safety pass, images.
//!
//! The stages run in a fixed order and each assumes the previous one's
//! invariants. [`ContextAssembler::assemble`] is the only entry point that
//! runs them, so no caller can skip or reorder a stage.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;

use super::flatten::flatten;
use super::images::{ImageHandle, merge_images};
use super::renderer::DocumentRenderer;
use super::safety::make_template_safe;
use crate::config::MemoConfig;
use crate::core::MemoError;
use crate::input::{DealInput, InputShape};
use crate::mapper::SchemaDocument;

/// A context ready for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContext {
    /// The flattened, template-safe context
    pub context: Map<String, Value>,
    /// Sponsors captured by the sponsorship builder, in capture order
    pub sponsor_names: Vec<String>,
    /// `sha256:`-prefixed digest of the context's JSON
    pub checksum: String,
}

impl AssembledContext {
    /// The context as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.context.clone())
    }

    pub fn sponsors_found(&self) -> usize {
        self.sponsor_names.len()
    }
}

/// Runs the assembly pipeline with an explicitly supplied configuration.
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler<'a> {
    config: &'a MemoConfig,
}

impl<'a> ContextAssembler<'a> {
    pub fn new(config: &'a MemoConfig) -> Self {
        Self {
            config,
        }
    }

    /// Map an input to its canonical schema document.
    pub fn schema(&self, input: &DealInput) -> SchemaDocument {
        let mapper = input.mapper();
        debug!(mapper = mapper.name(), "Mapping input to schema document");
        mapper.transform(&self.config.memo)
    }

    /// Run every stage and merge the image handles.
    pub fn assemble(
        &self,
        input: &DealInput,
        images: &BTreeMap<String, ImageHandle>,
    ) -> AssembledContext {
        let doc = self.schema(input);
        let sponsor_names = doc.sponsor_names();

        let mut context = flatten(doc);
        debug!(keys = context.len(), "Flattened schema document");

        make_template_safe(&mut context);
        merge_images(&mut context, images);
        debug!(images = images.len(), "Merged image handles");

        let checksum = context_checksum(&context);
        AssembledContext {
            context,
            sponsor_names,
            checksum,
        }
    }

    /// Classify a raw JSON value, then assemble it.
    ///
    /// # Errors
    ///
    /// Returns the classification errors of [`DealInput::classify`].
    pub fn assemble_value(
        &self,
        value: Value,
        shape: InputShape,
        deal_index: Option<usize>,
        images: &BTreeMap<String, ImageHandle>,
    ) -> Result<AssembledContext, MemoError> {
        let input = DealInput::classify(value, shape, deal_index)?;
        Ok(self.assemble(&input, images))
    }

    /// Render an assembled context.
    ///
    /// # Errors
    ///
    /// Any renderer failure is returned as [`MemoError::RenderFailed`]. There
    /// is no partial document.
    pub fn render(
        &self,
        renderer: &dyn DocumentRenderer,
        template: &[u8],
        assembled: &AssembledContext,
    ) -> Result<Vec<u8>, MemoError> {
        renderer.render(template, &assembled.to_value()).map_err(MemoError::from)
    }
}

/// Assemble a context from a raw JSON value with auto-detected shape and no images.
///
/// # Errors
///
/// Returns [`MemoError::InvalidInputShape`] or [`MemoError::DealIndexOutOfRange`]
/// for inputs rejected at the boundary.
pub fn assemble_context(value: Value, config: &MemoConfig) -> Result<AssembledContext, MemoError> {
    ContextAssembler::new(config).assemble_value(value, InputShape::Auto, None, &BTreeMap::new())
}

/// `sha256:`-prefixed digest of a context's JSON.
pub fn context_checksum(context: &Map<String, Value>) -> String {
    let mut hasher = Sha256::new();
    // Map serialization is infallible
    let bytes = serde_json::to_vec(context).unwrap_or_default();
    hasher.update(&bytes);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}
