//! Shared pieces of the command implementations.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::MemoConfig;
use crate::core::MemoError;
use crate::input::InputShape;
use crate::templating::ContextAssembler;

/// State every command runs with.
#[derive(Debug)]
pub struct CommandContext {
    pub config: MemoConfig,
}

impl CommandContext {
    #[must_use]
    pub fn new(config: MemoConfig) -> Self {
        Self {
            config,
        }
    }

    pub fn assembler(&self) -> ContextAssembler<'_> {
        ContextAssembler::new(&self.config)
    }
}

/// Where a deal input comes from and how to read it.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Deal input JSON: a deal record, a payload wrapper or extraction records
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Deal to select from a list of deals (overrides the wrapper's `deal_index`)
    #[arg(long, value_name = "N")]
    pub deal_index: Option<usize>,

    /// Input shape; `auto` detects it from the JSON
    #[arg(long, value_enum, default_value = "auto")]
    pub shape: InputShape,
}

impl InputArgs {
    /// Read the input file as JSON.
    pub async fn read(&self) -> Result<Value> {
        read_json(&self.input).await
    }
}

/// Output format for command reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON
    Json,
}

/// Read and parse a JSON file.
///
/// # Errors
///
/// Fails when the file cannot be read, or with [`MemoError::JsonError`] when it is not JSON.
pub async fn read_json(path: &Path) -> Result<Value> {
    let text = tokio::fs::read_to_string(path).await.map_err(|_| MemoError::FileSystemError {
        operation: "read input".to_string(),
        path: path.display().to_string(),
    })?;
    let value: Value = serde_json::from_str(&text)
        .map_err(MemoError::from)
        .with_context(|| format!("Failed to parse JSON from {}", path.display()))?;
    debug!("Read {} bytes of JSON from {}", text.len(), path.display());
    Ok(value)
}

/// Read a template file.
///
/// # Errors
///
/// Returns [`MemoError::TemplateNotFound`] when the file does not exist.
pub async fn read_template(path: &Path) -> Result<Vec<u8>> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(MemoError::TemplateNotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read template from {}", path.display()))
}
