//! Error handling for memofill
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** for precise handling in library code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`MemoError`] - enumerated failure cases visible outside the assembly core
//! - [`ErrorContext`] - wrapper adding suggestions and details for terminal display
//!
//! # Error Categories
//!
//! Only two kinds of failure ever leave the assembly pipeline:
//! - **Caller-contract violations**: [`MemoError::InvalidInputShape`] and
//!   [`MemoError::DealIndexOutOfRange`], rejected before any section builder runs
//! - **Renderer failures**: [`MemoError::RenderFailed`], carrying the engine message as-is
//!
//! Missing, renamed, or mistyped fields inside a record are never errors. They are
//! resolved to placeholders by the schema mappers.
//!
//! The remaining variants belong to the CLI surface (files, configuration, JSON).
//!
//! # Examples
//!
//! ```rust,no_run
//! use memofill::core::{MemoError, ErrorContext};
//!
//! let context = ErrorContext::new(MemoError::TemplateNotFound {
//!     path: "memo.tera".to_string(),
//! })
//! .with_suggestion("Check the --template path")
//! .with_details("Templates are read from the local filesystem");
//!
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for memofill operations.
///
/// All payloads are owned strings so the error is cheap to clone into an
/// [`ErrorContext`] and comparable in tests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoError {
    /// The top-level input was neither a mapping nor a list of mappings
    #[error("Invalid input shape: expected {expected}, found {found}")]
    InvalidInputShape {
        /// Description of the accepted shapes
        expected: String,
        /// Description of what was actually supplied
        found: String,
    },

    /// A deal index pointed past the end of a deal array
    #[error("Deal index {index} is out of range ({len} deal(s) supplied)")]
    DealIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of deals available
        len: usize,
    },

    /// The rendering engine rejected the template or context
    #[error("Template rendering failed: {message}")]
    RenderFailed {
        /// Engine-reported message
        message: String,
    },

    /// Template file could not be located
    #[error("Template not found: {path}")]
    TemplateNotFound {
        /// Path that was tried
        path: String,
    },

    /// Configuration file is malformed
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What went wrong
        message: String,
    },

    /// A filesystem operation failed
    #[error("File system error during {operation}: {path}")]
    FileSystemError {
        /// The operation being attempted
        operation: String,
        /// Path involved in the failure
        path: String,
    },

    /// Input or manifest JSON could not be parsed
    #[error("Invalid JSON: {message}")]
    JsonError {
        /// Parser message
        message: String,
    },

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl From<serde_json::Error> for MemoError {
    fn from(error: serde_json::Error) -> Self {
        Self::JsonError {
            message: error.to_string(),
        }
    }
}

impl From<toml::de::Error> for MemoError {
    fn from(error: toml::de::Error) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

/// Error wrapper carrying a suggestion and details for CLI display.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: MemoError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new context without suggestion or details.
    #[must_use]
    pub const fn new(error: MemoError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: error in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`].
///
/// Recognizes [`MemoError`], [`std::io::Error`], [`serde_json::Error`] and
/// [`toml::de::Error`]. Anything else is reported with its full cause chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(memo_error) = error.downcast_ref::<MemoError>() {
        return create_error_context(memo_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(MemoError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check file ownership and permissions on the input, template and output paths");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(MemoError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(json_error) = error.downcast_ref::<serde_json::Error>() {
        return ErrorContext::new(MemoError::JsonError {
            message: json_error.to_string(),
        })
        .with_suggestion("Validate the input file with a JSON linter")
        .with_details(format!("{error:#}"));
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(MemoError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax in your memofill config file");
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(MemoError::Other {
        message,
    })
}

fn create_error_context(error: MemoError) -> ErrorContext {
    match &error {
        MemoError::InvalidInputShape {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Supply a single deal object, a {\"payload\": [...]} wrapper, or a list of extraction records")
            .with_details("Extraction records carry a category in 'dd_name' and a payload in 'extracted_data'"),

        MemoError::DealIndexOutOfRange {
            len,
            ..
        } => {
            let suggestion = if *len == 0 {
                "The deal list is empty; check the upstream export".to_string()
            } else {
                format!("Use --deal-index between 0 and {}", len - 1)
            };
            ErrorContext::new(error).with_suggestion(suggestion)
        }

        MemoError::RenderFailed {
            ..
        } => ErrorContext::new(error)
            .with_suggestion(
                "Run 'memofill variables --template <file> --input <file>' to list variables the template reads but the context lacks",
            )
            .with_details(
                "Render errors usually mean a template/context mismatch:\n\
                 - Undefined variables (use {% if var is defined %} to check)\n\
                 - Unclosed {{ or {% delimiters\n\
                 - Unknown filters or functions",
            ),

        MemoError::TemplateNotFound {
            ..
        } => ErrorContext::new(error).with_suggestion("Check the --template path"),

        MemoError::ConfigError {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Check the TOML syntax in ~/.memofill/config.toml or the file passed with --config",
        ),

        MemoError::JsonError {
            ..
        } => ErrorContext::new(error).with_suggestion("Validate the input file with a JSON linter"),

        _ => ErrorContext::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_failed_carries_engine_message() {
        let error = MemoError::RenderFailed {
            message: "Variable `LTV` not found".to_string(),
        };
        assert_eq!(error.to_string(), "Template rendering failed: Variable `LTV` not found");
    }

    #[test]
    fn test_user_friendly_error_for_memo_error() {
        let ctx = user_friendly_error(anyhow::Error::from(MemoError::InvalidInputShape {
            expected: "mapping".to_string(),
            found: "number".to_string(),
        }));
        assert!(matches!(ctx.error, MemoError::InvalidInputShape { .. }));
        assert!(ctx.suggestion.is_some());
        assert!(ctx.details.is_some());
    }

    #[test]
    fn test_user_friendly_error_sees_through_context() {
        let inner = anyhow::Error::from(MemoError::DealIndexOutOfRange {
            index: 4,
            len: 2,
        });
        let wrapped = inner.context("Failed to assemble context for deal.json");

        let ctx = user_friendly_error(wrapped);
        assert!(matches!(ctx.error, MemoError::DealIndexOutOfRange { index: 4, len: 2 }));
        assert_eq!(ctx.suggestion.as_deref(), Some("Use --deal-index between 0 and 1"));
    }

    #[test]
    fn test_user_friendly_error_not_found() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let ctx = user_friendly_error(anyhow::Error::from(io_error));
        assert!(matches!(ctx.error, MemoError::FileSystemError { .. }));
        assert!(ctx.suggestion.is_some());
    }

    #[test]
    fn test_from_json_error() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{ not json");
        let error = MemoError::from(parse.unwrap_err());
        assert!(matches!(error, MemoError::JsonError { .. }));
    }

    #[test]
    fn test_error_context_display_format() {
        let ctx = ErrorContext::new(MemoError::TemplateNotFound {
            path: "memo.tera".to_string(),
        })
        .with_suggestion("Check the path")
        .with_details("Templates are local files");

        let text = ctx.to_string();
        assert!(text.contains("Template not found: memo.tera"));
        assert!(text.contains("Details: Templates are local files"));
        assert!(text.contains("Suggestion: Check the path"));
    }
}
