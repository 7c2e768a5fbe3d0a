//! Renderer error classification.
//!
//! Tera reports every failure as a chain of messages. [`TemplateError`]
//! sorts them into an undefined-variable case, which carries name
//! suggestions drawn from the context's top-level keys, and a catch-all
//! syntax case. The assembler folds both into
//! [`MemoError::RenderFailed`](crate::core::MemoError::RenderFailed).

use std::fmt;

use crate::core::MemoError;

/// A classified renderer failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The template read a variable the context does not define
    VariableNotFound {
        variable: String,
        /// Closest top-level context keys, best first
        suggestions: Vec<String>,
        line_number: Option<usize>,
    },

    /// Malformed markup, unknown filter, or any other engine failure
    SyntaxError {
        message: String,
        line_number: Option<usize>,
    },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::VariableNotFound {
                variable,
                ..
            } => write!(f, "Template variable not found: '{variable}'"),
            TemplateError::SyntaxError {
                message,
                ..
            } => write!(f, "Template syntax error: {message}"),
        }
    }
}

impl std::error::Error for TemplateError {}

impl TemplateError {
    /// Multi-line message with line number and suggestions.
    pub fn format_with_context(&self) -> String {
        let mut msg = self.to_string();
        let line_number = match self {
            TemplateError::VariableNotFound {
                line_number,
                ..
            }
            | TemplateError::SyntaxError {
                line_number,
                ..
            } => *line_number,
        };
        if let Some(line) = line_number {
            msg.push_str(&format!("\n  at line {line}"));
        }
        if let TemplateError::VariableNotFound {
            suggestions,
            ..
        } = self
        {
            if !suggestions.is_empty() {
                msg.push_str(&format!("\n  did you mean: {}?", suggestions.join(", ")));
            }
        }
        msg
    }
}

impl From<TemplateError> for MemoError {
    fn from(error: TemplateError) -> Self {
        MemoError::RenderFailed {
            message: error.format_with_context(),
        }
    }
}
