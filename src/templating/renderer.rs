//! Template rendering engine with Tera.
//!
//! The assembler treats rendering as an opaque external call: a template
//! blob and a context mapping go in, a document blob or a single classified
//! error comes out. [`DocumentRenderer`] is that seam, and [`TeraRenderer`]
//! is the implementation the CLI uses.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use strsim::levenshtein;
use tera::{Context as TeraContext, Tera};

use super::error::TemplateError;
use super::filters;

/// Maximum allowed Levenshtein distance as a percentage of target length for suggestions.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Maximum number of name suggestions attached to an error.
const MAX_SUGGESTIONS: usize = 3;

/// Renders a template blob against a context mapping.
pub trait DocumentRenderer {
    /// Render `template` with `context`, returning the document bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`TemplateError`] for any engine-reported failure.
    fn render(&self, template: &[u8], context: &Value) -> Result<Vec<u8>, TemplateError>;
}

/// Tera-backed renderer for UTF-8 text templates.
///
/// A fresh Tera instance is built per render, with the memo filters from
/// [`filters`] registered. Autoescaping is off, since escaping of template
/// delimiters already happened in the safety pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeraRenderer;

impl TeraRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render a template string against a context mapping.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::VariableNotFound`] when the template reads an
    /// undefined variable, and [`TemplateError::SyntaxError`] for everything else.
    pub fn render_str(&self, template: &str, context: &Value) -> Result<String, TemplateError> {
        let tera_context =
            TeraContext::from_value(context.clone()).map_err(|e| TemplateError::SyntaxError {
                message: format_tera_error(&e),
                line_number: None,
            })?;

        tracing::debug!(
            keys = context.as_object().map_or(0, |map| map.len()),
            bytes = template.len(),
            "Rendering template"
        );

        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        filters::register_filters(&mut tera);

        let rendered = tera.render_str(template, &tera_context).map_err(|e| parse_tera_error(&e, context))?;
        tracing::debug!("Template rendering complete");
        Ok(rendered)
    }
}

impl DocumentRenderer for TeraRenderer {
    fn render(&self, template: &[u8], context: &Value) -> Result<Vec<u8>, TemplateError> {
        let template = std::str::from_utf8(template).map_err(|e| TemplateError::SyntaxError {
            message: format!("Template is not valid UTF-8: {e}"),
            line_number: None,
        })?;
        self.render_str(template, context).map(String::into_bytes)
    }
}

/// Classify a Tera error, attaching suggestions from the context's top-level keys.
fn parse_tera_error(error: &tera::Error, context: &Value) -> TemplateError {
    let message = format_tera_error(error);
    let line_number = extract_line_number(&message);

    if let Some(variable) = extract_variable_name(&message) {
        let available: Vec<String> =
            context.as_object().map(|map| map.keys().cloned().collect()).unwrap_or_default();
        let root = variable.split(['.', '[']).next().unwrap_or(&variable);
        let suggestions = find_similar_variables(root, &available);
        return TemplateError::VariableNotFound {
            variable,
            suggestions,
            line_number,
        };
    }

    TemplateError::SyntaxError {
        message,
        line_number,
    }
}

/// Extract the variable name from a "Variable `foo` not found" message.
fn extract_variable_name(message: &str) -> Option<String> {
    static VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?:Variable `([^`]+)` not found|Unknown variable `([^`]+)`)")
            .expect("valid regex")
    });

    let caps = VARIABLE_RE.captures(message)?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string())
}

/// Extract the line from a Tera parse location such as `--> 3:7`.
fn extract_line_number(message: &str) -> Option<usize> {
    static LOCATION_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"--> (\d+):(\d+)").expect("valid regex"));

    LOCATION_RE.captures(message).and_then(|caps| caps[1].parse().ok())
}

/// Find similar variable names using Levenshtein distance.
fn find_similar_variables(target: &str, available: &[String]) -> Vec<String> {
    let mut scored: Vec<_> = available
        .iter()
        .map(|var| (var.clone(), levenshtein(target, var)))
        .filter(|(_, dist)| *dist <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
        .collect();

    scored.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    scored.into_iter().take(MAX_SUGGESTIONS).map(|(var, _)| var).collect()
}

/// Collect a Tera error chain into one message, without internal template names.
pub fn format_tera_error(error: &tera::Error) -> String {
    use std::error::Error;

    let mut all_messages = vec![error.to_string()];
    let mut current_error: Option<&dyn Error> = error.source();
    while let Some(err) = current_error {
        all_messages.push(err.to_string());
        current_error = err.source();
    }

    let messages: Vec<String> = all_messages
        .into_iter()
        .map(|msg| {
            msg.replace("while rendering '__tera_one_off'", "")
                .replace("Failed to render '__tera_one_off'", "Template rendering failed")
                .replace("Failed to parse '__tera_one_off'", "Template syntax error")
                .replace("'__tera_one_off'", "template")
                .trim()
                .to_string()
        })
        .filter(|msg| {
            !msg.is_empty() && msg != "Template rendering failed" && msg != "Template syntax error"
        })
        .collect();

    if messages.is_empty() {
        "Template syntax error".to_string()
    } else {
        messages.join("\n  -> ")
    }
}
