//! Tests for the template renderer functionality.

use crate::templating::error::TemplateError;
use crate::templating::renderer::{DocumentRenderer, TeraRenderer};
use anyhow::Result;
use serde_json::json;

#[test]
fn test_template_renderer() -> Result<()> {
    let renderer = TeraRenderer::new();

    let result = renderer.render_str("# Plain Memo", &json!({}))?;
    assert_eq!(result, "# Plain Memo");

    let context = json!({"cover": {"property_name": "Example Plaza"}});
    let result = renderer.render_str("# {{ cover.property_name }}", &context)?;
    assert_eq!(result, "# Example Plaza");

    Ok(())
}

#[test]
fn test_document_renderer_returns_bytes() -> Result<()> {
    let renderer = TeraRenderer::new();
    let bytes = renderer.render(b"LTV: {{ LTV }}", &json!({"LTV": "62.50%"}))?;
    assert_eq!(bytes, b"LTV: 62.50%".to_vec());
    Ok(())
}

#[test]
fn test_missing_variable_carries_suggestions() {
    let renderer = TeraRenderer::new();
    let context = json!({"sponsor": {"name": "Steve Hudson"}, "sponsors": [], "market": {}});

    let error = renderer.render_str("{{ sponsr.name }}", &context).unwrap_err();
    match &error {
        TemplateError::VariableNotFound {
            variable,
            suggestions,
            ..
        } => {
            assert_eq!(variable, "sponsr.name");
            assert_eq!(suggestions.first().map(String::as_str), Some("sponsor"));
            assert!(!suggestions.contains(&"market".to_string()));
        }
        other => panic!("expected VariableNotFound, got {other:?}"),
    }

    let message = error.to_string();
    assert!(!message.contains("__tera_one_off"), "internal template name leaked: {message}");
}

#[test]
fn test_malformed_markup_is_syntax_error() {
    let renderer = TeraRenderer::new();
    let error = renderer.render_str("{% if cover %}unterminated", &json!({"cover": {}})).unwrap_err();
    assert!(matches!(error, TemplateError::SyntaxError { .. }), "got {error:?}");
    assert!(!error.to_string().contains("__tera_one_off"));
}

#[test]
fn test_invalid_utf8_template() {
    let renderer = TeraRenderer::new();
    let error = renderer.render(&[0xff, 0xfe, 0x00], &json!({})).unwrap_err();
    assert!(error.to_string().contains("UTF-8"));
}

#[test]
fn test_string_values_are_not_reparsed() -> Result<()> {
    let renderer = TeraRenderer::new();
    let context = json!({"narrative": "Spreads of { { 450 } } bps"});
    let result = renderer.render_str("{{ narrative }}", &context)?;
    assert_eq!(result, "Spreads of { { 450 } } bps");
    Ok(())
}

#[test]
fn test_memo_filters_are_registered() -> Result<()> {
    let renderer = TeraRenderer::new();
    let context = json!({"loan_terms": {"loan_amount": 12_500_000}});
    let result = renderer.render_str("{{ loan_terms.loan_amount | currency }}", &context)?;
    assert_eq!(result, "$12.50M");
    Ok(())
}
