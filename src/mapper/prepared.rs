//! Pass-through mapping for contexts that were already flattened upstream.
//!
//! A prepared context needs no field resolution. It only gets its text
//! cleaned, the single-line display fields the deal-facts table reads, and
//! the due-diligence key alias. Its `sections` member, when present, is
//! completed to the canonical shape like any other mapper output.

use serde_json::{Map, Value};
use tracing::debug;

use super::{SchemaDocument, SchemaMapper};
use crate::config::MemoSettings;
use crate::format::{first_line, strip_markdown};
use crate::record::map_at;

/// Display field and the source field it is derived from.
const DISPLAY_FIELDS: &[(&str, &str)] = &[
    ("interest_rate_display", "interest_rate"),
    ("origination_fee_display", "origination_fee"),
    ("exit_fee_display", "exit_fee"),
    ("term_display", "term"),
    ("extension_display", "extension"),
];

/// Mapper over an already-flat context.
pub struct PreparedMapper<'a> {
    context: &'a Map<String, Value>,
}

impl<'a> PreparedMapper<'a> {
    pub fn new(context: &'a Map<String, Value>) -> Self {
        Self {
            context,
        }
    }
}

impl SchemaMapper for PreparedMapper<'_> {
    fn name(&self) -> &'static str {
        "prepared"
    }

    fn build(&self, _memo: &MemoSettings) -> SchemaDocument {
        let mut root = preprocess(self.context);
        let sections = match root.remove("sections") {
            Some(Value::Object(sections)) => sections,
            Some(_) => {
                debug!("Prepared context has a non-mapping sections member, ignoring it");
                Map::new()
            }
            None => Map::new(),
        };
        SchemaDocument::new(root, sections)
    }
}

/// Clean a prepared context: strip markdown, derive display fields, alias diligence keys.
pub fn preprocess(context: &Map<String, Value>) -> Map<String, Value> {
    let mut result: Map<String, Value> =
        context.iter().map(|(key, value)| (key.clone(), strip_text(value))).collect();

    let loan_terms = map_at(&result, &["loan_terms"]).clone();
    for (display, source) in DISPLAY_FIELDS {
        if result.contains_key(*display) {
            continue;
        }
        let raw = loan_terms
            .get(*source)
            .or_else(|| loan_terms.get(&format!("{source}_option")))
            .or_else(|| result.get(*source));
        let text = match raw {
            Some(Value::Object(described)) => {
                described.get("description").map(first_line).unwrap_or_default()
            }
            Some(value) => first_line(value),
            None => String::new(),
        };
        result.insert((*display).to_string(), Value::String(text));
    }

    if let Some(Value::Object(diligence)) = result.get_mut("due_diligence") {
        if !diligence.contains_key("background_check_firm") {
            if let Some(check) = diligence.get("background_check").cloned() {
                diligence.insert("background_check_firm".to_string(), check);
            }
        }
    }

    result
}

/// Recursively strip markdown and `[GENERATED]` prefixes from every string.
fn strip_text(value: &Value) -> Value {
    match value {
        Value::String(text) => Value::String(strip_markdown(text)),
        Value::Array(items) => Value::Array(items.iter().map(strip_text).collect()),
        Value::Object(fields) => {
            Value::Object(fields.iter().map(|(key, value)| (key.clone(), strip_text(value))).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_strips_markdown_recursively() {
        let context = object(json!({
            "narratives": {"market": "[GENERATED] **Strong** demand"},
            "sponsors": [{"overview": "## Bio\nLocal operator"}],
            "count": 3
        }));
        let result = preprocess(&context);
        assert_eq!(result["narratives"]["market"], "Strong demand");
        assert_eq!(result["sponsors"][0]["overview"], "Bio\nLocal operator");
        assert_eq!(result["count"], 3);
    }

    #[test]
    fn test_display_fields_from_loan_terms() {
        let context = object(json!({
            "loan_terms": {
                "interest_rate": {"description": "SOFR + 450 bps\nfloor 4.00%"},
                "origination_fee": "1.00%",
                "term": "24 months",
                "extension_option": "Two 6-month options\nsubject to DSCR test"
            },
            "exit_fee_display": "0.50%"
        }));
        let result = preprocess(&context);
        assert_eq!(result["interest_rate_display"], "SOFR + 450 bps");
        assert_eq!(result["origination_fee_display"], "1.00%");
        assert_eq!(result["exit_fee_display"], "0.50%");
        assert_eq!(result["term_display"], "24 months");
        assert_eq!(result["extension_display"], "Two 6-month options");
    }

    #[test]
    fn test_background_check_alias() {
        let context = object(json!({"due_diligence": {"background_check": "Diligence Co"}}));
        let result = preprocess(&context);
        assert_eq!(result["due_diligence"]["background_check_firm"], "Diligence Co");
    }

    #[test]
    fn test_sections_member_is_completed() {
        let context = object(json!({
            "sections": {"market": {"narrative": "Tight submarket."}},
            "cover": {"property_name": "Example Plaza"}
        }));
        let doc = PreparedMapper::new(&context).transform(&MemoSettings::default());
        assert!(!doc.root.contains_key("sections"));
        assert_eq!(doc.sections["market"]["narrative"], "Tight submarket.");
        assert_eq!(doc.sections["cover"]["property_name"], "Example Plaza");
        assert_eq!(doc.sections["property"]["metrics"], json!([]));
        assert_eq!(doc.root["toc"], "[[TOC]]");
    }
}
