//! Active-litigation normalization shared by both mapper variants.

use serde_json::{Map, Value, json};

use super::fallback::display_field;
use crate::format::sanitize_scalar;

/// Narrative used when no case is reported.
pub const NO_LITIGATION: &str = "No active litigation identified.";

/// Case fields and the fallback field each resolves through.
const CASE_FIELDS: &[(&str, &str)] = &[
    ("case_name", "case.case_name"),
    ("background", "case.background"),
    ("sponsor_explanation", "case.sponsor_explanation"),
    ("fairbridge_analysis", "case.fairbridge_analysis"),
    ("holdback", "case.holdback"),
];

/// Normalized litigation block.
#[derive(Debug, Clone, PartialEq)]
pub struct Litigation {
    pub exists: bool,
    pub cases: Vec<Value>,
    pub narrative: String,
}

impl Litigation {
    /// Read a litigation mapping (`{exists, cases, litigation_narrative}`).
    ///
    /// A single case mapping is wrapped into a list. `narrative` takes the
    /// record's narrative first, then a generated count sentence.
    pub fn from_map(litigation: &Map<String, Value>, narrative: Option<&Value>) -> Self {
        let cases: Vec<Value> = match litigation.get("cases") {
            Some(Value::Array(items)) => {
                items.iter().filter_map(Value::as_object).map(normalize_case).collect()
            }
            Some(Value::Object(case)) => vec![normalize_case(case)],
            _ => Vec::new(),
        };
        let flagged = litigation.get("exists").and_then(Value::as_bool).unwrap_or(false);
        let exists = flagged || !cases.is_empty();

        let stated = narrative
            .or_else(|| litigation.get("narrative"))
            .or_else(|| litigation.get("litigation_narrative"))
            .map(sanitize_scalar)
            .unwrap_or_default();
        let narrative = if !stated.trim().is_empty() {
            stated
        } else if cases.is_empty() {
            NO_LITIGATION.to_string()
        } else {
            format!("{} active litigation case(s). See details below.", cases.len())
        };

        Self {
            exists,
            cases,
            narrative,
        }
    }

    /// The `active_litigation` root mapping.
    pub fn to_active_value(&self) -> Value {
        json!({"exists": self.exists, "cases": self.cases, "narrative": self.narrative})
    }

    /// The `litigation` section mapping.
    pub fn to_section_value(&self) -> Value {
        json!({"has_litigation": self.exists, "narrative": self.narrative, "cases": self.cases})
    }
}

/// Resolve a case's fields through their legacy names, sanitizing every value.
pub fn normalize_case(case: &Map<String, Value>) -> Value {
    let mut out = Map::new();
    for (key, field) in CASE_FIELDS {
        out.insert((*key).to_string(), Value::String(display_field(case, field, "")));
    }
    for (key, value) in case {
        if !out.contains_key(key) {
            out.insert(key.clone(), Value::String(sanitize_scalar(value)));
        }
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_case_mapping_is_wrapped() {
        let litigation = json!({"cases": {"case": "Smith v. Example LLC", "fairbridge_holdback": "$250,000"}});
        let summary = Litigation::from_map(litigation.as_object().unwrap(), None);
        assert!(summary.exists);
        assert_eq!(summary.cases.len(), 1);
        assert_eq!(summary.cases[0]["case_name"], "Smith v. Example LLC");
        assert_eq!(summary.cases[0]["holdback"], "$250,000");
        assert_eq!(summary.narrative, "1 active litigation case(s). See details below.");
    }

    #[test]
    fn test_no_cases_uses_default_narrative() {
        let summary = Litigation::from_map(&Map::new(), None);
        assert!(!summary.exists);
        assert_eq!(summary.narrative, NO_LITIGATION);
        assert_eq!(summary.to_section_value()["has_litigation"], false);
    }

    #[test]
    fn test_stated_narrative_wins() {
        let litigation = json!({"exists": true, "cases": []});
        let narrative = json!("Settled foreclosure action, dismissed 2024.");
        let summary = Litigation::from_map(litigation.as_object().unwrap(), Some(&narrative));
        assert!(summary.exists);
        assert_eq!(summary.to_active_value()["narrative"], "Settled foreclosure action, dismissed 2024.");
    }

    #[test]
    fn test_extra_case_fields_are_sanitized() {
        let case = json!({"case_name": "A v. B", "court": null, "status": "None"});
        let normalized = normalize_case(case.as_object().unwrap());
        assert_eq!(normalized["court"], "");
        assert_eq!(normalized["status"], "");
        assert_eq!(normalized["sponsor_explanation"], "");
    }
}
