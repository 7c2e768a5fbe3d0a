//! Ordered-fallback field resolution.
//!
//! Upstream producers have renamed and re-nested fields several times, so one
//! canonical field may live under different names depending on the record's
//! vintage. Resolution is per field and always follows the same order:
//!
//! 1. the current name
//! 2. legacy names, in the order they were retired
//! 3. a value derived locally from other present fields
//! 4. a fixed neutral placeholder
//!
//! The names for each field are declared in [`FIELD_TABLE`]. Candidates may be
//! dotted paths (`financial_summary.assets.total_assets`) which are walked with
//! [`crate::record::map_get`]. Each outcome is modeled by [`Resolution`], so
//! "every source exhausted" is a value rather than a swallowed error.

use serde_json::{Map, Value};
use std::borrow::Cow;
use tracing::trace;

use crate::format::{NOT_AVAILABLE, is_no_data, sanitize_scalar};
use crate::record::map_get;

/// Candidate names for one canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    /// Canonical field identifier, `scope.field`
    pub field: &'static str,
    /// Source names to try; the first is the current name
    pub candidates: &'static [&'static str],
    /// Placeholder used when every source is exhausted
    pub placeholder: &'static str,
}

const fn rule(
    field: &'static str,
    candidates: &'static [&'static str],
    placeholder: &'static str,
) -> FieldRule {
    FieldRule {
        field,
        candidates,
        placeholder,
    }
}

/// Known alternate names per canonical field.
pub const FIELD_TABLE: &[FieldRule] = &[
    // Leverage ratios
    rule("leverage.ltc_at_closing", &["fb_ltc_at_closing", "ltc_at_closing"], NOT_AVAILABLE),
    rule("leverage.ltv_at_closing", &["ltv_at_closing"], NOT_AVAILABLE),
    rule("leverage.ltv_at_maturity", &["ltv_at_maturity"], NOT_AVAILABLE),
    rule("leverage.debt_yield", &["debt_yield_fully_drawn", "debt_yield"], NOT_AVAILABLE),
    rule("root.LTC", &["fb_ltc_at_closing", "ltc_at_closing", "ltc_at_maturity"], NOT_AVAILABLE),
    rule("root.LTV", &["ltv_at_closing", "ltv_at_maturity"], NOT_AVAILABLE),
    // Property
    rule("property.name", &["name", "property_name", "project_name"], ""),
    rule("property.building_sf", &["building_sf", "gla", "gross_leasable_area_sf"], NOT_AVAILABLE),
    rule("property.land_area_acres", &["land_area_acres", "site_size_acres"], NOT_AVAILABLE),
    rule("property.occupancy_current", &["occupancy_current", "occupancy"], NOT_AVAILABLE),
    rule("property.occupancy_stabilized", &["occupancy_stabilized"], NOT_AVAILABLE),
    // Valuation
    rule("valuation.as_is", &["as_is_value", "as_is"], NOT_AVAILABLE),
    rule("valuation.stabilized", &["as_stabilized_value", "stabilized_value"], NOT_AVAILABLE),
    rule("valuation.as_complete", &["as_complete_value", "as_complete"], NOT_AVAILABLE),
    rule("valuation.cap_rate", &["cap_rate", "going_in_cap_rate"], NOT_AVAILABLE),
    // Narratives
    rule("narratives.executive_summary", &["transaction_overview", "executive_summary"], ""),
    rule("narratives.property_overview", &["property_overview", "property_description"], ""),
    rule("narratives.location_overview", &["location_overview"], ""),
    rule("narratives.market_overview", &["market_overview"], ""),
    rule("narratives.sponsor", &["sponsor_narrative", "sponsor_summary"], ""),
    rule("narratives.exit_strategy", &["exit_strategy", "exit_strategy_narrative"], ""),
    rule("narratives.zoning", &["zoning_narrative", "zoning_entitlements"], ""),
    // Loan terms
    rule("loan_terms.extension", &["extension_option", "extension"], ""),
    rule("loan_terms.term", &["term", "term_months"], ""),
    // Capital stack, sources and uses
    rule("row.label", &["label", "item"], ""),
    rule("row.percent", &["rate_pct", "percent"], ""),
    rule("sources_uses.total_sources", &["total_sources", "sources_total"], ""),
    rule("sources_uses.total_uses", &["total_uses", "uses_total"], ""),
    rule("capital_stack.total", &["total", "sources_total"], ""),
    rule("ventures.list", &["items", "ventures"], ""),
    // Closing disbursement
    rule("disbursement.closing_costs", &["closing_costs_title", "closing_costs"], ""),
    rule("disbursement.total", &["total_disbursements", "total"], ""),
    // Litigation cases
    rule("case.case_name", &["case_name", "case"], ""),
    rule("case.background", &["background", "complaint_background"], ""),
    rule("case.sponsor_explanation", &["sponsor_explanation"], ""),
    rule("case.fairbridge_analysis", &["fairbridge_analysis", "fairbridge_counsel_analysis"], ""),
    rule("case.holdback", &["holdback", "fairbridge_holdback"], ""),
    // Sponsor ownership table
    rule("sponsor_table.entity", &["entity", "name", "member"], ""),
    rule(
        "sponsor_table.profit_pct",
        &["profit_pct", "profit_percentage_interest", "profit_percentage"],
        "",
    ),
    rule("sponsor_table.membership_interest", &["membership_interest", "membership_units"], ""),
    rule("sponsor_table.capital_interest", &["capital_interest", "capital_contribution"], ""),
    rule(
        "sponsor_table.capital_pct",
        &["capital_pct", "capital_interest_percentage", "capital_percentage"],
        "",
    ),
    // Due diligence providers
    rule("due_diligence.background_check", &["background_check", "background_check_firm"], ""),
    rule("due_diligence.site_visit", &["site_visit", "site_visit_team"], ""),
    // Highlights and track record
    rule("highlight.text", &["highlight", "description"], ""),
    rule("track_record.property", &["property_name", "name", "property"], ""),
    rule("track_record.outcome", &["status", "disposition.status", "outcome"], "Active"),
    // Extraction-record sponsor financials
    rule(
        "pfs.name",
        &[
            "signer_information.name",
            "personal_financial_statement.personal_info.name",
            "name",
            "individual_name",
        ],
        "",
    ),
    rule("pfs.total_assets", &["financial_summary.assets.total_assets"], ""),
    rule(
        "pfs.total_liabilities",
        &[
            "financial_summary.liabilities_and_net_worth.liabilities.total_liabilities",
            "financial_summary.liabilities.total_liabilities",
        ],
        "",
    ),
    rule(
        "pfs.net_worth",
        &["financial_summary.liabilities_and_net_worth.net_worth", "financial_summary.net_worth"],
        "",
    ),
    rule("pfs.cash", &["financial_summary.assets.cash_and_cash_equivalents"], ""),
    rule("pfs.securities", &["financial_summary.assets.marketable_securities"], ""),
    // Extraction-record sources and uses rows
    rule("extraction_row.label", &["description", "label"], ""),
    rule("extraction_row.percent", &["percentage", "percent"], ""),
    rule("extraction_row.release_conditions", &["release_conditions", "notes"], ""),
];

/// Look up a field's declared candidates.
pub fn field_rule(field: &str) -> Option<&'static FieldRule> {
    FIELD_TABLE.iter().find(|rule| rule.field == field)
}

/// Outcome of resolving one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    /// Found under the current name
    Current(&'a Value),
    /// Found under a legacy or alternate name
    Legacy {
        /// The name that matched
        name: &'static str,
        /// The value found
        value: &'a Value,
    },
    /// Computed from other present fields
    Derived(Value),
    /// Every source exhausted
    Placeholder(&'static str),
}

impl<'a> Resolution<'a> {
    /// The resolved value; a placeholder resolves to its text.
    pub fn value(&self) -> Cow<'a, Value> {
        match self {
            Self::Current(value)
            | Self::Legacy {
                value,
                ..
            } => Cow::Borrowed(*value),
            Self::Derived(value) => Cow::Owned(value.clone()),
            Self::Placeholder(text) => Cow::Owned(Value::String((*text).to_string())),
        }
    }

    /// The resolved value, `None` when the placeholder was reached.
    pub fn found(&self) -> Option<Cow<'a, Value>> {
        match self {
            Self::Placeholder(_) => None,
            _ => Some(self.value()),
        }
    }

    /// Display text; a placeholder displays as itself.
    pub fn display(&self) -> String {
        match self {
            Self::Placeholder(text) => (*text).to_string(),
            other => sanitize_scalar(&other.value()),
        }
    }

    /// Whether every source was exhausted.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }
}

/// Whether a value counts as present for fallback purposes.
///
/// Absent means `null`, empty or "no data" strings, empty lists and mappings,
/// `false`, and numeric zero.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !is_no_data(text),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn lookup<'a>(source: &'a Map<String, Value>, candidate: &str) -> Option<&'a Value> {
    if candidate.contains('.') {
        let path: Vec<&str> = candidate.split('.').collect();
        map_get(source, &path)
    } else {
        source.get(candidate)
    }
}

/// Resolve a field against its declared candidates, without derivation.
pub fn resolve<'a>(source: &'a Map<String, Value>, rule: &FieldRule) -> Resolution<'a> {
    resolve_or_derive(source, rule, || None)
}

/// Resolve a field, computing a derived value when no candidate is present.
pub fn resolve_or_derive<'a>(
    source: &'a Map<String, Value>,
    rule: &FieldRule,
    derive: impl FnOnce() -> Option<Value>,
) -> Resolution<'a> {
    for (position, candidate) in rule.candidates.iter().enumerate() {
        if let Some(value) = lookup(source, candidate).filter(|v| is_present(v)) {
            return if position == 0 {
                Resolution::Current(value)
            } else {
                trace!(field = rule.field, name = *candidate, "resolved from legacy name");
                Resolution::Legacy {
                    name: *candidate,
                    value,
                }
            };
        }
    }

    match derive().filter(is_present) {
        Some(value) => {
            trace!(field = rule.field, "resolved by derivation");
            Resolution::Derived(value)
        }
        None => {
            trace!(field = rule.field, "resolved to placeholder");
            Resolution::Placeholder(rule.placeholder)
        }
    }
}

/// Resolve a field by its table name.
///
/// An unknown field name resolves straight to `"N/A"`.
pub fn resolve_field<'a>(source: &'a Map<String, Value>, field: &str) -> Resolution<'a> {
    match field_rule(field) {
        Some(rule) => resolve(source, rule),
        None => {
            trace!(field, "no fallback entry declared");
            Resolution::Placeholder(NOT_AVAILABLE)
        }
    }
}

/// Display text of a field, or `placeholder` when exhausted or blank.
pub fn display_field(source: &Map<String, Value>, field: &str, placeholder: &str) -> String {
    let text = match resolve_field(source, field) {
        Resolution::Placeholder(_) => String::new(),
        found => found.display(),
    };
    if text.is_empty() {
        placeholder.to_string()
    } else {
        text
    }
}

/// Resolved value of a field, `None` when exhausted.
pub fn value_of<'a>(source: &'a Map<String, Value>, field: &str) -> Option<Cow<'a, Value>> {
    resolve_field(source, field).found()
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
    fn test_current_name_wins() {
        let source = object(json!({"fb_ltc_at_closing": "65%", "ltc_at_closing": "70%"}));
        let resolution = resolve_field(&source, "leverage.ltc_at_closing");
        assert_eq!(resolution, Resolution::Current(&json!("65%")));
    }

    #[test]
    fn test_legacy_name_used_when_current_absent() {
        let source = object(json!({"fb_ltc_at_closing": "", "ltc_at_closing": "70%"}));
        match resolve_field(&source, "leverage.ltc_at_closing") {
            Resolution::Legacy {
                name,
                value,
            } => {
                assert_eq!(name, "ltc_at_closing");
                assert_eq!(value, &json!("70%"));
            }
            other => panic!("expected legacy resolution, got {other:?}"),
        }
    }

    #[test]
    fn test_dotted_candidates_walk_nested_paths() {
        let source = object(json!({
            "financial_summary": {"liabilities": {"total_liabilities": 400}}
        }));
        let resolution = resolve_field(&source, "pfs.total_liabilities");
        assert_eq!(resolution.found().map(Cow::into_owned), Some(json!(400)));
    }

    #[test]
    fn test_derived_then_placeholder() {
        let source = object(json!({}));
        let rule = field_rule("pfs.net_worth").unwrap();

        let derived = resolve_or_derive(&source, rule, || Some(json!(600.0)));
        assert_eq!(derived, Resolution::Derived(json!(600.0)));

        let exhausted = resolve_or_derive(&source, rule, || Some(json!(0)));
        assert!(exhausted.is_placeholder());
    }

    #[test]
    fn test_sentinel_strings_are_not_present() {
        assert!(!is_present(&json!("None")));
        assert!(!is_present(&json!("  ")));
        assert!(!is_present(&json!(0)));
        assert!(!is_present(&json!([])));
        assert!(is_present(&json!("0%")));
        assert!(is_present(&json!(0.5)));
    }

    #[test]
    fn test_display_field_placeholders() {
        let source = object(json!({"ltv_at_closing": null}));
        assert_eq!(display_field(&source, "leverage.ltv_at_closing", "N/A"), "N/A");
        assert_eq!(display_field(&source, "no.such.field", "TBD"), "TBD");
    }

    #[test]
    fn test_field_table_names_are_unique() {
        let mut names: Vec<&str> = FIELD_TABLE.iter().map(|rule| rule.field).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }
}
