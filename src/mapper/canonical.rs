//! Canonical section skeletons.
//!
//! The renderer treats a missing key and an empty value differently, and only
//! the latter is safe. Every section the template may reference therefore has a
//! declared skeleton here, and [`ensure_canonical`] merges it under whatever a
//! mapper produced: missing sections are inserted whole, missing sub-keys are
//! filled in, and present values are left untouched.

use serde_json::{Map, Value, json};
use tracing::debug;

use super::sponsors::placeholder_track_record;
use super::{SchemaDocument, TOC_MARKER, tbd_source_row, tbd_use_row};
use crate::config::MemoSettings;
use crate::format::{NOT_AVAILABLE, TBD};

/// Canonical section names, in output order.
pub const SECTION_ORDER: [&str; 19] = [
    "cover",
    "transaction_overview",
    "executive_summary",
    "sources_and_uses",
    "property",
    "location",
    "market",
    "sponsorship",
    "risks_and_mitigants",
    "validation_flags",
    "third_party_reports",
    "zoning_entitlements",
    "foreclosure_analysis",
    "litigation",
    "loan_terms",
    "financial_analysis",
    "exit_strategy",
    "deal_highlights",
    "due_diligence",
];

/// Number of quarters in each foreclosure scenario table.
pub const FORECLOSURE_QUARTERS: usize = 8;

/// Column keys of a foreclosure scenario row, after `Quarter`.
const FORECLOSURE_COLUMNS: &[&str] = &[
    "Beginning_Balance",
    "Legal_Fees",
    "Taxes",
    "Insurance",
    "Total_Carrying_Costs",
    "Interest_Accrued",
    "Ending_Balance",
    "Property_Value",
    "LTV",
];

/// Due-diligence provider keys.
pub const DUE_DILIGENCE_PROVIDERS: [&str; 8] = [
    "lenders_counsel",
    "borrowers_counsel",
    "pca_firm",
    "background_check",
    "site_visit",
    "appraisal_firm",
    "appraisal_company",
    "environmental_firm",
];

/// Placeholder scenario rows, Q1 through Q8, every figure `"TBD"`.
pub fn foreclosure_rows() -> Vec<Value> {
    (1..=FORECLOSURE_QUARTERS)
        .map(|quarter| {
            let mut row = Map::new();
            row.insert("Quarter".to_string(), Value::String(format!("Q{quarter}")));
            for column in FORECLOSURE_COLUMNS {
                row.insert((*column).to_string(), Value::String(TBD.to_string()));
            }
            Value::Object(row)
        })
        .collect()
}

/// The foreclosure section with both placeholder scenarios.
pub fn foreclosure_section() -> Value {
    let rows = foreclosure_rows();
    json!({
        "scenario_default_rate": {"rows": rows.clone()},
        "scenario_note_rate": {"rows": rows},
    })
}

/// Skeleton for one section, `None` for names outside [`SECTION_ORDER`].
pub fn default_section(name: &str, memo: &MemoSettings) -> Option<Value> {
    let value = match name {
        "cover" => json!({
            "memo_subtitle": memo.subtitle,
            "memo_title": memo.title,
            "property_name": "",
            "property_address": "",
            "credit_committee": memo.credit_committee,
            "underwriting_team": memo.underwriting_team,
            "memo_date": memo.memo_date(),
        }),
        "transaction_overview" => json!({
            "deal_facts": [],
            "loan_terms": [],
            "leverage_metrics": [],
        }),
        "executive_summary" => json!({
            "narrative": "",
            "transaction_overview": "",
            "key_highlights": ["See deal highlights."],
            "recommendation": memo.recommendation,
            "conditions": memo.conditions,
        }),
        "sources_and_uses" => json!({
            "fairbridge_sources_uses": {
                "sources": [tbd_source_row()],
                "uses": [tbd_use_row()],
            },
        }),
        "property" => json!({
            "description_narrative": "",
            "metrics": [],
        }),
        "location" | "market" | "exit_strategy" => json!({"narrative": ""}),
        "sponsorship" => json!({
            "name": "See sponsor details",
            "table": [],
            "overview": "",
            "overview_narrative": "",
            "financial_summary": [{"label": TBD, "value": TBD}],
            "track_record": [placeholder_track_record()],
            "_sponsors_detail": [],
        }),
        "risks_and_mitigants" => json!({
            "overall_risk_score": "MODERATE",
            "recommendation_narrative": "",
            "risk_items": [],
            "items": [],
        }),
        "validation_flags" => json!({
            "summary": {"total_checks": 0, "passed": 0, "warnings": 0, "failed": 0},
            "critical_flags": [],
            "warning_flags": [],
        }),
        "third_party_reports" => json!({
            "appraisal": {
                "firm": NOT_AVAILABLE,
                "appraiser": NOT_AVAILABLE,
                "effective_date": NOT_AVAILABLE,
                "as_is_value": NOT_AVAILABLE,
                "stabilized_value": NOT_AVAILABLE,
                "cap_rate": NOT_AVAILABLE,
            },
            "environmental": {
                "firm": NOT_AVAILABLE,
                "report_date": NOT_AVAILABLE,
                "current_recs": "0",
                "phase_ii_required": "No",
                "findings": NOT_AVAILABLE,
            },
            "pca": {
                "firm": NOT_AVAILABLE,
                "report_date": NOT_AVAILABLE,
                "summary": "See property condition assessment.",
            },
        }),
        "zoning_entitlements" => json!({
            "summary_narrative": "",
            "current_zoning": NOT_AVAILABLE,
            "proposed_zoning": NOT_AVAILABLE,
            "entitlement_status": NOT_AVAILABLE,
            "exists": false,
        }),
        "foreclosure_analysis" => foreclosure_section(),
        "litigation" => json!({
            "has_litigation": false,
            "narrative": "No active litigation identified.",
            "cases": [],
        }),
        "loan_terms" => json!({"narrative": "", "terms": []}),
        "financial_analysis" => json!({"narrative": "", "metrics": []}),
        "deal_highlights" => json!({"items": []}),
        "due_diligence" => {
            let providers: Map<String, Value> = DUE_DILIGENCE_PROVIDERS
                .iter()
                .map(|key| ((*key).to_string(), Value::String(String::new())))
                .collect();
            Value::Object(providers)
        }
        _ => return None,
    };
    Some(value)
}

/// Complete a document so every canonical section and sub-key is present.
///
/// Sections are reordered to [`SECTION_ORDER`], followed by any extra sections a
/// mapper added. The cover is kept identical at `root.cover` and
/// `sections.cover`, and `root.toc` defaults to [`TOC_MARKER`].
pub fn ensure_canonical(doc: &mut SchemaDocument, memo: &MemoSettings) {
    if !doc.sections.get("cover").is_some_and(Value::is_object) {
        if let Some(cover) = doc.root.get("cover").filter(|c| c.is_object()) {
            doc.sections.insert("cover".to_string(), cover.clone());
        }
    }

    let mut previous = std::mem::take(&mut doc.sections);
    for name in SECTION_ORDER {
        let Some(skeleton) = default_section(name, memo) else {
            continue;
        };
        let section = match previous.remove(name) {
            Some(Value::Object(mut fields)) => {
                if let Value::Object(skeleton) = skeleton {
                    fill_missing(&mut fields, skeleton);
                }
                Value::Object(fields)
            }
            Some(other) => {
                debug!(section = name, kind = kind_of(&other), "Replacing non-mapping section");
                skeleton
            }
            None => {
                debug!(section = name, "Section absent, using skeleton");
                skeleton
            }
        };
        doc.sections.insert(name.to_string(), section);
    }
    doc.sections.extend(previous);

    if let Some(cover) = doc.sections.get("cover") {
        doc.root.insert("cover".to_string(), cover.clone());
    }
    if !doc.root.get("toc").is_some_and(|toc| toc.as_str().is_some_and(|s| !s.is_empty())) {
        doc.root.insert("toc".to_string(), Value::String(TOC_MARKER.to_string()));
    }
}

/// Insert skeleton keys missing from `target`, descending into nested mappings.
fn fill_missing(target: &mut Map<String, Value>, skeleton: Map<String, Value>) {
    for (key, default) in skeleton {
        match target.get_mut(&key) {
            None | Some(Value::Null) => {
                target.insert(key, default);
            }
            Some(Value::Object(existing)) => {
                if let Value::Object(nested) = default {
                    fill_missing(existing, nested);
                }
            }
            Some(_) => {}
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
