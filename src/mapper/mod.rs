//! Schema mapping from upstream deal records to the canonical sections structure.
//!
//! Two variants share one output shape, [`SchemaDocument`]:
//!
//! - [`layer2::Layer2Mapper`] reads an [`ExtractionIndex`](crate::record::ExtractionIndex)
//!   of tagged extraction records ("Appraisal", "Term Sheet", "PFS", ...)
//! - [`deal_input::DealInputMapper`] reads one pre-aggregated deal record, including
//!   the alternate sub-shapes older producers emit
//!
//! A third, [`prepared::PreparedMapper`], accepts an already-flat context and only
//! normalizes it.
//!
//! Every section builder is a pure function of the raw input. None of them reads
//! another builder's output, apart from explicitly named narrative aliases. Fields
//! are resolved one at a time through the ordered fallback in [`fallback`]. After a
//! variant has built its sections, [`canonical::ensure_canonical`] completes the
//! document so every section and sub-key the renderer may reference is present.
//!
//! Builders never fail. Missing or malformed input resolves to placeholders.

pub mod canonical;
pub mod deal_input;
pub mod fallback;
pub mod layer2;
pub mod litigation;
pub mod prepared;
pub mod sponsors;


use serde_json::{Map, Value, json};

use crate::config::MemoSettings;
use crate::format::{NOT_AVAILABLE, TBD};

/// Table-of-contents marker placed in the root `toc` key.
pub const TOC_MARKER: &str = "[[TOC]]";

/// Placeholder for loan-term fields the record leaves blank.
pub const LOAN_TERMS_PLACEHOLDER: &str = "See Loan Terms narrative";

/// Loan-term keys that always carry a value in `loan_terms_raw`.
const LOAN_TERMS_DEFAULTED: &[&str] =
    &["origination_fee", "exit_fee", "prepayment", "guaranty", "collateral"];

/// Output of a schema mapper: direct template variables plus canonical sections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDocument {
    /// Direct template variables (`cover`, `toc`, raw mappings, ...)
    pub root: Map<String, Value>,
    /// Canonical sections keyed by section name
    pub sections: Map<String, Value>,
}

impl SchemaDocument {
    pub fn new(root: Map<String, Value>, sections: Map<String, Value>) -> Self {
        Self {
            root,
            sections,
        }
    }

    /// Per-sponsor entries captured by the sponsorship builder.
    pub fn sponsors_detail(&self) -> &[Value] {
        self.sections
            .get("sponsorship")
            .and_then(|s| s.get("_sponsors_detail"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Names of the captured sponsors, in capture order.
    pub fn sponsor_names(&self) -> Vec<String> {
        self.sponsors_detail()
            .iter()
            .filter_map(|s| s.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }

    /// The document as one JSON value: root keys plus a `sections` member.
    pub fn to_value(&self) -> Value {
        let mut out = self.root.clone();
        out.insert("sections".to_string(), Value::Object(self.sections.clone()));
        Value::Object(out)
    }
}

/// A schema mapper variant.
pub trait SchemaMapper {
    /// Variant name for logs.
    fn name(&self) -> &'static str;

    /// Build the variant's sections and direct variables.
    fn build(&self, memo: &MemoSettings) -> SchemaDocument;

    /// Build and complete the document to the canonical shape.
    fn transform(&self, memo: &MemoSettings) -> SchemaDocument {
        tracing::debug!(mapper = self.name(), "Building schema document");
        let mut doc = self.build(memo);
        canonical::ensure_canonical(&mut doc, memo);
        doc
    }
}

/// A `{label, value}` row.
pub(crate) fn label_value(label: impl Into<String>, value: impl Into<String>) -> Value {
    json!({"label": label.into(), "value": value.into()})
}

/// `text`, or `"N/A"` when empty.
pub(crate) fn or_na(text: String) -> String {
    or_placeholder(text, NOT_AVAILABLE)
}

/// `text`, or `placeholder` when empty.
pub(crate) fn or_placeholder(text: String, placeholder: &str) -> String {
    if text.trim().is_empty() {
        placeholder.to_string()
    } else {
        text
    }
}

/// A single placeholder sources row.
pub(crate) fn tbd_source_row() -> Value {
    json!({"label": TBD, "amount": TBD, "percent": TBD})
}

/// A single placeholder uses row.
pub(crate) fn tbd_use_row() -> Value {
    json!({"label": TBD, "amount": TBD, "release_conditions": TBD})
}

/// `"street, city, state zip"` with blank parts left out.
pub(crate) fn join_address(street: &str, city: &str, state: &str, zip: &str) -> String {
    let region = format!("{} {}", state.trim(), zip.trim());
    [street.trim(), city.trim(), region.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Copy of a loan-terms mapping with blank term fields defaulted.
pub(crate) fn loan_terms_raw(loan_terms: &Map<String, Value>) -> Map<String, Value> {
    let mut raw = loan_terms.clone();
    for key in LOAN_TERMS_DEFAULTED {
        let blank = match raw.get(*key) {
            None | Some(Value::Null) => true,
            Some(Value::String(text)) => text.trim().is_empty(),
            Some(_) => false,
        };
        if blank {
            raw.insert((*key).to_string(), Value::String(LOAN_TERMS_PLACEHOLDER.to_string()));
        }
    }
    raw
}

/// Cover mapping shared by both variants.
pub(crate) fn cover(
    memo: &MemoSettings,
    property_name: String,
    property_address: String,
    credit_committee: Vec<String>,
    underwriting_team: Vec<String>,
    memo_date: Option<String>,
) -> Value {
    let credit_committee = if credit_committee.is_empty() {
        memo.credit_committee.clone()
    } else {
        credit_committee
    };
    let underwriting_team = if underwriting_team.is_empty() {
        memo.underwriting_team.clone()
    } else {
        underwriting_team
    };
    let memo_date = memo_date.filter(|d| !d.trim().is_empty()).unwrap_or_else(|| memo.memo_date());

    json!({
        "memo_subtitle": memo.subtitle,
        "memo_title": memo.title,
        "property_name": property_name,
        "property_address": property_address,
        "credit_committee": credit_committee,
        "underwriting_team": underwriting_team,
        "memo_date": memo_date,
    })
}
