//! Schema mapping over a single pre-aggregated deal record.
//!
//! Deal records come from several producer versions. The current shape keeps
//! each sub-record at the top level (`property`, `deal_facts`, `loan_terms`,
//! ...). Older shapes nest the same data under `deal_memo_ready`,
//! `calculations`, `extracted_data`, or `deal_identification`. [`DealParts`]
//! resolves every sub-record once, recording where it came from as a
//! [`PartSource`], and the builders in `sections` and `direct_vars` read only
//! the resolved parts.

mod direct_vars;
mod sections;

#[cfg(test)]
mod deal_input_tests;

use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

use super::{SchemaDocument, SchemaMapper};
use crate::config::MemoSettings;
use crate::format::strip_markdown;
use crate::record::map_at;

/// Where a resolved sub-record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartSource {
    /// The record's own top-level key
    Record,
    /// `deal_memo_ready`
    MemoReady,
    /// `calculations.leverage_ratios`
    Calculations,
    /// `extracted_data.loan_terms`
    ExtractedData,
    /// `deal_identification`
    DealIdentification,
    /// `deal_memo_ready.property_summary`
    PropertySummary,
    /// `deal_memo_ready.narrative_placeholders`
    NarrativePlaceholders,
    /// Not supplied in any known shape
    Absent,
}

impl fmt::Display for PartSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Record => "record",
            Self::MemoReady => "deal_memo_ready",
            Self::Calculations => "calculations",
            Self::ExtractedData => "extracted_data",
            Self::DealIdentification => "deal_identification",
            Self::PropertySummary => "property_summary",
            Self::NarrativePlaceholders => "narrative_placeholders",
            Self::Absent => "absent",
        };
        f.write_str(name)
    }
}

/// Sub-records of a deal, each resolved across the known record shapes.
///
/// Shapes are chosen per sub-record, not per field: the first non-empty
/// candidate mapping is taken whole, and a field left empty there is not
/// filled from a later shape. Field-level fallback happens afterwards,
/// against the chosen mapping's alternate names in
/// [`FIELD_TABLE`](crate::mapper::fallback::FIELD_TABLE).
#[derive(Debug, Clone, Default)]
pub struct DealParts {
    pub cover: Map<String, Value>,
    pub property: Map<String, Value>,
    pub deal_facts: Map<String, Value>,
    pub loan_terms: Map<String, Value>,
    pub leverage: Map<String, Value>,
    pub closing_disbursement: Map<String, Value>,
    pub sponsor: Map<String, Value>,
    pub sources_uses: Map<String, Value>,
    pub valuation: Map<String, Value>,
    /// Narrative texts, markdown already stripped
    pub narratives: Map<String, Value>,
    pub risks: Map<String, Value>,
    pub highlights: Map<String, Value>,
    pub due_diligence: Map<String, Value>,
    pub environmental: Map<String, Value>,
    pub zoning: Map<String, Value>,
    sources: Vec<(&'static str, PartSource)>,
}

/// A non-empty mapping at `key`.
fn part(map: &Map<String, Value>, key: &str) -> Option<Map<String, Value>> {
    map.get(key).and_then(Value::as_object).filter(|m| !m.is_empty()).cloned()
}

/// Text value or `""`.
fn text(map: &Map<String, Value>, key: &str) -> Value {
    match map.get(key) {
        Some(Value::String(s)) => Value::String(s.clone()),
        Some(Value::Null) | None => Value::String(String::new()),
        Some(other) => other.clone(),
    }
}

/// First non-empty text among `keys`.
fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Value {
    keys.iter()
        .map(|key| text(map, key))
        .find(|value| value.as_str().is_none_or(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| Value::String(String::new()))
}

impl DealParts {
    /// Resolve every sub-record of `deal`.
    pub fn from_record(deal: &Map<String, Value>) -> Self {
        let memo_ready = map_at(deal, &["deal_memo_ready"]);
        let extracted = map_at(deal, &["extracted_data"]);
        let mut parts = Self::default();

        parts.deal_facts = parts.choose("deal_facts", [
            (PartSource::Record, part(deal, "deal_facts")),
            (PartSource::MemoReady, part(memo_ready, "deal_facts_table")),
        ]);
        parts.leverage = parts.choose("leverage", [
            (PartSource::Record, part(deal, "leverage")),
            (PartSource::MemoReady, part(memo_ready, "leverage_ratios_table")),
            (PartSource::Calculations, part(map_at(deal, &["calculations"]), "leverage_ratios")),
        ]);

        let extracted_terms = part(extracted, "loan_terms")
            .map(|terms| match terms.get("data") {
                Some(Value::Object(data)) => data.clone(),
                _ => terms,
            })
            .filter(|terms| !terms.is_empty());
        parts.loan_terms = parts.choose("loan_terms", [
            (PartSource::Record, part(deal, "loan_terms")),
            (PartSource::ExtractedData, extracted_terms),
        ]);

        parts.closing_disbursement = parts.choose("closing_disbursement", [
            (PartSource::Record, part(deal, "closing_disbursement")),
            (PartSource::MemoReady, part(memo_ready, "closing_disbursement")),
        ]);

        let identification = part(deal, "deal_identification").map(|di| cover_from_identification(&di, memo_ready));
        parts.cover = parts.choose("cover", [
            (PartSource::Record, part(deal, "cover")),
            (PartSource::DealIdentification, identification),
        ]);

        let summary = part(memo_ready, "property_summary").map(|ps| property_from_summary(&ps));
        parts.property = parts.choose("property", [
            (PartSource::Record, part(deal, "property")),
            (PartSource::PropertySummary, summary),
        ]);

        let placeholders = map_at(memo_ready, &["narrative_placeholders"]);
        let mut narratives = parts.choose("narratives", [
            (PartSource::Record, part(deal, "narratives")),
            (
                PartSource::NarrativePlaceholders,
                Some(narratives_from_placeholders(placeholders)).filter(|_| !placeholders.is_empty()),
            ),
        ]);
        if !placeholders.is_empty() && !has_text(&narratives, "property_overview") {
            narratives.insert(
                "property_overview".to_string(),
                first_text(placeholders, &["property_description", "property_overview"]),
            );
        }
        parts.narratives = strip_narratives(narratives);

        parts.sponsor = parts.record_only(deal, "sponsor");
        parts.sources_uses = parts.record_only(deal, "sources_and_uses");
        parts.valuation = parts.record_only(deal, "valuation");
        parts.risks = parts.record_only(deal, "risks_and_mitigants");
        parts.highlights = parts.record_only(deal, "deal_highlights");
        parts.due_diligence = parts.record_only(deal, "due_diligence");
        parts.environmental = parts.record_only(deal, "environmental");
        parts.zoning = parts.record_only(deal, "zoning");

        parts
    }

    /// Where each sub-record came from, in resolution order.
    pub fn sources(&self) -> &[(&'static str, PartSource)] {
        &self.sources
    }

    /// Where the named sub-record came from.
    pub fn source_of(&self, name: &str) -> PartSource {
        self.sources
            .iter()
            .find(|(part, _)| *part == name)
            .map(|(_, source)| *source)
            .unwrap_or(PartSource::Absent)
    }

    fn choose<const N: usize>(
        &mut self,
        name: &'static str,
        candidates: [(PartSource, Option<Map<String, Value>>); N],
    ) -> Map<String, Value> {
        for (source, candidate) in candidates {
            if let Some(found) = candidate {
                debug!(part = name, source = %source, "Resolved deal part");
                self.sources.push((name, source));
                return found;
            }
        }
        debug!(part = name, "Deal part absent");
        self.sources.push((name, PartSource::Absent));
        Map::new()
    }

    fn record_only(&mut self, deal: &Map<String, Value>, key: &'static str) -> Map<String, Value> {
        self.choose(key, [(PartSource::Record, part(deal, key))])
    }
}

fn has_text(map: &Map<String, Value>, key: &str) -> bool {
    map.get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty() && s.trim() != "None")
}

fn cover_from_identification(
    identification: &Map<String, Value>,
    memo_ready: &Map<String, Value>,
) -> Map<String, Value> {
    let mut cover = Map::new();
    cover.insert("property_address".to_string(), text(identification, "property_address"));
    cover.insert(
        "credit_committee".to_string(),
        first_text(identification, &["sponsor_names", "credit_committee"]),
    );
    cover.insert("underwriting_team".to_string(), text(identification, "underwriting_team"));

    let date = first_text(identification, &["date"]);
    let date = match (date.as_str(), memo_ready.get("memo_date")) {
        (Some(""), Some(Value::String(memo_date))) => Value::String(memo_date.clone()),
        _ => date,
    };
    cover.insert("date".to_string(), date);
    cover
}

fn property_from_summary(summary: &Map<String, Value>) -> Map<String, Value> {
    let mut address = Map::new();
    for (key, from) in [("street", "address"), ("city", "city"), ("state", "state"), ("zip", "zip")] {
        address.insert(key.to_string(), text(summary, from));
    }

    let mut property = Map::new();
    property.insert("name".to_string(), first_text(summary, &["property_name", "project_name"]));
    property.insert("address".to_string(), Value::Object(address));
    property.insert("property_type".to_string(), text(summary, "property_type"));
    property.insert(
        "building_sf".to_string(),
        summary.get("gla").or_else(|| summary.get("gross_leasable_area_sf")).cloned().unwrap_or_default(),
    );
    property.insert(
        "land_area_acres".to_string(),
        summary.get("site_size_acres").or_else(|| summary.get("land_area_acres")).cloned().unwrap_or_default(),
    );
    property.insert("year_built".to_string(), summary.get("year_built").cloned().unwrap_or_default());
    property.insert("occupancy_current".to_string(), summary.get("occupancy").cloned().unwrap_or_default());
    property
}

fn narratives_from_placeholders(placeholders: &Map<String, Value>) -> Map<String, Value> {
    let mut narratives = Map::new();
    narratives.insert(
        "property_overview".to_string(),
        first_text(placeholders, &["property_description", "property_overview"]),
    );
    for (key, from) in [
        ("location_overview", "location_overview"),
        ("market_overview", "market_overview"),
        ("transaction_overview", "deal_summary"),
        ("sponsor_narrative", "sponsor_summary"),
        ("closing_funding_narrative", "closing_funding_narrative"),
    ] {
        narratives.insert(key.to_string(), text(placeholders, from));
    }
    narratives
}

fn strip_narratives(narratives: Map<String, Value>) -> Map<String, Value> {
    narratives
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(text) => Value::String(strip_markdown(&text)),
                other => other,
            };
            (key, value)
        })
        .collect()
}

/// Mapper over one deal record.
pub struct DealInputMapper<'a> {
    deal: &'a Map<String, Value>,
    parts: DealParts,
}

impl<'a> DealInputMapper<'a> {
    pub fn new(deal: &'a Map<String, Value>) -> Self {
        Self {
            deal,
            parts: DealParts::from_record(deal),
        }
    }

    /// The resolved sub-records.
    pub fn parts(&self) -> &DealParts {
        &self.parts
    }
}

impl SchemaMapper for DealInputMapper<'_> {
    fn name(&self) -> &'static str {
        "deal_input"
    }

    fn build(&self, memo: &MemoSettings) -> SchemaDocument {
        debug!(keys = self.deal.len(), "Mapping deal record");
        let sections = sections::build_sections(self.deal, &self.parts, memo);
        let mut root = direct_vars::direct_variables(self.deal, &self.parts);
        root.insert("cover".to_string(), sections::build_cover(&self.parts, memo));
        SchemaDocument::new(root, sections)
    }
}
