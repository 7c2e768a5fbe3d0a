//! Flattening of a schema document into one template namespace.
//!
//! Templates address the same data several ways: `{{ deal_facts.property_type }}`,
//! `{{ sections.transaction_overview.deal_facts }}`, `{{ narrative }}`,
//! `{{ location_overview.narrative }}`. [`flatten`] builds the one mapping that
//! satisfies all of them, in a fixed order:
//!
//! 1. corrections inside `sections`, so every later copy sees them
//! 2. corrections to root derivations (`loan_terms_raw`, `active_litigation`)
//! 3. section sub-fields copied into the root, first writer wins
//! 4. the [`ALIASES`] table
//! 5. whole-section exposures from [`EXPOSURES`]
//! 6. foreclosure scenario views
//! 7. `sections` attached to the root
//! 8. raw mappings spread into the root, then promoted over their list views
//!
//! Nothing here is cached. Each call derives everything from its input.

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::format::sanitize_scalar;
use crate::mapper::SchemaDocument;

/// Alternate name → canonical root name, applied when the alternate is absent.
pub const ALIASES: &[(&str, &str)] = &[("leverage", "leverage_metrics")];

/// What a root exposure copies out of `sections`.
#[derive(Debug, Clone, Copy)]
pub enum Exposure {
    /// The whole section mapping
    Section(&'static str),
    /// One list member of a section, `[]` when missing
    List(&'static str, &'static str),
    /// One text member of a section, `""` when missing
    Text(&'static str, &'static str),
}

/// Root names exposing sections or their members, written only when absent.
pub const EXPOSURES: &[(&str, Exposure)] = &[
    ("sponsor", Exposure::Section("sponsorship")),
    ("sponsors", Exposure::List("sponsorship", "_sponsors_detail")),
    ("sources_and_uses", Exposure::Section("sources_and_uses")),
    ("property_overview", Exposure::Section("property")),
    ("zoning_entitlements", Exposure::Section("zoning_entitlements")),
    ("risks_and_mitigants", Exposure::Section("risks_and_mitigants")),
    ("third_party_reports", Exposure::Section("third_party_reports")),
    ("validation_flags", Exposure::Section("validation_flags")),
    ("foreclosure_analysis", Exposure::Section("foreclosure_analysis")),
    ("location", Exposure::Section("location")),
    ("market", Exposure::Section("market")),
    ("location_overview", Exposure::Section("location")),
    ("market_overview", Exposure::Section("market")),
    ("property_overview_narrative", Exposure::Text("property", "description_narrative")),
    ("financial_info", Exposure::List("sponsorship", "financial_summary")),
    ("guarantor_financials", Exposure::List("sponsorship", "financial_summary")),
    ("financial_information", Exposure::List("sponsorship", "financial_summary")),
    ("litigation", Exposure::Section("litigation")),
    ("financial_analysis", Exposure::Section("financial_analysis")),
    ("deal_highlights", Exposure::Section("deal_highlights")),
    ("due_diligence", Exposure::Section("due_diligence")),
    ("exit_strategy", Exposure::Section("exit_strategy")),
];

/// Raw mapping → the root name it is promoted to.
const RAW_PROMOTIONS: &[(&str, &str)] = &[
    ("deal_facts_raw", "deal_facts"),
    ("leverage_raw", "leverage"),
    ("loan_terms_raw", "loan_terms"),
];

/// Foreclosure scenario views: root name → scenario key in the section.
const SCENARIO_VIEWS: &[(&str, &str)] = &[
    ("default_interest_scenario", "scenario_default_rate"),
    ("note_interest_scenario", "scenario_note_rate"),
];

/// Flatten a schema document into the template namespace.
pub fn flatten(doc: SchemaDocument) -> Map<String, Value> {
    let SchemaDocument {
        root,
        mut sections,
    } = doc;
    let mut flat = root;

    correct_sections(&mut sections);
    correct_root_derivations(&mut flat);

    // Step 3: first writer wins
    let mut copied = 0usize;
    for section in sections.values() {
        if let Value::Object(fields) = section {
            for (key, value) in fields {
                if !flat.contains_key(key) {
                    flat.insert(key.clone(), value.clone());
                    copied += 1;
                }
            }
        }
    }
    debug!(copied, "Copied section fields into root");

    for (alias, canonical) in ALIASES {
        if !flat.contains_key(*alias) {
            if let Some(value) = flat.get(*canonical).cloned() {
                flat.insert((*alias).to_string(), value);
            }
        }
    }

    for (name, exposure) in EXPOSURES {
        if flat.contains_key(*name) {
            continue;
        }
        if let Some(value) = expose(&sections, *exposure) {
            flat.insert((*name).to_string(), value);
        }
    }

    let foreclosure = sections.get("foreclosure_analysis");
    for (name, scenario) in SCENARIO_VIEWS {
        if !flat.contains_key(*name) {
            let source = foreclosure.and_then(|section| section.get(*scenario));
            flat.insert((*name).to_string(), scenario_view(source));
        }
    }

    flat.insert("sections".to_string(), Value::Object(sections));

    spread_raw_mappings(&mut flat);
    flat
}

/// Step 1: narrative defaults inside the sections themselves.
fn correct_sections(sections: &mut Map<String, Value>) {
    if let Some(Value::Object(sponsorship)) = sections.get_mut("sponsorship") {
        if sanitize_scalar(sponsorship.get("overview_narrative").unwrap_or(&Value::Null)).is_empty() {
            let name = sponsorship
                .get("name")
                .map(sanitize_scalar)
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "See Sponsor Details".to_string());
            sponsorship.insert("overview_narrative".to_string(), Value::String(name));
        }
    }
    copy_member_if_absent(sections, "property", "description_narrative", "narrative");
    copy_member_if_absent(sections, "zoning_entitlements", "summary_narrative", "narrative");
}

fn copy_member_if_absent(sections: &mut Map<String, Value>, section: &str, from: &str, to: &str) {
    if let Some(Value::Object(fields)) = sections.get_mut(section) {
        if !fields.contains_key(to) {
            if let Some(value) = fields.get(from).cloned() {
                fields.insert(to.to_string(), value);
            }
        }
    }
}

/// Step 2: corrections to root values produced by the mapper.
fn correct_root_derivations(flat: &mut Map<String, Value>) {
    let loan_terms_narrative = flat
        .get("narratives")
        .and_then(|narratives| narratives.get("loan_terms_narrative"))
        .map(sanitize_scalar)
        .unwrap_or_default();

    if let Some(Value::Object(loan_terms)) = flat.get_mut("loan_terms_raw") {
        if let Some(Value::Object(rate)) = loan_terms.get("interest_rate") {
            let text = match rate.get("description") {
                Some(description) => sanitize_scalar(description),
                None => Value::Object(rate.clone()).to_string(),
            };
            loan_terms.insert("interest_rate".to_string(), Value::String(text));
        }
        if !loan_terms_narrative.is_empty() {
            loan_terms.insert("narrative".to_string(), Value::String(loan_terms_narrative));
        }
    }

    if let Some(Value::Object(litigation)) = flat.get_mut("active_litigation") {
        if !litigation.contains_key("narrative") {
            let cases = litigation.get("cases").and_then(Value::as_array).map_or(0, Vec::len);
            let narrative = if cases > 0 {
                format!("{cases} active case(s). See details below.")
            } else {
                "No active litigation.".to_string()
            };
            litigation.insert("narrative".to_string(), Value::String(narrative));
        }
    }
}

fn expose(sections: &Map<String, Value>, exposure: Exposure) -> Option<Value> {
    match exposure {
        Exposure::Section(section) => sections.get(section).cloned(),
        Exposure::List(section, member) => {
            let fields = sections.get(section)?;
            Some(
                fields
                    .get(member)
                    .filter(|value| value.is_array())
                    .cloned()
                    .unwrap_or_else(|| Value::Array(Vec::new())),
            )
        }
        Exposure::Text(section, member) => {
            let fields = sections.get(section)?;
            Some(Value::String(fields.get(member).map(sanitize_scalar).unwrap_or_default()))
        }
    }
}

/// A scenario mapping with `rows` guaranteed a list and mirrored as `items`.
fn scenario_view(scenario: Option<&Value>) -> Value {
    let mut view = match scenario {
        Some(Value::Object(fields)) => fields.clone(),
        _ => Map::new(),
    };
    let rows = match view.get("rows") {
        Some(Value::Array(rows)) => Value::Array(rows.clone()),
        _ => json!([]),
    };
    view.insert("rows".to_string(), rows.clone());
    view.insert("items".to_string(), rows);
    Value::Object(view)
}

/// Step 8: spread raw keys into the root, then promote the raw mappings.
fn spread_raw_mappings(flat: &mut Map<String, Value>) {
    for (raw, _) in RAW_PROMOTIONS {
        let Some(Value::Object(fields)) = flat.get(*raw).cloned() else {
            continue;
        };
        for (key, value) in fields {
            if !flat.contains_key(&key) {
                flat.insert(key, value);
            }
        }
    }
    for (raw, promoted) in RAW_PROMOTIONS {
        if let Some(value @ Value::Object(_)) = flat.get(*raw).cloned() {
            flat.insert((*promoted).to_string(), value);
        }
    }
}
