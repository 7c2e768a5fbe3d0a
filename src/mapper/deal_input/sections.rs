use serde_json::{Map, Value, json};
use tracing::debug;

use super::DealParts;
use crate::config::MemoSettings;
use crate::format::{
    NOT_AVAILABLE, format_currency, format_grouped, format_percent, parse_currency_to_number,
    sanitize_scalar, split_list, str_or, str_or_empty, truncate_chars,
};
use crate::mapper::canonical::{DUE_DILIGENCE_PROVIDERS, foreclosure_section};
use crate::mapper::fallback::{display_field, is_present, value_of};
use crate::mapper::litigation::Litigation;
use crate::mapper::sponsors::{
    CombinedSource, GuarantorSummary, Precedence, Sponsor, SponsorRoster, name_key,
    track_record_from_properties,
};
use crate::mapper::{
    cover, join_address, label_value, or_na, or_placeholder, tbd_source_row, tbd_use_row,
};
use crate::record::{list_at, map_at};

const PROPERTY_NARRATIVE_LIMIT: usize = 4000;
const EXECUTIVE_NARRATIVE_LIMIT: usize = 4000;
const LOCATION_NARRATIVE_LIMIT: usize = 5000;
const MARKET_NARRATIVE_LIMIT: usize = 3000;
const SPONSOR_NARRATIVE_LIMIT: usize = 3000;
const ZONING_NARRATIVE_LIMIT: usize = 3000;
const RISK_NARRATIVE_LIMIT: usize = 2000;
const EXIT_NARRATIVE_LIMIT: usize = 2000;
const FINDINGS_LIMIT: usize = 500;

const KEY_HIGHLIGHT_LIMIT: usize = 6;

const DEFAULT_MARKET_NARRATIVE: &str = "Market analysis indicates favorable conditions. Please refer to the appraisal for detailed market analysis.";

const DEFAULT_RISK_NARRATIVE: &str =
    "Based on the analysis, this transaction presents acceptable risk levels for Fairbridge.";

/// Parts checked for the validation summary: label, critical.
const PART_CHECKS: &[(&str, bool)] = &[
    ("Property", true),
    ("Loan Terms", true),
    ("Sponsor", true),
    ("Sources & Uses", false),
    ("Valuation", false),
    ("Environmental", false),
    ("Zoning", false),
];

/// All deal-input sections except the cover.
pub(super) fn build_sections(
    deal: &Map<String, Value>,
    parts: &DealParts,
    memo: &MemoSettings,
) -> Map<String, Value> {
    let mut sections = Map::new();
    let mut put = |name: &str, value: Value| {
        sections.insert(name.to_string(), value);
    };
    put("transaction_overview", build_transaction_overview(parts));
    put("executive_summary", build_executive_summary(parts, memo));
    put("sources_and_uses", build_sources_and_uses(parts));
    put("property", build_property(parts));
    put("location", build_location(parts));
    put("market", build_market(parts));
    put("sponsorship", build_sponsorship(parts));
    put("risks_and_mitigants", build_risks_and_mitigants(parts));
    put("validation_flags", build_validation_flags(parts));
    put("third_party_reports", build_third_party_reports(parts));
    put("zoning_entitlements", build_zoning_entitlements(parts));
    put("foreclosure_analysis", foreclosure_section());
    put("litigation", build_litigation(deal, parts));
    put("loan_terms", build_loan_terms(parts));
    put("financial_analysis", build_financial_analysis(parts));
    put("exit_strategy", build_exit_strategy(parts));
    put("deal_highlights", build_deal_highlights(parts));
    put("due_diligence", normalized_due_diligence(&parts.due_diligence));
    sections
}

/// Narrative text resolved through the fallback table, cut to `limit` characters.
fn narrative(parts: &DealParts, field: &str, limit: usize) -> String {
    truncate_chars(&display_field(&parts.narratives, field, ""), limit)
}

fn property_name(parts: &DealParts) -> String {
    display_field(&parts.property, "property.name", "")
}

fn address_part(parts: &DealParts, key: &str) -> String {
    str_or_empty(map_at(&parts.property, &["address"]).get(key))
}

/// Rate text from a string or a `{description}` mapping.
fn rate_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::Object(rate)) => str_or(rate.get("description"), NOT_AVAILABLE),
        other => str_or(other, NOT_AVAILABLE),
    }
}

/// `"{value}%"` unless the value already carries a percent sign.
fn occupancy(value: Option<&Value>) -> String {
    let text = str_or_empty(value);
    if text.is_empty() {
        NOT_AVAILABLE.to_string()
    } else if text.ends_with('%') {
        text
    } else {
        format!("{text}%")
    }
}

pub(super) fn build_cover(parts: &DealParts, memo: &MemoSettings) -> Value {
    let stated = str_or_empty(parts.cover.get("property_address"));
    let address = if stated.is_empty() {
        join_address(
            &address_part(parts, "street"),
            &address_part(parts, "city"),
            &address_part(parts, "state"),
            &address_part(parts, "zip"),
        )
    } else {
        stated
    };

    let list = |key: &str| parts.cover.get(key).map(split_list).unwrap_or_default();
    let date = str_or_empty(parts.cover.get("date").or_else(|| parts.cover.get("memo_date")));

    cover(
        memo,
        property_name(parts),
        address,
        list("credit_committee"),
        list("underwriting_team"),
        Some(date),
    )
}

fn loan_term_rows(parts: &DealParts) -> Vec<Value> {
    let terms = &parts.loan_terms;
    vec![
        label_value("Interest Rate", rate_text(terms.get("interest_rate"))),
        label_value("Origination Fee", str_or(terms.get("origination_fee"), NOT_AVAILABLE)),
        label_value("Exit Fee", str_or(terms.get("exit_fee"), NOT_AVAILABLE)),
        label_value("Prepayment", str_or(terms.get("prepayment"), NOT_AVAILABLE)),
        label_value("Guaranty", str_or(terms.get("guaranty"), NOT_AVAILABLE)),
    ]
}

fn build_transaction_overview(parts: &DealParts) -> Value {
    let facts = &parts.deal_facts;
    let property_type = facts.get("property_type").or_else(|| parts.property.get("property_type"));

    let deal_facts = vec![
        label_value("Property Type", str_or(property_type, NOT_AVAILABLE)),
        label_value("Property Name", or_na(property_name(parts))),
        label_value("Loan Purpose", str_or(facts.get("loan_purpose"), NOT_AVAILABLE)),
        label_value("Loan Amount", str_or(facts.get("loan_amount"), NOT_AVAILABLE)),
        label_value("Source", str_or(facts.get("source"), NOT_AVAILABLE)),
    ];

    let leverage = &parts.leverage;
    let leverage_metrics = vec![
        label_value("LTC at Closing", display_field(leverage, "leverage.ltc_at_closing", NOT_AVAILABLE)),
        label_value("LTV at Closing", display_field(leverage, "leverage.ltv_at_closing", NOT_AVAILABLE)),
        label_value("LTV at Maturity", display_field(leverage, "leverage.ltv_at_maturity", NOT_AVAILABLE)),
        label_value("Debt Yield", display_field(leverage, "leverage.debt_yield", NOT_AVAILABLE)),
    ];

    json!({
        "deal_facts": deal_facts,
        "loan_terms": loan_term_rows(parts),
        "leverage_metrics": leverage_metrics,
    })
}

/// Executive narrative: the summary fields, then the property narrative alias, then a generated line.
fn executive_narrative(parts: &DealParts) -> String {
    let stated = narrative(parts, "narratives.executive_summary", EXECUTIVE_NARRATIVE_LIMIT);
    if !stated.is_empty() {
        return stated;
    }
    let property_alias = narrative(parts, "narratives.property_overview", EXECUTIVE_NARRATIVE_LIMIT);
    if !property_alias.is_empty() {
        debug!("Executive summary borrowing the property narrative");
        return property_alias;
    }
    format!(
        "Bridge loan request for {}. See narratives for full overview.",
        or_placeholder(property_name(parts), "the property")
    )
}

fn highlight_texts(parts: &DealParts) -> Vec<String> {
    list_at(&parts.highlights, &["items"])
        .iter()
        .filter_map(Value::as_object)
        .map(|item| display_field(item, "highlight.text", ""))
        .filter(|text| !text.is_empty())
        .collect()
}

fn build_executive_summary(parts: &DealParts, memo: &MemoSettings) -> Value {
    let narrative = executive_narrative(parts);
    let mut key_highlights = highlight_texts(parts);
    key_highlights.truncate(KEY_HIGHLIGHT_LIMIT);
    if key_highlights.is_empty() {
        key_highlights.push("See deal highlights.".to_string());
    }

    json!({
        "narrative": narrative,
        "transaction_overview": narrative,
        "key_highlights": key_highlights,
        "recommendation": memo.recommendation,
        "conditions": memo.conditions,
    })
}

fn build_sources_and_uses(parts: &DealParts) -> Value {
    let table = map_at(&parts.sources_uses, &["table"]);
    let total_sources =
        value_of(table, "sources_uses.total_sources").map_or(0.0, |total| parse_currency_to_number(&total));

    let mut sources = Vec::new();
    for item in list_at(table, &["sources"]).iter().filter_map(Value::as_object) {
        let amount = item.get("amount").unwrap_or(&Value::Null);
        let percent = if total_sources != 0.0 && !amount.is_null() {
            format!("{:.1}%", parse_currency_to_number(amount) / total_sources * 100.0)
        } else {
            format_percent(item.get("rate_pct").unwrap_or(&Value::Null))
        };
        sources.push(json!({
            "label": display_field(item, "row.label", "Source"),
            "amount": format_currency(amount),
            "percent": percent,
        }));
    }

    let mut uses = Vec::new();
    for category in list_at(table, &["uses"]).iter().filter_map(Value::as_object) {
        let release_conditions = str_or_empty(category.get("category"));
        for item in list_at(category, &["items"]).iter().filter_map(Value::as_object) {
            uses.push(json!({
                "label": display_field(item, "row.label", "Use"),
                "amount": format_currency(item.get("amount").unwrap_or(&Value::Null)),
                "release_conditions": release_conditions,
            }));
        }
    }

    if sources.is_empty() {
        sources.push(tbd_source_row());
    }
    if uses.is_empty() {
        uses.push(tbd_use_row());
    }
    json!({"fairbridge_sources_uses": {"sources": sources, "uses": uses}})
}

fn build_property(parts: &DealParts) -> Value {
    let property = &parts.property;
    let name = property_name(parts);
    let building_sf = value_of(property, "property.building_sf");
    let acres = display_field(property, "property.land_area_acres", NOT_AVAILABLE);

    let mut description = narrative(parts, "narratives.property_overview", PROPERTY_NARRATIVE_LIMIT);
    if description.is_empty() {
        description = format!(
            "{} is located at {}, {}, {}. {} SF, {acres} acres.",
            or_placeholder(name.clone(), "The property"),
            address_part(parts, "street"),
            address_part(parts, "city"),
            address_part(parts, "state"),
            building_sf.as_deref().map_or_else(|| NOT_AVAILABLE.to_string(), sanitize_scalar),
        );
    }

    let building_sf = match building_sf.as_deref() {
        Some(value) => match format_grouped(value) {
            Some(grouped) => format!("{grouped} SF"),
            None => sanitize_scalar(value),
        },
        None => NOT_AVAILABLE.to_string(),
    };

    let metrics = vec![
        label_value("Property Name", or_na(name)),
        label_value("Property Type", str_or(property.get("property_type"), NOT_AVAILABLE)),
        label_value("Land Area", format!("{acres} acres")),
        label_value("Building SF", building_sf),
        label_value("Year Built", str_or(property.get("year_built"), NOT_AVAILABLE)),
        label_value("Year Renovated", str_or(property.get("year_renovated"), NOT_AVAILABLE)),
        label_value("Condition", str_or(property.get("condition"), NOT_AVAILABLE)),
        label_value(
            "Current Occupancy",
            occupancy(value_of(property, "property.occupancy_current").as_deref()),
        ),
        label_value(
            "Stabilized Occupancy",
            occupancy(value_of(property, "property.occupancy_stabilized").as_deref()),
        ),
        label_value("Anchor Tenants", str_or(property.get("anchor_tenants"), NOT_AVAILABLE)),
    ];

    json!({"description_narrative": description, "metrics": metrics})
}

fn build_location(parts: &DealParts) -> Value {
    let mut text = narrative(parts, "narratives.location_overview", LOCATION_NARRATIVE_LIMIT);
    if text.is_empty() {
        text = format!(
            "The property is located in {}, {}, {}. See appraisal for detailed location analysis.",
            address_part(parts, "city"),
            address_part(parts, "county"),
            address_part(parts, "state"),
        );
    }
    json!({"narrative": text})
}

fn build_market(parts: &DealParts) -> Value {
    let text = narrative(parts, "narratives.market_overview", MARKET_NARRATIVE_LIMIT);
    json!({"narrative": or_placeholder(text, DEFAULT_MARKET_NARRATIVE)})
}

/// Principals with their financial profiles.
fn principal_sponsors(sponsor: &Map<String, Value>) -> Vec<Sponsor> {
    list_at(sponsor, &["principals"])
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|principal| {
            let name = str_or_empty(principal.get("name"));
            if name.is_empty() {
                return None;
            }
            let profile = map_at(principal, &["financial_profile"]);
            let liquid = profile.get("liquid_assets").cloned().unwrap_or_default();
            Some(Sponsor {
                net_worth: profile.get("net_worth").cloned().unwrap_or_default(),
                cash: liquid.clone(),
                liquidity: liquid,
                ..Sponsor::named(name)
            })
        })
        .collect()
}

/// Guarantor names first, then principals, deduplicated by name key.
///
/// A guarantor who is also a principal takes the principal's figures.
fn sponsor_roster(sponsor: &Map<String, Value>, guarantors: Option<&GuarantorSummary>) -> SponsorRoster {
    let principals = principal_sponsors(sponsor);
    let mut roster = SponsorRoster::new();

    for name in guarantors.map(|g| g.names.as_slice()).unwrap_or(&[]) {
        let key = name_key(name);
        let detailed = principals.iter().find(|p| name_key(&p.name) == key);
        let entry = match detailed {
            Some(principal) => Sponsor {
                name: name.clone(),
                ..principal.clone()
            },
            None => Sponsor::named(name.clone()),
        };
        roster.insert(entry);
    }
    for principal in principals {
        roster.insert(principal);
    }
    roster
}

/// Ownership table rows with their field names normalized.
pub(super) fn sponsor_table_rows(sponsor: &Map<String, Value>) -> Vec<Value> {
    list_at(sponsor, &["table"])
        .iter()
        .filter_map(Value::as_object)
        .map(|row| {
            json!({
                "entity": display_field(row, "sponsor_table.entity", ""),
                "profit_pct": display_field(row, "sponsor_table.profit_pct", ""),
                "membership_interest": display_field(row, "sponsor_table.membership_interest", ""),
                "capital_interest": display_field(row, "sponsor_table.capital_interest", ""),
                "capital_pct": display_field(row, "sponsor_table.capital_pct", ""),
            })
        })
        .collect()
}

fn build_sponsorship(parts: &DealParts) -> Value {
    let sponsor = &parts.sponsor;
    let guarantors = GuarantorSummary::from_map(map_at(sponsor, &["guarantors"]));
    let roster = sponsor_roster(sponsor, guarantors.as_ref());
    let combined = roster.combined(guarantors.as_ref(), Precedence::Upstream);
    debug!(sponsors = roster.len(), source = ?combined.source, "Aggregated deal sponsors");

    let mut financial_summary = Vec::new();
    if combined.source != CombinedSource::None {
        financial_summary.push(label_value("COMBINED NET WORTH", format_currency(&json!(combined.net_worth))));
        financial_summary.push(label_value("COMBINED LIQUIDITY", format_currency(&json!(combined.liquidity))));
    }
    for entry in roster.sponsors().iter().filter(|s| s.has_financials()) {
        financial_summary.push(label_value(format!("{} - Net Worth", entry.name), format_currency(&entry.net_worth)));
        financial_summary.push(label_value(format!("{} - Liquidity", entry.name), format_currency(&entry.liquidity)));
    }
    if financial_summary.is_empty() {
        financial_summary.push(label_value("TBD", "TBD"));
    }

    let guarantor_names = guarantors.as_ref().map(|g| g.names.join(" & ")).unwrap_or_default();
    let display_name = or_placeholder(
        or_placeholder(str_or_empty(sponsor.get("name")), &guarantor_names),
        "See sponsor details",
    );

    let mut overview_narrative = narrative(parts, "narratives.sponsor", SPONSOR_NARRATIVE_LIMIT);
    if overview_narrative.is_empty() && !roster.is_empty() {
        overview_narrative = format!(
            "The principals are {}. Combined net worth {}, liquidity {}.",
            roster.names().join(", "),
            format_currency(&json!(combined.net_worth)),
            format_currency(&json!(combined.liquidity)),
        );
    }

    json!({
        "name": display_name,
        "table": sponsor_table_rows(sponsor),
        "overview": display_name,
        "overview_narrative": overview_narrative,
        "financial_summary": financial_summary,
        "track_record": track_record_from_properties(list_at(sponsor, &["track_record"])),
        "_sponsors_detail": roster.to_value(),
    })
}

fn build_risks_and_mitigants(parts: &DealParts) -> Value {
    let mut risk_items: Vec<Value> = list_at(&parts.risks, &["items"])
        .iter()
        .filter_map(Value::as_object)
        .map(|item| {
            json!({
                "category": str_or(item.get("risk"), "Risk"),
                "score": str_or(item.get("score"), "Moderate"),
                "risk": str_or_empty(item.get("description")),
                "mitigant": str_or_empty(item.get("mitigant")),
            })
        })
        .collect();
    if risk_items.is_empty() {
        risk_items.push(json!({
            "category": "General",
            "score": "Moderate",
            "risk": "See risks and mitigants.",
            "mitigant": "See narrative.",
        }));
    }

    let stated = truncate_chars(
        &str_or_empty(parts.narratives.get("risks_mitigants_narrative")),
        RISK_NARRATIVE_LIMIT,
    );

    json!({
        "overall_risk_score": str_or(parts.risks.get("overall_risk_score"), "MODERATE"),
        "recommendation_narrative": or_placeholder(stated, DEFAULT_RISK_NARRATIVE),
        "risk_items": risk_items,
        "items": risk_items,
    })
}

fn build_validation_flags(parts: &DealParts) -> Value {
    let present = |label: &str| {
        let part = match label {
            "Property" => &parts.property,
            "Loan Terms" => &parts.loan_terms,
            "Sponsor" => &parts.sponsor,
            "Sources & Uses" => &parts.sources_uses,
            "Valuation" => &parts.valuation,
            "Environmental" => &parts.environmental,
            _ => &parts.zoning,
        };
        !part.is_empty()
    };

    let mut critical_flags = Vec::new();
    let mut warning_flags = Vec::new();
    let mut passed = 0;
    for &(label, critical) in PART_CHECKS {
        if present(label) {
            passed += 1;
        } else if critical {
            critical_flags.push(json!({
                "rule": format!("{label} Required"),
                "message": format!("{label} data not found in deal record"),
            }));
        } else {
            warning_flags.push(json!({
                "rule": format!("{label} Recommended"),
                "message": format!("{label} data not found - verify if required"),
            }));
        }
    }

    json!({
        "summary": {
            "total_checks": PART_CHECKS.len(),
            "passed": passed,
            "warnings": warning_flags.len(),
            "failed": critical_flags.len(),
        },
        "critical_flags": critical_flags,
        "warning_flags": warning_flags,
    })
}

fn build_third_party_reports(parts: &DealParts) -> Value {
    let diligence = &parts.due_diligence;
    let valuation = &parts.valuation;
    let environmental = &parts.environmental;

    let currency = |field: &str| {
        value_of(valuation, field).map_or_else(|| NOT_AVAILABLE.to_string(), |v| format_currency(&v))
    };
    let findings = truncate_chars(&str_or(environmental.get("findings_summary"), NOT_AVAILABLE), FINDINGS_LIMIT);
    let phase_ii = if environmental.get("phase_ii_required").is_some_and(is_present) {
        "Yes"
    } else {
        "No"
    };

    json!({
        "appraisal": {
            "firm": str_or(diligence.get("appraisal_company"), NOT_AVAILABLE),
            "appraiser": str_or(diligence.get("appraisal_firm"), NOT_AVAILABLE),
            "effective_date": str_or(valuation.get("effective_date"), NOT_AVAILABLE),
            "as_is_value": currency("valuation.as_is"),
            "stabilized_value": currency("valuation.stabilized"),
            "cap_rate": value_of(valuation, "valuation.cap_rate")
                .map_or_else(|| NOT_AVAILABLE.to_string(), |v| format_percent(&v)),
        },
        "environmental": {
            "firm": str_or(environmental.get("firm"), NOT_AVAILABLE),
            "report_date": str_or(environmental.get("report_date"), NOT_AVAILABLE),
            "current_recs": list_at(environmental, &["historical_recs"]).len().to_string(),
            "phase_ii_required": phase_ii,
            "findings": findings,
        },
        "pca": {
            "firm": str_or(diligence.get("pca_firm"), NOT_AVAILABLE),
            "report_date": NOT_AVAILABLE,
            "summary": str_or(parts.narratives.get("pca_narrative"), "See property condition assessment."),
        },
    })
}

fn build_zoning_entitlements(parts: &DealParts) -> Value {
    let zoning = &parts.zoning;
    let zone_code = str_or(zoning.get("zone_code"), NOT_AVAILABLE);

    let mut text = narrative(parts, "narratives.zoning", ZONING_NARRATIVE_LIMIT);
    if text.is_empty() {
        let best_use = str_or_empty(zoning.get("highest_best_use_improved"));
        text = format!("Current zoning: {zone_code}. {best_use}").trim_end().to_string();
    }

    json!({
        "summary_narrative": text,
        "current_zoning": zone_code,
        "proposed_zoning": "See redevelopment",
        "entitlement_status": "See zoning narrative",
        "exists": !zoning.is_empty(),
    })
}

/// Litigation block shared by the section and the `active_litigation` root value.
pub(super) fn litigation(deal: &Map<String, Value>, parts: &DealParts) -> Litigation {
    let narrative = parts.narratives.get("litigation_narrative").filter(|v| is_present(v));
    Litigation::from_map(map_at(deal, &["active_litigation"]), narrative)
}

fn build_litigation(deal: &Map<String, Value>, parts: &DealParts) -> Value {
    litigation(deal, parts).to_section_value()
}

fn build_loan_terms(parts: &DealParts) -> Value {
    let terms = &parts.loan_terms;
    let mut rows = loan_term_rows(parts);
    rows.push(label_value("Term", display_field(terms, "loan_terms.term", NOT_AVAILABLE)));
    rows.push(label_value("Extension", display_field(terms, "loan_terms.extension", NOT_AVAILABLE)));
    rows.push(label_value("Collateral", str_or(terms.get("collateral"), NOT_AVAILABLE)));

    json!({
        "narrative": str_or_empty(parts.narratives.get("loan_terms_narrative")),
        "terms": rows,
    })
}

fn build_financial_analysis(parts: &DealParts) -> Value {
    let valuation = &parts.valuation;
    let mut metrics = Vec::new();
    for (label, field) in [
        ("As-Is Value", "valuation.as_is"),
        ("Stabilized Value", "valuation.stabilized"),
        ("As-Complete Value", "valuation.as_complete"),
    ] {
        if let Some(value) = value_of(valuation, field) {
            metrics.push(label_value(label, format_currency(&value)));
        }
    }
    if let Some(cap_rate) = value_of(valuation, "valuation.cap_rate") {
        metrics.push(label_value("Cap Rate", format_percent(&cap_rate)));
    }

    json!({
        "narrative": str_or_empty(parts.narratives.get("financial_analysis_narrative")),
        "metrics": metrics,
    })
}

fn build_exit_strategy(parts: &DealParts) -> Value {
    json!({"narrative": narrative(parts, "narratives.exit_strategy", EXIT_NARRATIVE_LIMIT)})
}

fn build_deal_highlights(parts: &DealParts) -> Value {
    let items: Vec<Value> =
        highlight_texts(parts).into_iter().map(|highlight| json!({"highlight": highlight})).collect();
    json!({"items": items})
}

/// The eight provider fields, blank when not given.
pub(super) fn normalized_due_diligence(diligence: &Map<String, Value>) -> Value {
    let providers: Map<String, Value> = DUE_DILIGENCE_PROVIDERS
        .iter()
        .map(|key| {
            let value = match *key {
                "background_check" => display_field(diligence, "due_diligence.background_check", ""),
                "site_visit" => display_field(diligence, "due_diligence.site_visit", ""),
                other => str_or_empty(diligence.get(other)),
            };
            ((*key).to_string(), Value::String(value))
        })
        .collect();
    Value::Object(providers)
}
