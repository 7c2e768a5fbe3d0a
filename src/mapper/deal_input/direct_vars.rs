//! Root-level template variables emitted alongside the deal-input sections.
//!
//! Templates address many values directly (`{{ disbursement_total }}`,
//! `{% for row in sources_list %}`) rather than through `sections`. Every
//! value here is template-ready: lists are lists, mappings are mappings, and
//! scalars never carry a literal `None`.

use regex::Regex;
use serde_json::{Map, Value, json};
use std::sync::LazyLock;

use super::DealParts;
use super::sections::{litigation, normalized_due_diligence, sponsor_table_rows};
use crate::format::{
    NOT_AVAILABLE, first_line, format_currency, format_percent, sanitize_scalar, shorten_display,
    str_or, str_or_empty,
};
use crate::mapper::fallback::{display_field, value_of};
use crate::mapper::loan_terms_raw;
use crate::record::{list_at, map_at};

static RATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"SOFR\s*\+\s*\d+|[\d.]+%").expect("valid regex"));

static FEE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\d.]+%").expect("valid regex"));

const RATE_DISPLAY_LIMIT: usize = 50;
const FEE_DISPLAY_LIMIT: usize = 20;

/// Closing disbursement lines: variable suffix, source key, row label.
const DISBURSEMENT_LINES: &[(&str, &str, &str)] = &[
    ("payoff", "payoff_existing_debt", "Payoff Existing Debt"),
    ("broker_fee", "broker_fee", "Broker Fee"),
    ("origination_fee", "origination_fee", "Origination Fee"),
    ("closing_costs", "closing_costs_title", "Closing Costs (Title)"),
    ("lender_legal", "lender_legal", "Lender Legal"),
    ("borrower_legal", "borrower_legal", "Borrower Legal"),
    ("misc", "misc", "Misc"),
    ("interest_reserve", "interest_reserve", "Interest Reserve"),
    ("total", "total_disbursements", "Total Disbursements"),
    ("sponsor_equity", "sponsors_equity_at_closing", "Sponsors Equity at Closing"),
    ("fairbridge_release", "fairbridge_release_at_closing", "Fairbridge Release at Closing"),
];

/// Deal sub-records passed through as-is, or as an empty mapping.
const PASS_THROUGH: &[&str] = &["rent_roll", "construction_budget", "comps", "redevelopment"];

/// Build the root variables for one deal.
pub(super) fn direct_variables(deal: &Map<String, Value>, parts: &DealParts) -> Map<String, Value> {
    let mut out = Map::new();

    loan_issues(deal, &mut out);
    collaborative_ventures(deal, &mut out);
    let (capital_sources, capital_uses) = capital_stack(deal, &mut out);
    sources_and_uses(parts, capital_sources, capital_uses, &mut out);
    closing_disbursement(parts, &mut out);
    display_fields(parts, &mut out);

    out.insert("sponsor_table".to_string(), Value::Array(sponsor_table_rows(&parts.sponsor)));
    out.insert(
        "sponsors".to_string(),
        Value::Array(list_at(&parts.sponsor, &["principals"]).to_vec()),
    );

    for key in PASS_THROUGH {
        let value = deal.get(*key).filter(|v| !v.is_null()).cloned().unwrap_or_else(|| json!({}));
        out.insert((*key).to_string(), value);
    }
    out.insert("due_diligence".to_string(), normalized_due_diligence(&parts.due_diligence));
    out.insert("active_litigation".to_string(), litigation(deal, parts).to_active_value());

    let mut highlights = parts.highlights.clone();
    if !highlights.get("items").is_some_and(Value::is_array) {
        highlights.insert("items".to_string(), json!([]));
    }
    out.insert("deal_highlights".to_string(), Value::Object(highlights));

    let leverage = &parts.leverage;
    out.insert("LTC".to_string(), Value::String(display_field(leverage, "root.LTC", NOT_AVAILABLE)));
    out.insert("LTV".to_string(), Value::String(display_field(leverage, "root.LTV", NOT_AVAILABLE)));
    let property_value = value_of(&parts.valuation, "valuation.as_is")
        .or_else(|| value_of(&parts.valuation, "valuation.as_complete"))
        .map_or_else(|| NOT_AVAILABLE.to_string(), |value| format_currency(&value));
    out.insert("property_value".to_string(), Value::String(property_value));

    let narratives = &parts.narratives;
    out.insert(
        "exit_strategy".to_string(),
        json!({"narrative": display_field(narratives, "narratives.exit_strategy", "")}),
    );
    out.insert(
        "foreclosure_assumptions".to_string(),
        json!({"narrative": str_or_empty(narratives.get("foreclosure_assumptions"))}),
    );
    out.insert("narratives".to_string(), Value::Object(narratives.clone()));

    out.insert("deal_facts_raw".to_string(), Value::Object(parts.deal_facts.clone()));
    out.insert("leverage_raw".to_string(), Value::Object(parts.leverage.clone()));
    out.insert("loan_terms_raw".to_string(), Value::Object(loan_terms_raw(&parts.loan_terms)));

    out
}

fn list_or_empty(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Array(items)) => Value::Array(items.clone()),
        _ => json!([]),
    }
}

fn loan_issues(deal: &Map<String, Value>, out: &mut Map<String, Value>) {
    let issues = map_at(deal, &["loan_issues"]);
    let income_producing = list_or_empty(issues.get("income_producing"));
    let development = list_or_empty(issues.get("development"));

    if !issues.is_empty() {
        out.insert(
            "loan_issues".to_string(),
            json!({"income_producing": income_producing, "development": development}),
        );
    }
    out.insert("loan_issues_income_producing".to_string(), income_producing);
    out.insert("loan_issues_development".to_string(), development);
    out.insert(
        "loan_issues_disclosure".to_string(),
        Value::String(str_or_empty(issues.get("disclosure_statement"))),
    );
}

fn collaborative_ventures(deal: &Map<String, Value>, out: &mut Map<String, Value>) {
    let (items, disclosure, total, description) = match deal.get("collaborative_ventures") {
        Some(Value::Object(ventures)) => {
            let items = match value_of(ventures, "ventures.list").as_deref() {
                Some(Value::Array(list)) => list.clone(),
                _ => ventures
                    .iter()
                    .filter(|(key, _)| {
                        !matches!(key.as_str(), "disclosure_statement" | "total" | "description")
                    })
                    .map(|(_, value)| value.clone())
                    .collect(),
            };
            (
                items,
                str_or_empty(ventures.get("disclosure_statement")),
                str_or_empty(ventures.get("total")),
                str_or_empty(ventures.get("description")),
            )
        }
        Some(Value::Array(list)) => (list.clone(), String::new(), String::new(), String::new()),
        _ => (Vec::new(), String::new(), String::new(), String::new()),
    };

    out.insert("collaborative_ventures".to_string(), json!({"items": items}));
    out.insert("collaborative_ventures_list".to_string(), Value::Array(items));
    out.insert("collaborative_ventures_disclosure".to_string(), Value::String(disclosure));
    out.insert("collaborative_ventures_total".to_string(), Value::String(total));
    out.insert("collaborative_ventures_description".to_string(), Value::String(description));
}

fn source_row(item: &Map<String, Value>) -> Value {
    json!({
        "label": display_field(item, "row.label", ""),
        "amount": format_currency(item.get("amount").unwrap_or(&Value::Null)),
        "percent": format_percent(value_of(item, "row.percent").as_deref().unwrap_or(&Value::Null)),
    })
}

fn use_row(item: &Map<String, Value>, release_conditions: &str) -> Value {
    json!({
        "label": display_field(item, "row.label", ""),
        "amount": format_currency(item.get("amount").unwrap_or(&Value::Null)),
        "release_conditions": release_conditions,
    })
}

/// Source rows from a list of `{label|item, amount, rate_pct|percent}` mappings.
fn source_rows(items: &[Value]) -> Vec<Value> {
    items.iter().filter_map(Value::as_object).map(source_row).collect()
}

/// Use rows from category groups (`{category, items}`) or flat rows.
fn use_rows(entries: &[Value]) -> Vec<Value> {
    let mut rows = Vec::new();
    for entry in entries.iter().filter_map(Value::as_object) {
        let category = str_or_empty(entry.get("category"));
        let items = list_at(entry, &["items"]);
        if items.is_empty() {
            if entry.contains_key("item") || entry.contains_key("label") {
                rows.push(use_row(entry, &category));
            }
            continue;
        }
        rows.extend(items.iter().filter_map(Value::as_object).map(|item| use_row(item, &category)));
    }
    rows
}

/// Capital stack title, rows and total. Returns the rows for reuse by the sources-and-uses lists.
fn capital_stack(deal: &Map<String, Value>, out: &mut Map<String, Value>) -> (Vec<Value>, Vec<Value>) {
    let stack = map_at(deal, &["capital_stack"]);
    let table = match stack.get("table") {
        Some(Value::Object(table)) => table,
        _ => stack,
    };

    let title = str_or(table.get("title"), "Capital Stack at Closing");
    let mut sources = source_rows(list_at(table, &["sources"]));
    let mut uses = use_rows(list_at(table, &["uses"]));
    if sources.is_empty() && uses.is_empty() && !std::ptr::eq(table, stack) {
        sources = source_rows(list_at(stack, &["sources"]));
        uses = use_rows(list_at(stack, &["uses"]));
    }

    out.insert(
        "capital_stack".to_string(),
        json!({"title": title, "sources": sources, "uses": uses}),
    );
    out.insert("capital_stack_title".to_string(), Value::String(title));
    out.insert("capital_stack_sources".to_string(), Value::Array(sources.clone()));
    out.insert("capital_stack_uses".to_string(), Value::Array(uses.clone()));
    out.insert(
        "capital_stack_total".to_string(),
        Value::String(display_field(stack, "capital_stack.total", "")),
    );
    (sources, uses)
}

fn total_display(sources_uses: &Map<String, Value>, field: &str) -> String {
    let table = map_at(sources_uses, &["table"]);
    value_of(sources_uses, field)
        .or_else(|| value_of(table, field))
        .map(|total| format_currency(&total))
        .unwrap_or_default()
}

fn sources_and_uses(
    parts: &DealParts,
    capital_sources: Vec<Value>,
    capital_uses: Vec<Value>,
    out: &mut Map<String, Value>,
) {
    let sources_uses = &parts.sources_uses;
    let table = map_at(sources_uses, &["table"]);
    let pick = |key: &str| {
        let rows = list_at(table, &[key]);
        if rows.is_empty() { list_at(sources_uses, &[key]) } else { rows }
    };

    let mut sources = source_rows(pick("sources"));
    if sources.is_empty() {
        sources = capital_sources;
    }
    let mut uses = use_rows(pick("uses"));
    if uses.is_empty() {
        uses = capital_uses;
    }

    let max_rows = sources.len().max(uses.len()).max(1);
    out.insert("sources_list".to_string(), Value::Array(sources));
    out.insert("uses_list".to_string(), Value::Array(uses));
    out.insert(
        "sources_total".to_string(),
        Value::String(total_display(sources_uses, "sources_uses.total_sources")),
    );
    out.insert(
        "uses_total".to_string(),
        Value::String(total_display(sources_uses, "sources_uses.total_uses")),
    );
    out.insert("sources_uses_max_rows".to_string(), json!(max_rows));
}

fn disbursement_value(disbursement: &Map<String, Value>, key: &str) -> String {
    match key {
        "closing_costs_title" => display_field(disbursement, "disbursement.closing_costs", ""),
        "total_disbursements" => display_field(disbursement, "disbursement.total", ""),
        other => str_or_empty(disbursement.get(other)),
    }
}

fn sanitized(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter().map(|(key, value)| (key.clone(), Value::String(sanitize_scalar(value)))).collect()
}

fn closing_disbursement(parts: &DealParts, out: &mut Map<String, Value>) {
    let disbursement = &parts.closing_disbursement;
    let mut rows = Vec::with_capacity(DISBURSEMENT_LINES.len());
    for (suffix, key, label) in DISBURSEMENT_LINES {
        let value = disbursement_value(disbursement, key);
        out.insert(format!("disbursement_{suffix}"), Value::String(value.clone()));
        rows.push(json!({"label": label, "value": value}));
    }
    out.insert("disbursement_rows".to_string(), Value::Array(rows));
    out.insert("closing_disbursement".to_string(), Value::Object(sanitized(disbursement)));

    let mut funding = sanitized(disbursement);
    let narrative = str_or_empty(parts.narratives.get("closing_funding_narrative"));
    if !narrative.is_empty() {
        funding.insert("narrative".to_string(), Value::String(narrative));
    }
    out.insert("closing_funding_and_reserves".to_string(), Value::Object(funding));
}

/// `"{count}x {term}-month"` for a structured extension option, else its first line.
fn extension_text(value: &Value) -> String {
    match value {
        Value::Object(option) => format!(
            "{}x {}-month",
            str_or(option.get("count"), "1"),
            str_or(option.get("term_months"), "6")
        ),
        other => first_line(other),
    }
}

fn display_fields(parts: &DealParts, out: &mut Map<String, Value>) {
    let terms = &parts.loan_terms;
    let rate = terms
        .get("interest_rate")
        .filter(|v| !sanitize_scalar(v).is_empty())
        .or_else(|| parts.deal_facts.get("interest_rate"))
        .cloned()
        .unwrap_or_default();
    let rate = match rate {
        Value::Object(described) => described.get("description").cloned().unwrap_or_default(),
        other => other,
    };

    let fee = |key: &str| shorten_display(terms.get(key).unwrap_or(&Value::Null), FEE_DISPLAY_LIMIT, &FEE_RE);
    let displays = [
        ("interest_rate_display", shorten_display(&rate, RATE_DISPLAY_LIMIT, &RATE_RE)),
        ("origination_fee_display", fee("origination_fee")),
        ("exit_fee_display", fee("exit_fee")),
        (
            "term_display",
            value_of(terms, "loan_terms.term").map(|term| first_line(&term)).unwrap_or_default(),
        ),
        (
            "extension_display",
            value_of(terms, "loan_terms.extension").map(|ext| extension_text(&ext)).unwrap_or_default(),
        ),
    ];
    for (key, value) in displays {
        out.insert(key.to_string(), Value::String(value));
    }
}
