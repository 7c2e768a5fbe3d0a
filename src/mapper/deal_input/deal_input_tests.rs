//! Tests for the deal-record mapper.

use serde_json::{Map, Value, json};

use super::{DealInputMapper, DealParts, PartSource};
use crate::config::MemoSettings;
use crate::mapper::canonical::SECTION_ORDER;
use crate::mapper::{LOAN_TERMS_PLACEHOLDER, SchemaDocument, SchemaMapper};

fn memo() -> MemoSettings {
    MemoSettings {
        memo_date: Some("June 30, 2026".to_string()),
        ..MemoSettings::default()
    }
}

fn deal(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("fixture must be an object"),
    }
}

fn transform(value: Value) -> SchemaDocument {
    let record = deal(value);
    DealInputMapper::new(&record).transform(&memo())
}

fn row_value<'a>(rows: &'a Value, label: &str) -> &'a Value {
    rows.as_array()
        .and_then(|rows| rows.iter().find(|row| row["label"] == label))
        .map(|row| &row["value"])
        .unwrap_or(&Value::Null)
}

#[test]
fn test_sparse_record_yields_placeholders() {
    let doc = transform(json!({"deal_id": "D1", "property": {"name": "Example Plaza"}}));

    let names: Vec<&str> = doc.sections.keys().map(String::as_str).collect();
    assert_eq!(names, SECTION_ORDER.to_vec());
    assert_eq!(doc.root["cover"]["property_name"], "Example Plaza");
    assert_eq!(doc.sections["cover"]["property_name"], "Example Plaza");
    assert_eq!(
        doc.sections["sponsorship"]["track_record"],
        json!([{"property": "See sponsor documentation", "role": "Principal", "outcome": "Various"}])
    );
    assert_eq!(doc.sections["sponsorship"]["name"], "See sponsor details");
    assert_eq!(doc.sections["sponsorship"]["financial_summary"][0]["label"], "TBD");
    assert_eq!(doc.root["LTV"], "N/A");
    assert_eq!(doc.root["loan_terms_raw"]["collateral"], LOAN_TERMS_PLACEHOLDER);
    assert_eq!(
        doc.sections["executive_summary"]["narrative"],
        "Bridge loan request for Example Plaza. See narratives for full overview."
    );
}

#[test]
fn test_leverage_feeds_root_ltv_and_metrics() {
    let doc = transform(json!({"leverage": {"ltv_at_closing": "62.50%", "ltc_at_closing": "70.0%"}}));

    assert_eq!(doc.root["LTV"], "62.50%");
    assert_eq!(doc.root["LTC"], "70.0%");
    let metrics = &doc.sections["transaction_overview"]["leverage_metrics"];
    assert!(metrics.as_array().unwrap().contains(&json!({"label": "LTV at Closing", "value": "62.50%"})));
    assert_eq!(row_value(metrics, "LTC at Closing"), "70.0%");
    assert_eq!(row_value(metrics, "Debt Yield"), "N/A");
}

#[test]
fn test_alternate_shapes_are_resolved() {
    let record = deal(json!({
        "deal_memo_ready": {
            "deal_facts_table": {"property_type": "Retail", "loan_amount": "$12,500,000"},
            "leverage_ratios_table": {"ltv_at_maturity": "58.00%"},
            "property_summary": {
                "project_name": "Harbor Point",
                "address": "1 Harbor Way",
                "city": "Tampa",
                "state": "FL",
                "zip": "33602",
                "gla": 45000,
                "site_size_acres": 5.2
            },
            "narrative_placeholders": {
                "property_description": "## Overview\n**Anchored** retail center.",
                "sponsor_summary": "Experienced local sponsor."
            },
            "memo_date": "May 01, 2026"
        },
        "extracted_data": {"loan_terms": {"data": {"exit_fee": "1.00%"}}},
        "deal_identification": {"sponsor_names": "A. Lee, B. Kim", "underwriting_team": "C. Ortiz"}
    }));
    let parts = DealParts::from_record(&record);

    assert_eq!(parts.source_of("deal_facts"), PartSource::MemoReady);
    assert_eq!(parts.source_of("leverage"), PartSource::MemoReady);
    assert_eq!(parts.source_of("loan_terms"), PartSource::ExtractedData);
    assert_eq!(parts.source_of("cover"), PartSource::DealIdentification);
    assert_eq!(parts.source_of("property"), PartSource::PropertySummary);
    assert_eq!(parts.source_of("narratives"), PartSource::NarrativePlaceholders);
    assert_eq!(parts.source_of("sponsor"), PartSource::Absent);
    assert_eq!(parts.narratives["property_overview"], "Overview\nAnchored retail center.");

    let doc = DealInputMapper::new(&record).transform(&memo());
    let cover = &doc.root["cover"];
    assert_eq!(cover["property_name"], "Harbor Point");
    assert_eq!(cover["property_address"], "1 Harbor Way, Tampa, FL 33602");
    assert_eq!(cover["credit_committee"], json!(["A. Lee", "B. Kim"]));
    assert_eq!(cover["underwriting_team"], json!(["C. Ortiz"]));
    assert_eq!(cover["memo_date"], "May 01, 2026");

    assert_eq!(doc.root["LTV"], "58.00%");
    assert_eq!(doc.root["exit_fee_display"], "1.00%");
    let metrics = &doc.sections["property"]["metrics"];
    assert_eq!(row_value(metrics, "Building SF"), "45,000 SF");
    assert_eq!(row_value(metrics, "Land Area"), "5.2 acres");
    assert_eq!(doc.sections["executive_summary"]["narrative"], "Overview\nAnchored retail center.");
    assert_eq!(doc.sections["sponsorship"]["overview_narrative"], "Experienced local sponsor.");
}

#[test]
fn test_current_shape_wins_over_alternates() {
    let record = deal(json!({
        "leverage": {"ltv_at_closing": "60%"},
        "deal_memo_ready": {"leverage_ratios_table": {"ltv_at_closing": "99%"}}
    }));
    let parts = DealParts::from_record(&record);
    assert_eq!(parts.source_of("leverage"), PartSource::Record);
    assert_eq!(parts.leverage["ltv_at_closing"], "60%");
}

#[test]
fn test_alternate_shape_is_chosen_per_sub_record() {
    let record = deal(json!({
        "deal_facts": {"property_type": "", "loan_purpose": "Refinance"},
        "deal_memo_ready": {"deal_facts_table": {"property_type": "Retail", "borrower": "Harbor LLC"}}
    }));
    let parts = DealParts::from_record(&record);
    assert_eq!(parts.source_of("deal_facts"), PartSource::Record);
    assert_eq!(parts.deal_facts["property_type"], "");
    assert!(!parts.deal_facts.contains_key("borrower"));
}

#[test]
fn test_sponsorship_prefers_upstream_combined_figures() {
    let doc = transform(json!({
        "sponsor": {
            "guarantors": {
                "names": ["Steve Hudson", "Ana Mendez"],
                "combined_net_worth": 50_000_000,
                "combined_cash_position": 1_000_000,
                "combined_securities_holdings": 500_000
            },
            "principals": [
                {"name": "Steve Hudson Jr.", "financial_profile": {"net_worth": "$30,000,000", "liquid_assets": 750_000}},
                {"name": "Charles Ladd", "financial_profile": {"net_worth": 5_000_000, "liquid_assets": 250_000}}
            ],
            "track_record": [{"property_name": "Oak Commons", "status": "Sold"}]
        }
    }));
    let sponsorship = &doc.sections["sponsorship"];

    assert_eq!(doc.sponsor_names(), vec!["Steve Hudson", "Ana Mendez", "Charles Ladd"]);
    assert_eq!(sponsorship["name"], "Steve Hudson & Ana Mendez");
    assert_eq!(sponsorship["overview"], "Steve Hudson & Ana Mendez");

    let summary = &sponsorship["financial_summary"];
    assert_eq!(summary[0], json!({"label": "COMBINED NET WORTH", "value": "$50.00M"}));
    assert_eq!(summary[1], json!({"label": "COMBINED LIQUIDITY", "value": "$1.50M"}));
    assert_eq!(row_value(summary, "Steve Hudson - Net Worth"), "$30,000,000");
    assert_eq!(row_value(summary, "Charles Ladd - Liquidity"), "$250,000");
    assert_eq!(row_value(summary, "Ana Mendez - Net Worth"), &Value::Null);

    assert_eq!(
        sponsorship["track_record"],
        json!([{"property": "Oak Commons", "role": "Principal", "outcome": "Sold"}])
    );
    assert!(
        sponsorship["overview_narrative"]
            .as_str()
            .unwrap()
            .starts_with("The principals are Steve Hudson, Ana Mendez, Charles Ladd.")
    );
}

#[test]
fn test_sponsor_table_rows_are_normalized() {
    let doc = transform(json!({
        "sponsor": {"table": [{"member": "Hudson Holdings LLC", "profit_percentage": "60%", "capital_contribution": "$1,000,000"}]}
    }));
    let expected = json!([{
        "entity": "Hudson Holdings LLC",
        "profit_pct": "60%",
        "membership_interest": "",
        "capital_interest": "$1,000,000",
        "capital_pct": ""
    }]);
    assert_eq!(doc.root["sponsor_table"], expected);
    assert_eq!(doc.sections["sponsorship"]["table"], expected);
}

#[test]
fn test_sources_and_uses_percent_of_total() {
    let doc = transform(json!({
        "sources_and_uses": {"table": {
            "total_sources": 20_000_000,
            "sources": [{"label": "Senior Loan", "amount": 12_500_000}],
            "uses": [{"category": "Closing", "items": [{"item": "Title", "amount": 950}]}]
        }}
    }));
    let table = &doc.sections["sources_and_uses"]["fairbridge_sources_uses"];
    assert_eq!(table["sources"][0], json!({"label": "Senior Loan", "amount": "$12.50M", "percent": "62.5%"}));
    assert_eq!(table["uses"][0], json!({"label": "Title", "amount": "$950", "release_conditions": "Closing"}));

    assert_eq!(doc.root["sources_list"][0]["label"], "Senior Loan");
    assert_eq!(doc.root["uses_list"][0]["release_conditions"], "Closing");
    assert_eq!(doc.root["sources_total"], "$20.00M");
    assert_eq!(doc.root["sources_uses_max_rows"], 1);
}

#[test]
fn test_capital_stack_rows_back_the_sources_list() {
    let doc = transform(json!({
        "capital_stack": {"table": {
            "title": "Capital Stack at Maturity",
            "sources": [{"item": "Senior Loan", "amount": "$12,500,000", "rate_pct": 62.5}],
            "uses": [{"item": "Purchase Price", "amount": 18_000_000}]
        }, "total": "$20,000,000"}
    }));
    assert_eq!(doc.root["capital_stack_title"], "Capital Stack at Maturity");
    assert_eq!(
        doc.root["capital_stack_sources"],
        json!([{"label": "Senior Loan", "amount": "$12,500,000", "percent": "62.50%"}])
    );
    assert_eq!(doc.root["capital_stack_uses"][0]["amount"], "$18.00M");
    assert_eq!(doc.root["capital_stack_total"], "$20,000,000");
    assert_eq!(doc.root["capital_stack"]["title"], "Capital Stack at Maturity");
    assert_eq!(doc.root["sources_list"], doc.root["capital_stack_sources"]);
}

#[test]
fn test_display_fields_are_shortened() {
    let doc = transform(json!({
        "loan_terms": {
            "interest_rate": "Floating at SOFR + 450 bps with a floor of 4.00% and step-ups thereafter",
            "origination_fee": "1.00% of the loan amount payable at closing",
            "exit_fee": "0.5%",
            "term": "24 months\nwith two extensions",
            "extension_option": {"count": 2, "term_months": 6}
        }
    }));
    assert_eq!(doc.root["interest_rate_display"], "SOFR + 450");
    assert_eq!(doc.root["origination_fee_display"], "1.00%");
    assert_eq!(doc.root["exit_fee_display"], "0.5%");
    assert_eq!(doc.root["term_display"], "24 months");
    assert_eq!(doc.root["extension_display"], "2x 6-month");
    assert_eq!(doc.root["loan_terms_raw"]["prepayment"], LOAN_TERMS_PLACEHOLDER);
}

#[test]
fn test_closing_disbursement_variables() {
    let doc = transform(json!({
        "closing_disbursement": {
            "payoff_existing_debt": "$8,000,000",
            "closing_costs": "$120,000",
            "total_disbursements": null
        },
        "narratives": {"closing_funding_narrative": "Funds released at closing."}
    }));
    assert_eq!(doc.root["disbursement_payoff"], "$8,000,000");
    assert_eq!(doc.root["disbursement_closing_costs"], "$120,000");
    assert_eq!(doc.root["disbursement_total"], "");
    assert_eq!(doc.root["disbursement_rows"].as_array().unwrap().len(), 11);
    assert_eq!(doc.root["disbursement_rows"][0], json!({"label": "Payoff Existing Debt", "value": "$8,000,000"}));
    assert_eq!(doc.root["closing_disbursement"]["total_disbursements"], "");
    assert_eq!(doc.root["closing_funding_and_reserves"]["narrative"], "Funds released at closing.");
}

#[test]
fn test_litigation_single_case_is_wrapped() {
    let doc = transform(json!({
        "active_litigation": {"cases": {"case": "Smith v. Example LLC", "complaint_background": "Contract dispute"}}
    }));
    let active = &doc.root["active_litigation"];
    assert_eq!(active["exists"], true);
    assert_eq!(active["cases"][0]["case_name"], "Smith v. Example LLC");
    assert_eq!(active["cases"][0]["background"], "Contract dispute");

    let section = &doc.sections["litigation"];
    assert_eq!(section["has_litigation"], true);
    assert_eq!(section["narrative"], "1 active litigation case(s). See details below.");
}

#[test]
fn test_loan_issues_and_ventures() {
    let doc = transform(json!({
        "loan_issues": {"income_producing": [{"issue": "Vacancy"}], "development": "n/a", "disclosure_statement": "None"},
        "collaborative_ventures": {"ventures": [{"name": "JV One"}], "total": "$4,000,000"}
    }));
    assert_eq!(doc.root["loan_issues"]["income_producing"], json!([{"issue": "Vacancy"}]));
    assert_eq!(doc.root["loan_issues"]["development"], json!([]));
    assert_eq!(doc.root["loan_issues_development"], json!([]));
    assert_eq!(doc.root["loan_issues_disclosure"], "");
    assert_eq!(doc.root["collaborative_ventures_list"], json!([{"name": "JV One"}]));
    assert_eq!(doc.root["collaborative_ventures"]["items"], json!([{"name": "JV One"}]));
    assert_eq!(doc.root["collaborative_ventures_total"], "$4,000,000");
}

#[test]
fn test_loan_issues_mapping_omitted_when_absent() {
    let doc = transform(json!({}));
    assert!(!doc.root.contains_key("loan_issues"));
    assert_eq!(doc.root["loan_issues_income_producing"], json!([]));
    assert_eq!(doc.root["collaborative_ventures_list"], json!([]));
    assert_eq!(doc.root["rent_roll"], json!({}));
    assert_eq!(doc.root["deal_highlights"], json!({"items": []}));
}

#[test]
fn test_validation_flags_follow_part_presence() {
    let doc = transform(json!({"property": {"name": "Example Plaza"}, "zoning": {"zone_code": "CG"}}));
    let summary = &doc.sections["validation_flags"]["summary"];
    assert_eq!(summary["total_checks"], 7);
    assert_eq!(summary["passed"], 2);
    assert_eq!(summary["failed"], 2);
    assert_eq!(summary["warnings"], 3);

    let zoning = &doc.sections["zoning_entitlements"];
    assert_eq!(zoning["current_zoning"], "CG");
    assert_eq!(zoning["summary_narrative"], "Current zoning: CG.");
    assert_eq!(zoning["exists"], true);
}

#[test]
fn test_narrative_truncation_and_highlights() {
    let long_market = "m".repeat(3500);
    let doc = transform(json!({
        "narratives": {"market_overview": long_market, "executive_summary": "Summary text."},
        "deal_highlights": {"items": [
            {"highlight": "Grocery anchored"},
            {"description": "Below-market basis"},
            "not a mapping"
        ]}
    }));
    assert_eq!(doc.sections["market"]["narrative"].as_str().unwrap().chars().count(), 3000);
    assert_eq!(doc.sections["executive_summary"]["narrative"], "Summary text.");
    assert_eq!(
        doc.sections["executive_summary"]["key_highlights"],
        json!(["Grocery anchored", "Below-market basis"])
    );
    assert_eq!(doc.sections["deal_highlights"]["items"][1], json!({"highlight": "Below-market basis"}));
}

#[test]
fn test_due_diligence_aliases() {
    let doc = transform(json!({
        "due_diligence": {"background_check_firm": "Diligence Co", "site_visit_team": "J. Park", "pca_firm": null}
    }));
    let diligence = &doc.root["due_diligence"];
    assert_eq!(diligence["background_check"], "Diligence Co");
    assert_eq!(diligence["site_visit"], "J. Park");
    assert_eq!(diligence["pca_firm"], "");
    assert_eq!(diligence.as_object().unwrap().len(), 8);
    assert_eq!(doc.sections["due_diligence"], *diligence);
}
