//! Schema mapping over indexed extraction records.
//!
//! Each builder reads one or more extraction categories straight from the
//! [`ExtractionIndex`]. Appraisal property details are shared through
//! `Subject`, a borrowed view over the raw payload, so builders stay
//! independent of each other's output.
//!
//! Currency values use [`CurrencyStyle::Extraction`], which shows cents below
//! one thousand.

use serde_json::{Map, Value, json};
use tracing::debug;

use super::canonical::foreclosure_section;
use super::fallback::{display_field, is_present, value_of};
use super::litigation::Litigation;
use super::sponsors::{
    CombinedSource, GuarantorSummary, Precedence, Sponsor, SponsorRoster, pfs_name,
    sponsor_from_pfs, track_record_from_properties,
};
use super::{
    SchemaDocument, SchemaMapper, cover, join_address, label_value, loan_terms_raw, or_na,
    tbd_source_row, tbd_use_row,
};
use crate::config::MemoSettings;
use crate::format::{
    CurrencyStyle, NOT_AVAILABLE, as_number, first_amount_in, format_amount, format_currency_with,
    format_grouped, format_percent, parse_currency_to_number, sanitize_scalar, str_or, str_or_empty,
};
use crate::record::{ExtractionIndex, list_at, map_at, map_get, str_at};

/// Extraction category labels read by this mapper.
pub mod category {
    pub const APPRAISAL: &str = "Appraisal";
    pub const TERM_SHEET: &str = "Term Sheet";
    pub const PFS: &str = "PFS";
    pub const SREO: &str = "SREO";
    pub const PHASE_I_ESA: &str = "Phase I ESA";
    pub const PCA: &str = "PCA";
    pub const ZONING: &str = "Zoning";
    pub const TITLE_SURVEY: &str = "Title & Survey";
    pub const FB_UNDERWRITING: &str = "FB Underwriting";
    pub const SOURCES_USES: &str = "Sources & Uses";
}

const STYLE: CurrencyStyle = CurrencyStyle::Extraction;

/// Key highlights kept in the executive summary.
const KEY_HIGHLIGHT_LIMIT: usize = 6;

/// Anchor tenants listed in the property metrics.
const ANCHOR_TENANT_LIMIT: usize = 5;

const DEFAULT_RECOMMENDATION_NARRATIVE: &str = "Based on the analysis, this transaction presents acceptable risk levels for Fairbridge. The strong sponsor financials and property fundamentals support the loan request.";

const DEFAULT_ZONING_NARRATIVE: &str = "The property's zoning is consistent with its current use. Please refer to the zoning report for detailed entitlement analysis.";

const DEFAULT_MARKET_NARRATIVE: &str = "Market analysis indicates favorable conditions for the subject property type. Please refer to the appraisal for detailed market analysis including comparable sales, rental comparables, and market trends.";

/// Risk rows used when underwriting reports none: category, score, risk, mitigant.
const DEFAULT_RISKS: &[(&str, &str, &str, &str)] = &[
    (
        "Credit/Sponsor",
        "Low",
        "Sponsor net worth and liquidity meet requirements",
        "Strong combined financials of guarantors",
    ),
    ("Market", "Moderate", "Retail market conditions", "Strong location and anchor tenant mix"),
    (
        "Property",
        "Moderate",
        "Property condition and age",
        "Recent renovations and ongoing maintenance",
    ),
    ("Exit", "Low", "Refinance or sale at maturity", "Multiple exit strategies available"),
];

/// A document presence check.
struct Check {
    label: &'static str,
    category: &'static str,
    critical: bool,
    /// Satisfied by any payload rather than a non-empty first payload
    repeatable: bool,
}

const CHECKS: &[Check] = &[
    Check {
        label: "Appraisal",
        category: category::APPRAISAL,
        critical: true,
        repeatable: false,
    },
    Check {
        label: "Term Sheet",
        category: category::TERM_SHEET,
        critical: true,
        repeatable: false,
    },
    Check {
        label: "PFS",
        category: category::PFS,
        critical: true,
        repeatable: true,
    },
    Check {
        label: "SREO",
        category: category::SREO,
        critical: false,
        repeatable: true,
    },
    Check {
        label: "Phase I ESA",
        category: category::PHASE_I_ESA,
        critical: false,
        repeatable: false,
    },
    Check {
        label: "Zoning",
        category: category::ZONING,
        critical: false,
        repeatable: false,
    },
    Check {
        label: "Title",
        category: category::TITLE_SURVEY,
        critical: false,
        repeatable: false,
    },
];

/// Mapper over an indexed extraction set.
pub struct Layer2Mapper<'a> {
    index: &'a ExtractionIndex,
}

impl<'a> Layer2Mapper<'a> {
    pub fn new(index: &'a ExtractionIndex) -> Self {
        Self {
            index,
        }
    }
}

impl SchemaMapper for Layer2Mapper<'_> {
    fn name(&self) -> &'static str {
        "layer2"
    }

    fn build(&self, memo: &MemoSettings) -> SchemaDocument {
        let index = self.index;
        debug!(records = index.len(), categories = ?index.categories(), "Mapping extraction records");

        let mut sections = Map::new();
        let mut put = |name: &str, value: Value| {
            sections.insert(name.to_string(), value);
        };
        put("transaction_overview", build_transaction_overview(index));
        put("executive_summary", build_executive_summary(index, memo));
        put("sources_and_uses", build_sources_and_uses(index));
        put("property", build_property(index));
        put("location", build_location(index));
        put("market", build_market(index));
        put("sponsorship", build_sponsorship(index));
        put("risks_and_mitigants", build_risks_and_mitigants(index));
        put("validation_flags", build_validation_flags(index));
        put("third_party_reports", build_third_party_reports(index));
        put("zoning_entitlements", build_zoning_entitlements(index));
        put("foreclosure_analysis", foreclosure_section());
        put("litigation", build_litigation(index));
        put("loan_terms", build_loan_terms(index));
        put("financial_analysis", build_financial_analysis(index));
        put("exit_strategy", build_exit_strategy(index));
        put("deal_highlights", build_deal_highlights(index));
        put("due_diligence", build_due_diligence(index));

        let mut root = Map::new();
        root.insert("cover".to_string(), build_cover(index, memo));
        root.insert("deal_facts_raw".to_string(), deal_facts_raw(index));
        root.insert("leverage_raw".to_string(), leverage_raw(index));
        let terms = map_at(index.first(category::TERM_SHEET), &["loan_terms"]);
        root.insert("loan_terms_raw".to_string(), Value::Object(loan_terms_raw(terms)));
        if let Some(ltv) = Pricing::from_index(index).ltv {
            root.insert("LTV".to_string(), Value::String(format_percent(&json!(ltv))));
        }

        SchemaDocument::new(root, sections)
    }
}

/// Borrowed view over the appraisal's property details.
struct Subject<'a> {
    details: &'a Map<String, Value>,
    address: &'a Map<String, Value>,
    improvements: &'a Map<String, Value>,
    land_area: &'a Map<String, Value>,
}

impl<'a> Subject<'a> {
    fn from_index(index: &'a ExtractionIndex) -> Self {
        let details = map_at(index.first(category::APPRAISAL), &["property_details"]);
        Self {
            details,
            address: map_at(details, &["address"]),
            improvements: map_at(details, &["improvements"]),
            land_area: map_at(details, &["land_area"]),
        }
    }

    fn name(&self) -> String {
        str_or_empty(self.details.get("property_name"))
    }

    fn property_type(&self) -> String {
        str_or(self.details.get("property_type"), "Retail")
    }

    fn address_part(&self, key: &str) -> String {
        str_or_empty(self.address.get(key))
    }

    fn full_address(&self) -> String {
        join_address(
            &self.address_part("street"),
            &self.address_part("city"),
            &self.address_part("state"),
            &self.address_part("zip"),
        )
    }

    fn city_state(&self) -> String {
        format!("{}, {}", self.address_part("city"), self.address_part("state"))
    }

    /// Gross leasable area with digit grouping, when numeric.
    fn gla(&self) -> Option<String> {
        self.improvements.get("gross_leasable_area_sf").and_then(format_grouped)
    }

    fn acres(&self) -> String {
        str_or(self.land_area.get("acres"), NOT_AVAILABLE)
    }

    fn improvement(&self, key: &str) -> String {
        str_or(self.improvements.get(key), NOT_AVAILABLE)
    }

    fn occupancy(&self, key: &str) -> Option<&'a Value> {
        map_get(self.details, &["occupancy", key])
    }
}

/// Loan amount and appraised values, with the derived loan-to-value ratio.
struct Pricing<'a> {
    loan_amount: Option<f64>,
    as_is: Option<&'a Value>,
    stabilized: Option<&'a Value>,
    ltv: Option<f64>,
}

impl<'a> Pricing<'a> {
    fn from_index(index: &'a ExtractionIndex) -> Self {
        let appraisal = index.first(category::APPRAISAL);
        let mut as_is = None;
        let mut stabilized = None;
        for conclusion in list_at(appraisal, &["valuation_summary", "market_value_conclusions"]) {
            let premise = conclusion.get("appraisal_premise").and_then(Value::as_str).unwrap_or("");
            let value = conclusion.get("value_conclusion").filter(|v| !v.is_null());
            if premise.contains("As Is") {
                as_is = value;
            }
            if premise.contains("Stabilized") {
                stabilized = value;
            }
        }

        let loan_terms = map_at(index.first(category::TERM_SHEET), &["loan_terms"]);
        let loan_amount = match loan_terms.get("loan_amount") {
            Some(Value::String(text)) => first_amount_in(text),
            Some(other) => as_number(other),
            None => None,
        }
        .filter(|amount| *amount != 0.0);

        let as_is_number = as_is.map(parse_currency_to_number).filter(|v| *v != 0.0);
        let ltv = match (loan_amount, as_is_number) {
            (Some(loan), Some(value)) => Some(loan / value * 100.0),
            _ => None,
        };

        Self {
            loan_amount,
            as_is,
            stabilized,
            ltv,
        }
    }

    fn loan_amount_display(&self) -> String {
        match self.loan_amount {
            Some(amount) => format_amount(amount, STYLE),
            None => NOT_AVAILABLE.to_string(),
        }
    }

    fn ltv_display(&self) -> String {
        match self.ltv {
            Some(ltv) => format_percent(&json!(ltv)),
            None => NOT_AVAILABLE.to_string(),
        }
    }
}

fn currency(value: Option<&Value>) -> String {
    format_currency_with(value.unwrap_or(&Value::Null), STYLE)
}

fn percent(value: Option<&Value>) -> String {
    format_percent(value.unwrap_or(&Value::Null))
}

/// Rate text from a string or a `{description}` mapping.
fn rate_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::Object(rate)) => str_or(rate.get("description"), NOT_AVAILABLE),
        other => str_or(other, NOT_AVAILABLE),
    }
}

fn borrower(index: &ExtractionIndex) -> String {
    let term_sheet = index.first(category::TERM_SHEET);
    str_at(term_sheet, &["borrower", "name"])
        .map(str::to_string)
        .unwrap_or_else(|| str_or(term_sheet.get("borrower"), NOT_AVAILABLE))
}

fn build_cover(index: &ExtractionIndex, memo: &MemoSettings) -> Value {
    let subject = Subject::from_index(index);
    cover(memo, subject.name(), subject.full_address(), Vec::new(), Vec::new(), None)
}

fn loan_term_rows(index: &ExtractionIndex) -> Vec<Value> {
    let pricing = Pricing::from_index(index);
    let terms = map_at(index.first(category::TERM_SHEET), &["loan_terms"]);
    let extension = map_at(terms, &["extension_option"]);
    vec![
        label_value("Loan Amount", pricing.loan_amount_display()),
        label_value("Interest Rate", rate_text(terms.get("interest_rate"))),
        label_value("Term", format!("{} months", str_or(terms.get("term_months"), NOT_AVAILABLE))),
        label_value("Amortization", str_or(terms.get("amortization"), "Interest Only")),
        label_value(
            "Extension",
            format!(
                "{}x {}-month",
                str_or(extension.get("count"), "1"),
                str_or(extension.get("term_months"), "6")
            ),
        ),
        label_value("Origination Fee", str_or(terms.get("origination_fee"), "1.00%")),
        label_value("Exit Fee", str_or(terms.get("exit_fee"), "1.00%")),
    ]
}

fn build_transaction_overview(index: &ExtractionIndex) -> Value {
    let subject = Subject::from_index(index);
    let pricing = Pricing::from_index(index);
    let gla = subject.gla().map(|gla| format!("{gla} SF"));

    let address = subject.full_address();

    let deal_facts = vec![
        label_value("Borrower", borrower(index)),
        label_value("Property Type", subject.property_type()),
        label_value("Property Name", subject.name()),
        label_value("Address", or_na(address)),
        label_value("Location", subject.city_state()),
        label_value("Land Area", format!("{} acres", subject.acres())),
        label_value("Building SF", gla.unwrap_or_else(|| NOT_AVAILABLE.to_string())),
        label_value("Year Built", subject.improvement("year_built")),
        label_value("Occupancy", percent(subject.occupancy("current_occupancy_percent"))),
    ];

    let leverage_metrics = vec![
        label_value("As-Is Value", currency(pricing.as_is)),
        label_value("Stabilized Value", currency(pricing.stabilized)),
        label_value("Loan-to-Value (As-Is)", pricing.ltv_display()),
        label_value("Loan Amount", pricing.loan_amount_display()),
    ];

    json!({
        "deal_facts": deal_facts,
        "loan_terms": loan_term_rows(index),
        "leverage_metrics": leverage_metrics,
    })
}

fn deal_facts_raw(index: &ExtractionIndex) -> Value {
    let subject = Subject::from_index(index);
    json!({
        "borrower": borrower(index),
        "property_type": subject.property_type(),
        "property_name": subject.name(),
        "address": subject.full_address(),
        "location": subject.city_state(),
        "land_area_acres": subject.acres(),
        "building_sf": subject.gla().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        "year_built": subject.improvement("year_built"),
        "occupancy": percent(subject.occupancy("current_occupancy_percent")),
    })
}

fn leverage_raw(index: &ExtractionIndex) -> Value {
    let pricing = Pricing::from_index(index);
    json!({
        "as_is_value": currency(pricing.as_is),
        "stabilized_value": currency(pricing.stabilized),
        "ltv_at_closing": pricing.ltv_display(),
        "loan_amount": pricing.loan_amount_display(),
    })
}

/// The opening sentence of the executive summary.
fn overview_sentence(subject: &Subject<'_>) -> String {
    let name = subject.name();
    let name = if name.is_empty() { "the property".to_string() } else { name };
    let center = match subject.gla() {
        Some(gla) => format!("a {gla} SF retail center"),
        None => "a retail center".to_string(),
    };
    format!(
        "Fairbridge is being asked to provide a bridge loan secured by {name}, {center} located in {}.",
        subject.city_state()
    )
}

fn key_highlights(index: &ExtractionIndex) -> Vec<String> {
    let subject = Subject::from_index(index);
    let pricing = Pricing::from_index(index);
    let name = subject.name();

    let mut highlights = vec![
        format!("Property: {}", if name.is_empty() { "the property" } else { name.as_str() }),
        format!("Location: {}", subject.city_state()),
        match subject.gla() {
            Some(gla) => format!("GLA: {gla} SF"),
            None => "GLA: See appraisal".to_string(),
        },
    ];
    let occupancy = str_or_empty(subject.occupancy("current_occupancy_percent"));
    if !occupancy.is_empty() {
        let suffix = if occupancy.ends_with('%') { "" } else { "%" };
        highlights.push(format!("Current Occupancy: {occupancy}{suffix}"));
    }
    if pricing.loan_amount.is_some() {
        highlights.push(format!("Loan Amount: {}", pricing.loan_amount_display()));
    }
    if pricing.as_is.is_some() {
        highlights.push(format!("As-Is Value: {}", currency(pricing.as_is)));
    }
    highlights.truncate(KEY_HIGHLIGHT_LIMIT);
    highlights
}

fn build_executive_summary(index: &ExtractionIndex, memo: &MemoSettings) -> Value {
    let subject = Subject::from_index(index);
    let overview = overview_sentence(&subject);

    let plan = str_at(index.first(category::APPRAISAL), &["redevelopment_plan", "description"])
        .map(str::trim)
        .unwrap_or("");
    let narrative = if plan.is_empty() {
        overview.clone()
    } else {
        format!("{overview}\n\nThe business plan involves: {plan}")
    };

    json!({
        "narrative": narrative,
        "transaction_overview": overview,
        "key_highlights": key_highlights(index),
        "recommendation": memo.recommendation,
        "conditions": memo.conditions,
    })
}

fn build_sources_and_uses(index: &ExtractionIndex) -> Value {
    let mut sources = Vec::new();
    let mut uses = Vec::new();

    for doc in index.get_all(category::SOURCES_USES) {
        for item in list_at(doc, &["sources"]).iter().filter_map(Value::as_object) {
            sources.push(json!({
                "label": display_field(item, "extraction_row.label", "Source"),
                "amount": currency(item.get("amount")),
                "percent": percent(value_of(item, "extraction_row.percent").as_deref()),
            }));
        }
        for item in list_at(doc, &["uses"]).iter().filter_map(Value::as_object) {
            uses.push(json!({
                "label": display_field(item, "extraction_row.label", "Use"),
                "amount": currency(item.get("amount")),
                "release_conditions": display_field(item, "extraction_row.release_conditions", ""),
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

fn build_property(index: &ExtractionIndex) -> Value {
    let subject = Subject::from_index(index);
    let appraisal = index.first(category::APPRAISAL);
    let gla = subject.gla().unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let name = subject.name();

    let narrative = format!(
        "The subject property is {} located at {}. The property consists of {} buildings totaling {gla} SF of gross leasable area on approximately {} acres.",
        if name.is_empty() { "a retail center" } else { name.as_str() },
        subject.address_part("street"),
        str_or(subject.improvements.get("number_of_buildings"), "multiple"),
        subject.acres(),
    );

    let mut land = format!("{} acres", subject.acres());
    if let Some(square_feet) = subject.land_area.get("square_feet").and_then(format_grouped) {
        land.push_str(&format!(" ({square_feet} SF)"));
    }

    let mut metrics = vec![
        label_value("Property Name", or_na(name.clone())),
        label_value("Property Type", subject.property_type()),
        label_value("Land Area", land),
        label_value("Gross Leasable Area", format!("{gla} SF")),
        label_value("Number of Buildings", subject.improvement("number_of_buildings")),
        label_value("Year Built", subject.improvement("year_built")),
        label_value("Year Renovated", subject.improvement("year_renovated")),
        label_value("Condition", subject.improvement("condition")),
        label_value("Current Occupancy", percent(subject.occupancy("current_occupancy_percent"))),
        label_value("Stabilized Occupancy", percent(subject.occupancy("stabilized_occupancy_percent"))),
    ];

    let income = map_at(appraisal, &["income_approach"]);
    if let Some(noi) = income.get("net_operating_income").filter(|v| !v.is_null()) {
        metrics.push(label_value("Net Operating Income", currency(Some(noi))));
    }
    if let Some(cap_rate) = income.get("cap_rate").filter(|v| !v.is_null()) {
        metrics.push(label_value("Cap Rate", percent(Some(cap_rate))));
    }

    let anchors: Vec<String> = list_at(subject.details, &["anchor_tenants"])
        .iter()
        .map(sanitize_scalar)
        .filter(|tenant| !tenant.is_empty())
        .take(ANCHOR_TENANT_LIMIT)
        .collect();
    if !anchors.is_empty() {
        metrics.push(label_value("Anchor Tenants", anchors.join(", ")));
    }

    json!({"description_narrative": narrative, "metrics": metrics})
}

fn build_location(index: &ExtractionIndex) -> Value {
    let appraisal = index.first(category::APPRAISAL);
    if let Some(summary) = str_at(appraisal, &["location_analysis", "summary"]).filter(|s| !s.trim().is_empty()) {
        return json!({"narrative": summary});
    }

    let subject = Subject::from_index(index);
    let narrative = format!(
        "The property is located in {}, {}, {}. The area benefits from strong demographics and accessibility. Please refer to the appraisal for detailed location analysis.",
        subject.address_part("city"),
        subject.address_part("county"),
        subject.address_part("state"),
    );
    json!({"narrative": narrative})
}

fn build_market(index: &ExtractionIndex) -> Value {
    let narrative = str_at(index.first(category::APPRAISAL), &["market_analysis", "summary"])
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_MARKET_NARRATIVE);
    json!({"narrative": narrative})
}

fn build_sponsorship(index: &ExtractionIndex) -> Value {
    let mut roster = SponsorRoster::new();
    for pfs in index.get_all(category::PFS) {
        let Some(name) = pfs_name(pfs) else {
            debug!("Skipping PFS without a signer name");
            continue;
        };
        if roster.contains(&name) {
            debug!(name = %name, "Skipping duplicate PFS");
            continue;
        }
        if let Some(sponsor) = sponsor_from_pfs(pfs) {
            roster.insert(sponsor);
        }
    }

    let mut financial_summary = Vec::new();
    for sponsor in roster.sponsors() {
        financial_summary.push(label_value(
            format!("{} - Total Assets", sponsor.name),
            currency(Some(&sponsor.total_assets)),
        ));
        financial_summary
            .push(label_value(format!("{} - Net Worth", sponsor.name), currency(Some(&sponsor.net_worth))));
        financial_summary.push(label_value(
            format!("{} - Cash & Securities", sponsor.name),
            currency(Some(&sponsor.liquidity)),
        ));
    }

    let mut guarantors = None;
    if roster.is_empty() {
        guarantors = index
            .get_all(category::FB_UNDERWRITING)
            .iter()
            .chain(index.get_all(category::TERM_SHEET))
            .find_map(|doc| GuarantorSummary::from_map(map_at(doc, &["sponsorship", "guarantors"])));
        if let Some(summary) = &guarantors {
            debug!(guarantors = summary.names.len(), "No PFS detail, using guarantor figures");
            for name in &summary.names {
                roster.insert(Sponsor::named(name.clone()));
            }
            financial_summary.push(label_value(
                "Combined Net Worth (Guarantors)",
                currency(Some(&summary.combined_net_worth)),
            ));
            financial_summary.push(label_value(
                "Combined Liquidity",
                format_amount(summary.liquidity().unwrap_or(0.0), STYLE),
            ));
        }
    }

    let combined = roster.combined(guarantors.as_ref(), Precedence::PerSponsor);
    if combined.source == CombinedSource::PerSponsor && combined.net_worth > 0.0 {
        financial_summary.insert(0, label_value("COMBINED NET WORTH", format_amount(combined.net_worth, STYLE)));
        financial_summary.insert(1, label_value("COMBINED LIQUIDITY", format_amount(combined.liquidity, STYLE)));
    }
    if financial_summary.is_empty() {
        financial_summary.push(label_value("TBD", "TBD"));
    }

    let names = roster.names();
    let (display_name, overview_narrative) = if names.is_empty() {
        ("See sponsor details".to_string(), "Sponsor information to be completed.".to_string())
    } else {
        (
            names.join(" & "),
            format!(
                "The principals on this transaction are {}. Combined net worth of the guarantors is {} with combined liquidity of {}.",
                names.join(" and "),
                format_amount(combined.net_worth, STYLE),
                format_amount(combined.liquidity, STYLE),
            ),
        )
    };

    let track_record = track_record_from_properties(
        index.get_all(category::SREO).iter().flat_map(|sreo| list_at(sreo, &["properties"])),
    );

    json!({
        "name": display_name,
        "overview": display_name,
        "overview_narrative": overview_narrative,
        "financial_summary": financial_summary,
        "track_record": track_record,
        "_sponsors_detail": roster.to_value(),
    })
}

fn build_risks_and_mitigants(index: &ExtractionIndex) -> Value {
    let reported = map_at(index.first(category::FB_UNDERWRITING), &["risks_and_mitigants"]);

    let mut risk_items: Vec<Value> = list_at(reported, &["risk_items"])
        .iter()
        .filter_map(Value::as_object)
        .map(|item| {
            json!({
                "category": str_or(item.get("category").or_else(|| item.get("risk")), "Risk"),
                "score": str_or(item.get("score"), "Moderate"),
                "risk": str_or(item.get("description").or_else(|| item.get("risk")), NOT_AVAILABLE),
                "mitigant": str_or(item.get("mitigant"), "See narrative."),
            })
        })
        .collect();
    if risk_items.is_empty() {
        risk_items = DEFAULT_RISKS
            .iter()
            .map(|(category, score, risk, mitigant)| {
                json!({"category": category, "score": score, "risk": risk, "mitigant": mitigant})
            })
            .collect();
    }

    json!({
        "overall_risk_score": str_or(reported.get("overall_risk_score"), "MODERATE"),
        "recommendation_narrative": str_or(reported.get("recommendation_narrative"), DEFAULT_RECOMMENDATION_NARRATIVE),
        "risk_items": risk_items,
        "items": risk_items,
    })
}

fn build_validation_flags(index: &ExtractionIndex) -> Value {
    let mut critical_flags = Vec::new();
    let mut warning_flags = Vec::new();
    let mut passed = 0;

    for check in CHECKS {
        let available = if check.repeatable {
            index.has_any(check.category)
        } else {
            index.has(check.category)
        };
        if available {
            passed += 1;
        } else if check.critical {
            critical_flags.push(json!({
                "rule": format!("{} Required", check.label),
                "message": format!("{} document not found in extraction", check.label),
            }));
        } else {
            warning_flags.push(json!({
                "rule": format!("{} Recommended", check.label),
                "message": format!("{} document not found - verify if required", check.label),
            }));
        }
    }

    json!({
        "summary": {
            "total_checks": CHECKS.len(),
            "passed": passed,
            "warnings": warning_flags.len(),
            "failed": critical_flags.len(),
        },
        "critical_flags": critical_flags,
        "warning_flags": warning_flags,
    })
}

fn appraiser_name(appraisal: &Map<String, Value>) -> String {
    list_at(appraisal, &["parties", "appraisers"])
        .first()
        .map(|appraiser| str_or(appraiser.get("name"), NOT_AVAILABLE))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn environmental_firm(phase1: &Map<String, Value>) -> String {
    let info = map_at(phase1, &["report_info"]);
    let firm = str_or_empty(info.get("firm"));
    if firm.is_empty() {
        str_or(info.get("preparer"), NOT_AVAILABLE)
    } else {
        firm
    }
}

fn build_third_party_reports(index: &ExtractionIndex) -> Value {
    let appraisal = index.first(category::APPRAISAL);
    let phase1 = index.first(category::PHASE_I_ESA);
    let pca = index.first(category::PCA);
    let pricing = Pricing::from_index(index);

    let doc_info = map_at(appraisal, &["document_info"]);
    let cap_rate = map_get(appraisal, &["valuation_summary", "cap_rate"])
        .map(format_percent)
        .unwrap_or_else(|| "See appraisal".to_string());

    let findings = map_at(phase1, &["findings"]);
    let phase_ii = if findings.get("phase_ii_required").is_some_and(is_present) {
        "Yes"
    } else {
        "No"
    };

    let pca_info = map_at(pca, &["report_info"]);

    json!({
        "appraisal": {
            "firm": str_or(doc_info.get("company_name"), NOT_AVAILABLE),
            "appraiser": appraiser_name(appraisal),
            "effective_date": str_or(doc_info.get("date_of_report"), NOT_AVAILABLE),
            "as_is_value": currency(pricing.as_is),
            "stabilized_value": currency(pricing.stabilized),
            "cap_rate": cap_rate,
        },
        "environmental": {
            "firm": environmental_firm(phase1),
            "report_date": str_or(map_at(phase1, &["report_info"]).get("date"), NOT_AVAILABLE),
            "current_recs": list_at(findings, &["recommendations"]).len().to_string(),
            "phase_ii_required": phase_ii,
            "findings": str_or(findings.get("summary"), "No significant findings."),
        },
        "pca": {
            "firm": str_or(pca_info.get("firm"), NOT_AVAILABLE),
            "report_date": str_or(pca_info.get("date"), NOT_AVAILABLE),
            "summary": str_or(map_get(pca, &["findings", "summary"]), "See property condition assessment."),
        },
    })
}

fn build_zoning_entitlements(index: &ExtractionIndex) -> Value {
    let zoning = index.first(category::ZONING);
    let current = zoning
        .get("current_zoning")
        .or_else(|| map_get(index.first(category::APPRAISAL), &["zoning", "current_zoning"]));

    json!({
        "summary_narrative": str_or(zoning.get("summary"), DEFAULT_ZONING_NARRATIVE),
        "current_zoning": str_or(current, NOT_AVAILABLE),
        "proposed_zoning": str_or(zoning.get("proposed_zoning"), "No change proposed"),
        "entitlement_status": str_or(zoning.get("entitlement_status"), "Entitled for current use"),
        "exists": index.has(category::ZONING),
    })
}

fn build_litigation(index: &ExtractionIndex) -> Value {
    let underwriting = index.first(category::FB_UNDERWRITING);
    Litigation::from_map(map_at(underwriting, &["litigation"]), None).to_section_value()
}

fn build_loan_terms(index: &ExtractionIndex) -> Value {
    let terms = map_at(index.first(category::TERM_SHEET), &["loan_terms"]);
    json!({
        "narrative": str_or_empty(terms.get("narrative")),
        "terms": loan_term_rows(index),
    })
}

fn build_financial_analysis(index: &ExtractionIndex) -> Value {
    let income = map_at(index.first(category::APPRAISAL), &["income_approach"]);
    let mut metrics = Vec::new();
    if let Some(value) = income.get("potential_gross_income").filter(|v| !v.is_null()) {
        metrics.push(label_value("Potential Gross Income", currency(Some(value))));
    }
    if let Some(value) = income.get("net_operating_income").filter(|v| !v.is_null()) {
        metrics.push(label_value("Net Operating Income", currency(Some(value))));
    }
    if let Some(value) = income.get("cap_rate").filter(|v| !v.is_null()) {
        metrics.push(label_value("Cap Rate", percent(Some(value))));
    }
    if let Some(value) = income.get("indicated_value").filter(|v| !v.is_null()) {
        metrics.push(label_value("Indicated Value", currency(Some(value))));
    }

    json!({
        "narrative": str_or_empty(income.get("summary")),
        "metrics": metrics,
    })
}

fn build_deal_highlights(index: &ExtractionIndex) -> Value {
    let items: Vec<Value> =
        key_highlights(index).into_iter().map(|highlight| json!({"highlight": highlight})).collect();
    json!({"items": items})
}

fn build_exit_strategy(index: &ExtractionIndex) -> Value {
    let narrative = match index.first(category::FB_UNDERWRITING).get("exit_strategy") {
        Some(Value::Object(exit)) => str_or_empty(exit.get("narrative")),
        other => str_or_empty(other),
    };
    json!({"narrative": narrative})
}

fn build_due_diligence(index: &ExtractionIndex) -> Value {
    let appraisal = index.first(category::APPRAISAL);
    let phase1 = index.first(category::PHASE_I_ESA);
    let pca = index.first(category::PCA);

    let mut providers = Map::new();
    let mut put = |key: &str, value: String| {
        if !value.is_empty() && value != NOT_AVAILABLE {
            providers.insert(key.to_string(), Value::String(value));
        }
    };
    put("appraisal_company", str_or_empty(map_get(appraisal, &["document_info", "company_name"])));
    put("appraisal_firm", appraiser_name(appraisal));
    put("environmental_firm", environmental_firm(phase1));
    put("pca_firm", str_or_empty(map_get(pca, &["report_info", "firm"])));
    Value::Object(providers)
}
