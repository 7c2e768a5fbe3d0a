//! Sponsor and principal aggregation.
//!
//! The same individual often appears in several upstream documents with
//! slightly different spellings ("Steve Hudson", "Steve Hudson Jr."). A [`SponsorRoster`] collects candidates in
//! arrival order and drops any whose [`name_key`] was already accepted.
//!
//! Financial figures stay as raw JSON values on each [`Sponsor`] so the display
//! layer can format them, and are parsed with
//! [`parse_currency_to_number`] only when summed.

use serde_json::{Map, Value, json};
use std::collections::HashSet;
use tracing::{debug, trace};

use super::fallback::{Resolution, field_rule, is_present, resolve_field, resolve_or_derive};
use crate::format::{is_no_data, parse_currency_to_number, sanitize_scalar};
use crate::record::list_at;

/// Track-record entries kept per memo.
pub const TRACK_RECORD_LIMIT: usize = 10;

/// Placeholder track-record entry used when no past deal qualifies.
pub fn placeholder_track_record() -> Value {
    json!({"property": "See sponsor documentation", "role": "Principal", "outcome": "Various"})
}

/// Deduplication key for a sponsor name.
///
/// Lower-cases, removes commas and periods, drops the standalone token `jr`,
/// and collapses whitespace.
///
/// ```
/// use memofill::mapper::sponsors::name_key;
///
/// assert_eq!(name_key("Steve Hudson Jr."), name_key("steve hudson"));
/// assert_eq!(name_key("Jr. Mendez,  Ana"), "mendez ana");
/// ```
pub fn name_key(name: &str) -> String {
    let cleaned: String =
        name.to_lowercase().chars().filter(|c| *c != ',' && *c != '.').collect();
    cleaned.split_whitespace().filter(|token| *token != "jr").collect::<Vec<_>>().join(" ")
}

/// One sponsor with raw financial figures.
#[derive(Debug, Clone, PartialEq)]
pub struct Sponsor {
    pub name: String,
    pub total_assets: Value,
    pub net_worth: Value,
    pub liquidity: Value,
    pub cash: Value,
    pub securities: Value,
}

impl Sponsor {
    /// A sponsor known by name only.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            total_assets: Value::Null,
            net_worth: Value::Null,
            liquidity: Value::Null,
            cash: Value::Null,
            securities: Value::Null,
        }
    }

    /// Whether any per-sponsor figure is present.
    pub fn has_financials(&self) -> bool {
        [&self.total_assets, &self.net_worth, &self.liquidity].into_iter().any(is_present)
    }

    pub fn to_value(&self) -> Value {
        json!({
            "name": self.name,
            "total_assets": self.total_assets,
            "net_worth": self.net_worth,
            "liquidity": self.liquidity,
            "cash": self.cash,
            "securities": self.securities,
        })
    }
}

/// Where combined totals came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinedSource {
    /// Summed over per-sponsor figures
    PerSponsor,
    /// Read from an upstream pre-aggregated figure
    Upstream,
    /// Nothing to report
    None,
}

/// Combined guarantor totals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombinedFigures {
    pub net_worth: f64,
    pub liquidity: f64,
    pub source: CombinedSource,
}

/// Sponsors in arrival order, deduplicated by [`name_key`].
#[derive(Debug, Clone, Default)]
pub struct SponsorRoster {
    sponsors: Vec<Sponsor>,
    seen: HashSet<String>,
}

impl SponsorRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a sponsor with this name key is already present.
    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(&name_key(name))
    }

    /// Add a sponsor unless its name key was already accepted. Returns whether it was added.
    pub fn insert(&mut self, sponsor: Sponsor) -> bool {
        let key = name_key(&sponsor.name);
        if key.is_empty() || !self.seen.insert(key) {
            trace!(name = %sponsor.name, "Skipping duplicate sponsor");
            return false;
        }
        self.sponsors.push(sponsor);
        true
    }

    pub fn sponsors(&self) -> &[Sponsor] {
        &self.sponsors
    }

    pub fn names(&self) -> Vec<String> {
        self.sponsors.iter().map(|s| s.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sponsors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sponsors.len()
    }

    /// Whether any sponsor carries its own financial figures.
    pub fn has_detail(&self) -> bool {
        self.sponsors.iter().any(Sponsor::has_financials)
    }

    /// Sum of per-sponsor net worth, unparsable values counting as zero.
    pub fn summed_net_worth(&self) -> f64 {
        self.sponsors.iter().map(|s| parse_currency_to_number(&s.net_worth)).sum()
    }

    /// Sum of per-sponsor liquidity, unparsable values counting as zero.
    pub fn summed_liquidity(&self) -> f64 {
        self.sponsors.iter().map(|s| parse_currency_to_number(&s.liquidity)).sum()
    }

    /// Combined net worth and liquidity.
    ///
    /// With [`Precedence::PerSponsor`] the upstream figures are only read when no
    /// sponsor carries its own figures. With [`Precedence::Upstream`] each upstream
    /// figure that is present wins over the corresponding sum.
    pub fn combined(
        &self,
        upstream: Option<&GuarantorSummary>,
        precedence: Precedence,
    ) -> CombinedFigures {
        let upstream_net_worth = upstream.and_then(GuarantorSummary::net_worth);
        let upstream_liquidity = upstream.and_then(GuarantorSummary::liquidity);
        let has_upstream = upstream_net_worth.is_some() || upstream_liquidity.is_some();

        let use_upstream = match precedence {
            Precedence::Upstream => has_upstream,
            Precedence::PerSponsor => !self.has_detail() && has_upstream,
        };

        if use_upstream {
            CombinedFigures {
                net_worth: upstream_net_worth.unwrap_or_else(|| self.summed_net_worth()),
                liquidity: upstream_liquidity.unwrap_or_else(|| self.summed_liquidity()),
                source: CombinedSource::Upstream,
            }
        } else if self.has_detail() {
            CombinedFigures {
                net_worth: self.summed_net_worth(),
                liquidity: self.summed_liquidity(),
                source: CombinedSource::PerSponsor,
            }
        } else {
            CombinedFigures {
                net_worth: 0.0,
                liquidity: 0.0,
                source: CombinedSource::None,
            }
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.sponsors.iter().map(Sponsor::to_value).collect())
    }
}

/// Which combined figure wins when both upstream and per-sponsor figures exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    PerSponsor,
    Upstream,
}

/// Upstream pre-aggregated guarantor figures (`sponsorship.guarantors` or `sponsor.guarantors`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuarantorSummary {
    pub names: Vec<String>,
    pub combined_net_worth: Value,
    pub combined_cash: Value,
    pub combined_securities: Value,
}

impl GuarantorSummary {
    /// Read a guarantors mapping; `None` when it is empty.
    pub fn from_map(guarantors: &Map<String, Value>) -> Option<Self> {
        if guarantors.is_empty() {
            return None;
        }
        let names = list_at(guarantors, &["names"])
            .iter()
            .map(sanitize_scalar)
            .filter(|name| !name.is_empty())
            .collect();
        Some(Self {
            names,
            combined_net_worth: guarantors.get("combined_net_worth").cloned().unwrap_or_default(),
            combined_cash: guarantors.get("combined_cash_position").cloned().unwrap_or_default(),
            combined_securities: guarantors
                .get("combined_securities_holdings")
                .cloned()
                .unwrap_or_default(),
        })
    }

    pub fn net_worth(&self) -> Option<f64> {
        is_present(&self.combined_net_worth).then(|| parse_currency_to_number(&self.combined_net_worth))
    }

    /// Cash plus securities, `None` when neither is given.
    pub fn liquidity(&self) -> Option<f64> {
        if is_present(&self.combined_cash) || is_present(&self.combined_securities) {
            Some(
                parse_currency_to_number(&self.combined_cash)
                    + parse_currency_to_number(&self.combined_securities),
            )
        } else {
            None
        }
    }
}

/// Name on a personal financial statement.
///
/// The first named principal wins, then the declared name paths.
pub fn pfs_name(pfs: &Map<String, Value>) -> Option<String> {
    let principal = list_at(pfs, &["principals"])
        .iter()
        .filter_map(|p| p.get("name"))
        .map(sanitize_scalar)
        .find(|name| !name.is_empty());
    if principal.is_some() {
        return principal;
    }

    match resolve_field(pfs, "pfs.name") {
        Resolution::Placeholder(_) => None,
        found => Some(found.display()).filter(|name| !name.is_empty()),
    }
}

/// Value of the first itemized asset whose type contains every needle.
fn itemized_asset(assets: &[Value], needles: &[&str]) -> Value {
    assets
        .iter()
        .find(|item| {
            let kind = item.get("asset_type").and_then(Value::as_str).unwrap_or("").to_lowercase();
            needles.iter().all(|needle| kind.contains(needle))
        })
        .and_then(|item| item.get("value"))
        .cloned()
        .unwrap_or_default()
}

/// Extract a sponsor from a personal financial statement.
///
/// Returns `None` when the statement has no name, or neither total assets nor
/// net worth.
pub fn sponsor_from_pfs(pfs: &Map<String, Value>) -> Option<Sponsor> {
    let name = pfs_name(pfs)?;

    let total_assets = resolve_field(pfs, "pfs.total_assets").found().map(|v| v.into_owned());
    let total_liabilities =
        resolve_field(pfs, "pfs.total_liabilities").found().map(|v| v.into_owned());

    let net_worth = field_rule("pfs.net_worth")
        .map(|rule| {
            resolve_or_derive(pfs, rule, || {
                let assets = parse_currency_to_number(total_assets.as_ref()?);
                let liabilities =
                    total_liabilities.as_ref().map(parse_currency_to_number).unwrap_or(0.0);
                Some(json!(assets - liabilities))
            })
        })
        .and_then(|r| r.found().map(|v| v.into_owned()));

    let items = list_at(pfs, &["financial_summary", "assets", "items"]);
    let cash = resolve_field(pfs, "pfs.cash")
        .found()
        .map(|v| v.into_owned())
        .unwrap_or_else(|| itemized_asset(items, &["cash"]));
    let securities = resolve_field(pfs, "pfs.securities")
        .found()
        .map(|v| v.into_owned())
        .unwrap_or_else(|| itemized_asset(items, &["securities", "listed"]));
    let liquidity = parse_currency_to_number(&cash) + parse_currency_to_number(&securities);

    if total_assets.is_none() && net_worth.is_none() {
        debug!(name = %name, "PFS carries no asset or net worth figures");
        return None;
    }

    Some(Sponsor {
        name,
        total_assets: total_assets.unwrap_or_default(),
        net_worth: net_worth.unwrap_or_default(),
        liquidity: json!(liquidity),
        cash,
        securities,
    })
}

/// Past deals from schedule-of-real-estate-owned payloads, capped at [`TRACK_RECORD_LIMIT`].
///
/// Properties without a usable name are skipped. Always returns at least one
/// entry; the placeholder stands in when nothing qualifies.
pub fn track_record_from_properties<'a>(properties: impl IntoIterator<Item = &'a Value>) -> Vec<Value> {
    let mut record: Vec<Value> = properties
        .into_iter()
        .filter_map(Value::as_object)
        .filter_map(track_record_entry)
        .take(TRACK_RECORD_LIMIT)
        .collect();
    if record.is_empty() {
        record.push(placeholder_track_record());
    }
    record
}

fn track_record_entry(property: &Map<String, Value>) -> Option<Value> {
    let name = match resolve_field(property, "track_record.property") {
        Resolution::Placeholder(_) => return None,
        found => found.display(),
    };
    if is_no_data(&name) {
        return None;
    }
    let outcome = resolve_field(property, "track_record.outcome").display();
    let role = property
        .get("role")
        .map(sanitize_scalar)
        .filter(|role| !role.is_empty())
        .unwrap_or_else(|| "Principal".to_string());
    Some(json!({"property": name, "role": role, "outcome": outcome}))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_jr_suffix_collapses() {
        let mut roster = SponsorRoster::new();
        assert!(roster.insert(Sponsor::named("Steve Hudson")));
        assert!(!roster.insert(Sponsor::named("Steve Hudson Jr.")));
        assert!(!roster.insert(Sponsor::named("steve hudson, JR")));
        assert_eq!(roster.names(), vec!["Steve Hudson"]);
    }

    #[test]
    fn test_jr_inside_a_word_is_kept() {
        assert_eq!(name_key("Jrome Smith"), "jrome smith");
        assert_ne!(name_key("Jrome Smith"), name_key("Rome Smith"));
    }

    #[test]
    fn test_net_worth_derived_from_assets_and_liabilities() {
        let pfs = object(json!({
            "signer_information": {"name": "Charles Ladd"},
            "financial_summary": {
                "assets": {"total_assets": "$1,000,000", "cash_and_cash_equivalents": 50000},
                "liabilities": {"total_liabilities": 400000}
            }
        }));
        let sponsor = sponsor_from_pfs(&pfs).unwrap();
        assert_eq!(sponsor.name, "Charles Ladd");
        assert_eq!(parse_currency_to_number(&sponsor.net_worth), 600_000.0);
        assert_eq!(parse_currency_to_number(&sponsor.liquidity), 50_000.0);
    }

    #[test]
    fn test_liquidity_from_itemized_assets() {
        let pfs = object(json!({
            "name": "Ana Mendez",
            "financial_summary": {
                "assets": {
                    "total_assets": 2_000_000,
                    "items": [
                        {"asset_type": "Cash on hand", "value": 100000},
                        {"asset_type": "Securities (private)", "value": 999},
                        {"asset_type": "Listed Securities", "value": 250000}
                    ]
                },
                "liabilities_and_net_worth": {"net_worth": 1_500_000}
            }
        }));
        let sponsor = sponsor_from_pfs(&pfs).unwrap();
        assert_eq!(sponsor.net_worth, json!(1_500_000));
        assert_eq!(parse_currency_to_number(&sponsor.liquidity), 350_000.0);
    }

    #[test]
    fn test_first_named_principal_wins() {
        let pfs = object(json!({
            "principals": [{"name": ""}, {"name": "Steve Hudson"}, {"name": "Other"}],
            "name": "Ignored",
            "financial_summary": {"assets": {"total_assets": 10}}
        }));
        assert_eq!(pfs_name(&pfs).as_deref(), Some("Steve Hudson"));
    }

    #[test]
    fn test_pfs_without_figures_is_skipped() {
        let pfs = object(json!({"name": "Nobody"}));
        assert!(sponsor_from_pfs(&pfs).is_none());
        assert!(sponsor_from_pfs(&object(json!({"financial_summary": {}}))).is_none());
    }

    #[test]
    fn test_string_tolerant_sums() {
        let mut roster = SponsorRoster::new();
        let mut a = Sponsor::named("A");
        a.net_worth = json!("$35,610,000");
        let mut b = Sponsor::named("B");
        b.net_worth = json!("unknown");
        let mut c = Sponsor::named("C");
        c.net_worth = json!(390_000);
        roster.insert(a);
        roster.insert(b);
        roster.insert(c);
        assert_eq!(roster.summed_net_worth(), 36_000_000.0);
        assert!(roster.has_detail());
    }

    #[test]
    fn test_track_record_capped_and_filtered() {
        let mut properties: Vec<Value> = (0..15)
            .map(|i| json!({"property_name": format!("Property {i}"), "disposition": {"status": "Sold"}}))
            .collect();
        properties.insert(0, json!({"property_name": "N/A"}));
        properties.insert(1, json!({"name": "Legacy Name"}));
        let record = track_record_from_properties(&properties);
        assert_eq!(record.len(), TRACK_RECORD_LIMIT);
        assert_eq!(record[0], json!({"property": "Legacy Name", "role": "Principal", "outcome": "Active"}));
        assert_eq!(record[1]["outcome"], "Sold");
    }

    #[test]
    fn test_empty_track_record_uses_placeholder() {
        let record = track_record_from_properties(&Vec::<Value>::new());
        assert_eq!(record, vec![placeholder_track_record()]);
    }

    #[test]
    fn test_guarantor_summary() {
        let guarantors = object(json!({
            "names": ["Steve Hudson", "Charles Ladd Jr."],
            "combined_net_worth": "$40,000,000",
            "combined_cash_position": 1_000_000
        }));
        let summary = GuarantorSummary::from_map(&guarantors).unwrap();
        assert_eq!(summary.names.len(), 2);
        assert_eq!(summary.net_worth(), Some(40_000_000.0));
        assert_eq!(summary.liquidity(), Some(1_000_000.0));
        assert!(GuarantorSummary::from_map(&Map::new()).is_none());
    }

    #[test]
    fn test_combined_precedence() {
        let upstream = GuarantorSummary {
            names: vec![],
            combined_net_worth: json!("$40,000,000"),
            combined_cash: Value::Null,
            combined_securities: Value::Null,
        };
        let mut roster = SponsorRoster::new();
        let mut sponsor = Sponsor::named("Steve Hudson");
        sponsor.net_worth = json!(35_000_000);
        sponsor.liquidity = json!(2_000_000);
        roster.insert(sponsor);

        let upstream_first = roster.combined(Some(&upstream), Precedence::Upstream);
        assert_eq!(upstream_first.source, CombinedSource::Upstream);
        assert_eq!(upstream_first.net_worth, 40_000_000.0);
        assert_eq!(upstream_first.liquidity, 2_000_000.0);

        let detail_first = roster.combined(Some(&upstream), Precedence::PerSponsor);
        assert_eq!(detail_first.source, CombinedSource::PerSponsor);
        assert_eq!(detail_first.net_worth, 35_000_000.0);

        let names_only = SponsorRoster::new();
        let fallback = names_only.combined(Some(&upstream), Precedence::PerSponsor);
        assert_eq!(fallback.source, CombinedSource::Upstream);
        assert_eq!(names_only.combined(None, Precedence::Upstream).source, CombinedSource::None);
    }
}
