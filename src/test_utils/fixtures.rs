//! Sample inputs and templates for tests.

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};

/// A JSON input file for the assembler.
#[derive(Clone, Debug)]
pub struct DealFixture {
    pub name: String,
    pub value: Value,
}

impl DealFixture {
    /// A raw deal record carrying only an identifier and a property name
    pub fn sparse() -> Self {
        Self {
            name: "sparse".to_string(),
            value: json!({"deal_id": "D1", "property": {"name": "Example Plaza"}}),
        }
    }

    /// A raw deal record with leverage and deal facts
    pub fn with_leverage() -> Self {
        Self {
            name: "leverage".to_string(),
            value: json!({
                "deal_id": "D2",
                "property": {"name": "Harbor Point"},
                "deal_facts": {"property_type": "Retail", "loan_purpose": "Refinance"},
                "leverage": {"ltv_at_closing": "62.50%", "ltc_at_closing": "70.0%"}
            }),
        }
    }

    /// A wrapped list of deals with a selected index
    pub fn wrapped(deal_index: usize) -> Self {
        Self {
            name: "wrapped".to_string(),
            value: json!({
                "payload": [
                    {"property": {"name": "First Plaza"}},
                    {"property": {"name": "Second Plaza"}}
                ],
                "deal_index": deal_index
            }),
        }
    }

    /// Tagged extraction records with two personal financial statements
    pub fn extractions() -> Self {
        let pfs = |name: &str, net_worth: u64| {
            json!({
                "dd_name": "PFS",
                "extracted_data": {
                    "name": name,
                    "financial_summary": {
                        "assets": {"total_assets": 50_000_000, "cash_and_cash_equivalents": 100_000},
                        "liabilities_and_net_worth": {"net_worth": net_worth}
                    }
                }
            })
        };
        Self {
            name: "extractions".to_string(),
            value: json!([
                {"dd_name": "Term Sheet", "extracted_data": {
                    "borrower": {"name": "Example Plaza Owner LLC"},
                    "loan_terms": {"loan_amount": 12_500_000, "term_months": 24}
                }},
                pfs("Steve Hudson", 42_000_000),
                pfs("Charles Ladd", 18_000_000)
            ]),
        }
    }

    /// Write the fixture as `<name>.json`
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("{}.json", self.name));
        let text = serde_json::to_string_pretty(&self.value)?;
        fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// A Tera template file.
#[derive(Clone, Debug)]
pub struct TemplateFixture {
    pub name: String,
    pub content: String,
}

impl TemplateFixture {
    /// A short memo reading the cover, leverage and sponsor loops
    pub fn memo() -> Self {
        Self {
            name: "memo.md".to_string(),
            content: r#"# {{ cover.memo_title }}
Property: {{ cover.property_name }}
LTV: {{ LTV }}
{% for row in sections.transaction_overview.leverage_metrics %}- {{ row.label }}: {{ row.value }}
{% endfor %}{% for sponsor in sponsors %}Sponsor: {{ sponsor.name }}
{% endfor %}"#
                .to_string(),
        }
    }

    /// A template with a custom body
    pub fn simple(name: &str, content: &str) -> Self {
        Self {
            name: name.to_string(),
            content: content.to_string(),
        }
    }

    /// Write the template to a directory
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.name);
        fs::write(&path, &self.content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
