//! Custom Tera filters for memo templates.
//!
//! The filters expose the value formatters to template authors, so a raw
//! figure reached through a `*_raw` mapping can still be shown the way the
//! mapped sections show it.
//!
//! | Filter       | Example                                     | Output       |
//! |--------------|---------------------------------------------|--------------|
//! | `currency`   | `{{ loan_terms.loan_amount \| currency }}`  | `$12.50M`    |
//! | `percent`    | `{{ leverage.ltv \| percent }}`             | `62.50%` for `62.5` |
//! | `plain`      | `{{ narratives.market \| plain }}`          | no markdown  |
//! | `first_line` | `{{ loan_terms.extension \| first_line }}`  | first line   |
//!
//! `currency` takes an optional `style` argument: `"deal"` (the default)
//! renders small amounts without cents, `"extraction"` keeps two decimals.
//! No filter fails on a value it cannot interpret. Unparsable input is
//! returned as display text.

use std::collections::HashMap;

use tera::{Tera, Value};

use crate::format::{
    CurrencyStyle, first_line, format_currency_with, format_percent, sanitize_scalar,
    strip_markdown,
};

/// Register every memo filter on a Tera instance.
pub fn register_filters(tera: &mut Tera) {
    tera.register_filter("currency", currency_filter);
    tera.register_filter("percent", percent_filter);
    tera.register_filter("plain", plain_filter);
    tera.register_filter("first_line", first_line_filter);
}

fn currency_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let style = match args.get("style").and_then(Value::as_str) {
        None | Some("deal") => CurrencyStyle::DealInput,
        Some("extraction") => CurrencyStyle::Extraction,
        Some(other) => {
            return Err(tera::Error::msg(format!(
                "currency filter: unknown style '{other}' (expected 'deal' or 'extraction')"
            )));
        }
    };
    Ok(Value::String(format_currency_with(value, style)))
}

fn percent_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(format_percent(value)))
}

fn plain_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(strip_markdown(&sanitize_scalar(value))))
}

fn first_line_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(first_line(value)))
}
