//! Display formatting for raw deal values.
//!
//! Every function here is total: coercion failure degrades to a best-effort
//! string (or `0.0` for [`parse_currency_to_number`]), never to an error. Upstream
//! records are untrusted and a single malformed value must not abort a section.
//!
//! # Currency styles
//!
//! Two display conventions exist for currency, selected with [`CurrencyStyle`]:
//!
//! | Value          | [`CurrencyStyle::Extraction`] | [`CurrencyStyle::DealInput`] |
//! |----------------|-------------------------------|------------------------------|
//! | `1_250_000`    | `$1.25M`                      | `$1.25M`                     |
//! | `35_610`       | `$35,610`                     | `$35,610`                    |
//! | `950`          | `$950.00`                     | `$950`                       |
//! | `"$2.1M"`      | `$2.1M`                       | `$2.1M`                      |
//! | `null`         | `N/A`                         | `N/A`                        |

pub mod markdown;

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

pub use markdown::strip_markdown;

/// Placeholder for values that are absent.
pub const NOT_AVAILABLE: &str = "N/A";

/// Placeholder for values that are pending.
pub const TBD: &str = "TBD";

/// Currency display convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurrencyStyle {
    /// Extraction-record convention: cents shown below 1,000.
    Extraction,
    /// Deal-record convention: whole dollars only.
    #[default]
    DealInput,
}

/// Format a currency value with the deal-input convention.
///
/// ```
/// use memofill::format::format_currency;
/// use serde_json::json;
///
/// assert_eq!(format_currency(&json!(1_250_000)), "$1.25M");
/// assert_eq!(format_currency(&json!(950)), "$950");
/// assert_eq!(format_currency(&json!(null)), "N/A");
/// ```
pub fn format_currency(value: &Value) -> String {
    format_currency_with(value, CurrencyStyle::DealInput)
}

/// Format a currency value with an explicit [`CurrencyStyle`].
pub fn format_currency_with(value: &Value, style: CurrencyStyle) -> String {
    if is_blank(value) {
        return NOT_AVAILABLE.to_string();
    }
    if let Value::String(text) = value {
        if text.trim_start().starts_with('$') {
            return text.clone();
        }
    }
    match as_number(value) {
        Some(amount) => format_amount(amount, style),
        None => display_value(value),
    }
}

/// Format an already-numeric amount.
pub fn format_amount(amount: f64, style: CurrencyStyle) -> String {
    let sign = if amount < 0.0 {
        "-"
    } else {
        ""
    };
    let magnitude = amount.abs();

    if magnitude >= 1_000_000.0 {
        format!("{sign}${}M", group_thousands(magnitude / 1_000_000.0, 2))
    } else if style == CurrencyStyle::Extraction && magnitude < 1_000.0 {
        format!("{sign}${}", group_thousands(magnitude, 2))
    } else {
        format!("{sign}${}", group_thousands(magnitude, 0))
    }
}

/// Format a percentage: `"X.XX%"` for numbers, pass-through for strings already carrying `%`.
pub fn format_percent(value: &Value) -> String {
    if is_blank(value) {
        return NOT_AVAILABLE.to_string();
    }
    if let Value::String(text) = value {
        if text.contains('%') {
            return text.clone();
        }
    }
    match as_number(value) {
        Some(number) => format!("{number:.2}%"),
        None => display_value(value),
    }
}

/// Parse a currency-like value into a number, returning `0.0` on failure.
///
/// Strips `$`, commas and whitespace before parsing. Used inside aggregation
/// loops where one bad value must only zero itself.
///
/// ```
/// use memofill::format::parse_currency_to_number;
/// use serde_json::json;
///
/// assert_eq!(parse_currency_to_number(&json!("$35,610,000")), 35_610_000.0);
/// assert_eq!(parse_currency_to_number(&json!(null)), 0.0);
/// assert_eq!(parse_currency_to_number(&json!("garbage")), 0.0);
/// ```
pub fn parse_currency_to_number(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().filter(|n| n.is_finite()).unwrap_or(0.0),
        Value::String(text) => parse_currency_str(text),
        _ => 0.0,
    }
}

/// String form of [`parse_currency_to_number`].
pub fn parse_currency_str(text: &str) -> f64 {
    let cleaned: String =
        text.chars().filter(|c| *c != '$' && *c != ',' && !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return 0.0;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite()).unwrap_or(0.0)
}

/// Find the first dollar amount in free text such as `"$12,500,000 first mortgage"`.
pub fn first_amount_in(text: &str) -> Option<f64> {
    static AMOUNT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\$?(\d[\d,]*)").expect("valid regex"));

    let caps = AMOUNT_RE.captures(text)?;
    caps[1].replace(',', "").parse::<f64>().ok()
}

/// Numeric view of a value: numbers, or strings that parse as plain numbers.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|n| n.is_finite()),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Normalize "no data" to an empty string.
///
/// `null`, and strings meaning "no data" (`none`, `null`, `undefined`, `n/a`,
/// `nan`, or a bracketed not-available marker like `[Not Available]`), become
/// `""`. Everything else is rendered with [`display_value`].
///
/// ```
/// use memofill::format::sanitize_scalar;
/// use serde_json::json;
///
/// assert_eq!(sanitize_scalar(&json!(null)), "");
/// assert_eq!(sanitize_scalar(&json!("None")), "");
/// assert_eq!(sanitize_scalar(&json!("[Not Provided]")), "");
/// assert_eq!(sanitize_scalar(&json!("Retail")), "Retail");
/// ```
pub fn sanitize_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) if is_no_data(text) => String::new(),
        other => display_value(other),
    }
}

/// Optional-value variant of [`sanitize_scalar`].
pub fn str_or_empty(value: Option<&Value>) -> String {
    value.map(sanitize_scalar).unwrap_or_default()
}

/// Like [`str_or_empty`], substituting `placeholder` for empty results.
pub fn str_or(value: Option<&Value>, placeholder: &str) -> String {
    let text = str_or_empty(value);
    if text.is_empty() {
        placeholder.to_string()
    } else {
        text
    }
}

/// Whether a string is one of the "no data" sentinels.
pub fn is_no_data(text: &str) -> bool {
    static BRACKETED_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)^\[\s*(not\s+available|not\s+provided|n/?a|none|missing|unknown)\s*\]$")
            .expect("valid regex")
    });

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }
    matches!(trimmed.to_ascii_lowercase().as_str(), "none" | "null" | "undefined" | "n/a" | "nan")
        || BRACKETED_RE.is_match(trimmed)
}

/// Plain display text for a value, without JSON quoting.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::Number(number) => match number.as_i64() {
            Some(int) => int.to_string(),
            None => number.as_f64().map(|f| f.to_string()).unwrap_or_else(|| number.to_string()),
        },
        Value::String(text) => text.clone(),
        Value::Array(items) => {
            items.iter().map(display_value).filter(|s| !s.is_empty()).collect::<Vec<_>>().join(", ")
        }
        Value::Object(_) => value.to_string(),
    }
}

/// Split a comma-separated string (or a list) into trimmed, non-empty entries.
pub fn split_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(text) => text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items.iter().map(sanitize_scalar).filter(|s| !s.is_empty()).collect(),
        _ => Vec::new(),
    }
}

/// First non-empty line of a value's display text.
pub fn first_line(value: &Value) -> String {
    let text = sanitize_scalar(value);
    text.trim().lines().next().map(|line| line.trim().to_string()).unwrap_or_default()
}

/// Shorten a long rate description to its headline figure.
///
/// Texts at or under `max_len` characters pass through unchanged. Longer ones
/// are reduced to the first match of `pattern`, or `"See Loan Terms"`.
pub fn shorten_display(value: &Value, max_len: usize, pattern: &Regex) -> String {
    let text = sanitize_scalar(value);
    if text.chars().count() <= max_len {
        return text;
    }
    pattern
        .find(&text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "See Loan Terms".to_string())
}

/// Grouped digits with a fixed number of decimals: `1234567.891, 2` → `"1,234,567.89"`.
pub fn group_thousands(number: f64, decimals: usize) -> String {
    let formatted = format!("{number:.decimals$}");
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (formatted.as_str(), None),
    };
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Digit-grouped display of a numeric value (`45000` → `"45,000"`), `None` for non-numbers.
pub fn format_grouped(value: &Value) -> Option<String> {
    match value {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Some(group_thousands(int as f64, 0))
            } else {
                let float = number.as_f64()?;
                if float.fract() == 0.0 {
                    Some(group_thousands(float, 0))
                } else {
                    let text = float.to_string();
                    let decimals = text.split_once('.').map_or(0, |(_, frac)| frac.len());
                    Some(group_thousands(float, decimals))
                }
            }
        }
        _ => None,
    }
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => is_no_data(text),
        _ => false,
    }
}
