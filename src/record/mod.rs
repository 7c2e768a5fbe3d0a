//! Indexed access to extraction records.
//!
//! An extraction set is a flat list of tagged records, each carrying a category
//! label (`"Appraisal"`, `"Term Sheet"`, `"PFS"`, ...) and a payload mapping.
//! [`ExtractionIndex`] groups payloads by category in arrival order, so repeatable
//! categories such as several personal financial statements stay addressable.
//!
//! Lookups never fail: a missing category or index yields an empty mapping or
//! an empty slice. Path walks through payloads go through [`safe_get`], which
//! stops at the first ancestor that is not a mapping.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

static EMPTY_PAYLOAD: LazyLock<Map<String, Value>> = LazyLock::new(Map::new);

/// Keys that may carry a record's category label, in priority order.
const CATEGORY_KEYS: &[&str] = &["dd_name", "category_label", "category"];

/// Keys that may carry a record's payload, in priority order.
const PAYLOAD_KEYS: &[&str] = &["extracted_data", "payload"];

/// Category used when a record carries no label.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Extraction payloads grouped by category.
#[derive(Debug, Clone, Default)]
pub struct ExtractionIndex {
    by_category: HashMap<String, Vec<Map<String, Value>>>,
    total: usize,
}

impl ExtractionIndex {
    /// Group a list of tagged records by category.
    ///
    /// Records that are not mappings are skipped. A payload that is not a
    /// mapping is indexed as an empty mapping.
    pub fn from_records(records: &[Value]) -> Self {
        let mut index = Self::default();
        for (position, record) in records.iter().enumerate() {
            let Some(fields) = record.as_object() else {
                debug!("Skipping extraction record {position}: not a mapping");
                continue;
            };

            let category = CATEGORY_KEYS
                .iter()
                .find_map(|key| fields.get(*key).and_then(Value::as_str))
                .unwrap_or(UNKNOWN_CATEGORY)
                .to_string();

            let payload = match PAYLOAD_KEYS.iter().find_map(|key| fields.get(*key)) {
                Some(Value::Object(payload)) => payload.clone(),
                Some(_) => {
                    debug!("Extraction record {position} ({category}) has a non-mapping payload");
                    Map::new()
                }
                None => Map::new(),
            };

            index.insert(category, payload);
        }
        index
    }

    /// Append a payload under a category.
    pub fn insert(&mut self, category: impl Into<String>, payload: Map<String, Value>) {
        self.by_category.entry(category.into()).or_default().push(payload);
        self.total += 1;
    }

    /// The `index`-th payload of a category, or an empty mapping.
    pub fn get(&self, category: &str, index: usize) -> &Map<String, Value> {
        self.by_category.get(category).and_then(|docs| docs.get(index)).unwrap_or_else(|| empty_map())
    }

    /// The first payload of a category, or an empty mapping.
    pub fn first(&self, category: &str) -> &Map<String, Value> {
        self.get(category, 0)
    }

    /// All payloads of a category in arrival order.
    pub fn get_all(&self, category: &str) -> &[Map<String, Value>] {
        self.by_category.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the category's first payload exists and is non-empty.
    pub fn has(&self, category: &str) -> bool {
        !self.first(category).is_empty()
    }

    /// Whether any payload of the category was supplied.
    pub fn has_any(&self, category: &str) -> bool {
        !self.get_all(category).is_empty()
    }

    /// Total number of indexed records.
    pub fn len(&self) -> usize {
        self.total
    }

    /// Whether no records were indexed.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Category labels present, sorted.
    pub fn categories(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_category.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Walk a key path through nested mappings.
///
/// Returns `None` as soon as an ancestor is not a mapping or a key is missing,
/// and also when the final value is `null`.
///
/// ```
/// use memofill::record::safe_get;
/// use serde_json::json;
///
/// let doc = json!({"property_details": {"address": {"city": "Tampa"}, "note": "n/a"}});
/// assert_eq!(safe_get(&doc, &["property_details", "address", "city"]), Some(&json!("Tampa")));
/// assert_eq!(safe_get(&doc, &["property_details", "note", "city"]), None);
/// assert_eq!(safe_get(&doc, &["missing", "city"]), None);
/// ```
pub fn safe_get<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in path {
        current = current.as_object()?.get(*key)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// [`safe_get`] starting from a mapping.
pub fn map_get<'a>(map: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let head = map.get(*first)?;
    safe_get(head, rest)
}

/// A nested mapping at `path`, or an empty one.
pub fn map_at<'a>(map: &'a Map<String, Value>, path: &[&str]) -> &'a Map<String, Value> {
    map_get(map, path).and_then(Value::as_object).unwrap_or_else(|| empty_map())
}

/// A nested list at `path`, or an empty slice.
pub fn list_at<'a>(map: &'a Map<String, Value>, path: &[&str]) -> &'a [Value] {
    map_get(map, path).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

/// A nested string at `path`.
pub fn str_at<'a>(map: &'a Map<String, Value>, path: &[&str]) -> Option<&'a str> {
    map_get(map, path).and_then(Value::as_str)
}

/// The shared empty mapping.
pub fn empty_map() -> &'static Map<String, Value> {
    &EMPTY_PAYLOAD
}
