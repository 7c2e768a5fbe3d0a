//! Input classification at the library boundary.
//!
//! Upstream producers hand over one of several top-level shapes. [`DealInput`]
//! names them, and [`DealInput::classify`] is the only place that inspects the
//! top-level type. Anything past this point can assume it holds either an
//! extraction set or a single mapping. Caller-contract violations are rejected
//! here with [`MemoError::InvalidInputShape`] before any section builder runs.
//!
//! Accepted shapes:
//!
//! | Top-level value                               | Classified as            |
//! |-----------------------------------------------|--------------------------|
//! | `{"payload": [deal, ...], "deal_index": n}`   | deal at `n`              |
//! | `{"layer2_data": [record, ...]}`              | extractions              |
//! | `{...}`                                       | deal                     |
//! | `[record, ...]` with `dd_name`/`extracted_data` | extractions            |
//! | `[deal, ...]`                                 | deal at `deal_index`     |
//! | `[]`                                          | empty extraction set     |

use serde_json::{Map, Value};
use tracing::debug;

use crate::core::MemoError;
use crate::mapper::SchemaMapper;
use crate::mapper::deal_input::DealInputMapper;
use crate::mapper::layer2::Layer2Mapper;
use crate::mapper::prepared::PreparedMapper;
use crate::record::ExtractionIndex;

/// Keys marking an array element as a tagged extraction record.
const EXTRACTION_MARKERS: &[&str] = &["dd_name", "extracted_data"];

const EXPECTED_SHAPES: &str =
    "a deal mapping, a {\"payload\": [...]} wrapper, or a list of mappings";

/// Requested interpretation of the top-level input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum InputShape {
    /// Detect the shape from the value
    #[default]
    Auto,
    /// A list of tagged extraction records
    Extractions,
    /// A single raw deal record
    Deal,
    /// An already-flat context
    Prepared,
}

/// A classified input, ready for its schema mapper.
#[derive(Debug, Clone)]
pub enum DealInput {
    /// Tagged extraction records grouped by category
    Extractions(ExtractionIndex),
    /// One raw deal record
    Deal(Map<String, Value>),
    /// One pre-aggregated, already-flat context
    Prepared(Map<String, Value>),
}

/// Top-level value with wrappers removed.
enum Unwrapped {
    List {
        items: Vec<Value>,
        wrapper_index: Option<usize>,
        tagged: bool,
    },
    Single(Map<String, Value>),
}

impl DealInput {
    /// Classify a top-level JSON value.
    ///
    /// `deal_index` selects a deal from a deal list. When it is `None`, a
    /// wrapper's own `deal_index` is used, then `0`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoError::InvalidInputShape`] for scalars, arrays holding
    /// non-mapping elements, and shapes the explicit `shape` cannot accept.
    /// Returns [`MemoError::DealIndexOutOfRange`] when the selected index is
    /// past the end of the deal list.
    pub fn classify(
        value: Value,
        shape: InputShape,
        deal_index: Option<usize>,
    ) -> Result<Self, MemoError> {
        let unwrapped = unwrap_top_level(value)?;

        let input = match (shape, unwrapped) {
            (InputShape::Auto, Unwrapped::Single(deal)) => Self::Deal(deal),
            (
                InputShape::Auto,
                Unwrapped::List {
                    items,
                    tagged: true,
                    ..
                },
            ) => Self::Extractions(ExtractionIndex::from_records(&items)),
            (
                InputShape::Auto,
                Unwrapped::List {
                    items,
                    ..
                },
            ) if items.is_empty() => Self::Extractions(ExtractionIndex::default()),
            (
                InputShape::Auto | InputShape::Deal,
                Unwrapped::List {
                    items,
                    wrapper_index,
                    ..
                },
            ) => Self::Deal(select_deal(items, deal_index.or(wrapper_index))?),
            (InputShape::Deal, Unwrapped::Single(deal)) => Self::Deal(deal),
            (
                InputShape::Extractions,
                Unwrapped::List {
                    items,
                    ..
                },
            ) => Self::Extractions(ExtractionIndex::from_records(&items)),
            (InputShape::Extractions, Unwrapped::Single(_)) => {
                return Err(MemoError::InvalidInputShape {
                    expected: "a list of extraction records".to_string(),
                    found: "a single mapping".to_string(),
                });
            }
            (InputShape::Prepared, Unwrapped::Single(context)) => Self::Prepared(context),
            (
                InputShape::Prepared,
                Unwrapped::List {
                    items,
                    wrapper_index,
                    ..
                },
            ) => Self::Prepared(select_deal(items, deal_index.or(wrapper_index))?),
        };

        debug!(shape = ?shape, kind = input.kind(), "Classified input");
        Ok(input)
    }

    /// Parse and classify JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`MemoError::JsonError`] for malformed JSON, otherwise as [`Self::classify`].
    pub fn from_json_str(
        text: &str,
        shape: InputShape,
        deal_index: Option<usize>,
    ) -> Result<Self, MemoError> {
        let value: Value = serde_json::from_str(text)?;
        Self::classify(value, shape, deal_index)
    }

    /// Short name of the variant, for logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Extractions(_) => "extractions",
            Self::Deal(_) => "deal",
            Self::Prepared(_) => "prepared",
        }
    }

    /// The schema mapper for this input.
    pub fn mapper(&self) -> Box<dyn SchemaMapper + '_> {
        match self {
            Self::Extractions(index) => Box::new(Layer2Mapper::new(index)),
            Self::Deal(deal) => Box::new(DealInputMapper::new(deal)),
            Self::Prepared(context) => Box::new(PreparedMapper::new(context)),
        }
    }
}

fn unwrap_top_level(value: Value) -> Result<Unwrapped, MemoError> {
    match value {
        Value::Object(mut fields) => {
            let wrapper_index = fields
                .get("deal_index")
                .and_then(Value::as_u64)
                .and_then(|index| usize::try_from(index).ok());
            match fields.remove("payload") {
                Some(Value::Array(items)) => return list(items, wrapper_index, false),
                Some(Value::Object(deal)) => return Ok(Unwrapped::Single(deal)),
                Some(other) => {
                    fields.insert("payload".to_string(), other);
                }
                None => {}
            }
            match fields.remove("layer2_data") {
                Some(Value::Array(records)) => list(records, None, true),
                Some(other) => {
                    fields.insert("layer2_data".to_string(), other);
                    Ok(Unwrapped::Single(fields))
                }
                None => Ok(Unwrapped::Single(fields)),
            }
        }
        Value::Array(items) => {
            let tagged = items.iter().any(|item| {
                item.as_object()
                    .is_some_and(|fields| EXTRACTION_MARKERS.iter().any(|key| fields.contains_key(*key)))
            });
            list(items, None, tagged)
        }
        other => Err(MemoError::InvalidInputShape {
            expected: EXPECTED_SHAPES.to_string(),
            found: describe(&other).to_string(),
        }),
    }
}

fn list(
    items: Vec<Value>,
    wrapper_index: Option<usize>,
    tagged: bool,
) -> Result<Unwrapped, MemoError> {
    if let Some(bad) = items.iter().find(|item| !item.is_object()) {
        return Err(MemoError::InvalidInputShape {
            expected: EXPECTED_SHAPES.to_string(),
            found: format!("a list containing {}", describe(bad)),
        });
    }
    Ok(Unwrapped::List {
        items,
        wrapper_index,
        tagged,
    })
}

fn select_deal(items: Vec<Value>, index: Option<usize>) -> Result<Map<String, Value>, MemoError> {
    let index = index.unwrap_or(0);
    let len = items.len();
    match items.into_iter().nth(index) {
        Some(Value::Object(deal)) => Ok(deal),
        Some(other) => Err(MemoError::InvalidInputShape {
            expected: "a deal mapping".to_string(),
            found: describe(&other).to_string(),
        }),
        None => Err(MemoError::DealIndexOutOfRange {
            index,
            len,
        }),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
