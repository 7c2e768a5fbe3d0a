//! Image handles merged into the final context.
//!
//! Decoding and scaling happen outside this crate. A caller supplies an image
//! manifest naming each placeholder with its source and pixel dimensions:
//!
//! ```json
//! {
//!   "IMAGE_SITE_PLAN": {"src": "images/site.png", "width_px": 1600, "height_px": 1200},
//!   "IMAGE_AERIAL_MAP": {"src": "images/aerial.png", "width_px": 800, "height_px": 800}
//! }
//! ```
//!
//! Each entry becomes an [`ImageHandle`] sized in inches to fit the configured
//! page limits while keeping its aspect ratio.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::ImageSettings;
use crate::core::MemoError;

/// Preferred widths in inches for the built-in placeholders.
///
/// Together with the names under `[images.widths]` in the configuration,
/// this table is the set of recognized placeholders.
pub const IMAGE_WIDTHS: &[(&str, f64)] = &[
    ("IMAGE_SOURCES_USES", 6.5),
    ("IMAGE_CAPITAL_STACK_CLOSING", 6.5),
    ("IMAGE_CAPITAL_STACK_MATURITY", 6.5),
    ("IMAGE_LOAN_TO_COST", 6.0),
    ("IMAGE_LTV_LTC", 6.0),
    ("IMAGE_AERIAL_MAP", 4.5),
    ("IMAGE_LOCATION_MAP", 4.5),
    ("IMAGE_REGIONAL_MAP", 4.5),
    ("IMAGE_SITE_PLAN", 5.5),
    ("IMAGE_STREET_VIEW", 5.5),
    ("IMAGE_FORECLOSURE_DEFAULT", 6.5),
    ("IMAGE_FORECLOSURE_NOTE", 6.5),
];

/// Height used when pixel dimensions are unknown.
const FALLBACK_HEIGHT_IN: f64 = 4.0;

/// Whether a name is a built-in placeholder or one the configuration declares.
pub fn is_recognized_placeholder(name: &str, settings: &ImageSettings) -> bool {
    settings.widths.contains_key(name) || IMAGE_WIDTHS.iter().any(|(known, _)| *known == name)
}

/// Preferred width for a placeholder: configured, built-in, then the default.
pub fn preferred_width(name: &str, settings: &ImageSettings) -> f64 {
    settings
        .widths
        .get(name)
        .copied()
        .or_else(|| IMAGE_WIDTHS.iter().find(|(known, _)| *known == name).map(|(_, width)| *width))
        .unwrap_or(settings.default_width_in)
}

/// One manifest entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageSource {
    pub src: String,
    #[serde(default)]
    pub width_px: u32,
    #[serde(default)]
    pub height_px: u32,
}

/// An image manifest keyed by placeholder name.
pub type ImageManifest = BTreeMap<String, ImageSource>;

/// A sized image, ready for the renderer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageHandle {
    pub src: String,
    pub width_in: f64,
    pub height_in: f64,
}

impl ImageHandle {
    /// Size an image within the page limits, preserving aspect ratio.
    ///
    /// The width starts at `preferred` (capped at the max width). If the
    /// resulting height is over the max height, the height is capped and the
    /// width recomputed, then capped once more. Zero pixel dimensions fall
    /// back to the capped preferred width and a 4 inch height.
    pub fn fit(
        src: impl Into<String>,
        pixel_width: u32,
        pixel_height: u32,
        preferred: f64,
        limits: &ImageSettings,
    ) -> Self {
        let src = src.into();
        let mut width = preferred.min(limits.max_width_in);

        if pixel_width == 0 || pixel_height == 0 {
            return Self {
                src,
                width_in: width,
                height_in: FALLBACK_HEIGHT_IN.min(limits.max_height_in),
            };
        }

        let aspect = f64::from(pixel_height) / f64::from(pixel_width);
        let mut height = width * aspect;
        if height > limits.max_height_in {
            height = limits.max_height_in;
            width = height / aspect;
            if width > limits.max_width_in {
                width = limits.max_width_in;
                height = width * aspect;
            }
        }

        Self {
            src,
            width_in: width,
            height_in: height,
        }
    }
}

/// Parse an image manifest.
///
/// # Errors
///
/// Returns [`MemoError::JsonError`] when the text is not a manifest mapping.
pub fn parse_manifest(text: &str) -> Result<ImageManifest, MemoError> {
    Ok(serde_json::from_str(text)?)
}

/// Size every recognized manifest entry. Unrecognized names are skipped with a warning.
pub fn prepare_images(manifest: &ImageManifest, settings: &ImageSettings) -> BTreeMap<String, ImageHandle> {
    let mut handles = BTreeMap::new();
    for (name, source) in manifest {
        if !is_recognized_placeholder(name, settings) {
            warn!("Skipping image '{name}': not a recognized placeholder");
            continue;
        }
        let width = preferred_width(name, settings);
        let handle = ImageHandle::fit(&source.src, source.width_px, source.height_px, width, settings);
        debug!("Prepared image {name}: {:.2}\" x {:.2}\"", handle.width_in, handle.height_in);
        handles.insert(name.clone(), handle);
    }
    handles
}

/// Merge handles into a context and default `images` to `[]`.
pub fn merge_images(context: &mut Map<String, Value>, handles: &BTreeMap<String, ImageHandle>) {
    for (name, handle) in handles {
        let value = serde_json::to_value(handle).unwrap_or(Value::Null);
        context.insert(name.clone(), value);
    }
    if !context.get("images").is_some_and(Value::is_array) {
        context.insert("images".to_string(), Value::Array(Vec::new()));
    }
}
