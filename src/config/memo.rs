//! User configuration for memo assembly.
//!
//! The configuration file is optional. Every key has a default, so a missing
//! file, a missing table, or a missing key all fall back to the built-in values.
//!
//! # Location
//!
//! - Unix/macOS: `~/.memofill/config.toml`
//! - Windows: `%LOCALAPPDATA%\memofill\config.toml`
//! - Override: `MEMOFILL_CONFIG` environment variable, or `--config` on the CLI
//!
//! # Example
//!
//! ```toml
//! [memo]
//! title = "BRIDGE LOAN REQUEST"
//! subtitle = "CREDIT COMMITTEE MEMO"
//! credit_committee = ["A. Partner, Partner", "B. Officer, CFO"]
//! underwriting_team = ["C. Analyst, Associate"]
//! memo_date = "January 15, 2026"
//!
//! [images]
//! max_width_in = 6.5
//! max_height_in = 8.0
//!
//! [images.widths]
//! IMAGE_SITE_PLAN = 6.0
//!
//! [output]
//! directory = "memos"
//! suffix_limit = 1000
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "MEMOFILL_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MemoConfig {
    /// Cover and recommendation defaults
    #[serde(default)]
    pub memo: MemoSettings,

    /// Image sizing limits
    #[serde(default)]
    pub images: ImageSettings,

    /// Output file placement
    #[serde(default)]
    pub output: OutputSettings,
}

/// Cover page and recommendation defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MemoSettings {
    pub title: String,
    pub subtitle: String,
    pub credit_committee: Vec<String>,
    pub underwriting_team: Vec<String>,
    pub recommendation: String,
    pub conditions: Vec<String>,
    /// Fixed memo date; today's date when unset
    pub memo_date: Option<String>,
}

impl Default for MemoSettings {
    fn default() -> Self {
        Self {
            title: "BRIDGE LOAN REQUEST".to_string(),
            subtitle: "CREDIT COMMITTEE MEMO".to_string(),
            credit_committee: vec![
                "Tony Balbo, Partner".to_string(),
                "Keith Konon, Partner".to_string(),
                "Greg Halajian, CFO".to_string(),
            ],
            underwriting_team: vec!["Colton Proctor, Associate".to_string()],
            recommendation: "APPROVE - Subject to conditions".to_string(),
            conditions: vec![
                "Standard closing conditions".to_string(),
                "Satisfactory title and survey review".to_string(),
                "Completion of legal documentation".to_string(),
            ],
            memo_date: None,
        }
    }
}

impl MemoSettings {
    /// The configured memo date, or today formatted like `January 05, 2026`.
    pub fn memo_date(&self) -> String {
        match self.memo_date.as_deref().map(str::trim) {
            Some(date) if !date.is_empty() => date.to_string(),
            _ => chrono::Local::now().format("%B %d, %Y").to_string(),
        }
    }
}

/// Image sizing limits, in inches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageSettings {
    pub max_width_in: f64,
    pub max_height_in: f64,
    /// Width used for recognized placeholders without a declared width
    pub default_width_in: f64,
    /// Preferred widths per placeholder name, overriding the built-in table
    pub widths: BTreeMap<String, f64>,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            max_width_in: 6.5,
            max_height_in: 8.0,
            default_width_in: 5.0,
            widths: BTreeMap::new(),
        }
    }
}

/// Output file placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    /// Directory for rendered memos; the current directory when unset
    pub directory: Option<PathBuf>,
    /// Highest numeric suffix tried before falling back to a timestamp
    pub suffix_limit: u32,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: None,
            suffix_limit: 1000,
        }
    }
}

impl MemoConfig {
    /// Load configuration from the default location.
    ///
    /// Returns defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined, or the
    /// file exists but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_with_optional(Some(path)).await
    }

    /// Load configuration from an explicit path, falling back to the default location.
    ///
    /// An explicit path that does not exist yields defaults, like the default path does.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .map_err(crate::core::MemoError::from)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// The default config file path, honoring `MEMOFILL_CONFIG`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or local data) directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("memofill")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".memofill")
        };

        Ok(config_dir.join("config.toml"))
    }
}
