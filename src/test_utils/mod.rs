//! Test utilities for memofill
//!
//! Fixtures for deal inputs and templates, plus one-time logging setup.
//!
//! ```rust,no_run
//! use memofill::test_utils::{DealFixture, TemplateFixture};
//!
//! # fn example(dir: &std::path::Path) -> anyhow::Result<()> {
//! let input = DealFixture::sparse().write_to(dir)?;
//! let template = TemplateFixture::memo().write_to(dir)?;
//! # Ok(())
//! # }
//! ```

pub mod fixtures;

pub use fixtures::{DealFixture, TemplateFixture};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call installs a subscriber. The filter is `level` when
/// given, else `RUST_LOG`. With neither, nothing is installed.
///
/// ```bash
/// RUST_LOG=memofill=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_ansi(true)
            .try_init();
    });
}
