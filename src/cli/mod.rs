//! Command-line interface for memofill.
//!
//! # Commands
//!
//! - `fill` - Assemble a context from a deal input and render a template with it
//! - `transform` - Print the schema document (or the flattened context) for an input
//! - `variables` - List the variables a template reads, and those an input leaves missing
//!
//! # Global Options
//!
//! - `--verbose` / `-v` - Debug logging
//! - `--quiet` / `-q` - Errors only
//! - `--config` / `-c` - Path to a config file (also `MEMOFILL_CONFIG`)
//!
//! `RUST_LOG`, when set, takes precedence over both verbosity flags.
//!
//! # Examples
//!
//! ```bash
//! memofill fill --template memo.md --input deal.json --output-dir out/
//! memofill fill -t memo.md -i records.json --images images.json --format json
//! memofill transform --input deal.json --flatten
//! memofill variables --template memo.md --input deal.json
//! ```

pub mod common;
mod fill;
mod transform;
mod variables;


use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::{CONFIG_ENV_VAR, MemoConfig};
use common::CommandContext;

/// Main CLI structure.
#[derive(Parser, Debug)]
#[command(
    name = "memofill",
    about = "Fill credit memo templates from deal records",
    version,
    long_about = "memofill normalizes deal records and extraction outputs into one canonical, \
                  template-safe context and renders Tera templates with it."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the config file
    ///
    /// Defaults to `~/.memofill/config.toml`. A missing file means defaults.
    #[arg(short, long, global = true, env = CONFIG_ENV_VAR, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a template with the context assembled from a deal input
    Fill(fill::FillCommand),

    /// Print the schema document for a deal input
    Transform(transform::TransformCommand),

    /// List the variables a template reads
    Variables(variables::VariablesCommand),
}

impl Cli {
    /// Install logging, load the config and run the selected command.
    ///
    /// # Errors
    ///
    /// Returns the command's error, or a config load failure.
    pub async fn execute(self) -> Result<()> {
        init_logging(self.log_level());

        let config = MemoConfig::load_with_optional(self.config.clone()).await?;
        let ctx = CommandContext::new(config);

        match self.command {
            Commands::Fill(cmd) => cmd.execute(&ctx).await,
            Commands::Transform(cmd) => cmd.execute(&ctx).await,
            Commands::Variables(cmd) => cmd.execute(&ctx).await,
        }
    }

    /// Log level selected by the verbosity flags.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `level` when set.
fn init_logging(level: &str) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(level)
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
