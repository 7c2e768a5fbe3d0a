//! memofill CLI entry point
//!
//! Parses arguments, runs the command and prints errors with suggestions.
//!
//! - `fill` - Render a template with an assembled deal context
//! - `transform` - Print the schema document for an input
//! - `variables` - List the variables a template reads

use anyhow::Result;
use clap::Parser;
use memofill::cli;
use memofill::core::error::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
