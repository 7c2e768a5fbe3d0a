//! List the variables a template reads.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::common::{CommandContext, OutputFormat, read_json};
use crate::core::MemoError;
use crate::input::InputShape;
use crate::templating::variables::{missing_variables, referenced_variables};

/// Command to report template variables.
///
/// With `--input`, the input is assembled and every referenced variable
/// absent from the context is reported. Any missing variable fails the command.
///
/// ```bash
/// memofill variables --template memo.md
/// memofill variables --template memo.md --input deal.json --format json
/// ```
#[derive(Args, Debug)]
pub struct VariablesCommand {
    /// Tera template to scan
    #[arg(short, long, value_name = "FILE")]
    pub template: PathBuf,

    /// Deal input to check the template against
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Deal to select from a list of deals
    #[arg(long, value_name = "N", requires = "input")]
    pub deal_index: Option<usize>,

    /// Input shape; `auto` detects it from the JSON
    #[arg(long, value_enum, default_value = "auto")]
    pub shape: InputShape,

    /// Report format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl VariablesCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let template = tokio::fs::read_to_string(&self.template).await.map_err(|_| {
            MemoError::TemplateNotFound {
                path: self.template.display().to_string(),
            }
        })?;
        let referenced: Vec<String> = referenced_variables(&template).into_iter().collect();

        let missing = match &self.input {
            Some(path) => {
                let value = read_json(path).await?;
                let assembled = ctx.assembler().assemble_value(
                    value,
                    self.shape,
                    self.deal_index,
                    &BTreeMap::new(),
                )?;
                Some(missing_variables(&template, &assembled.context))
            }
            None => None,
        };

        match self.format {
            OutputFormat::Json => {
                let report = json!({
                    "template": self.template.display().to_string(),
                    "referenced": referenced,
                    "missing": missing,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            OutputFormat::Text => {
                println!("{}", "Referenced variables:".bold());
                for name in &referenced {
                    println!("  {name}");
                }
                if let Some(missing) = &missing {
                    if missing.is_empty() {
                        println!("{}", "✓ Every referenced variable is in the context".green());
                    } else {
                        println!("{}", "Missing from the context:".red().bold());
                        for name in missing {
                            println!("  {}", name.red());
                        }
                    }
                }
            }
        }

        match missing {
            Some(missing) if !missing.is_empty() => Err(anyhow::anyhow!(
                "{} referenced variable(s) of {} missing from the context: {}",
                missing.len(),
                self.template.display(),
                missing.join(", ")
            )),
            _ => Ok(()),
        }
    }
}
