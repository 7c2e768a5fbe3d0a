//! Print the schema document for a deal input.

use anyhow::Result;
use clap::Args;
use std::collections::BTreeMap;

use super::common::{CommandContext, InputArgs};
use crate::input::DealInput;

/// Command to inspect how an input maps.
///
/// ```bash
/// memofill transform --input deal.json            # root variables plus `sections`
/// memofill transform --input deal.json --flatten  # the context a template sees
/// ```
#[derive(Args, Debug)]
pub struct TransformCommand {
    #[command(flatten)]
    pub input: InputArgs,

    /// Print the flattened, template-safe context instead of the schema document
    #[arg(long)]
    pub flatten: bool,
}

impl TransformCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let value = self.input.read().await?;
        let input = DealInput::classify(value, self.input.shape, self.input.deal_index)?;

        let output = if self.flatten {
            ctx.assembler().assemble(&input, &BTreeMap::new()).to_value()
        } else {
            ctx.assembler().schema(&input).to_value()
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}
