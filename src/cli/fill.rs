//! Render a template with an assembled deal context.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::common::{CommandContext, InputArgs, OutputFormat, read_template};
use crate::templating::images::{parse_manifest, prepare_images};
use crate::templating::{ImageHandle, TeraRenderer};
use crate::utils::{atomic_write, unique_output_path};

/// Command to fill a template.
///
/// ```bash
/// memofill fill --template memo.md --input deal.json
/// memofill fill -t memo.md -i deal.json --output-dir out --output-name harbor_point.md
/// memofill fill -t memo.md -i batch.json --deal-index 2 --format json
/// ```
#[derive(Args, Debug)]
pub struct FillCommand {
    /// Tera template to render
    #[arg(short, long, value_name = "FILE")]
    pub template: PathBuf,

    #[command(flatten)]
    pub input: InputArgs,

    /// Image manifest JSON: `{"IMAGE_NAME": {"src": ..., "width_px": ..., "height_px": ...}}`
    #[arg(long, value_name = "FILE")]
    pub images: Option<PathBuf>,

    /// Directory for the rendered document (default: config `output.directory`, then `.`)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// File name for the rendered document (default: `<input>_memo.<template extension>`)
    #[arg(long, value_name = "NAME")]
    pub output_name: Option<String>,

    /// Report format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// What a fill run produced.
#[derive(Debug, Serialize)]
pub struct FillReport {
    pub output: PathBuf,
    pub checksum: String,
    pub sponsors_found: usize,
    pub sponsor_names: Vec<String>,
}

impl FillCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let template = read_template(&self.template).await?;
        let value = self.input.read().await?;
        let images = self.load_images(ctx).await?;

        let assembler = ctx.assembler();
        let assembled =
            assembler.assemble_value(value, self.input.shape, self.input.deal_index, &images)?;
        info!(checksum = %assembled.checksum, "Assembled context");

        let document = assembler
            .render(&TeraRenderer::new(), &template, &assembled)
            .with_context(|| format!("Failed to render {}", self.template.display()))?;

        let output = self.output_path(ctx);
        atomic_write(&output, &document)?;

        let report = FillReport {
            output,
            checksum: assembled.checksum,
            sponsors_found: assembled.sponsor_names.len(),
            sponsor_names: assembled.sponsor_names,
        };
        self.print_report(&report)
    }

    async fn load_images(&self, ctx: &CommandContext) -> Result<BTreeMap<String, ImageHandle>> {
        let Some(path) = &self.images else {
            return Ok(BTreeMap::new());
        };
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read image manifest from {}", path.display()))?;
        let manifest = parse_manifest(&text)
            .with_context(|| format!("Invalid image manifest {}", path.display()))?;
        debug!("Loaded {} image manifest entries", manifest.len());
        Ok(prepare_images(&manifest, &ctx.config.images))
    }

    fn output_path(&self, ctx: &CommandContext) -> PathBuf {
        let dir = self
            .output_dir
            .clone()
            .or_else(|| ctx.config.output.directory.clone())
            .unwrap_or_else(|| PathBuf::from("."));

        let (stem, ext) = match &self.output_name {
            Some(name) => split_name(name, &self.template),
            None => {
                let input_stem = file_stem(&self.input.input).unwrap_or_else(|| "deal".to_string());
                (format!("{input_stem}_memo"), template_extension(&self.template))
            }
        };
        unique_output_path(&dir, &stem, &ext, ctx.config.output.suffix_limit)
    }

    fn print_report(&self, report: &FillReport) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(report)?);
            }
            OutputFormat::Text => {
                println!("{} {}", "✓ Wrote".green().bold(), report.output.display());
                println!("  Checksum: {}", report.checksum);
                if report.sponsor_names.is_empty() {
                    println!("  Sponsors found: {}", report.sponsors_found);
                } else {
                    println!(
                        "  Sponsors found: {} ({})",
                        report.sponsors_found,
                        report.sponsor_names.join(", ")
                    );
                }
            }
        }
        Ok(())
    }
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().map(|stem| stem.to_string_lossy().to_string())
}

fn template_extension(template: &Path) -> String {
    template
        .extension()
        .map_or_else(|| "txt".to_string(), |ext| ext.to_string_lossy().to_string())
}

/// Stem and extension of a requested output name; the template's extension when it has none.
fn split_name(name: &str, template: &Path) -> (String, String) {
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => (stem.to_string_lossy().to_string(), ext.to_string_lossy().to_string()),
        _ => (name.to_string(), template_extension(template)),
    }
}
