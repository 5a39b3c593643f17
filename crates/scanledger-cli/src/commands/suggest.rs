//! Suggest command - propose a category for a vendor and text.

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;

use crate::context::{AppContext, cancel_on_ctrl_c};
use crate::output::{self, OutputFormat};

/// Arguments for the suggest command.
#[derive(Args)]
pub struct SuggestArgs {
    /// Vendor name
    #[arg(long, default_value = "")]
    vendor: String,

    /// Document text
    #[arg(long, conflicts_with = "text_file")]
    text: Option<String>,

    /// Read document text from a file
    #[arg(long)]
    text_file: Option<PathBuf>,
}

pub async fn run(args: SuggestArgs, config_path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let raw_text = match (&args.text, &args.text_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path).await?,
        (None, None) => String::new(),
    };
    if args.vendor.trim().is_empty() && raw_text.trim().is_empty() {
        anyhow::bail!("Provide --vendor, --text or --text-file");
    }

    let ctx = AppContext::load(config_path).await?;
    let pipeline = ctx.pipeline();
    let cancel = cancel_on_ctrl_c();

    let suggestion = pipeline
        .suggest_category(&args.vendor, &raw_text, &[], &cancel)
        .await?;
    // Matching a rule updates its last-used time.
    ctx.save().await?;

    match format {
        OutputFormat::Json => output::print_json(&suggestion)?,
        OutputFormat::Text => match suggestion.category_id {
            Some(id) => {
                println!(
                    "{} ({}) confidence {}",
                    style(suggestion.category_name.as_deref().unwrap_or("?")).cyan().bold(),
                    id,
                    suggestion.confidence
                );
                println!("  {}", style(&suggestion.rationale).dim());
            }
            None => output::notice(format!("No category suggested: {}", suggestion.rationale)),
        },
    }

    Ok(())
}
