//! Import command - add a file to the document store.

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use serde_json::json;

use crate::context::AppContext;
use crate::output::{self, OutputFormat};

/// Arguments for the import command.
#[derive(Args)]
pub struct ImportArgs {
    /// Input file (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Name to record instead of the file name
    #[arg(long)]
    name: Option<String>,
}

pub async fn run(args: ImportArgs, config_path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let ctx = AppContext::load(config_path).await?;
    let pipeline = ctx.pipeline();

    let id = pipeline
        .import(&args.input, args.name.as_deref().unwrap_or_default())
        .await?;
    ctx.save().await?;

    match format {
        OutputFormat::Json => output::print_json(&json!({ "documentId": id }))?,
        OutputFormat::Text => output::success(format!(
            "Imported {} as {}",
            args.input.display(),
            style(id).cyan().bold()
        )),
    }

    Ok(())
}
