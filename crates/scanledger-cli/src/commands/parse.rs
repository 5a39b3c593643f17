//! Parse command - extract text and drafts from an imported document.

use std::path::Path;

use clap::Args;
use console::style;
use uuid::Uuid;

use scanledger_core::ParseResult;

use crate::context::{AppContext, cancel_on_ctrl_c};
use crate::output::{self, OutputFormat};

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Document id
    id: Uuid,

    /// Also print the extracted text (text format only)
    #[arg(long)]
    show_text: bool,
}

pub async fn run(args: ParseArgs, config_path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let ctx = AppContext::load(config_path).await?;
    let pipeline = ctx.pipeline();
    let cancel = cancel_on_ctrl_c();

    // A failed parse is recorded on the document, so save either way.
    let result = pipeline.parse(args.id, &cancel).await;
    ctx.save().await?;
    let parsed = result?;

    match format {
        OutputFormat::Json => output::print_json(&parsed)?,
        OutputFormat::Text => print_text(&parsed, args.show_text),
    }

    Ok(())
}

pub fn print_text(parsed: &ParseResult, show_text: bool) {
    output::success(format!(
        "Parsed {} ({} page(s))",
        style(parsed.document_id).cyan(),
        parsed.page_texts.len()
    ));

    if show_text {
        println!();
        println!("{}", parsed.raw_text);
    }

    println!();
    let rows: Vec<Vec<String>> = parsed
        .drafts
        .iter()
        .map(|d| {
            vec![
                d.date.format("%Y-%m-%d").to_string(),
                d.amount.to_string(),
                d.confidence.to_string(),
                d.description.clone().unwrap_or_default(),
            ]
        })
        .collect();
    output::table(&["DATE", "AMOUNT", "CONF", "DESCRIPTION"], &rows);
}
