//! Interpret command - read invoice fields with the language model.

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use uuid::Uuid;

use scanledger_core::InvoiceInterpretation;

use crate::context::{AppContext, cancel_on_ctrl_c};
use crate::output::{self, OutputFormat};

/// Arguments for the interpret command.
#[derive(Args)]
pub struct InterpretArgs {
    /// Document id
    id: Uuid,

    /// Use text from this file instead of parsing the document again
    #[arg(long)]
    text_file: Option<PathBuf>,
}

pub async fn run(args: InterpretArgs, config_path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let ctx = AppContext::load(config_path).await?;
    let pipeline = ctx.pipeline();
    let cancel = cancel_on_ctrl_c();

    let raw_text = match &args.text_file {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => {
            let result = pipeline.parse(args.id, &cancel).await;
            ctx.save().await?;
            result?.raw_text
        }
    };

    let interpretation = pipeline.interpret(args.id, &raw_text, &cancel).await?;

    match format {
        OutputFormat::Json => output::print_json(&interpretation)?,
        OutputFormat::Text => print_text(&interpretation),
    }

    Ok(())
}

fn print_text(interpretation: &InvoiceInterpretation) {
    let data = &interpretation.data;
    println!("{}", style("Invoice").bold());
    println!("  Vendor:     {}", data.vendor_name);
    println!("  Date:       {}", data.invoice_date.format("%Y-%m-%d"));
    println!("  Total:      {} {}", data.total_amount, data.currency);
    println!("  Confidence: {}", data.confidence);
    if let Some(notes) = &data.notes {
        println!("  Notes:      {}", notes);
    }

    if !data.line_items.is_empty() {
        println!();
        let rows: Vec<Vec<String>> = data
            .line_items
            .iter()
            .map(|item| {
                vec![
                    item.description.clone(),
                    output::or_dash(item.quantity),
                    item.amount.to_string(),
                ]
            })
            .collect();
        output::table(&["ITEM", "QTY", "AMOUNT"], &rows);
    }

    let baseline = &interpretation.baseline;
    println!();
    println!("{}", style("Pattern baseline").dim());
    println!("  Vendor: {}", output::or_dash(baseline.vendor_name.as_deref()));
    println!("  Date:   {}", output::or_dash(baseline.invoice_date));
    println!("  Total:  {} {}", output::or_dash(baseline.total_amount), baseline.currency);
}
