//! Confirm command - turn a document's drafts into expenses.

use std::path::Path;

use clap::Args;
use console::style;
use uuid::Uuid;

use scanledger_core::heuristic_baseline;
use scanledger_core::repository::{CategoryRepository, DocumentRepository};

use crate::context::{AppContext, cancel_on_ctrl_c};
use crate::output::{self, OutputFormat};

/// Arguments for the confirm command.
#[derive(Args)]
pub struct ConfirmArgs {
    /// Document id
    id: Uuid,

    /// Vendor name (default: detected from the text)
    #[arg(long)]
    vendor: Option<String>,

    /// Category for every expense, overriding the suggestion
    #[arg(long)]
    category: Option<Uuid>,
}

pub async fn run(args: ConfirmArgs, config_path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let ctx = AppContext::load(config_path).await?;
    let pipeline = ctx.pipeline();
    let cancel = cancel_on_ctrl_c();

    let document = DocumentRepository::get(ctx.repos.as_ref(), args.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Document not found: {}", args.id))?;

    let result = if document.is_confirmed() {
        pipeline.confirm(args.id, "", &[]).await?
    } else {
        let parsed = pipeline.parse(args.id, &cancel).await;
        ctx.save().await?;
        let parsed = parsed?;

        let vendor = args
            .vendor
            .or_else(|| heuristic_baseline(&parsed.raw_text, &ctx.config.extraction.default_currency).vendor_name)
            .unwrap_or_default();

        let review = pipeline
            .review(args.id, &vendor, &parsed.raw_text, parsed.drafts, &cancel)
            .await?;
        let mut items = review.items;
        if items.is_empty() {
            anyhow::bail!("No expense drafts found in document {}", args.id);
        }

        if let Some(category_id) = args.category {
            let category = CategoryRepository::get(ctx.repos.as_ref(), category_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Category not found: {}", category_id))?;
            for item in &mut items {
                item.draft.category_id = Some(category.id);
                item.draft.category_name = Some(category.name.clone());
            }
        }

        pipeline.confirm(args.id, &vendor, &items).await?
    };
    ctx.save().await?;

    match format {
        OutputFormat::Json => output::print_json(&result)?,
        OutputFormat::Text if result.created_expense_ids.is_empty() => {
            output::notice(format!("Document {} was already confirmed", result.document_id));
        }
        OutputFormat::Text => {
            output::success(format!(
                "Confirmed {}: {} expense(s) created",
                style(result.document_id).cyan(),
                result.created_expense_ids.len()
            ));
            for rule in &result.learned_rules {
                println!("  learned rule '{}' -> {}", rule.normalized_keyword, rule.category_id);
            }
        }
    }

    Ok(())
}
