//! Documents command - list imported documents.

use std::path::Path;

use scanledger_core::repository::DocumentRepository;

use crate::context::AppContext;
use crate::output::{self, OutputFormat};

pub async fn run(config_path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let ctx = AppContext::load(config_path).await?;
    let documents = DocumentRepository::list(ctx.repos.as_ref()).await?;

    match format {
        OutputFormat::Json => output::print_json(&documents)?,
        OutputFormat::Text => {
            let rows: Vec<Vec<String>> = documents
                .iter()
                .map(|d| {
                    vec![
                        d.id.to_string(),
                        d.original_file_name.clone(),
                        d.status.to_string(),
                        if d.ocr_used { "yes" } else { "no" }.to_string(),
                        d.created_at.format("%Y-%m-%d %H:%M").to_string(),
                        d.failure_reason.clone().unwrap_or_default(),
                    ]
                })
                .collect();
            output::table(&["ID", "FILE", "STATUS", "OCR", "IMPORTED", "REASON"], &rows);
        }
    }

    Ok(())
}
