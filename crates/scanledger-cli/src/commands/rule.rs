//! Rule command - manage learned vendor rules.

use std::path::Path;

use clap::{Args, Subcommand};
use uuid::Uuid;

use scanledger_core::repository::VendorRuleRepository;

use crate::context::AppContext;
use crate::output::{self, OutputFormat};

/// Arguments for the rule command.
#[derive(Args)]
pub struct RuleArgs {
    #[command(subcommand)]
    command: RuleCommand,
}

#[derive(Subcommand)]
enum RuleCommand {
    /// Map a vendor keyword to a category, or update an existing mapping
    Add {
        /// Vendor keyword (matched case- and accent-insensitively)
        keyword: String,

        /// Target category id
        category_id: Uuid,

        /// Rule confidence between 0 and 1
        #[arg(long, default_value_t = 0.9)]
        confidence: f64,
    },

    /// List learned rules
    List,
}

pub async fn run(args: RuleArgs, config_path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let ctx = AppContext::load(config_path).await?;

    match args.command {
        RuleCommand::Add {
            keyword,
            category_id,
            confidence,
        } => {
            let rule = ctx.pipeline().add_vendor_rule(&keyword, category_id, confidence).await?;
            ctx.save().await?;

            match format {
                OutputFormat::Json => output::print_json(&rule)?,
                OutputFormat::Text => output::success(format!(
                    "Rule '{}' -> {} ({})",
                    rule.normalized_keyword, rule.category_id, rule.confidence
                )),
            }
        }
        RuleCommand::List => {
            let rules = VendorRuleRepository::list(ctx.repos.as_ref()).await?;

            match format {
                OutputFormat::Json => output::print_json(&rules)?,
                OutputFormat::Text => {
                    let rows: Vec<Vec<String>> = rules
                        .iter()
                        .map(|r| {
                            vec![
                                r.keyword.clone(),
                                r.category_id.to_string(),
                                r.confidence.to_string(),
                                r.last_used_at.format("%Y-%m-%d %H:%M").to_string(),
                            ]
                        })
                        .collect();
                    output::table(&["KEYWORD", "CATEGORY", "CONF", "LAST USED"], &rows);
                }
            }
        }
    }

    Ok(())
}
