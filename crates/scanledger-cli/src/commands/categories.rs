//! Categories command - add and list spending categories.

use std::path::Path;

use clap::{Args, Subcommand};

use scanledger_core::Category;
use scanledger_core::repository::CategoryRepository;

use crate::context::AppContext;
use crate::output::{self, OutputFormat};

/// Arguments for the categories command.
#[derive(Args)]
pub struct CategoriesArgs {
    #[command(subcommand)]
    command: CategoriesCommand,
}

#[derive(Subcommand)]
enum CategoriesCommand {
    /// Add a category
    Add {
        /// Category name
        name: String,

        /// What belongs in this category (shown to the language model)
        #[arg(long)]
        description: Option<String>,
    },

    /// List categories
    List,
}

pub async fn run(args: CategoriesArgs, config_path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let ctx = AppContext::load(config_path).await?;

    match args.command {
        CategoriesCommand::Add { name, description } => {
            let name = name.trim();
            if name.is_empty() {
                anyhow::bail!("Category name must not be empty");
            }

            let mut category = Category::new(name);
            if let Some(description) = description {
                category = category.with_description(description);
            }
            CategoryRepository::insert(ctx.repos.as_ref(), category.clone()).await?;
            ctx.save().await?;

            match format {
                OutputFormat::Json => output::print_json(&category)?,
                OutputFormat::Text => output::success(format!("Added category {} ({})", category.name, category.id)),
            }
        }
        CategoriesCommand::List => {
            let categories = CategoryRepository::list(ctx.repos.as_ref()).await?;

            match format {
                OutputFormat::Json => output::print_json(&categories)?,
                OutputFormat::Text => {
                    let rows: Vec<Vec<String>> = categories
                        .iter()
                        .map(|c| vec![c.id.to_string(), c.name.clone(), c.description.clone().unwrap_or_default()])
                        .collect();
                    output::table(&["ID", "NAME", "DESCRIPTION"], &rows);
                }
            }
        }
    }

    Ok(())
}
