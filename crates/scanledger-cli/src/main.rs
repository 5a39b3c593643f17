//! CLI application for scanned receipt and invoice ingestion.

mod commands;
mod context;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{categories, config, confirm, documents, import, interpret, models, parse, rule, suggest};
use output::OutputFormat;

/// scanledger - Turn scanned receipts into confirmed expenses
#[derive(Parser)]
#[command(name = "scanledger")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a PDF or image into the document store
    Import(import::ImportArgs),

    /// Extract text and expense drafts from a document
    Parse(parse::ParseArgs),

    /// Interpret a document's invoice fields with the language model
    Interpret(interpret::InterpretArgs),

    /// Suggest a category for a vendor and text
    Suggest(suggest::SuggestArgs),

    /// Manage learned vendor rules
    Rule(rule::RuleArgs),

    /// Confirm a document's drafts as expenses
    Confirm(confirm::ConfirmArgs),

    /// List imported documents
    Documents,

    /// Manage categories
    Categories(categories::CategoriesArgs),

    /// Manage OCR models
    Models(models::ModelsArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.unwrap_or_else(context::default_config_path);
    let format = cli.format;

    // Execute command
    match cli.command {
        Commands::Import(args) => import::run(args, &config_path, format).await,
        Commands::Parse(args) => parse::run(args, &config_path, format).await,
        Commands::Interpret(args) => interpret::run(args, &config_path, format).await,
        Commands::Suggest(args) => suggest::run(args, &config_path, format).await,
        Commands::Rule(args) => rule::run(args, &config_path, format).await,
        Commands::Confirm(args) => confirm::run(args, &config_path, format).await,
        Commands::Documents => documents::run(&config_path, format).await,
        Commands::Categories(args) => categories::run(args, &config_path, format).await,
        Commands::Models(args) => models::run(args, &config_path, format).await,
        Commands::Config(args) => config::run(args, &config_path).await,
    }
}
