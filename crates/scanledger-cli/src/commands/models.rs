//! Models command - check and download OCR language data.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use futures_util::StreamExt;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use scanledger_core::models::config::{OcrConfig, ScanledgerConfig};
use scanledger_core::{NoopProgress, ProgressReporter};

use crate::context::load_config;
use crate::output::{self, OutputFormat};

/// Arguments for the models command.
#[derive(Args)]
pub struct ModelsArgs {
    #[command(subcommand)]
    command: ModelsCommand,
}

#[derive(Subcommand)]
enum ModelsCommand {
    /// Check which model files are installed
    Status,

    /// Download missing model files
    Download(DownloadArgs),
}

#[derive(Args)]
struct DownloadArgs {
    /// Force re-download even if files exist
    #[arg(long)]
    force: bool,

    /// Do not draw progress bars
    #[arg(long)]
    quiet: bool,
}

/// Presence of one model file.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileStatus {
    name: String,
    present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelStatus {
    model_dir: PathBuf,
    language: String,
    files: Vec<FileStatus>,
    ready: bool,
}

/// Progress bar for one download.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new(multi: &MultiProgress) -> anyhow::Result<Self> {
        let bar = multi.add(ProgressBar::new(0));
        bar.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} {msg:<30} [{bar:25.cyan/blue}] {bytes}/{total_bytes}")?
                .progress_chars("=>-"),
        );
        Ok(Self { bar })
    }
}

impl ProgressReporter for BarProgress {
    fn start(&self, label: &str, total: Option<u64>) {
        if let Some(total) = total {
            self.bar.set_length(total);
        }
        self.bar.set_message(label.to_string());
    }

    fn advance(&self, bytes: u64) {
        self.bar.inc(bytes);
    }

    fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

pub async fn run(args: ModelsArgs, config_path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    match args.command {
        ModelsCommand::Status => {
            let status = model_status(&config);
            print_status(&status, format)
        }
        ModelsCommand::Download(download_args) => download_models(&config, download_args, format).await,
    }
}

fn model_status(config: &ScanledgerConfig) -> ModelStatus {
    let files: Vec<FileStatus> = OcrConfig::required_files(&config.ocr.language)
        .into_iter()
        .map(|name| {
            let size_bytes = std::fs::metadata(config.model_path(&name))
                .ok()
                .filter(|m| m.is_file())
                .map(|m| m.len());
            FileStatus {
                present: size_bytes.is_some(),
                name,
                size_bytes,
            }
        })
        .collect();

    ModelStatus {
        model_dir: config.ocr.model_dir.clone(),
        language: config.ocr.language.clone(),
        ready: files.iter().all(|f| f.present),
        files,
    }
}

fn print_status(status: &ModelStatus, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return output::print_json(status);
    }

    println!("{}", style("Model Status").bold());
    println!(
        "Language: {}  Directory: {}",
        style(&status.language).cyan().bold(),
        status.model_dir.display()
    );
    println!();

    for file in &status.files {
        match file.size_bytes {
            Some(size) => println!("    {} {:<25} {:>10}", style("✓").green(), file.name, format_size(size)),
            None => println!("    {} {:<25} {:>10}", style("✗").red(), file.name, "missing"),
        }
    }

    println!();
    if status.ready {
        println!("    {} Ready", style("✓").green());
    } else {
        println!(
            "    {} Run 'scanledger models download' to download",
            style("⚠").yellow()
        );
    }

    Ok(())
}

async fn download_models(config: &ScanledgerConfig, args: DownloadArgs, format: OutputFormat) -> anyhow::Result<()> {
    let output_dir = &config.ocr.model_dir;
    tokio::fs::create_dir_all(output_dir).await?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("scanledger/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let show_progress = format == OutputFormat::Text && !args.quiet;
    let multi_progress = MultiProgress::new();
    let mut failures = Vec::new();

    for name in OcrConfig::required_files(&config.ocr.language) {
        let path = config.model_path(&name);
        if path.is_file() && !args.force {
            debug!("{} already present", name);
            continue;
        }

        let url = download_url(&config.ocr.download_url, &name);
        let result = if show_progress {
            let progress = BarProgress::new(&multi_progress)?;
            download_file(&client, &url, &path, &name, &progress).await
        } else {
            download_file(&client, &url, &path, &name, &NoopProgress).await
        };

        if let Err(e) = result {
            if show_progress {
                println!("  {} {} - {}", style("✗").red(), name, e);
            }
            failures.push(format!("{}: {}", name, e));
        }
    }

    let status = model_status(config);
    print_status(&status, format)?;

    if !failures.is_empty() {
        anyhow::bail!("Failed to download: {}", failures.join("; "));
    }

    Ok(())
}

/// Substitute `{file}` in the configured URL template.
fn download_url(template: &str, file: &str) -> String {
    if template.contains("{file}") {
        template.replace("{file}", file)
    } else {
        format!("{}/{}", template.trim_end_matches('/'), file)
    }
}

async fn download_file(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    label: &str,
    progress: &dyn ProgressReporter,
) -> anyhow::Result<()> {
    info!("Downloading {}", url);
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("HTTP {}", response.status());
    }

    progress.start(label, response.content_length());

    // Create temp file first
    let temp_path = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&temp_path).await?;

    // Stream download with progress
    let mut stream = response.bytes_stream();
    let written = async {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            progress.advance(chunk.len() as u64);
        }
        file.flush().await?;
        Ok::<(), anyhow::Error>(())
    }
    .await;

    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }
    drop(file);

    // Rename temp to final
    tokio::fs::rename(&temp_path, path).await?;
    progress.finish(&format!("{} {}", style("✓").green(), label));

    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.1}GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.1}MB", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.1}KB", bytes as f64 / 1_000.0)
    } else {
        format!("{}B", bytes)
    }
}
