//! Shared state for commands: configuration, repositories and the pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use scanledger_core::{
    ContentStore, IngestionPipeline, LlmClient, MemoryRepositories, OcrTextExtractor, PipelineComponents,
    PureOcrLoader, ScanledgerConfig, StateSnapshot,
};

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scanledger")
        .join("config.json")
}

/// Load the config at `path`, or defaults when the file does not exist.
pub fn load_config(path: &Path) -> anyhow::Result<ScanledgerConfig> {
    if path.exists() {
        Ok(ScanledgerConfig::from_file(path)?)
    } else {
        debug!("No config at {}, using defaults", path.display());
        Ok(ScanledgerConfig::default())
    }
}

/// Everything a command needs to run the pipeline against the state file.
pub struct AppContext {
    pub config: ScanledgerConfig,
    pub repos: Arc<MemoryRepositories>,
    state_path: PathBuf,
}

impl AppContext {
    pub async fn load(config_path: &Path) -> anyhow::Result<Self> {
        let config = load_config(config_path)?;
        let state_path = config.storage.state_file.clone();
        let snapshot = StateSnapshot::load(&state_path).await?;
        debug!(
            "Loaded state: {} documents, {} rules, {} categories",
            snapshot.documents.len(),
            snapshot.rules.len(),
            snapshot.categories.len()
        );

        Ok(Self {
            config,
            repos: Arc::new(MemoryRepositories::from_snapshot(snapshot)),
            state_path,
        })
    }

    pub fn pipeline(&self) -> IngestionPipeline {
        let extractor = OcrTextExtractor::new(
            self.config.ocr.model_dir.clone(),
            Arc::new(self.config.ocr.language.clone()),
            Arc::new(PureOcrLoader {
                keep_unk: self.config.ocr.keep_unk,
            }),
        )
        .with_pdf_config(self.config.pdf.clone());

        let components = PipelineComponents {
            store: ContentStore::new(self.config.storage.root_dir.clone()),
            documents: self.repos.clone(),
            rules: self.repos.clone(),
            categories: self.repos.clone(),
            expenses: self.repos.clone(),
            extractor: Arc::new(extractor),
            llm: Arc::new(LlmClient::new(Arc::new(self.config.llm.clone()))),
        };

        IngestionPipeline::new(components, &self.config)
    }

    /// Persist repositories back to the state file.
    pub async fn save(&self) -> anyhow::Result<()> {
        self.repos.snapshot().await.save(&self.state_path).await?;
        Ok(())
    }
}

/// Token cancelled on Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            child.cancel();
        }
    });
    token
}
