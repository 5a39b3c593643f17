//! Configuration structures for scanledger.

use scanledger_inference::LlmSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanledgerConfig {
    /// Where documents and state live.
    pub storage: StorageConfig,

    /// OCR model location and language.
    pub ocr: OcrConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Heuristic extraction configuration.
    pub extraction: ExtractionConfig,

    /// Language-model backend.
    pub llm: LlmSettings,

    /// Category suggestion configuration.
    pub category: CategoryConfig,
}

/// Storage locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding content-addressed document files.
    pub root_dir: PathBuf,

    /// JSON file persisting documents, rules, categories and expenses.
    pub state_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("documents"),
            state_file: PathBuf::from("scanledger-state.json"),
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing `det.onnx`, `<lang>_rec.onnx` and `<lang>_dict.txt`.
    pub model_dir: PathBuf,

    /// Recognition language (model family), e.g. `latin`.
    pub language: String,

    /// Keep `[UNK]` tokens in OCR output instead of replacing with spaces.
    pub keep_unk: bool,

    /// Where `models download` fetches files from. `{file}` is replaced by
    /// the file name.
    pub download_url: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            language: "latin".to_string(),
            keep_unk: false,
            download_url: "https://github.com/jakubmatias/incr/raw/main/models/mobile/{file}".to_string(),
        }
    }
}

impl OcrConfig {
    /// Shared text detection model.
    pub const DETECTION_MODEL: &'static str = "det.onnx";

    pub fn recognition_model(language: &str) -> String {
        format!("{}_rec.onnx", language)
    }

    pub fn dictionary(language: &str) -> String {
        format!("{}_dict.txt", language)
    }

    /// The files that must exist for `language`.
    pub fn required_files(language: &str) -> Vec<String> {
        vec![
            Self::DETECTION_MODEL.to_string(),
            Self::recognition_model(language),
            Self::dictionary(language),
        ]
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Maximum pages to process (0 = unlimited).
    pub max_pages: usize,

    /// Try to extract embedded text before falling back to OCR.
    pub prefer_embedded_text: bool,

    /// Minimum text length to consider PDF as text-based.
    pub min_text_length: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            max_pages: 10,
            prefer_embedded_text: true,
            min_text_length: 50,
        }
    }
}

/// Heuristic extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Currency if none is detected.
    pub default_currency: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_currency: "BRL".to_string(),
        }
    }
}

/// Category suggestion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Catalog cache lifetime. Values under 30 are raised to 30.
    pub cache_ttl_secs: u64,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self { cache_ttl_secs: 300 }
    }
}

impl ScanledgerConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }

    /// Full path to a file in the OCR model directory.
    pub fn model_path(&self, file_name: &str) -> PathBuf {
        self.ocr.model_dir.join(file_name)
    }
}
