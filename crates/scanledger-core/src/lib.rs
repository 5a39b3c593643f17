//! Core library for scanned receipt and invoice ingestion.
//!
//! This crate provides:
//! - A content-addressed document store (SHA-256 names, deduplication)
//! - Text extraction from PDFs and images through pluggable OCR
//! - Regex heuristics for dates and amounts
//! - Invoice interpretation through a language model
//! - Category suggestion from learned rules, keywords and the model
//! - The ingestion pipeline: import, parse, review, confirm

pub mod category;
pub mod error;
pub mod extraction;
pub mod heuristics;
pub mod interpret;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod repository;
pub mod store;

pub use category::{CategoryCatalog, CategoryCatalogCache, CategorySuggestion, CategorySuggestionEngine};
pub use error::{ErrorKind, IngestError, OcrError, PdfError, Result};
pub use extraction::{DocumentTextExtractor, ExtractedText, OcrTextExtractor};
pub use heuristics::{build_drafts, heuristic_baseline};
pub use interpret::InvoiceInterpreter;
pub use models::{
    Category, ConfidenceScore, DocumentHash, DocumentStatus, Expense, ExpenseDraftItem, HeuristicBaseline,
    ImportedDocument, InvoiceData, InvoiceInterpretation, InvoiceLineItem, ReviewItem, ScanledgerConfig,
    VendorCategoryRule,
};
#[cfg(feature = "native")]
pub use ocr::PureOcrLoader;
pub use ocr::{LanguageFiles, PageRecognizer, RecognizerLoader};
pub use pipeline::{ConfirmResult, IngestionPipeline, ParseResult, PipelineComponents, ReviewResult};
pub use repository::{MemoryRepositories, NoopProgress, OcrLanguageProvider, ProgressReporter, StateSnapshot};
pub use store::{ContentStore, StoredFile};

/// Re-export inference types.
pub use scanledger_inference::{InferenceError, JsonGenerator, LlmClient, LlmSettings, LlmSettingsProvider};
