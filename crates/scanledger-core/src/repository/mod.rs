//! Collaborator interfaces the pipeline consumes.
//!
//! Persistence and host settings live outside this crate. The traits here
//! describe exactly what ingestion needs from them; [`memory`] provides
//! implementations for tests and the CLI.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Category, DocumentHash, Expense, ImportedDocument, VendorCategoryRule};

pub use memory::{MemoryRepositories, StateSnapshot};

/// Imported document storage.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<ImportedDocument>>;

    async fn find_by_hash(&self, hash: &DocumentHash) -> Result<Option<ImportedDocument>>;

    /// Insert a new document. Fails with `Conflict` when another document
    /// already has the same hash.
    async fn insert(&self, document: ImportedDocument) -> Result<()>;

    /// Replace an existing document. Fails with `NotFound` if absent.
    async fn update(&self, document: &ImportedDocument) -> Result<()>;

    async fn list(&self) -> Result<Vec<ImportedDocument>>;
}

/// Learned rule storage, keyed by normalized keyword.
#[async_trait]
pub trait VendorRuleRepository: Send + Sync {
    async fn find_by_keyword(&self, normalized_keyword: &str) -> Result<Option<VendorCategoryRule>>;

    /// Insert or replace the rule with the same normalized keyword.
    async fn upsert(&self, rule: &VendorCategoryRule) -> Result<()>;

    async fn list(&self) -> Result<Vec<VendorCategoryRule>>;
}

/// Read access to the category list.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Category>>;

    async fn get(&self, id: Uuid) -> Result<Option<Category>>;

    async fn insert(&self, category: Category) -> Result<()>;
}

/// Confirmed expense storage.
#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    /// Store every expense or none of them.
    async fn insert_all(&self, expenses: Vec<Expense>) -> Result<()>;

    /// Remove expenses by id. Unknown ids are ignored.
    async fn delete(&self, ids: &[Uuid]) -> Result<()>;

    async fn list_for_document(&self, document_id: Uuid) -> Result<Vec<Expense>>;

    async fn list(&self) -> Result<Vec<Expense>>;
}

/// The user's OCR language preference, e.g. `latin`.
pub trait OcrLanguageProvider: Send + Sync {
    fn ocr_language(&self) -> String;
}

impl OcrLanguageProvider for String {
    fn ocr_language(&self) -> String {
        self.clone()
    }
}

/// Progress sink for long transfers (model downloads).
pub trait ProgressReporter: Send + Sync {
    /// Begin a transfer of `total` bytes, if known.
    fn start(&self, label: &str, total: Option<u64>);

    fn advance(&self, bytes: u64);

    fn finish(&self, message: &str);
}

/// Reporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn start(&self, _label: &str, _total: Option<u64>) {}

    fn advance(&self, _bytes: u64) {}

    fn finish(&self, _message: &str) {}
}
