//! Document ingestion: import, parse, interpret, suggest, review, confirm.
//!
//! A document moves `uploaded -> parsed -> confirmed`. A failed parse leaves
//! it `failed` with a reason, and parsing may be retried. Confirmation is
//! final: confirming again succeeds without creating anything.

mod results;

pub use results::{ConfirmResult, ParseResult, ReviewResult};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use scanledger_inference::JsonGenerator;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::category::{CategoryCatalogCache, CategorySuggestion, CategorySuggestionEngine};
use crate::error::{ErrorKind, IngestError, Result};
use crate::extraction::{DocumentTextExtractor, ExtractedText};
use crate::heuristics::build_drafts;
use crate::interpret::InvoiceInterpreter;
use crate::models::{
    DocumentStatus, Expense, ExpenseDraftItem, ImportedDocument, InvoiceInterpretation, InvoiceLineItem,
    ReviewItem, ScanledgerConfig, VendorCategoryRule,
};
use crate::repository::{CategoryRepository, DocumentRepository, ExpenseRepository, VendorRuleRepository};
use crate::store::ContentStore;

/// Confidence of rules learned from a user override.
pub const OVERRIDE_RULE_CONFIDENCE: f64 = 0.9;

/// Everything the pipeline talks to.
pub struct PipelineComponents {
    pub store: ContentStore,
    pub documents: Arc<dyn DocumentRepository>,
    pub rules: Arc<dyn VendorRuleRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub expenses: Arc<dyn ExpenseRepository>,
    pub extractor: Arc<dyn DocumentTextExtractor>,
    pub llm: Arc<dyn JsonGenerator>,
}

/// Entry point for the ingestion workflow.
pub struct IngestionPipeline {
    store: ContentStore,
    documents: Arc<dyn DocumentRepository>,
    expenses: Arc<dyn ExpenseRepository>,
    extractor: Arc<dyn DocumentTextExtractor>,
    interpreter: InvoiceInterpreter,
    suggestions: CategorySuggestionEngine,
}

impl IngestionPipeline {
    pub fn new(components: PipelineComponents, config: &ScanledgerConfig) -> Self {
        let catalog = Arc::new(CategoryCatalogCache::new(
            components.categories,
            Duration::from_secs(config.category.cache_ttl_secs),
        ));

        Self {
            store: components.store,
            documents: components.documents,
            expenses: components.expenses,
            extractor: components.extractor,
            interpreter: InvoiceInterpreter::new(
                Arc::clone(&components.llm),
                config.extraction.default_currency.clone(),
            ),
            suggestions: CategorySuggestionEngine::new(components.rules, catalog, components.llm),
        }
    }

    /// Store a file and register it as a new document.
    ///
    /// Content already imported is rejected with `Conflict`. The existing
    /// document's artifact is kept; a copy stored under another extension
    /// is removed.
    pub async fn import(&self, source: &Path, original_name: &str) -> Result<Uuid> {
        let original_name = match original_name.trim() {
            "" => source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            name => name.to_string(),
        };

        let stored = self.store.save(source, &original_name).await?;

        if let Some(existing) = self.documents.find_by_hash(&stored.hash).await? {
            if existing.stored_file_name != stored.stored_name {
                self.store.remove(&stored.stored_name).await?;
            }
            return Err(IngestError::Conflict(format!(
                "{} was already imported as document {}",
                original_name, existing.id
            )));
        }

        let document = ImportedDocument::new(
            original_name,
            stored.stored_name,
            stored.extension,
            stored.size,
            stored.hash,
        );
        let id = document.id;
        self.documents.insert(document).await?;

        info!("Imported document {}", id);
        Ok(id)
    }

    /// Extract text and heuristic drafts from a document.
    pub async fn parse(&self, document_id: Uuid, cancel: &CancellationToken) -> Result<ParseResult> {
        let mut document = self.load(document_id).await?;
        if document.is_confirmed() {
            return Err(IngestError::Conflict(format!("document {} is already confirmed", document_id)));
        }

        let extracted = match self.extract(&document, cancel).await {
            Ok(extracted) => extracted,
            Err(e) if e.kind() == ErrorKind::Cancelled => return Err(e),
            Err(e) => {
                warn!("Parsing document {} failed: {}", document_id, e);
                document.mark_failed(e.to_string())?;
                self.documents.update(&document).await?;
                return Err(e);
            }
        };

        document.mark_parsed(extracted.is_ocr_used)?;
        self.documents.update(&document).await?;

        let drafts = build_drafts(&extracted.raw_text);
        info!(
            "Parsed document {} ({} pages, ocr: {}, {} drafts)",
            document_id,
            extracted.page_texts.len(),
            extracted.is_ocr_used,
            drafts.len()
        );

        Ok(ParseResult {
            document_id,
            raw_text: extracted.raw_text,
            page_texts: extracted.page_texts,
            drafts,
        })
    }

    /// Interpret the text of an existing document. Changes no state.
    pub async fn interpret(
        &self,
        document_id: Uuid,
        raw_text: &str,
        cancel: &CancellationToken,
    ) -> Result<InvoiceInterpretation> {
        self.load(document_id).await?;
        self.interpreter.interpret(raw_text, cancel).await
    }

    pub async fn suggest_category(
        &self,
        vendor_name: &str,
        raw_text: &str,
        line_items: &[InvoiceLineItem],
        cancel: &CancellationToken,
    ) -> Result<CategorySuggestion> {
        self.suggestions.suggest(vendor_name, raw_text, line_items, cancel).await
    }

    pub async fn add_vendor_rule(&self, keyword: &str, category_id: Uuid, confidence: f64) -> Result<VendorCategoryRule> {
        self.suggestions.learn(keyword, category_id, confidence).await
    }

    /// Attach one category suggestion to a document's drafts.
    ///
    /// Drafts without a category take the suggested one. Every item records
    /// the suggestion so [`confirm`](Self::confirm) can spot overrides. A
    /// model that is disabled or failing leaves the drafts as they are.
    pub async fn review(
        &self,
        document_id: Uuid,
        vendor_name: &str,
        raw_text: &str,
        drafts: Vec<ExpenseDraftItem>,
        cancel: &CancellationToken,
    ) -> Result<ReviewResult> {
        self.load(document_id).await?;

        let suggestion = match self.suggestions.suggest(vendor_name, raw_text, &[], cancel).await {
            Ok(suggestion) => Some(suggestion),
            Err(e) if matches!(e.kind(), ErrorKind::LlmRequired | ErrorKind::LlmFailed) => {
                warn!("No category suggestion for document {}: {}", document_id, e);
                None
            }
            Err(e) => return Err(e),
        };

        let suggested_id = suggestion.as_ref().and_then(|s| s.category_id);
        let suggested_name = suggestion.as_ref().and_then(|s| s.category_name.clone());

        let items = drafts
            .into_iter()
            .map(|mut draft| {
                if draft.category_id.is_none() && suggested_id.is_some() {
                    draft.category_id = suggested_id;
                    draft.category_name = suggested_name.clone();
                }
                ReviewItem {
                    draft,
                    suggested_category_id: suggested_id,
                }
            })
            .collect();

        Ok(ReviewResult {
            document_id,
            suggestion,
            items,
        })
    }

    /// Turn reviewed items into expenses, exactly once per document.
    ///
    /// All items are validated before anything is written. The expenses are
    /// stored as one batch and taken back out if the document cannot be
    /// marked confirmed, so a failed confirm can be retried without
    /// duplicates. Items whose category differs from the suggestion then
    /// teach a rule keyed by the vendor name; a rule that cannot be stored
    /// is logged and skipped since the expenses are already committed.
    pub async fn confirm(&self, document_id: Uuid, vendor_name: &str, items: &[ReviewItem]) -> Result<ConfirmResult> {
        let mut document = self.load(document_id).await?;

        if document.is_confirmed() {
            debug!("Document {} already confirmed", document_id);
            return Ok(ConfirmResult::empty(document_id));
        }
        if document.status != DocumentStatus::Parsed {
            return Err(IngestError::Conflict(format!(
                "document {} is {} and must be parsed before confirmation",
                document_id, document.status
            )));
        }

        let vendor_name = vendor_name.trim();
        let expenses = items
            .iter()
            .map(|item| {
                let draft = &item.draft;
                let description = draft.description.clone().unwrap_or_else(|| vendor_name.to_string());
                Expense::new(draft.date, draft.amount, description, draft.category_id, document_id)
            })
            .collect::<Result<Vec<_>>>()?;
        let created_expense_ids: Vec<Uuid> = expenses.iter().map(|e| e.id).collect();

        self.expenses.insert_all(expenses).await?;

        document.mark_confirmed()?;
        if let Err(e) = self.documents.update(&document).await {
            warn!("Confirming document {} failed, removing its expenses: {}", document_id, e);
            if let Err(rollback) = self.expenses.delete(&created_expense_ids).await {
                warn!("Could not remove expenses of document {}: {}", document_id, rollback);
            }
            return Err(e);
        }

        let mut learned_rules: Vec<VendorCategoryRule> = Vec::new();
        if !vendor_name.is_empty() {
            for item in items.iter().filter(|item| item.is_override()) {
                let Some(category_id) = item.draft.category_id else { continue };
                match self
                    .suggestions
                    .learn(vendor_name, category_id, OVERRIDE_RULE_CONFIDENCE)
                    .await
                {
                    Ok(rule) => {
                        learned_rules.retain(|r| r.id != rule.id);
                        learned_rules.push(rule);
                    }
                    Err(e) => warn!("Could not learn rule for '{}': {}", vendor_name, e),
                }
            }
        }

        info!(
            "Confirmed document {}: {} expenses, {} rules learned",
            document_id,
            created_expense_ids.len(),
            learned_rules.len()
        );

        Ok(ConfirmResult {
            document_id,
            created_expense_ids,
            learned_rules,
        })
    }

    /// Drop cached categories after the category list changed.
    pub fn invalidate_categories(&self) {
        self.suggestions.catalog().invalidate();
    }

    async fn load(&self, document_id: Uuid) -> Result<ImportedDocument> {
        self.documents
            .get(document_id)
            .await?
            .ok_or_else(|| IngestError::NotFound(format!("document {}", document_id)))
    }

    async fn extract(&self, document: &ImportedDocument, cancel: &CancellationToken) -> Result<ExtractedText> {
        let content = self.store.open_read(&document.stored_file_name).await?;
        self.extractor
            .extract(&document.stored_file_name, &document.file_extension, Box::new(content), cancel)
            .await
    }
}
