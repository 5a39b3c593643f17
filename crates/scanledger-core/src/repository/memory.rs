//! In-memory repositories with JSON snapshot support.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{CategoryRepository, DocumentRepository, ExpenseRepository, VendorRuleRepository};
use crate::error::{IngestError, Result};
use crate::models::{Category, DocumentHash, Expense, ImportedDocument, VendorCategoryRule};

/// Serializable form of all repositories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateSnapshot {
    pub documents: Vec<ImportedDocument>,
    pub rules: Vec<VendorCategoryRule>,
    pub categories: Vec<Category>,
    pub expenses: Vec<Expense>,
}

impl StateSnapshot {
    /// Load a snapshot. A missing file is an empty state.
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| IngestError::Storage(format!("corrupt state file {}: {}", path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(IngestError::Storage(e.to_string())),
        }
    }

    /// Write the snapshot through a temp file and rename.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| IngestError::Storage(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!("Saved state to {}", path.display());
        Ok(())
    }
}

/// All four repositories over `tokio::sync::RwLock`ed maps.
#[derive(Debug, Default)]
pub struct MemoryRepositories {
    documents: RwLock<HashMap<Uuid, ImportedDocument>>,
    rules: RwLock<HashMap<String, VendorCategoryRule>>,
    categories: RwLock<HashMap<Uuid, Category>>,
    expenses: RwLock<HashMap<Uuid, Expense>>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StateSnapshot) -> Self {
        Self {
            documents: RwLock::new(snapshot.documents.into_iter().map(|d| (d.id, d)).collect()),
            rules: RwLock::new(
                snapshot
                    .rules
                    .into_iter()
                    .map(|r| (r.normalized_keyword.clone(), r))
                    .collect(),
            ),
            categories: RwLock::new(snapshot.categories.into_iter().map(|c| (c.id, c)).collect()),
            expenses: RwLock::new(snapshot.expenses.into_iter().map(|e| (e.id, e)).collect()),
        }
    }

    pub async fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            documents: DocumentRepository::list(self).await.unwrap_or_default(),
            rules: VendorRuleRepository::list(self).await.unwrap_or_default(),
            categories: CategoryRepository::list(self).await.unwrap_or_default(),
            expenses: ExpenseRepository::list(self).await.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl DocumentRepository for MemoryRepositories {
    async fn get(&self, id: Uuid) -> Result<Option<ImportedDocument>> {
        Ok(self.documents.read().await.get(&id).cloned())
    }

    async fn find_by_hash(&self, hash: &DocumentHash) -> Result<Option<ImportedDocument>> {
        Ok(self.documents.read().await.values().find(|d| &d.hash == hash).cloned())
    }

    async fn insert(&self, document: ImportedDocument) -> Result<()> {
        let mut documents = self.documents.write().await;
        if let Some(existing) = documents.values().find(|d| d.hash == document.hash) {
            return Err(IngestError::Conflict(format!(
                "document with hash {} already imported as {}",
                document.hash, existing.id
            )));
        }
        documents.insert(document.id, document);
        Ok(())
    }

    async fn update(&self, document: &ImportedDocument) -> Result<()> {
        let mut documents = self.documents.write().await;
        match documents.get_mut(&document.id) {
            Some(slot) => {
                *slot = document.clone();
                Ok(())
            }
            None => Err(IngestError::NotFound(format!("document {}", document.id))),
        }
    }

    async fn list(&self) -> Result<Vec<ImportedDocument>> {
        let mut documents: Vec<_> = self.documents.read().await.values().cloned().collect();
        documents.sort_by_key(|d| d.created_at);
        Ok(documents)
    }
}

#[async_trait]
impl VendorRuleRepository for MemoryRepositories {
    async fn find_by_keyword(&self, normalized_keyword: &str) -> Result<Option<VendorCategoryRule>> {
        Ok(self.rules.read().await.get(normalized_keyword).cloned())
    }

    async fn upsert(&self, rule: &VendorCategoryRule) -> Result<()> {
        self.rules
            .write()
            .await
            .insert(rule.normalized_keyword.clone(), rule.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<VendorCategoryRule>> {
        let mut rules: Vec<_> = self.rules.read().await.values().cloned().collect();
        rules.sort_by(|a, b| a.normalized_keyword.cmp(&b.normalized_keyword));
        Ok(rules)
    }
}

#[async_trait]
impl CategoryRepository for MemoryRepositories {
    async fn list(&self) -> Result<Vec<Category>> {
        let mut categories: Vec<_> = self.categories.read().await.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.categories.read().await.get(&id).cloned())
    }

    async fn insert(&self, category: Category) -> Result<()> {
        let mut categories = self.categories.write().await;
        if categories.values().any(|c| c.name.eq_ignore_ascii_case(&category.name)) {
            return Err(IngestError::Conflict(format!("category '{}' already exists", category.name)));
        }
        categories.insert(category.id, category);
        Ok(())
    }
}

#[async_trait]
impl ExpenseRepository for MemoryRepositories {
    async fn insert_all(&self, expenses: Vec<Expense>) -> Result<()> {
        let mut stored = self.expenses.write().await;
        if let Some(existing) = expenses.iter().find(|e| stored.contains_key(&e.id)) {
            return Err(IngestError::Conflict(format!("expense {} already exists", existing.id)));
        }
        stored.extend(expenses.into_iter().map(|e| (e.id, e)));
        Ok(())
    }

    async fn delete(&self, ids: &[Uuid]) -> Result<()> {
        let mut stored = self.expenses.write().await;
        for id in ids {
            stored.remove(id);
        }
        Ok(())
    }

    async fn list_for_document(&self, document_id: Uuid) -> Result<Vec<Expense>> {
        let mut expenses: Vec<_> = self
            .expenses
            .read()
            .await
            .values()
            .filter(|e| e.document_id == document_id)
            .cloned()
            .collect();
        expenses.sort_by_key(|e| e.created_at);
        Ok(expenses)
    }

    async fn list(&self) -> Result<Vec<Expense>> {
        let mut expenses: Vec<_> = self.expenses.read().await.values().cloned().collect();
        expenses.sort_by_key(|e| e.created_at);
        Ok(expenses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::ConfidenceScore;
    use pretty_assertions::assert_eq;

    fn document(hash_byte: &str) -> ImportedDocument {
        let hash = DocumentHash::parse(&hash_byte.repeat(64)).unwrap();
        ImportedDocument::new("a.pdf", format!("{}.pdf", hash), "pdf", 3, hash)
    }

    #[tokio::test]
    async fn test_duplicate_hash_conflicts() {
        let repo = MemoryRepositories::new();
        DocumentRepository::insert(&repo, document("a")).await.unwrap();
        let err = DocumentRepository::insert(&repo, document("a")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        DocumentRepository::insert(&repo, document("b")).await.unwrap();
        assert_eq!(DocumentRepository::list(&repo).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let repo = MemoryRepositories::new();
        let err = repo.update(&document("c")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("state.json");

        let repo = MemoryRepositories::new();
        let doc = document("d");
        let doc_id = doc.id;
        DocumentRepository::insert(&repo, doc).await.unwrap();
        let groceries = Category::new("Groceries");
        CategoryRepository::insert(&repo, groceries.clone()).await.unwrap();
        let rule = VendorCategoryRule::new("Lidl", groceries.id, ConfidenceScore::saturating(0.9)).unwrap();
        repo.upsert(&rule).await.unwrap();

        repo.snapshot().await.save(&path).await.unwrap();
        let restored = MemoryRepositories::from_snapshot(StateSnapshot::load(&path).await.unwrap());

        assert!(DocumentRepository::get(&restored, doc_id).await.unwrap().is_some());
        assert_eq!(restored.find_by_keyword("lidl").await.unwrap(), Some(rule));
        assert_eq!(CategoryRepository::get(&restored, groceries.id).await.unwrap(), Some(groceries));
    }

    fn expense(document_id: Uuid) -> Expense {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        Expense::new(date, rust_decimal::Decimal::TEN, "Taxi".to_string(), None, document_id).unwrap()
    }

    #[tokio::test]
    async fn test_insert_all_is_all_or_nothing() {
        let repo = MemoryRepositories::new();
        let document_id = Uuid::new_v4();
        let first = expense(document_id);
        repo.insert_all(vec![first.clone()]).await.unwrap();

        let err = repo.insert_all(vec![expense(document_id), first.clone()]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(repo.list_for_document(document_id).await.unwrap().len(), 1);

        repo.delete(&[first.id, Uuid::new_v4()]).await.unwrap();
        assert!(ExpenseRepository::list(&repo).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_state_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = StateSnapshot::load(&dir.path().join("nope.json")).await.unwrap();
        assert!(snapshot.documents.is_empty());
    }
}
