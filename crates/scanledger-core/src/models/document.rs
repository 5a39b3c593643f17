//! Imported document and its lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::values::DocumentHash;
use crate::error::{IngestError, Result};

/// Lifecycle of an imported document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Uploaded,
    Parsed,
    Confirmed,
    Failed,
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Uploaded => "uploaded",
            Self::Parsed => "parsed",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A file the user imported. Identified by id; deduplicated by content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedDocument {
    pub id: Uuid,
    pub original_file_name: String,
    pub stored_file_name: String,
    /// Lowercase, without the dot. Empty when the file had none.
    pub file_extension: String,
    pub size_bytes: u64,
    pub hash: DocumentHash,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    pub ocr_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl ImportedDocument {
    pub fn new(
        original_file_name: impl Into<String>,
        stored_file_name: impl Into<String>,
        file_extension: impl Into<String>,
        size_bytes: u64,
        hash: DocumentHash,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            original_file_name: original_file_name.into(),
            stored_file_name: stored_file_name.into(),
            file_extension: file_extension.into(),
            size_bytes,
            hash,
            status: DocumentStatus::Uploaded,
            created_at: Utc::now(),
            processed_at: None,
            ocr_used: false,
            failure_reason: None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == DocumentStatus::Confirmed
    }

    /// Record a successful extraction.
    pub fn mark_parsed(&mut self, ocr_used: bool) -> Result<()> {
        self.ensure_not_confirmed("parse")?;
        self.status = DocumentStatus::Parsed;
        self.ocr_used = ocr_used;
        self.failure_reason = None;
        self.processed_at = Some(Utc::now());
        Ok(())
    }

    /// Record a failed extraction. Confirmed documents are immutable.
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<()> {
        self.ensure_not_confirmed("fail")?;
        self.status = DocumentStatus::Failed;
        self.failure_reason = Some(reason.into());
        self.processed_at = Some(Utc::now());
        Ok(())
    }

    /// Move a parsed document to its terminal state. Confirming twice is a
    /// no-op.
    pub fn mark_confirmed(&mut self) -> Result<()> {
        match self.status {
            DocumentStatus::Confirmed => Ok(()),
            DocumentStatus::Parsed => {
                self.status = DocumentStatus::Confirmed;
                self.processed_at = Some(Utc::now());
                Ok(())
            }
            other => Err(IngestError::Conflict(format!(
                "document {} is {} and must be parsed before confirmation",
                self.id, other
            ))),
        }
    }

    fn ensure_not_confirmed(&self, action: &str) -> Result<()> {
        if self.is_confirmed() {
            return Err(IngestError::Conflict(format!(
                "cannot {} document {}: already confirmed",
                action, self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn doc() -> ImportedDocument {
        let hash = DocumentHash::parse(&"ab".repeat(32)).unwrap();
        ImportedDocument::new("Receipt.JPG", format!("{}.jpg", hash), "jpg", 10, hash)
    }

    #[test]
    fn test_lifecycle() {
        let mut doc = doc();
        assert_eq!(doc.status, DocumentStatus::Uploaded);

        doc.mark_failed("OCR language data missing").unwrap();
        assert_eq!(doc.status, DocumentStatus::Failed);
        assert!(doc.failure_reason.is_some());

        doc.mark_parsed(true).unwrap();
        assert_eq!(doc.status, DocumentStatus::Parsed);
        assert!(doc.ocr_used);
        assert_eq!(doc.failure_reason, None);

        doc.mark_confirmed().unwrap();
        doc.mark_confirmed().unwrap();
        assert!(doc.is_confirmed());
    }

    #[test]
    fn test_confirmed_is_terminal() {
        let mut doc = doc();
        doc.mark_parsed(false).unwrap();
        doc.mark_confirmed().unwrap();

        assert_eq!(doc.mark_parsed(true).unwrap_err().kind(), ErrorKind::Conflict);
        assert_eq!(doc.mark_failed("late").unwrap_err().kind(), ErrorKind::Conflict);
        assert_eq!(doc.status, DocumentStatus::Confirmed);
        assert_eq!(doc.failure_reason, None);
    }

    #[test]
    fn test_confirm_requires_parse() {
        let mut doc = doc();
        assert_eq!(doc.mark_confirmed().unwrap_err().kind(), ErrorKind::Conflict);
    }
}
