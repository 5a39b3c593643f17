//! Learned vendor to category rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;
use uuid::Uuid;

use super::values::ConfidenceScore;
use crate::error::{IngestError, Result};

/// Maps a vendor keyword to a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorCategoryRule {
    pub id: Uuid,
    pub keyword: String,
    /// Lookup key. See [`normalize_keyword`].
    pub normalized_keyword: String,
    pub category_id: Uuid,
    pub confidence: ConfidenceScore,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl VendorCategoryRule {
    pub fn new(keyword: &str, category_id: Uuid, confidence: ConfidenceScore) -> Result<Self> {
        let normalized_keyword = normalize_keyword(keyword);
        if normalized_keyword.is_empty() {
            return Err(IngestError::Validation("rule keyword must not be empty".to_string()));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            keyword: keyword.trim().to_string(),
            normalized_keyword,
            category_id,
            confidence,
            created_at: now,
            last_used_at: now,
        })
    }

    /// Overwrite target and confidence. Last write wins.
    pub fn reinforce(&mut self, category_id: Uuid, confidence: ConfidenceScore) {
        self.category_id = category_id;
        self.confidence = confidence;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_used_at = Utc::now();
    }

    /// Whether the rule's keyword occurs in already-normalized text.
    pub fn matches(&self, normalized_text: &str) -> bool {
        normalized_text.contains(&self.normalized_keyword)
    }
}

/// Strip diacritics, lowercase and collapse whitespace.
///
/// `"  Café   São-Paulo "` becomes `"cafe sao-paulo"`.
pub fn normalize_keyword(text: &str) -> String {
    let stripped: String = text.nfd().filter(|c| !is_combining_mark(*c)).collect();
    stripped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_keyword() {
        assert_eq!(normalize_keyword("  Café   São-Paulo "), "cafe sao-paulo");
        assert_eq!(normalize_keyword("ŻABKA\tPolska"), "zabka polska");
        assert_eq!(normalize_keyword("   "), "");
    }

    #[test]
    fn test_empty_keyword_rejected() {
        let err = VendorCategoryRule::new(" \u{301} ", Uuid::new_v4(), ConfidenceScore::saturating(0.9));
        assert!(err.is_err());
    }

    #[test]
    fn test_reinforce_overwrites() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let mut rule = VendorCategoryRule::new("Uber", first, ConfidenceScore::saturating(0.9)).unwrap();
        let used = Utc::now() - chrono::Duration::days(1);
        rule.last_used_at = used;

        rule.reinforce(second, ConfidenceScore::saturating(0.5));
        assert_eq!(rule.category_id, second);
        assert_eq!(rule.confidence.value(), 0.5);
        assert!(rule.last_used_at > used);
        assert!(rule.matches("uber trip 12 may"));
    }
}
