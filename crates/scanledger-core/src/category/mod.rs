//! Category assignment.
//!
//! Suggestions come from three sources, first hit wins:
//! 1. learned vendor rules whose keyword occurs in the vendor or text
//! 2. overlap between category name tokens and the document
//! 3. the language model, choosing from the cached category list

pub mod cache;
pub mod engine;
pub mod keywords;

pub use cache::{CategoryCatalog, CategoryCatalogCache, MIN_CACHE_TTL};
pub use engine::CategorySuggestionEngine;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ConfidenceScore;

/// A proposed category. `category_id` is `None` when no source could
/// name one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySuggestion {
    pub category_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    pub confidence: ConfidenceScore,
    pub rationale: String,
}

impl CategorySuggestion {
    pub fn none(rationale: impl Into<String>) -> Self {
        Self {
            category_id: None,
            category_name: None,
            confidence: ConfidenceScore::saturating(0.0),
            rationale: rationale.into(),
        }
    }
}
