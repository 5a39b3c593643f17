//! Expense candidates produced before confirmation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::values::ConfidenceScore;

/// An expense candidate. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseDraftItem {
    pub date: NaiveDate,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    pub confidence: ConfidenceScore,
}

/// A draft together with the category the engine proposed for it.
///
/// Keeping the suggestion lets confirmation tell a user override apart from
/// an accepted suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub draft: ExpenseDraftItem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_category_id: Option<Uuid>,
}

impl ReviewItem {
    pub fn new(draft: ExpenseDraftItem) -> Self {
        let suggested_category_id = draft.category_id;
        Self {
            draft,
            suggested_category_id,
        }
    }

    /// True when a category was chosen and it is not the suggested one.
    pub fn is_override(&self) -> bool {
        match self.draft.category_id {
            Some(chosen) => self.suggested_category_id != Some(chosen),
            None => false,
        }
    }
}
