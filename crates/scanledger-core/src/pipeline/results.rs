use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::CategorySuggestion;
use crate::models::{ExpenseDraftItem, ReviewItem, VendorCategoryRule};

/// Output of a successful parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub document_id: Uuid,
    pub raw_text: String,
    pub page_texts: Vec<String>,
    pub drafts: Vec<ExpenseDraftItem>,
}

/// Drafts annotated with the document's category suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    pub document_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<CategorySuggestion>,
    pub items: Vec<ReviewItem>,
}

/// Output of a confirmation. Both lists are empty when the document had
/// already been confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmResult {
    pub document_id: Uuid,
    pub created_expense_ids: Vec<Uuid>,
    pub learned_rules: Vec<VendorCategoryRule>,
}

impl ConfirmResult {
    pub fn empty(document_id: Uuid) -> Self {
        Self {
            document_id,
            created_expense_ids: Vec::new(),
            learned_rules: Vec::new(),
        }
    }
}
