//! Categories and confirmed expenses.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{IngestError, Result};

/// Maximum length of an expense description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 200;

/// A spending category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A confirmed expense record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    pub document_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(
        date: NaiveDate,
        amount: Decimal,
        description: impl Into<String>,
        category_id: Option<Uuid>,
        document_id: Uuid,
    ) -> Result<Self> {
        let description = description.into().trim().to_string();
        if amount <= Decimal::ZERO {
            return Err(IngestError::Validation(format!("expense amount must be positive, got {}", amount)));
        }
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(IngestError::Validation(format!(
                "expense description exceeds {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            date,
            amount,
            description,
            category_id,
            document_id,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn test_expense_validation() {
        let doc = Uuid::new_v4();
        assert!(Expense::new(date(), Decimal::new(100, 2), "Coffee", None, doc).is_ok());
        assert!(Expense::new(date(), Decimal::ZERO, "Free", None, doc).is_err());
        assert!(Expense::new(date(), Decimal::new(-5, 0), "Refund", None, doc).is_err());

        let long = "x".repeat(MAX_DESCRIPTION_LEN + 1);
        assert!(Expense::new(date(), Decimal::ONE, long, None, doc).is_err());

        let exact = "é".repeat(MAX_DESCRIPTION_LEN);
        assert!(Expense::new(date(), Decimal::ONE, exact, None, doc).is_ok());
    }
}
