//! Structured reading of an invoice.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::values::ConfidenceScore;

/// One line of an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLineItem {
    pub description: String,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
}

/// Validated fields accepted from the language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceData {
    pub vendor_name: String,
    pub invoice_date: NaiveDate,
    pub total_amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub line_items: Vec<InvoiceLineItem>,
    pub confidence: ConfidenceScore,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Regex-only reading of the same text, computed alongside the model pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeuristicBaseline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Decimal>,
    pub currency: String,
}

/// Result of interpreting one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceInterpretation {
    /// JSON text that passed validation.
    pub json: String,
    pub data: InvoiceData,
    pub baseline: HeuristicBaseline,
}
