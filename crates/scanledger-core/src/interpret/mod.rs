//! Invoice interpretation.
//!
//! Runs the regex baseline and the language model over the same text. The
//! model answer is parsed into a loose [`serde_json::Value`] first and then
//! projected field by field into [`InvoiceData`], so one bad field yields a
//! precise validation message instead of a generic deserialization error.

mod prompt;

pub use prompt::{MAX_PROMPT_TEXT_CHARS, SYSTEM_PROMPT, user_prompt};

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use scanledger_inference::JsonGenerator;
use scanledger_inference::json::remove_field;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{IngestError, Result};
use crate::heuristics::heuristic_baseline;
use crate::models::{ConfidenceScore, InvoiceData, InvoiceInterpretation, InvoiceLineItem};

/// Confidence used when the model does not report one.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Accepted `invoiceDate` layouts, tried in order.
const DATE_FORMATS: [&str; 4] = ["%d/%m/%Y", "%Y-%m-%d", "%d.%m.%Y", "%d-%m-%Y"];

/// Turns raw document text into validated invoice fields.
pub struct InvoiceInterpreter {
    llm: Arc<dyn JsonGenerator>,
    default_currency: String,
}

impl InvoiceInterpreter {
    pub fn new(llm: Arc<dyn JsonGenerator>, default_currency: impl Into<String>) -> Self {
        Self {
            llm,
            default_currency: default_currency.into(),
        }
    }

    pub async fn interpret(&self, raw_text: &str, cancel: &CancellationToken) -> Result<InvoiceInterpretation> {
        let baseline = heuristic_baseline(raw_text, &self.default_currency);
        debug!("Heuristic baseline: {:?}", baseline);

        if !self.llm.is_enabled() {
            return Err(IngestError::LlmRequired);
        }

        let json = self
            .llm
            .generate_json(SYSTEM_PROMPT, &user_prompt(raw_text, &baseline), cancel)
            .await?;

        let (json, data) = match project(&json) {
            Ok(data) => (json, data),
            Err(reason) => {
                warn!("Model answer rejected ({}), retrying without line items", reason);
                let stripped = remove_field(&json, "lineItems").ok_or_else(|| {
                    IngestError::Validation(format!("invalid invoice interpretation: {}", reason))
                })?;
                let data = project(&stripped).map_err(|retry_reason| {
                    IngestError::Validation(format!("invalid invoice interpretation: {}", retry_reason))
                })?;
                (stripped, data)
            }
        };

        info!(
            "Interpreted invoice from {} on {}: {} {}",
            data.vendor_name, data.invoice_date, data.total_amount, data.currency
        );

        Ok(InvoiceInterpretation { json, data, baseline })
    }
}

/// Project recovered JSON text onto [`InvoiceData`].
fn project(json: &str) -> std::result::Result<InvoiceData, String> {
    let value: Value = serde_json::from_str(json).map_err(|e| format!("not valid JSON: {}", e))?;
    let object = value.as_object().ok_or("expected a JSON object")?;

    let vendor_name = object
        .get("vendorName")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or("vendorName is missing or empty")?
        .to_string();

    let invoice_date = object
        .get("invoiceDate")
        .and_then(Value::as_str)
        .and_then(parse_date)
        .ok_or("invoiceDate is missing or unparseable")?;

    let total_amount = object
        .get("totalAmount")
        .and_then(decimal_of)
        .filter(|amount| *amount > Decimal::ZERO)
        .ok_or("totalAmount must be a positive number")?;

    let currency = object
        .get("currency")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or("currency is missing or empty")?
        .to_uppercase();

    let confidence = match object.get("confidence") {
        None | Some(Value::Null) => ConfidenceScore::saturating(DEFAULT_CONFIDENCE),
        Some(value) => value
            .as_f64()
            .and_then(|c| ConfidenceScore::new(c).ok())
            .ok_or("confidence must be a number between 0 and 1")?,
    };

    let line_items = match object.get("lineItems") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().enumerate().filter_map(|(i, item)| line_item(i, item)).collect(),
        Some(_) => return Err("lineItems must be an array".to_string()),
    };

    let notes = object
        .get("notes")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    Ok(InvoiceData {
        vendor_name,
        invoice_date,
        total_amount,
        currency,
        line_items,
        confidence,
        notes,
    })
}

/// Lenient line item projection. Unusable items are dropped.
fn line_item(index: usize, item: &Value) -> Option<InvoiceLineItem> {
    let description = item
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty());
    let amount = item
        .get("amount")
        .and_then(decimal_of)
        .filter(|a| *a > Decimal::ZERO);

    match (description, amount) {
        (Some(description), Some(amount)) => Some(InvoiceLineItem {
            description: description.to_string(),
            amount,
            quantity: item.get("quantity").and_then(decimal_of),
        }),
        _ => {
            warn!("Dropping line item {}: needs a description and a positive amount", index);
            None
        }
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Decimal from a JSON number or a numeric string.
fn decimal_of(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use scanledger_inference::{InferenceError, recover_json};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned model replies through the real JSON recovery.
    pub(crate) struct CannedGenerator {
        enabled: bool,
        replies: Mutex<VecDeque<String>>,
        pub(crate) prompts: Mutex<Vec<String>>,
    }

    impl CannedGenerator {
        pub(crate) fn new(replies: &[&str]) -> Self {
            Self {
                enabled: true,
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn disabled() -> Self {
            Self {
                enabled: false,
                ..Self::new(&[])
            }
        }
    }

    #[async_trait]
    impl JsonGenerator for CannedGenerator {
        fn is_enabled(&self) -> bool {
            self.enabled
        }

        async fn generate_json(
            &self,
            _system: &str,
            user: &str,
            _cancel: &CancellationToken,
        ) -> scanledger_inference::Result<String> {
            self.prompts.lock().unwrap().push(user.to_string());
            let reply = self.replies.lock().unwrap().pop_front();
            match reply {
                Some(reply) => Ok(recover_json(&reply)),
                None => Err(InferenceError::Failed("no canned reply left".to_string())),
            }
        }
    }

    fn interpreter(generator: CannedGenerator) -> InvoiceInterpreter {
        InvoiceInterpreter::new(Arc::new(generator), "BRL")
    }

    const RECEIPT: &str = "Posto Shell Centro\n10/05/2024\nGasolina 141,90\nTotal R$ 141,90";

    #[tokio::test]
    async fn test_fenced_division_is_repaired_and_validated() {
        let reply = "Here you go:\n```json\n{\"vendorName\": \"Posto Shell\", \"invoiceDate\": \"10/05/2024\", \
                     \"totalAmount\": 141.9 / 70.95, \"currency\": \"brl\", \"confidence\": 0.8}\n```";
        let result = interpreter(CannedGenerator::new(&[reply]))
            .interpret(RECEIPT, &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.json.contains("2.0000"));
        assert_eq!(result.data.total_amount, Decimal::new(2, 0));
        assert_eq!(result.data.currency, "BRL");
        assert_eq!(result.data.invoice_date, NaiveDate::from_ymd_opt(2024, 5, 10).unwrap());
        assert_eq!(result.data.confidence.value(), 0.8);
        assert_eq!(result.baseline.vendor_name.as_deref(), Some("Posto Shell Centro"));
        assert_eq!(result.baseline.total_amount, Some(Decimal::new(14190, 2)));
    }

    #[tokio::test]
    async fn test_confidence_defaults_and_bad_items_dropped() {
        let reply = r#"{"vendorName": "Mercado", "invoiceDate": "2024-05-10", "totalAmount": "30.50",
            "currency": "BRL", "lineItems": [
                {"description": "Arroz", "amount": 20.5, "quantity": 1},
                {"description": "", "amount": 3},
                {"description": "Feijão", "amount": -1},
                {"description": "Sal", "amount": "10"}
            ]}"#;
        let data = interpreter(CannedGenerator::new(&[reply]))
            .interpret(RECEIPT, &CancellationToken::new())
            .await
            .unwrap()
            .data;

        assert_eq!(data.confidence.value(), DEFAULT_CONFIDENCE);
        assert_eq!(data.total_amount, Decimal::new(3050, 2));
        let names: Vec<_> = data.line_items.iter().map(|i| i.description.as_str()).collect();
        assert_eq!(names, vec!["Arroz", "Sal"]);
        assert_eq!(data.line_items[0].quantity, Some(Decimal::ONE));
    }

    #[tokio::test]
    async fn test_retries_without_line_items() {
        let reply = r#"{"vendorName": "Loja", "invoiceDate": "10.05.2024", "totalAmount": 12,
            "currency": "EUR", "lineItems": "see attachment"}"#;
        let result = interpreter(CannedGenerator::new(&[reply]))
            .interpret(RECEIPT, &CancellationToken::new())
            .await
            .unwrap();

        assert!(!result.json.contains("lineItems"));
        assert!(result.data.line_items.is_empty());
        assert_eq!(result.data.invoice_date, NaiveDate::from_ymd_opt(2024, 5, 10).unwrap());
    }

    #[tokio::test]
    async fn test_invalid_answer_is_validation_error() {
        let reply = r#"{"vendorName": "", "invoiceDate": "someday", "totalAmount": 0, "currency": "BRL"}"#;
        let err = interpreter(CannedGenerator::new(&[reply]))
            .interpret(RECEIPT, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_out_of_range_confidence_rejected() {
        let reply = r#"{"vendorName": "Loja", "invoiceDate": "10-05-2024", "totalAmount": 5,
            "currency": "BRL", "confidence": 1.5}"#;
        let err = interpreter(CannedGenerator::new(&[reply]))
            .interpret(RECEIPT, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_disabled_llm_requires_llm() {
        let err = interpreter(CannedGenerator::disabled())
            .interpret(RECEIPT, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LlmRequired);
    }

    #[tokio::test]
    async fn test_backend_failure_is_llm_failed() {
        let err = interpreter(CannedGenerator::new(&[]))
            .interpret(RECEIPT, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LlmFailed);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 10);
        for text in ["10/05/2024", "2024-05-10", "10.05.2024", "10-05-2024", " 10/05/2024 "] {
            assert_eq!(parse_date(text), expected, "{}", text);
        }
        assert_eq!(parse_date("May 10"), None);
    }
}
