//! Prompts for invoice interpretation.

use crate::models::HeuristicBaseline;

/// Raw text beyond this many characters is cut before prompting.
pub const MAX_PROMPT_TEXT_CHARS: usize = 8000;

pub const SYSTEM_PROMPT: &str = "You read OCR text of invoices and receipts and answer with a single JSON object, nothing else.
Use exactly these keys:
  vendorName   (string, the issuing business)
  invoiceDate  (string, DD/MM/YYYY or YYYY-MM-DD)
  totalAmount  (number, the amount actually paid)
  currency     (string, ISO 4217 code such as BRL, EUR, USD)
  lineItems    (array of {description: string, amount: number, quantity: number or null})
  confidence   (number between 0 and 1)
  notes        (string or null)
Numbers must be plain decimals with a dot separator. Do not add comments.";

/// User prompt with the regex hints and the document text.
pub fn user_prompt(raw_text: &str, baseline: &HeuristicBaseline) -> String {
    let mut prompt = String::from("Hints found by pattern matching (may be wrong):\n");

    if let Some(vendor) = &baseline.vendor_name {
        prompt.push_str(&format!("- vendor: {}\n", vendor));
    }
    if let Some(date) = baseline.invoice_date {
        prompt.push_str(&format!("- date: {}\n", date.format("%d/%m/%Y")));
    }
    if let Some(total) = baseline.total_amount {
        prompt.push_str(&format!("- largest amount: {}\n", total));
    }
    prompt.push_str(&format!("- currency: {}\n\n", baseline.currency));

    prompt.push_str("Document text:\n");
    prompt.extend(raw_text.chars().take(MAX_PROMPT_TEXT_CHARS));
    prompt
}
