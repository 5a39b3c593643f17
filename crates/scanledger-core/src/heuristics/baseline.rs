//! Regex-only reading of vendor, date, total and currency.

use super::patterns::{CODE_BRL, CODE_EUR, CODE_GBP, CODE_PLN, CODE_USD, LETTER};
use super::{AmountExtractor, DateExtractor, FieldExtractor};
use crate::models::HeuristicBaseline;

/// Compute the baseline for `raw_text`.
pub fn heuristic_baseline(raw_text: &str, default_currency: &str) -> HeuristicBaseline {
    let amounts = AmountExtractor::new();
    let dates = DateExtractor::new();

    HeuristicBaseline {
        vendor_name: vendor_line(raw_text, &amounts, &dates),
        invoice_date: dates.extract(raw_text).map(|m| m.value),
        total_amount: amounts.extract_all(raw_text).into_iter().map(|m| m.value).max(),
        currency: detect_currency(raw_text).unwrap_or(default_currency).to_string(),
    }
}

/// First line with at least three letters that holds no date or amount.
fn vendor_line(raw_text: &str, amounts: &AmountExtractor, dates: &DateExtractor) -> Option<String> {
    raw_text
        .lines()
        .map(str::trim)
        .filter(|line| LETTER.find_iter(line).count() >= 3)
        .find(|line| amounts.extract(line).is_none() && dates.extract(line).is_none())
        .map(str::to_string)
}

/// Currency from symbols or ISO codes. `R$` is checked before `$`.
pub fn detect_currency(text: &str) -> Option<&'static str> {
    if text.contains("R$") || CODE_BRL.is_match(text) {
        Some("BRL")
    } else if text.contains('€') || CODE_EUR.is_match(text) {
        Some("EUR")
    } else if text.contains('£') || CODE_GBP.is_match(text) {
        Some("GBP")
    } else if CODE_PLN.is_match(text) {
        Some("PLN")
    } else if text.contains('$') || CODE_USD.is_match(text) {
        Some("USD")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_baseline_from_receipt() {
        let text = "12/04/2024\nSupermercado Bom Preço\nArroz 22,90\nFeijão 8,49\nTOTAL R$ 31,39";
        let baseline = heuristic_baseline(text, "EUR");
        assert_eq!(baseline.vendor_name.as_deref(), Some("Supermercado Bom Preço"));
        assert_eq!(baseline.invoice_date, NaiveDate::from_ymd_opt(2024, 4, 12));
        assert_eq!(baseline.total_amount, Some(Decimal::from_str("31.39").unwrap()));
        assert_eq!(baseline.currency, "BRL");
    }

    #[test]
    fn test_currency_detection() {
        assert_eq!(detect_currency("Total: R$ 10,00"), Some("BRL"));
        assert_eq!(detect_currency("Total: $10.00"), Some("USD"));
        assert_eq!(detect_currency("Summe 10,00 €"), Some("EUR"));
        assert_eq!(detect_currency("Total GBP 3.20"), Some("GBP"));
        assert_eq!(detect_currency("Razem 12,30 zł"), Some("PLN"));
        assert_eq!(detect_currency("EURO-PALLETS 3"), None);
        assert_eq!(detect_currency("nothing"), None);
    }

    #[test]
    fn test_empty_text_uses_default_currency() {
        let baseline = heuristic_baseline("", "BRL");
        assert_eq!(baseline, HeuristicBaseline {
            currency: "BRL".to_string(),
            ..Default::default()
        });
    }
}
