//! Monetary amount extraction.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::AMOUNT;
use super::{ExtractionMatch, FieldExtractor};

/// Amount field extractor.
///
/// Recognizes `1.234,56`, `1,234.56`, `1234,56` and `1234.56`. A match glued to other
/// digits or separators (`10.05.2024`, `1234.567`) is part of something
/// else and is dropped.
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for caps in AMOUNT.captures_iter(text) {
            let Some(full) = caps.get(0) else { continue };
            if is_embedded(text, full.start(), full.end()) {
                continue;
            }

            let normalized = if let Some(m) = caps.name("grouped") {
                m.as_str().replace('.', "").replace(',', ".")
            } else if let Some(m) = caps.name("us") {
                m.as_str().replace(',', "")
            } else if let Some(m) = caps.name("comma") {
                m.as_str().replace(',', ".")
            } else {
                full.as_str().to_string()
            };

            if let Ok(amount) = Decimal::from_str(&normalized) {
                results.push(ExtractionMatch::new(amount, 0.8, full.as_str()).with_position(full.start(), full.end()));
            }
        }

        results
    }
}

/// Whether `text[start..end]` continues a longer numeric token.
fn is_embedded(text: &str, start: usize, end: usize) -> bool {
    let mut before = text[..start].chars().rev();
    let prev = before.next();
    let prev2 = before.next();

    let mut after = text[end..].chars();
    let next = after.next();
    let next2 = after.next();

    let is_sep = |c: Option<char>| matches!(c, Some('.') | Some(','));
    let is_digit = |c: Option<char>| c.is_some_and(|c| c.is_ascii_digit());

    is_digit(prev) || (is_sep(prev) && is_digit(prev2)) || is_digit(next) || (is_sep(next) && is_digit(next2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn amounts(text: &str) -> Vec<Decimal> {
        AmountExtractor::new().extract_all(text).into_iter().map(|m| m.value).collect()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_formats() {
        assert_eq!(amounts("R$ 1.234,56"), vec![dec("1234.56")]);
        assert_eq!(amounts("Total: 45,90"), vec![dec("45.90")]);
        assert_eq!(amounts("Total: 45.90"), vec![dec("45.90")]);
        assert_eq!(amounts("1.234.567,89"), vec![dec("1234567.89")]);
    }

    #[test]
    fn test_comma_grouped_dot_decimal() {
        assert_eq!(amounts("Total $1,234.56"), vec![dec("1234.56")]);
        assert_eq!(amounts("Amount due: 12,345,678.90 USD"), vec![dec("12345678.90")]);
        assert_eq!(amounts("Subtotal 999.00\nTotal 1,049.00"), vec![dec("999.00"), dec("1049.00")]);
    }

    #[test]
    fn test_multiple_in_order() {
        assert_eq!(amounts("Pão 3,50\nCafé 7,25\nTotal 10,75"), vec![dec("3.50"), dec("7.25"), dec("10.75")]);
    }

    #[test]
    fn test_dates_and_long_numbers_ignored() {
        assert!(amounts("Emitido em 10.05.2024").is_empty());
        assert!(amounts("CNPJ 12.345.678/0001-90").is_empty());
        assert!(amounts("ref 1234.567").is_empty());
        assert!(amounts("10/05/2024").is_empty());
    }

    #[test]
    fn test_trailing_punctuation_allowed() {
        assert_eq!(amounts("Paid 12,50."), vec![dec("12.50")]);
        assert_eq!(amounts("(9.99)"), vec![dec("9.99")]);
    }

    #[test]
    fn test_position_recorded() {
        let m = AmountExtractor::new().extract("Total 5,00").unwrap();
        assert_eq!(m.position, Some((6, 10)));
        assert_eq!(m.source, "5,00");
    }
}
