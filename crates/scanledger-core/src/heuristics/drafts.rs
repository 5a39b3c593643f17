//! Regex fallback that turns raw text into expense drafts.

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use tracing::debug;

use super::{AmountExtractor, DateExtractor, FieldExtractor};
use crate::models::expense::MAX_DESCRIPTION_LEN;
use crate::models::{ConfidenceScore, ExpenseDraftItem};

/// Confidence assigned to every heuristic draft.
pub const HEURISTIC_CONFIDENCE: f64 = 0.6;

/// Build drafts using today's local date as the fallback date.
pub fn build_drafts(raw_text: &str) -> Vec<ExpenseDraftItem> {
    build_drafts_on(raw_text, Local::now().date_naive())
}

/// Build one draft per positive amount.
///
/// The i-th positive amount takes the i-th date. Surplus amounts take the first date,
/// or `today` when the text has no date at all.
pub fn build_drafts_on(raw_text: &str, today: NaiveDate) -> Vec<ExpenseDraftItem> {
    let amounts = AmountExtractor::new().extract_all(raw_text);
    let dates: Vec<NaiveDate> = DateExtractor::new()
        .extract_all(raw_text)
        .into_iter()
        .map(|m| m.value)
        .collect();

    let drafts: Vec<ExpenseDraftItem> = amounts
        .into_iter()
        .filter(|m| m.value > Decimal::ZERO)
        .enumerate()
        .map(|(i, m)| {
            let date = dates.get(i).or_else(|| dates.first()).copied().unwrap_or(today);
            let description = m.position.and_then(|(start, _)| line_at(raw_text, start));
            ExpenseDraftItem {
                date,
                amount: m.value,
                description,
                category_id: None,
                category_name: None,
                confidence: ConfidenceScore::saturating(HEURISTIC_CONFIDENCE),
            }
        })
        .collect();

    debug!("Heuristics produced {} drafts from {} dates", drafts.len(), dates.len());
    drafts
}

/// Trimmed line containing byte offset `pos`, capped at the description
/// limit. `None` for blank lines.
fn line_at(text: &str, pos: usize) -> Option<String> {
    let start = text[..pos].rfind('\n').map_or(0, |i| i + 1);
    let end = text[pos..].find('\n').map_or(text.len(), |i| pos + i);
    let line = text[start..end].trim();
    if line.is_empty() {
        return None;
    }
    Some(line.chars().take(MAX_DESCRIPTION_LEN).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_single_total_with_date() {
        let drafts = build_drafts_on("Total 10/05/2024 ... R$ 1.234,56", ymd(2030, 1, 1));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].amount, Decimal::from_str("1234.56").unwrap());
        assert_eq!(drafts[0].date, ymd(2024, 5, 10));
        assert_eq!(drafts[0].confidence.value(), 0.6);
        assert_eq!(drafts[0].description.as_deref(), Some("Total 10/05/2024 ... R$ 1.234,56"));
    }

    #[test]
    fn test_pairs_amounts_with_dates_in_order() {
        let text = "01/03/2024 Uber 23,90\n02/03/2024 Uber 18,40\nTip 5,00";
        let drafts = build_drafts_on(text, ymd(2030, 1, 1));
        let got: Vec<_> = drafts.iter().map(|d| (d.date, d.description.clone().unwrap())).collect();
        assert_eq!(
            got,
            vec![
                (ymd(2024, 3, 1), "01/03/2024 Uber 23,90".to_string()),
                (ymd(2024, 3, 2), "02/03/2024 Uber 18,40".to_string()),
                (ymd(2024, 3, 1), "Tip 5,00".to_string()),
            ]
        );
    }

    #[test]
    fn test_no_date_uses_today() {
        let today = ymd(2025, 7, 4);
        let drafts = build_drafts_on("Coffee 4.50", today);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].date, today);
    }

    #[test]
    fn test_zero_amounts_skipped() {
        let drafts = build_drafts_on("Desconto 0,00\nTotal 9,90", ymd(2030, 1, 1));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].amount, Decimal::from_str("9.90").unwrap());
    }

    #[test]
    fn test_zero_amounts_do_not_take_dates() {
        let text = "Desconto 0,00\n01/03/2024 Uber 23,90\n02/03/2024 Uber 18,40";
        let drafts = build_drafts_on(text, ymd(2030, 1, 1));
        let dates: Vec<_> = drafts.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![ymd(2024, 3, 1), ymd(2024, 3, 2)]);
    }

    #[test]
    fn test_us_formatted_total() {
        let drafts = build_drafts_on("12/05/2024 Total $1,234.56", ymd(2030, 1, 1));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].amount, Decimal::from_str("1234.56").unwrap());
        assert_eq!(drafts[0].date, ymd(2024, 5, 12));
    }

    #[test]
    fn test_nothing_found() {
        assert!(build_drafts("no numbers here").is_empty());
        assert!(build_drafts("").is_empty());
    }

    #[test]
    fn test_long_line_truncated() {
        let text = format!("{} 12,00", "x".repeat(300));
        let drafts = build_drafts_on(&text, ymd(2030, 1, 1));
        assert_eq!(drafts[0].description.as_ref().unwrap().chars().count(), MAX_DESCRIPTION_LEN);
    }
}
