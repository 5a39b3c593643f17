//! Date extraction.

use chrono::NaiveDate;

use super::patterns::DATE_DMY;
use super::{ExtractionMatch, FieldExtractor};

/// Date field extractor for `D/M/Y`. Invalid calendar dates are skipped.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for caps in DATE_DMY.captures_iter(text) {
            let day: u32 = caps[1].parse().unwrap_or(0);
            let month: u32 = caps[2].parse().unwrap_or(0);
            let year = parse_year(&caps[3]);

            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                let Some(full) = caps.get(0) else { continue };
                results.push(ExtractionMatch::new(date, 0.9, full.as_str()).with_position(full.start(), full.end()));
            }
        }

        results
    }
}

/// Two-digit years are 2000-based.
fn parse_year(s: &str) -> i32 {
    let year: i32 = s.parse().unwrap_or(0);
    if s.len() == 2 { 2000 + year } else { year }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dates(text: &str) -> Vec<NaiveDate> {
        DateExtractor::new().extract_all(text).into_iter().map(|m| m.value).collect()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_extract_dmy() {
        assert_eq!(dates("Emissão 10/05/2024"), vec![ymd(2024, 5, 10)]);
        assert_eq!(dates("1/2/2023 and 28/02/2023"), vec![ymd(2023, 2, 1), ymd(2023, 2, 28)]);
    }

    #[test]
    fn test_two_digit_year() {
        assert_eq!(dates("15/01/24"), vec![ymd(2024, 1, 15)]);
        assert_eq!(dates("15/01/99"), vec![ymd(2099, 1, 15)]);
    }

    #[test]
    fn test_invalid_dates_skipped() {
        assert!(dates("31/02/2024").is_empty());
        assert!(dates("10/13/2024").is_empty());
        assert_eq!(dates("32/01/2024 01/01/2024"), vec![ymd(2024, 1, 1)]);
    }
}
