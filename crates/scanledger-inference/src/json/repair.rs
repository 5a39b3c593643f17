//! Mechanical fixes for number syntax that models emit but JSON rejects.

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use rust_decimal::Decimal;

lazy_static! {
    /// `141.9 / 70.95`
    static ref DIVISION: Regex =
        Regex::new(r"(-?\d+(?:\.\d+)?)\s*/\s*(-?\d+(?:\.\d+)?)").unwrap();

    /// `007`, `00.5`; the prefix group keeps digits of a longer number intact.
    static ref LEADING_ZEROS: Regex = Regex::new(r"(^|[^\d.])0+(\d+)").unwrap();
}

/// Upper bound on division passes for chained expressions like `a / b / c`.
const MAX_DIVISION_PASSES: usize = 8;

/// Apply number repairs to every region of `json` outside string literals.
pub fn repair_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for segment in segments(json) {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Code(text) => out.push_str(&repair_code(text)),
        }
    }
    out
}

fn repair_code(code: &str) -> String {
    let mut current = code.to_string();

    for _ in 0..MAX_DIVISION_PASSES {
        if !DIVISION.is_match(&current) {
            break;
        }
        let next = DIVISION
            .replace_all(&current, |caps: &Captures| divide(&caps[1], &caps[2]).unwrap_or_else(|| caps[0].to_string()))
            .into_owned();
        if next == current {
            break;
        }
        current = next;
    }

    LEADING_ZEROS.replace_all(&current, "${1}${2}").into_owned()
}

fn divide(numerator: &str, denominator: &str) -> Option<String> {
    let n = Decimal::from_str(numerator).ok()?;
    let d = Decimal::from_str(denominator).ok()?;
    let quotient = n.checked_div(d)?;
    Some(format!("{:.4}", quotient.round_dp(4)))
}

enum Segment<'a> {
    Code(&'a str),
    Literal(&'a str),
}

/// Split into alternating code and string-literal spans. An unterminated
/// literal runs to the end of the input.
fn segments(json: &str) -> Vec<Segment<'_>> {
    let mut result = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in json.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                result.push(Segment::Literal(&json[start..=idx]));
                start = idx + 1;
                in_string = false;
            }
        } else if c == '"' {
            if start < idx {
                result.push(Segment::Code(&json[start..idx]));
            }
            start = idx;
            in_string = true;
        }
    }

    if start < json.len() {
        let rest = &json[start..];
        result.push(if in_string {
            Segment::Literal(rest)
        } else {
            Segment::Code(rest)
        });
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_division_becomes_quotient() {
        assert_eq!(repair_json(r#"{"totalAmount": 141.9 / 70.95}"#), r#"{"totalAmount": 2.0000}"#);
        assert_eq!(repair_json(r#"{"x": 10/3}"#), r#"{"x": 3.3333}"#);
    }

    #[test]
    fn test_division_by_zero_untouched() {
        assert_eq!(repair_json(r#"{"x": 5 / 0}"#), r#"{"x": 5 / 0}"#);
    }

    #[test]
    fn test_chained_division() {
        assert_eq!(repair_json("[100 / 2 / 5]"), "[10.0000]");
    }

    #[test]
    fn test_leading_zeros_stripped() {
        assert_eq!(repair_json(r#"{"qty": 007, "rate": 00.5}"#), r#"{"qty": 7, "rate": 0.5}"#);
    }

    #[test]
    fn test_ordinary_numbers_untouched() {
        let json = r#"{"a": 0, "b": 0.05, "c": 100, "d": -1.50, "e": 10.01}"#;
        assert_eq!(repair_json(json), json);
    }

    #[test]
    fn test_string_literals_untouched() {
        let json = r#"{"invoiceDate": "10/05/2024", "ref": "007", "note": "say \"1/2\""}"#;
        assert_eq!(repair_json(json), json);
    }
}
