//! Keyword overlap between category names and document text.

use std::collections::HashSet;

use crate::models::{Category, normalize_keyword};

/// Shortest token that counts toward overlap.
pub const MIN_TOKEN_LEN: usize = 3;

/// Highest confidence a keyword match can reach.
pub const MAX_KEYWORD_CONFIDENCE: f64 = 0.75;

/// Normalized alphanumeric tokens of at least [`MIN_TOKEN_LEN`] characters.
pub fn tokens(text: &str) -> HashSet<String> {
    normalize_keyword(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}

/// `min(0.75, 0.4 + 0.15 * overlap)`.
pub fn overlap_confidence(overlap: usize) -> f64 {
    (0.4 + 0.15 * overlap as f64).min(MAX_KEYWORD_CONFIDENCE)
}

/// The category sharing the most tokens with `text_tokens`, with the count.
/// Earlier categories win ties. `None` when nothing overlaps.
pub fn best_overlap<'a>(categories: &'a [Category], text_tokens: &HashSet<String>) -> Option<(&'a Category, usize)> {
    let mut best: Option<(&Category, usize)> = None;
    for category in categories {
        let overlap = tokens(&category.name).intersection(text_tokens).count();
        if overlap > 0 && best.is_none_or(|(_, b)| overlap > b) {
            best = Some((category, overlap));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tokens() {
        let got = tokens("Café & Restaurante, 2x AB");
        let mut got: Vec<_> = got.into_iter().collect();
        got.sort();
        assert_eq!(got, vec!["cafe", "restaurante"]);
    }

    #[test]
    fn test_overlap_confidence() {
        assert_eq!(overlap_confidence(1), 0.55);
        assert_eq!(overlap_confidence(2), 0.7);
        assert_eq!(overlap_confidence(5), MAX_KEYWORD_CONFIDENCE);
    }

    #[test]
    fn test_best_overlap() {
        let categories = vec![Category::new("Food"), Category::new("Fuel and Transport"), Category::new("Transport")];
        let text = tokens("Shell fuel station, transport services");
        let (category, overlap) = best_overlap(&categories, &text).unwrap();
        assert_eq!(category.name, "Fuel and Transport");
        assert_eq!(overlap, 2);

        assert!(best_overlap(&categories, &tokens("nothing relevant")).is_none());
    }
}
