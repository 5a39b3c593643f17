//! JSON recovery for language-model output.
//!
//! Models wrap JSON in prose and code fences, leave trailing commas, and
//! occasionally write arithmetic where a number belongs. [`recover_json`]
//! turns such a response into text that `serde_json` accepts whenever the
//! response contains a JSON value at all.

mod recover;
mod repair;

pub use recover::{balanced_end, extract_json};
pub use repair::repair_json;

use lazy_static::lazy_static;
use regex::Regex;

/// Extract the JSON value from a model response and repair its numbers.
pub fn recover_json(text: &str) -> String {
    repair_json(&extract_json(text))
}

lazy_static! {
    static ref FIELD_KEY: Regex = Regex::new(r#""([A-Za-z_][A-Za-z0-9_]*)"\s*:\s*"#).unwrap();
}

/// Remove a top-level-or-nested object member by key, textually.
///
/// Used when one field is malformed enough to fail validation of the whole
/// object. The member's value must be an object, array, string or scalar;
/// one adjacent comma is removed with it. Returns `None` when the key is
/// absent or its value cannot be delimited.
pub fn remove_field(json: &str, key: &str) -> Option<String> {
    let caps = FIELD_KEY
        .captures_iter(json)
        .find(|caps| &caps[1] == key && !inside_string(json, caps.get(0).map_or(0, |m| m.start())))?;
    let whole = caps.get(0)?;
    let value_start = whole.end();
    let value_len = value_length(&json[value_start..])?;
    let value_end = value_start + value_len;

    let before = &json[..whole.start()];
    let after = &json[value_end..];

    let after_trimmed = after.trim_start();
    if let Some(rest) = after_trimmed.strip_prefix(',') {
        return Some(format!("{}{}", before, rest.trim_start()));
    }

    let before_trimmed = before.trim_end();
    if let Some(head) = before_trimmed.strip_suffix(',') {
        return Some(format!("{}{}", head, after));
    }

    Some(format!("{}{}", before, after))
}

fn value_length(text: &str) -> Option<usize> {
    match text.chars().next()? {
        '{' | '[' => balanced_end(text),
        '"' => {
            let mut escaped = false;
            for (idx, c) in text.char_indices().skip(1) {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    return Some(idx + 1);
                }
            }
            None
        }
        _ => text.find([',', '}', ']']).or(Some(text.len())),
    }
}

fn inside_string(json: &str, pos: usize) -> bool {
    let mut in_string = false;
    let mut escaped = false;
    for c in json[..pos].chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        }
    }
    in_string
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    #[test]
    fn test_recover_fenced_division() {
        let response = "Here is the invoice:\n```json\n{\n  \"vendorName\": \"Acme\",\n  \"totalAmount\": 141.9 / 70.95\n}\n```";
        let recovered = recover_json(response);
        assert!(recovered.contains("2.0000"));

        let value: Value = serde_json::from_str(&recovered).unwrap();
        assert_eq!(value["vendorName"], "Acme");
        assert_eq!(value["totalAmount"].as_f64(), Some(2.0));
    }

    #[test]
    fn test_remove_middle_field() {
        let json = r#"{"vendorName": "Acme", "lineItems": [{"a": 1}, {"b": [2]}], "totalAmount": 10}"#;
        let stripped = remove_field(json, "lineItems").unwrap();
        assert_eq!(stripped, r#"{"vendorName": "Acme", "totalAmount": 10}"#);
    }

    #[test]
    fn test_remove_last_field() {
        let json = r#"{"vendorName": "Acme", "lineItems": [1, 2]}"#;
        let stripped = remove_field(json, "lineItems").unwrap();
        assert_eq!(stripped, r#"{"vendorName": "Acme"}"#);
        assert!(serde_json::from_str::<Value>(&stripped).is_ok());
    }

    #[test]
    fn test_remove_field_ignores_key_inside_string() {
        let json = r#"{"note": "\"lineItems\": none", "lineItems": null}"#;
        let stripped = remove_field(json, "lineItems").unwrap();
        assert_eq!(stripped, r#"{"note": "\"lineItems\": none"}"#);
    }

    #[test]
    fn test_remove_missing_field() {
        assert_eq!(remove_field(r#"{"a": 1}"#, "lineItems"), None);
    }
}
