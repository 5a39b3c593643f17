//! Locating a JSON value inside free-form model output.

/// Recover the JSON value embedded in `text`.
///
/// Tries, in order: the content of the first fenced code block, a balanced
/// value starting at the first `{` or `[`, and a tolerant scan for the first
/// complete object or array. When nothing JSON-shaped is found the trimmed
/// input is returned unchanged so the caller's parser reports a clear error.
pub fn extract_json(text: &str) -> String {
    let trimmed = text.trim();
    find_json(trimmed).unwrap_or_else(|| trimmed.to_string())
}

fn find_json(text: &str) -> Option<String> {
    if let Some(inner) = fenced_block(text) {
        if let Some(found) = find_json(strip_language_tag(inner)) {
            return Some(found);
        }
    }

    let start = text.find(['{', '['])?;
    let candidate = &text[start..];

    if let Some(end) = balanced_end(candidate) {
        let balanced = &candidate[..end];
        if parses(balanced) {
            return Some(balanced.to_string());
        }
        // Balanced but not strictly valid (trailing commas, comments): prefer
        // a tolerant rendering of the same value when one exists.
        return Some(tolerant_scan(candidate).unwrap_or_else(|| balanced.to_string()));
    }

    tolerant_scan(candidate)
}

/// Inner text of the first ``` fence. An unterminated fence runs to the end.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after = &text[open + 3..];
    match after.find("```") {
        Some(close) => Some(&after[..close]),
        None => Some(after),
    }
}

/// Drop a leading language tag such as `json` from fenced content.
fn strip_language_tag(inner: &str) -> &str {
    let first_line_end = inner.find('\n').unwrap_or(inner.len());
    let tag = inner[..first_line_end].trim();
    if !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        inner[first_line_end..].trim()
    } else {
        inner.trim()
    }
}

/// Byte length of the balanced JSON value that opens at `text[0]`.
///
/// Tracks bracket nesting and string/escape state so that delimiters inside
/// string literals are ignored. Returns `None` when the value never closes or
/// a closer does not match its opener.
pub fn balanced_end(text: &str) -> Option<usize> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(c) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(idx + c.len_utf8());
                }
            }
            _ => {
                if stack.is_empty() {
                    return None;
                }
            }
        }
    }

    None
}

/// Return the first complete object/array in `text`, starting from each
/// `{`/`[` in turn, tolerating comments and trailing commas. The returned
/// text has comments and trailing commas removed.
fn tolerant_scan(text: &str) -> Option<String> {
    text.char_indices()
        .filter(|(_, c)| *c == '{' || *c == '[')
        .filter_map(|(idx, _)| scan_value(&text[idx..]))
        .find(|cleaned| parses(cleaned))
}

fn scan_value(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut stack: Vec<char> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                let end = string_end(&chars, i)?;
                out.extend(&chars[i..end]);
                i = end;
                continue;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                    i += 1;
                }
                i += 2;
                continue;
            }
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(c) {
                    return None;
                }
                trim_trailing_comma(&mut out);
                out.push(c);
                if stack.is_empty() {
                    return Some(out);
                }
                i += 1;
                continue;
            }
            _ => {}
        }
        out.push(c);
        i += 1;
    }

    None
}

/// Index one past the closing quote of the string literal opening at `start`.
fn string_end(chars: &[char], start: usize) -> Option<usize> {
    let mut escaped = false;
    for (offset, c) in chars[start + 1..].iter().enumerate() {
        if escaped {
            escaped = false;
        } else if *c == '\\' {
            escaped = true;
        } else if *c == '"' {
            return Some(start + offset + 2);
        }
    }
    None
}

fn trim_trailing_comma(out: &mut String) {
    let trimmed_len = out.trim_end().len();
    if out[..trimmed_len].ends_with(',') {
        out.truncate(trimmed_len - 1);
    }
}

fn parses(candidate: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(&super::repair::repair_json(candidate)).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_object_untouched() {
        assert_eq!(extract_json(r#"  {"a": 1}  "#), r#"{"a": 1}"#);
    }

    #[test]
    fn test_fenced_block_with_language_tag() {
        let text = "Here you go:\n```json\n{\"vendor\": \"Acme\"}\n```\nAnything else?";
        assert_eq!(extract_json(text), r#"{"vendor": "Acme"}"#);
    }

    #[test]
    fn test_fenced_block_without_tag() {
        let text = "```\n[1, 2, 3]\n```";
        assert_eq!(extract_json(text), "[1, 2, 3]");
    }

    #[test]
    fn test_unterminated_fence() {
        let text = "```json\n{\"a\": {\"b\": 2}}";
        assert_eq!(extract_json(text), r#"{"a": {"b": 2}}"#);
    }

    #[test]
    fn test_prose_wrapped_object() {
        let text = r#"Sure! The result is {"total": 12.5, "items": [{"x": "}"}]} hope that helps"#;
        assert_eq!(
            extract_json(text),
            r#"{"total": 12.5, "items": [{"x": "}"}]}"#
        );
    }

    #[test]
    fn test_array_before_object_wins() {
        let text = r#"values: [1, {"a": 2}] and {"b": 3}"#;
        assert_eq!(extract_json(text), r#"[1, {"a": 2}]"#);
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let text = r#"{"note": "use { and [ freely", "ok": true} trailing"#;
        assert_eq!(extract_json(text), r#"{"note": "use { and [ freely", "ok": true}"#);
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let text = r#"{"name": "The \"Best\" Shop"}"#;
        assert_eq!(extract_json(text), text);
    }

    #[test]
    fn test_trailing_commas_and_comments_cleaned() {
        let text = "{\n  \"a\": 1, // first\n  \"b\": [1, 2,],\n}";
        let recovered = extract_json(text);
        let value: serde_json::Value = serde_json::from_str(&recovered).unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(value["b"][1], 2);
    }

    #[test]
    fn test_unbalanced_prefix_falls_back_to_scan() {
        let text = r#"Note [unfinished thought. Result: {"ok": true}"#;
        assert_eq!(extract_json(text), r#"{"ok": true}"#);
    }

    #[test]
    fn test_no_json_returns_trimmed_text() {
        assert_eq!(extract_json("  I could not read the invoice.  "), "I could not read the invoice.");
    }

    #[test]
    fn test_balanced_end_reports_length() {
        assert_eq!(balanced_end(r#"{"a": [1, 2]} tail"#), Some(13));
        assert_eq!(balanced_end(r#"{"a": [1, 2}"#), None);
        assert_eq!(balanced_end(r#"{"a": 1"#), None);
    }
}
