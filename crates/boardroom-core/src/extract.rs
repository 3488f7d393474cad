//! Structured output recovery from free-form provider text.
//!
//! Providers are asked for JSON but answer with whatever they like: a bare
//! object, an object wrapped in prose, a fenced markdown block, or stray
//! control bytes in the middle of it all. [`extract`] recovers the object
//! when one is there and reports [`ExtractionError`] when it is not.
//!
//! ## Strategy
//!
//! Tried in order, first success wins:
//!
//! 1. Strip control characters (U+0000..U+001F, U+007F..U+009F).
//! 2. Parse the cleaned text directly.
//! 3. For each `{` in order, isolate its string-aware balanced `{...}` span
//!    and parse that. The first candidate is the span opened by the first
//!    `{`, so any object spanning first brace to last brace is found here.
//!
//! Only JSON objects count as structured values. No syntax repair is
//! attempted beyond bracket isolation.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

lazy_static! {
    static ref CONTROL_CHARS: Regex =
        Regex::new(r"[\x{0000}-\x{001F}\x{007F}-\x{009F}]").unwrap();
}

/// Why no structured value could be recovered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no parseable JSON object found in provider text")]
    Unparseable,
}

/// Recover a JSON object from raw provider text.
pub fn extract(raw: &str) -> Result<Value, ExtractionError> {
    let cleaned = strip_control_chars(raw);
    let text = cleaned.trim();

    if let Some(value) = parse_object(text) {
        return Ok(value);
    }

    if let Some(value) = balanced_spans(text).find_map(parse_object) {
        tracing::debug!("recovered object from balanced span");
        return Ok(value);
    }

    Err(ExtractionError::Unparseable)
}

/// Remove C0 and C1 control characters.
pub fn strip_control_chars(text: &str) -> String {
    CONTROL_CHARS.replace_all(text, "").into_owned()
}

fn parse_object(candidate: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Every balanced `{...}` span, one per opening brace, in order of position.
fn balanced_spans(text: &str) -> impl Iterator<Item = &str> {
    text.char_indices()
        .filter(|&(_, c)| c == '{')
        .filter_map(move |(start, _)| close_of(text, start).map(|end| &text[start..=end]))
}

/// Byte index of the `}` closing the `{` at `start`, ignoring braces in strings.
fn close_of(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_clean_json_parses_directly() {
        let value = extract(r#"{"a": 1}"#).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_fenced_block_inside_prose() {
        let raw = "Here is the result:\n```json\n{\"score\": 7, \"ok\": true}\n```\nThanks!";
        assert_eq!(extract(raw).unwrap(), json!({"score": 7, "ok": true}));
    }

    #[test]
    fn test_plain_prose_is_unparseable() {
        assert_eq!(extract("not json at all"), Err(ExtractionError::Unparseable));
    }

    #[test]
    fn test_blank_text_is_unparseable() {
        assert_eq!(extract("  \n\t "), Err(ExtractionError::Unparseable));
        assert_eq!(extract(""), Err(ExtractionError::Unparseable));
    }

    #[test]
    fn test_control_chars_are_stripped() {
        let raw = "{\"name\u{0007}\": \"Acme\u{0085}\"}";
        assert_eq!(extract(raw).unwrap(), json!({"name": "Acme"}));
    }

    #[test]
    fn test_braces_inside_strings_do_not_close_span() {
        let raw = r#"Sure! {"pattern": "a } b", "nested": {"x": "{"}} trailing"#;
        assert_eq!(
            extract(raw).unwrap(),
            json!({"pattern": "a } b", "nested": {"x": "{"}})
        );
    }

    #[test]
    fn test_skips_unparseable_leading_braces() {
        let raw = r#"Template {name} was filled: {"name": "Acme"}"#;
        assert_eq!(extract(raw).unwrap(), json!({"name": "Acme"}));
    }

    #[test]
    fn test_unclosed_brace_falls_through_to_inner_span() {
        let raw = r#"{ draft follows {"a": {"b": 1}} end"#;
        assert_eq!(extract(raw).unwrap(), json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_stray_closing_brace_after_object() {
        let raw = r#"{"a": {"b": 1} }} junk"#;
        assert_eq!(extract(raw).unwrap(), json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_top_level_array_is_not_structured() {
        assert_eq!(extract("[1, 2, 3]"), Err(ExtractionError::Unparseable));
    }

    #[test]
    fn test_broken_syntax_is_not_repaired() {
        assert_eq!(
            extract(r#"{"a": 1, "b": }"#),
            Err(ExtractionError::Unparseable)
        );
    }

    fn json_object() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-zA-Z0-9 {}\\[\\]\":,]{0,12}".prop_map(Value::from),
        ];
        let inner = leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        });
        prop::collection::btree_map("[a-z]{1,6}", inner, 0..5)
            .prop_map(|m| Value::Object(m.into_iter().collect()))
    }

    proptest! {
        #[test]
        fn prop_extraction_is_deterministic(raw in ".{0,200}") {
            prop_assert_eq!(extract(&raw), extract(&raw));
        }

        #[test]
        fn prop_prose_wrapping_is_transparent(
            value in json_object(),
            before in "[a-zA-Z0-9 .,:!\n`]{0,40}",
            after in "[a-zA-Z0-9 .,:!\n`]{0,40}",
        ) {
            let clean = serde_json::to_string(&value).unwrap();
            let wrapped = format!("{before}{clean}{after}");
            prop_assert_eq!(extract(&clean), Ok(value.clone()));
            prop_assert_eq!(extract(&wrapped), extract(&clean));
        }
    }
}
