//! Relaxed field coercion for extracted stage output.
//!
//! Every stage schema is built through [`FieldReader`], which is the only
//! place where provider output is bent into shape:
//!
//! - a field declared as text accepts strings, numbers and booleans as-is,
//!   and a nested object or array as its compact JSON text
//! - a list of text accepts an array (each element coerced as above) or a
//!   single scalar, which becomes a one-element list
//! - an absent optional field takes its documented default (empty text,
//!   empty list, empty object)
//!
//! Required fields are strict: absent, null or blank text is a
//! [`ValidationError`], which sends the stage to its static fallback.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// A stage output failed schema validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("expected a JSON object at '{0}'")]
    NotAnObject(String),

    #[error("missing required field '{0}'")]
    MissingField(String),
}

/// Coerce a scalar or nested value to text. Null has no text form.
pub fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// Read-only view over one JSON object with relaxed typed accessors.
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    object: Option<&'a Map<String, Value>>,
    path: String,
}

impl<'a> FieldReader<'a> {
    /// Root reader. The value must be an object.
    pub fn new(value: &'a Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(object) => Ok(Self {
                object: Some(object),
                path: "$".to_string(),
            }),
            _ => Err(ValidationError::NotAnObject("$".to_string())),
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.object.and_then(|o| o.get(key)).filter(|v| !v.is_null())
    }

    fn field_path(&self, key: &str) -> String {
        format!("{}.{}", self.path, key)
    }

    /// Text that must be present and non-blank.
    pub fn required_text(&self, key: &str) -> Result<String, ValidationError> {
        self.get(key)
            .and_then(coerce_text)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ValidationError::MissingField(self.field_path(key)))
    }

    /// Optional text, empty when absent.
    pub fn text(&self, key: &str) -> String {
        self.text_or(key, "")
    }

    pub fn text_or(&self, key: &str, default: &str) -> String {
        self.get(key)
            .and_then(coerce_text)
            .unwrap_or_else(|| default.to_string())
    }

    /// Optional list of text, empty when absent.
    pub fn text_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Array(items)) => items.iter().filter_map(coerce_text).collect(),
            Some(other) => coerce_text(other).into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// Optional number. Numeric strings such as `"50000"` are accepted.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().replace(',', "").parse().ok(),
            _ => None,
        }
    }

    pub fn number_or(&self, key: &str, default: f64) -> f64 {
        self.number(key).unwrap_or(default)
    }

    /// Nested object. Absent or non-object values read as an empty object.
    pub fn object(&self, key: &str) -> FieldReader<'a> {
        let object = match self.get(key) {
            Some(Value::Object(o)) => Some(o),
            _ => None,
        };
        FieldReader {
            object,
            path: self.field_path(key),
        }
    }

    /// Nested object that must be present.
    pub fn required_object(&self, key: &str) -> Result<FieldReader<'a>, ValidationError> {
        match self.get(key) {
            Some(Value::Object(o)) => Ok(FieldReader {
                object: Some(o),
                path: self.field_path(key),
            }),
            Some(_) => Err(ValidationError::NotAnObject(self.field_path(key))),
            None => Err(ValidationError::MissingField(self.field_path(key))),
        }
    }

    /// Array of objects. Non-object elements are skipped.
    pub fn objects(&self, key: &str) -> Vec<FieldReader<'a>> {
        match self.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| match item {
                    Value::Object(o) => Some(FieldReader {
                        object: Some(o),
                        path: format!("{}[{}]", self.field_path(key), index),
                    }),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Object of text values, in key order.
    pub fn text_map(&self, key: &str) -> BTreeMap<String, String> {
        match self.get(key) {
            Some(Value::Object(o)) => o
                .iter()
                .filter_map(|(k, v)| coerce_text(v).map(|t| (k.clone(), t)))
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    /// True when the field holds a value of any kind.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_root_must_be_object() {
        assert!(FieldReader::new(&json!([1, 2])).is_err());
        assert!(FieldReader::new(&json!({})).is_ok());
    }

    #[test]
    fn test_required_text_rejects_missing_null_and_blank() {
        let value = json!({"a": null, "b": "   ", "c": "ok"});
        let reader = FieldReader::new(&value).unwrap();
        assert_eq!(
            reader.required_text("a"),
            Err(ValidationError::MissingField("$.a".to_string()))
        );
        assert!(reader.required_text("b").is_err());
        assert!(reader.required_text("missing").is_err());
        assert_eq!(reader.required_text("c").unwrap(), "ok");
    }

    #[test]
    fn test_object_answer_for_text_field_becomes_json_text() {
        let value = json!({"database": {"primary": "PostgreSQL", "cache": "Redis"}});
        let reader = FieldReader::new(&value).unwrap();
        assert_eq!(
            reader.required_text("database").unwrap(),
            r#"{"cache":"Redis","primary":"PostgreSQL"}"#
        );
    }

    #[test]
    fn test_scalars_coerce_to_text() {
        let value = json!({"n": 42, "b": true});
        let reader = FieldReader::new(&value).unwrap();
        assert_eq!(reader.text("n"), "42");
        assert_eq!(reader.text("b"), "true");
        assert_eq!(reader.text("absent"), "");
        assert_eq!(reader.text_or("absent", "medium"), "medium");
    }

    #[test]
    fn test_text_list_accepts_single_value() {
        let value = json!({"many": ["a", 2, null], "one": "solo"});
        let reader = FieldReader::new(&value).unwrap();
        assert_eq!(reader.text_list("many"), vec!["a", "2"]);
        assert_eq!(reader.text_list("one"), vec!["solo"]);
        assert!(reader.text_list("absent").is_empty());
    }

    #[test]
    fn test_numbers_from_strings() {
        let value = json!({"a": 10, "b": "50,000", "c": "lots"});
        let reader = FieldReader::new(&value).unwrap();
        assert_eq!(reader.number("a"), Some(10.0));
        assert_eq!(reader.number("b"), Some(50_000.0));
        assert_eq!(reader.number("c"), None);
        assert_eq!(reader.number_or("c", 1.5), 1.5);
    }

    #[test]
    fn test_nested_readers() {
        let value = json!({
            "target": {"primary": "SMBs"},
            "list": [{"name": "A"}, "skip", {"name": "B"}],
            "map": {"x": 1, "y": "two"}
        });
        let reader = FieldReader::new(&value).unwrap();
        assert_eq!(reader.object("target").text("primary"), "SMBs");
        assert_eq!(reader.object("absent").text("primary"), "");
        assert_eq!(
            reader.object("target").required_text("secondary"),
            Err(ValidationError::MissingField("$.target.secondary".to_string()))
        );
        assert!(reader.required_object("absent").is_err());
        let names: Vec<_> = reader.objects("list").iter().map(|r| r.text("name")).collect();
        assert_eq!(names, vec!["A", "B"]);
        let map = reader.text_map("map");
        assert_eq!(map.get("x").map(String::as_str), Some("1"));
        assert_eq!(map.get("y").map(String::as_str), Some("two"));
    }
}
