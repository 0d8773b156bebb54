//! Turning one key of a JSON document into a plain string.
//!
//! The opened environment snapshot is a JSON object. Values handed to callers
//! are strings without surrounding quotes: strings verbatim, integers as
//! written, other numbers in the `%g` shortest form, booleans as
//! `true`/`false`, and arrays or objects as compact JSON text.

use crate::error::LookupError;
use serde_json::{Number, Value};

/// Looks up `key` in the JSON object `json` and returns its canonical string form.
///
/// A `null` value counts as a missing key, and a `null` document as an
/// object without keys.
///
/// # Example
///
/// ```
/// use escbox::extract::lookup_key;
///
/// assert_eq!(lookup_key(r#"{"x":"hello"}"#, "x").unwrap(), "hello");
/// assert_eq!(lookup_key(r#"{"x":[1,2,3]}"#, "x").unwrap(), "[1,2,3]");
/// ```
pub fn lookup_key(json: &str, key: &str) -> Result<String, LookupError> {
    let data: Value = serde_json::from_str(json).map_err(LookupError::Parse)?;
    if data.is_null() {
        return Err(LookupError::KeyNotFound);
    }
    let object = data.as_object().ok_or(LookupError::NotAnObject)?;

    match object.get(key) {
        None | Some(Value::Null) => Err(LookupError::KeyNotFound),
        Some(value) => to_canonical_string(value),
    }
}

/// Lists the keys of a JSON object document, sorted.
pub fn keys(json: &str) -> Result<Vec<String>, LookupError> {
    let data: Value = serde_json::from_str(json).map_err(LookupError::Parse)?;
    if data.is_null() {
        return Ok(Vec::new());
    }
    let object = data.as_object().ok_or(LookupError::NotAnObject)?;
    let mut keys: Vec<String> = object.keys().cloned().collect();
    keys.sort();
    Ok(keys)
}

/// Converts a JSON value to the string handed out to callers.
pub fn to_canonical_string(value: &Value) -> Result<String, LookupError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(format_number(n)),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(value).map_err(LookupError::Serialize)
        }
        Value::Null => Err(LookupError::KeyNotFound),
    }
}

fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) => format_float(f),
        None => n.to_string(),
    }
}

// `%g` with shortest precision: exponent form when the decimal exponent is
// below -4 or at least 6, written with a sign and at least two digits.
fn format_float(f: f64) -> String {
    let scientific = format!("{f:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if (-4..6).contains(&exponent) {
        return format!("{f}");
    }
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_is_unquoted() {
        assert_eq!(lookup_key(r#"{"x":"hello"}"#, "x").unwrap(), "hello");
        assert_eq!(lookup_key(r#"{"x":""}"#, "x").unwrap(), "");
        assert_eq!(
            lookup_key(r#"{"x":"with \"quotes\""}"#, "x").unwrap(),
            r#"with "quotes""#
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lookup_key(r#"{"x":42}"#, "x").unwrap(), "42");
        assert_eq!(lookup_key(r#"{"x":-7}"#, "x").unwrap(), "-7");
        assert_eq!(lookup_key(r#"{"x":42.0}"#, "x").unwrap(), "42");
        assert_eq!(lookup_key(r#"{"x":3.25}"#, "x").unwrap(), "3.25");
        assert_eq!(lookup_key(r#"{"x":0.1}"#, "x").unwrap(), "0.1");
        assert_eq!(lookup_key(r#"{"x":1000000}"#, "x").unwrap(), "1000000");
        assert_eq!(
            lookup_key(r#"{"x":18446744073709551615}"#, "x").unwrap(),
            "18446744073709551615"
        );
    }

    #[test]
    fn test_float_exponent_form() {
        assert_eq!(lookup_key(r#"{"x":1e21}"#, "x").unwrap(), "1e+21");
        assert_eq!(lookup_key(r#"{"x":1.5e-7}"#, "x").unwrap(), "1.5e-07");
        assert_eq!(lookup_key(r#"{"x":-2.5e-300}"#, "x").unwrap(), "-2.5e-300");
        assert_eq!(lookup_key(r#"{"x":1e100}"#, "x").unwrap(), "1e+100");
        assert_eq!(lookup_key(r#"{"x":1000000.0}"#, "x").unwrap(), "1e+06");
        assert_eq!(lookup_key(r#"{"x":1234567.5}"#, "x").unwrap(), "1.2345675e+06");
        assert_eq!(lookup_key(r#"{"x":0.00001}"#, "x").unwrap(), "1e-05");
    }

    #[test]
    fn test_float_plain_form() {
        assert_eq!(lookup_key(r#"{"x":123456.5}"#, "x").unwrap(), "123456.5");
        assert_eq!(lookup_key(r#"{"x":0.0001}"#, "x").unwrap(), "0.0001");
        assert_eq!(lookup_key(r#"{"x":0.0}"#, "x").unwrap(), "0");
        assert_eq!(lookup_key(r#"{"x":-0.0}"#, "x").unwrap(), "-0");
    }

    #[test]
    fn test_booleans() {
        assert_eq!(lookup_key(r#"{"x":true}"#, "x").unwrap(), "true");
        assert_eq!(lookup_key(r#"{"x":false}"#, "x").unwrap(), "false");
    }

    #[test]
    fn test_composites_are_compact_json() {
        assert_eq!(lookup_key(r#"{"x":[1,2,3]}"#, "x").unwrap(), "[1,2,3]");
        assert_eq!(
            lookup_key(r#"{"x": { "b": 1, "a": [true, "s"] }}"#, "x").unwrap(),
            r#"{"a":[true,"s"],"b":1}"#
        );
    }

    #[test]
    fn test_missing_and_null_keys() {
        assert!(matches!(
            lookup_key(r#"{"x":1}"#, "y"),
            Err(LookupError::KeyNotFound)
        ));
        assert!(matches!(
            lookup_key(r#"{"x":null}"#, "x"),
            Err(LookupError::KeyNotFound)
        ));
    }

    #[test]
    fn test_invalid_documents() {
        assert!(matches!(lookup_key("not json", "x"), Err(LookupError::Parse(_))));
        assert!(matches!(lookup_key("[1,2]", "x"), Err(LookupError::NotAnObject)));
        assert!(matches!(lookup_key("null", "x"), Err(LookupError::KeyNotFound)));
    }

    #[test]
    fn test_keys_sorted() {
        assert_eq!(
            keys(r#"{"b":1,"a":"x","c":null}"#).unwrap(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert!(keys("null").unwrap().is_empty());
    }
}
