//! Payload sanitization for action records
//!
//! Payloads are JSON-safe by construction: values are serialized with serde
//! and fall back to a placeholder string when serialization fails, so a bad
//! argument can never fail a record write. Every string is truncated to a
//! byte cap to bound log growth.

use serde::Serialize;
use serde_json::Value;

/// Placeholder recorded when a value cannot be represented as JSON.
const UNSERIALIZABLE: &str = "<unserializable>";

/// Suffix appended to truncated strings.
const TRUNCATION_SUFFIX: &str = "...[truncated]";

/// Convert any serializable value into a JSON-safe, size-capped payload.
///
/// Never fails: values that serde_json rejects (non-string map keys,
/// non-finite floats) are recorded as [`UNSERIALIZABLE`].
pub fn to_recorded_value<T: Serialize>(value: &T, cap_bytes: usize) -> Value {
    match serde_json::to_value(value) {
        Ok(v) => sanitize_value(v, cap_bytes),
        Err(_) => Value::String(UNSERIALIZABLE.to_string()),
    }
}

/// Recursively truncate every string in a JSON value to the byte cap.
pub fn sanitize_value(value: Value, cap_bytes: usize) -> Value {
    match value {
        Value::String(s) => Value::String(truncate(s, cap_bytes)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| sanitize_value(v, cap_bytes))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (truncate(k, cap_bytes), sanitize_value(v, cap_bytes)))
                .collect(),
        ),
        other => other,
    }
}

fn truncate(s: String, cap_bytes: usize) -> String {
    if s.len() <= cap_bytes {
        return s;
    }
    let mut end = cap_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &s[..end], TRUNCATION_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_short_strings_pass_through() {
        let value = to_recorded_value(&"hello", 2048);
        assert_eq!(value, Value::String("hello".to_string()));
    }

    #[test]
    fn test_long_strings_truncated() {
        let long = "x".repeat(5000);
        let value = to_recorded_value(&long, 2048);
        let s = value.as_str().unwrap();
        assert!(s.starts_with("xxx"));
        assert!(s.ends_with(TRUNCATION_SUFFIX));
        assert!(s.len() < 5000);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // multi-byte characters straddling the cap must not split
        let s = "é".repeat(100);
        let value = sanitize_value(Value::String(s), 101);
        assert!(value.as_str().unwrap().ends_with(TRUNCATION_SUFFIX));
    }

    #[test]
    fn test_nested_values_sanitized() {
        let value = serde_json::json!({
            "name": "ok",
            "args": ["short", "y".repeat(100)],
            "inner": {"text": "z".repeat(100)},
        });
        let sanitized = sanitize_value(value, 16);
        assert_eq!(sanitized["name"], "ok");
        assert!(sanitized["args"][1]
            .as_str()
            .unwrap()
            .ends_with(TRUNCATION_SUFFIX));
        assert!(sanitized["inner"]["text"]
            .as_str()
            .unwrap()
            .ends_with(TRUNCATION_SUFFIX));
    }

    #[test]
    fn test_unserializable_values_fall_back() {
        // JSON object keys must be strings; tuple keys fail serialization
        let mut bad: HashMap<(u8, u8), &str> = HashMap::new();
        bad.insert((1, 2), "pair");
        let value = to_recorded_value(&bad, 2048);
        assert_eq!(value, Value::String(UNSERIALIZABLE.to_string()));
    }

    #[test]
    fn test_non_finite_floats_become_null() {
        // serde_json maps non-finite floats to null rather than erroring
        let value = to_recorded_value(&f64::NAN, 2048);
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_numbers_and_bools_untouched() {
        let value = serde_json::json!({"count": 3, "done": true, "none": null});
        assert_eq!(sanitize_value(value.clone(), 1), value);
    }
}
