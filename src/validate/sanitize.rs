//! Payload sanitization and timestamp stamping.
//!
//! [`sanitize`] produces a cleaned deep copy of a JSON payload before
//! validation; [`apply_timestamps`] stamps `created_date`/`updated_date`.
//! Both are pure, no store access.

use serde_json::{Map, Number, Value};

use crate::types::Timestamp;

/// Returns a sanitized deep copy of `value`.
///
/// - Strings are trimmed and stripped of `<`/`>` characters. This is a
///   conservative markup guard for values echoed into web views, not a
///   full HTML sanitizer.
/// - Arrays and objects are sanitized recursively.
/// - `null` is preserved.
/// - Numbers and booleans pass through unchanged; the JSON value model
///   cannot hold non-finite numbers, so float coercion happens in
///   [`sanitize_f64`] where raw floats enter.
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_str(s)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), sanitize(v));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Coerces a raw float to a storable value: non-finite input (NaN, ±∞)
/// becomes `0.0`.
pub fn sanitize_f64(n: f64) -> f64 {
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// Builds a JSON number from a raw float, zeroing non-finite input.
pub fn number_value(n: f64) -> Value {
    Number::from_f64(sanitize_f64(n))
        .map(Value::Number)
        .unwrap_or_else(|| Value::Number(0.into()))
}

fn sanitize_str(s: &str) -> String {
    s.trim().chars().filter(|c| *c != '<' && *c != '>').collect()
}

/// Stamps lifecycle timestamps (epoch milliseconds) onto an object
/// payload.
///
/// On create (`is_update == false`) both `created_date` and
/// `updated_date` are set to now; on update only `updated_date` is
/// touched. Non-object payloads are left unchanged.
pub fn apply_timestamps(data: &mut Value, is_update: bool) {
    let Some(map) = data.as_object_mut() else {
        return;
    };
    let now = Timestamp::now().as_millis();
    if !is_update {
        map.insert("created_date".into(), Value::from(now));
    }
    map.insert("updated_date".into(), Value::from(now));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_trims_and_strips_markup() {
        let cleaned = sanitize(&json!({"name": " Milk <b> "}));
        assert_eq!(cleaned["name"], "Milk b");
    }

    #[test]
    fn test_sanitize_f64_zeroes_non_finite() {
        assert_eq!(sanitize_f64(f64::INFINITY), 0.0);
        assert_eq!(sanitize_f64(f64::NEG_INFINITY), 0.0);
        assert_eq!(sanitize_f64(f64::NAN), 0.0);
        assert_eq!(sanitize_f64(1.5), 1.5);
    }

    #[test]
    fn test_number_value() {
        assert_eq!(number_value(2.5), json!(2.5));
        assert_eq!(number_value(f64::INFINITY), json!(0.0));
    }

    #[test]
    fn test_sanitize_recurses_into_arrays_and_objects() {
        let cleaned = sanitize(&json!({
            "tags": [" a ", "<script>"],
            "nested": {"note": " hi <i> "}
        }));
        assert_eq!(cleaned["tags"], json!(["a", "script"]));
        assert_eq!(cleaned["nested"]["note"], "hi i");
    }

    #[test]
    fn test_sanitize_preserves_null_and_scalars() {
        let cleaned = sanitize(&json!({"gone": null, "n": 3, "flag": true}));
        assert_eq!(cleaned["gone"], Value::Null);
        assert_eq!(cleaned["n"], 3);
        assert_eq!(cleaned["flag"], true);
    }

    #[test]
    fn test_sanitize_is_a_copy() {
        let original = json!({"name": " x "});
        let _ = sanitize(&original);
        assert_eq!(original["name"], " x ");
    }

    #[test]
    fn test_apply_timestamps_on_create() {
        let mut data = json!({"title": "t"});
        apply_timestamps(&mut data, false);
        assert!(data["created_date"].is_i64());
        assert_eq!(data["created_date"], data["updated_date"]);
    }

    #[test]
    fn test_apply_timestamps_on_update_leaves_created() {
        let mut data = json!({"title": "t", "created_date": 12345});
        apply_timestamps(&mut data, true);
        assert_eq!(data["created_date"], 12345);
        assert!(data["updated_date"].as_i64().unwrap() > 12345);
    }

    #[test]
    fn test_apply_timestamps_ignores_non_objects() {
        let mut data = json!("scalar");
        apply_timestamps(&mut data, false);
        assert_eq!(data, json!("scalar"));
    }
}
