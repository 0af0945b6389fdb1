//! JSON Sanitization
//!
//! The persistence layer is strict JSON: NaN and infinities must never reach
//! it. Non-finite numbers are coerced to null rather than raised as errors,
//! and sanitization is idempotent.

use serde::Serialize;
use serde_json::{Map, Number, Value};

/// Coerce a float to a JSON-safe value; non-finite becomes None
pub fn json_safe_f64(x: f64) -> Option<f64> {
    x.is_finite().then_some(x)
}

/// Recursively sanitize a JSON value in place of strict-JSON storage.
///
/// Any number that cannot be represented as a finite f64 is replaced with
/// null. Arrays and objects are walked; everything else passes through.
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::Number(n) => match n.as_f64().and_then(json_safe_f64) {
            Some(f) => {
                // Preserve integers exactly; only floats go through f64
                if n.is_i64() || n.is_u64() {
                    Value::Number(n)
                } else {
                    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
                }
            }
            None => Value::Null,
        },
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k, sanitize_value(v)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

/// Serialize anything to a sanitized JSON value.
///
/// serde_json already maps non-finite floats to null on serialization; the
/// explicit walk keeps the guarantee independent of that behavior.
pub fn to_sanitized_value<T: Serialize>(value: &T) -> Result<Value, serde_json::Error> {
    serde_json::to_value(value).map(sanitize_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_finite_floats_become_none() {
        assert_eq!(json_safe_f64(f64::NAN), None);
        assert_eq!(json_safe_f64(f64::INFINITY), None);
        assert_eq!(json_safe_f64(f64::NEG_INFINITY), None);
        assert_eq!(json_safe_f64(1.25), Some(1.25));
    }

    #[test]
    fn nan_serializes_to_null() {
        #[derive(Serialize)]
        struct Row {
            price: f64,
            score: f64,
        }
        let v = to_sanitized_value(&Row {
            price: 10.0,
            score: f64::NAN,
        })
        .unwrap();
        assert_eq!(v["price"], json!(10.0));
        assert_eq!(v["score"], Value::Null);
    }

    #[test]
    fn sanitize_walks_nested_structures() {
        let v = json!({
            "a": [1, 2.5, null],
            "b": {"c": "text", "d": true, "e": 7}
        });
        assert_eq!(sanitize_value(v.clone()), v);
    }

    #[test]
    fn sanitize_is_idempotent() {
        let v = json!({
            "scores": [1.0, 2.0],
            "meta": {"count": 3, "ratio": 0.5}
        });
        let once = sanitize_value(v);
        let twice = sanitize_value(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn integers_survive_untouched() {
        let v = json!({"volume": 18_446_744_073_709_551_615u64, "n": -42});
        let s = sanitize_value(v.clone());
        assert_eq!(s, v);
    }
}
