//! Write-side round-float-to-int normalization (§3, §4.5).
//!
//! Deliberate and lossy: an incoming `42.0` is stored as the integer `42`
//! so that `AttributeEquals(name, Integer(42))` matches it later. This walk
//! runs once, at write time, over the whole document — not inside
//! `Primitive::eq`, which never implicitly coerces kinds.

use serde_json::{Number, Value};

/// Recursively coerces every exactly-integral JSON number in `value` to an
/// integer representation, in place.
pub fn normalize_numbers_for_write(value: &mut Value) {
    match value {
        Value::Number(n) => {
            if let Some(normalized) = normalize_number(n) {
                *n = normalized;
            }
        }
        Value::Array(items) => {
            for item in items {
                normalize_numbers_for_write(item);
            }
        }
        Value::Object(map) => {
            for v in map.values_mut() {
                normalize_numbers_for_write(v);
            }
        }
        Value::Null | Value::Bool(_) | Value::String(_) => {}
    }
}

fn normalize_number(n: &Number) -> Option<Number> {
    if n.is_i64() || n.is_u64() {
        return None;
    }
    let f = n.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        #[allow(clippy::cast_possible_truncation)]
        return Some(Number::from(f as i64));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exact_integral_double_becomes_integer() {
        let mut v = json!({"age": 42.0, "score": 9.5});
        normalize_numbers_for_write(&mut v);
        assert_eq!(v["age"], json!(42));
        assert_eq!(v["score"], json!(9.5));
    }

    #[test]
    fn recurses_into_nested_arrays_and_objects() {
        let mut v = json!({"nums": [1.0, 2.5, {"inner": 3.0}]});
        normalize_numbers_for_write(&mut v);
        assert_eq!(v["nums"][0], json!(1));
        assert_eq!(v["nums"][1], json!(2.5));
        assert_eq!(v["nums"][2]["inner"], json!(3));
    }

    #[test]
    fn leaves_non_numeric_values_untouched() {
        let mut v = json!({"name": "x", "flag": true, "nothing": null});
        let before = v.clone();
        normalize_numbers_for_write(&mut v);
        assert_eq!(v, before);
    }
}
