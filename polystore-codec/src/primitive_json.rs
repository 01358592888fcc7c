//! Conversion between `Primitive` and its JSON wire form (§3, §4.5).
//!
//! Byte sequences have no native JSON representation, so they round-trip as
//! a small discriminated object rather than a bare string — this keeps
//! `json_to_primitive(primitive_to_json(p)) == Some(p)` total, instead of
//! colliding with a document that legitimately stores a base64-looking
//! string.

use serde_json::{json, Value};

use polystore_common::Primitive;

const BYTES_DISCRIMINANT_KEY: &str = "__bytes__";

/// Encodes a `Primitive` as the JSON value a decoded item would expose it
/// as.
#[must_use]
pub fn primitive_to_json(value: &Primitive) -> Value {
    value.visit(
        |s| Value::String(s.to_string()),
        |i| json!(i),
        |d| json!(d),
        Value::Bool,
        |b| json!({ BYTES_DISCRIMINANT_KEY: base64::encode(b) }),
    )
}

/// Decodes a JSON value previously produced by [`primitive_to_json`] back
/// into a `Primitive`. Returns `None` for shapes that don't correspond to a
/// single scalar (arrays, nested objects other than the bytes wrapper).
#[must_use]
pub fn json_to_primitive(value: &Value) -> Option<Primitive> {
    match value {
        Value::String(s) => Some(Primitive::string(s.clone())),
        Value::Bool(b) => Some(Primitive::boolean(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Primitive::integer(i))
            } else {
                n.as_f64().map(Primitive::double)
            }
        }
        Value::Object(map) if map.len() == 1 => map
            .get(BYTES_DISCRIMINANT_KEY)
            .and_then(Value::as_str)
            .and_then(|encoded| base64::decode(encoded).ok())
            .map(Primitive::bytes),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_round_trip() {
        for p in [
            Primitive::string("hello"),
            Primitive::integer(42),
            Primitive::double(3.5),
            Primitive::boolean(true),
        ] {
            let json = primitive_to_json(&p);
            assert_eq!(json_to_primitive(&json), Some(p));
        }
    }

    #[test]
    fn bytes_round_trip_via_discriminated_form() {
        let p = Primitive::bytes(vec![1, 2, 3]);
        let json = primitive_to_json(&p);
        assert!(json.is_object());
        assert_eq!(json_to_primitive(&json), Some(p));
    }

    #[test]
    fn arbitrary_nested_object_is_not_a_primitive() {
        assert_eq!(json_to_primitive(&json!({"a": 1, "b": 2})), None);
    }
}
