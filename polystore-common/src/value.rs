//! `Primitive` and `DbKey`: the typed scalar system bridging keys and
//! condition operands with schema-less JSON documents.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ValidationError};

/// Relative tolerance used when comparing two `Double` primitives, so that
/// ordinary floating-point noise does not defeat equality checks.
const DOUBLE_EQ_RELATIVE_TOLERANCE: f64 = 1e-9;

/// A tagged-union scalar value used for keys and condition operands.
///
/// Immutable once constructed. Equality is kind-then-value: a `String` and
/// an `Integer` are never equal even if their textual forms coincide, and
/// `Double` equality permits a small relative tolerance (see
/// [`DOUBLE_EQ_RELATIVE_TOLERANCE`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Primitive {
    String(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    #[serde(with = "bytes_as_base64")]
    Bytes(Vec<u8>),
}

mod bytes_as_base64 {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        base64::encode(bytes).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        base64::decode(&encoded).map_err(serde::de::Error::custom)
    }
}

/// The kind of a `Primitive`, used in error messages and type-priority
/// ordering (§4.5's sorting utilities).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Boolean,
    Integer,
    Double,
    String,
    Bytes,
}

impl PrimitiveKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Bytes => "bytes",
        }
    }
}

impl Primitive {
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Primitive::String(value.into())
    }

    #[must_use]
    pub fn integer(value: i64) -> Self {
        Primitive::Integer(value)
    }

    #[must_use]
    pub fn double(value: f64) -> Self {
        Primitive::Double(value)
    }

    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Primitive::Boolean(value)
    }

    #[must_use]
    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Primitive::Bytes(value.into())
    }

    #[must_use]
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::String(_) => PrimitiveKind::String,
            Primitive::Integer(_) => PrimitiveKind::Integer,
            Primitive::Double(_) => PrimitiveKind::Double,
            Primitive::Boolean(_) => PrimitiveKind::Boolean,
            Primitive::Bytes(_) => PrimitiveKind::Bytes,
        }
    }

    /// Route on kind with a visitor, the canonical way to consume a
    /// `Primitive` (the `as_*` accessors exist purely for convenience).
    pub fn visit<R>(
        &self,
        mut on_string: impl FnMut(&str) -> R,
        mut on_integer: impl FnMut(i64) -> R,
        mut on_double: impl FnMut(f64) -> R,
        mut on_boolean: impl FnMut(bool) -> R,
        mut on_bytes: impl FnMut(&[u8]) -> R,
    ) -> R {
        match self {
            Primitive::String(s) => on_string(s),
            Primitive::Integer(i) => on_integer(*i),
            Primitive::Double(d) => on_double(*d),
            Primitive::Boolean(b) => on_boolean(*b),
            Primitive::Bytes(b) => on_bytes(b),
        }
    }

    /// Succeeds only if this is a `String`; otherwise fails naming both
    /// the expected and actual kind.
    pub fn as_string(&self) -> Result<&str, Error> {
        match self {
            Primitive::String(s) => Ok(s),
            other => Err(mismatch(PrimitiveKind::String, other.kind())),
        }
    }

    pub fn as_integer(&self) -> Result<i64, Error> {
        match self {
            Primitive::Integer(i) => Ok(*i),
            other => Err(mismatch(PrimitiveKind::Integer, other.kind())),
        }
    }

    pub fn as_double(&self) -> Result<f64, Error> {
        match self {
            Primitive::Double(d) => Ok(*d),
            other => Err(mismatch(PrimitiveKind::Double, other.kind())),
        }
    }

    pub fn as_boolean(&self) -> Result<bool, Error> {
        match self {
            Primitive::Boolean(b) => Ok(*b),
            other => Err(mismatch(PrimitiveKind::Boolean, other.kind())),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8], Error> {
        match self {
            Primitive::Bytes(b) => Ok(b),
            other => Err(mismatch(PrimitiveKind::Bytes, other.kind())),
        }
    }

    /// Returns `(true, value)` if this is a `String`, else `(false, "")`.
    #[must_use]
    pub fn try_get_string(&self) -> (bool, &str) {
        match self {
            Primitive::String(s) => (true, s.as_str()),
            _ => (false, ""),
        }
    }

    #[must_use]
    pub fn try_get_integer(&self) -> (bool, i64) {
        match self {
            Primitive::Integer(i) => (true, *i),
            _ => (false, 0),
        }
    }

    #[must_use]
    pub fn try_get_double(&self) -> (bool, f64) {
        match self {
            Primitive::Double(d) => (true, *d),
            _ => (false, 0.0),
        }
    }

    #[must_use]
    pub fn try_get_boolean(&self) -> (bool, bool) {
        match self {
            Primitive::Boolean(b) => (true, *b),
            _ => (false, false),
        }
    }

    /// Numeric ordering used by comparison condition leaves
    /// (`Greater`/`Less`/…). Returns `None` for non-numeric kinds — callers
    /// must not implicitly coerce strings or booleans.
    #[must_use]
    pub fn partial_cmp_numeric(&self, other: &Primitive) -> Option<std::cmp::Ordering> {
        let a = match self {
            Primitive::Integer(i) => *i as f64,
            Primitive::Double(d) => *d,
            _ => return None,
        };
        let b = match other {
            Primitive::Integer(i) => *i as f64,
            Primitive::Double(d) => *d,
            _ => return None,
        };
        a.partial_cmp(&b)
    }
}

fn mismatch(expected: PrimitiveKind, actual: PrimitiveKind) -> Error {
    Error::Validation(ValidationError::TypeMismatch {
        expected: expected.name(),
        actual: actual.name(),
    })
}

impl PartialEq for Primitive {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Primitive::String(a), Primitive::String(b)) => a == b,
            (Primitive::Integer(a), Primitive::Integer(b)) => a == b,
            (Primitive::Boolean(a), Primitive::Boolean(b)) => a == b,
            (Primitive::Bytes(a), Primitive::Bytes(b)) => a == b,
            (Primitive::Double(a), Primitive::Double(b)) => doubles_equal(*a, *b),
            // Cross-kind comparisons are never implicitly coerced, even
            // Integer vs Double: that normalization happens earlier, on
            // write, via the round-float-to-int codec step.
            _ => false,
        }
    }
}

fn doubles_equal(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= DOUBLE_EQ_RELATIVE_TOLERANCE * scale
}

impl Eq for Primitive {}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::String(s) => write!(f, "{s}"),
            Primitive::Integer(i) => write!(f, "{i}"),
            Primitive::Double(d) => write!(f, "{d}"),
            Primitive::Boolean(b) => write!(f, "{b}"),
            Primitive::Bytes(b) => write!(f, "{}", base64::encode(b)),
        }
    }
}

impl From<String> for Primitive {
    fn from(v: String) -> Self {
        Primitive::String(v)
    }
}

impl From<&str> for Primitive {
    fn from(v: &str) -> Self {
        Primitive::String(v.to_string())
    }
}

impl From<i64> for Primitive {
    fn from(v: i64) -> Self {
        Primitive::Integer(v)
    }
}

impl From<f64> for Primitive {
    fn from(v: f64) -> Self {
        Primitive::Double(v)
    }
}

impl From<bool> for Primitive {
    fn from(v: bool) -> Self {
        Primitive::Boolean(v)
    }
}

/// `(attributeName, Primitive)` — names exactly one item within a table.
///
/// Different items in the same table MAY use different key attribute
/// names; items are partitioned internally by attribute name so that
/// `(a, v1)` and `(b, v1)` name distinct items even when `v1` is equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbKey {
    attribute_name: String,
    value: Primitive,
}

impl DbKey {
    /// # Errors
    /// Returns [`ValidationError::EmptyKeyAttributeName`] if `attribute_name`
    /// is empty.
    pub fn new(attribute_name: impl Into<String>, value: Primitive) -> Result<Self, Error> {
        let attribute_name = attribute_name.into();
        if attribute_name.is_empty() {
            return Err(Error::Validation(ValidationError::EmptyKeyAttributeName));
        }
        Ok(Self {
            attribute_name,
            value,
        })
    }

    #[must_use]
    pub fn attribute_name(&self) -> &str {
        &self.attribute_name
    }

    #[must_use]
    pub fn value(&self) -> &Primitive {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_equality_tolerates_float_noise() {
        let a = Primitive::Double(0.1 + 0.2);
        let b = Primitive::Double(0.3);
        assert_eq!(a, b);
    }

    #[test]
    fn cross_kind_equality_never_coerces() {
        assert_ne!(Primitive::String("42".into()), Primitive::Integer(42));
        assert_ne!(Primitive::Integer(42), Primitive::Double(42.0));
    }

    #[test]
    fn as_x_accessors_report_both_kinds_on_mismatch() {
        let err = Primitive::String("x".into()).as_integer().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("integer"));
        assert!(msg.contains("string"));
    }

    #[test]
    fn try_get_returns_zero_value_on_mismatch() {
        let (ok, v) = Primitive::String("x".into()).try_get_integer();
        assert!(!ok);
        assert_eq!(v, 0);
    }

    #[test]
    fn bytes_are_copied_not_aliased() {
        let mut source = vec![1u8, 2, 3];
        let p = Primitive::bytes(source.clone());
        source.push(4);
        assert_eq!(p.as_bytes().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn db_key_rejects_empty_attribute_name() {
        assert!(DbKey::new("", Primitive::integer(1)).is_err());
    }
}
