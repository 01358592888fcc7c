//! Key injection and the write/read item boundary (§4.5).

use serde_json::{Map, Value};

use polystore_common::DbKey;

use crate::numeric::normalize_numbers_for_write;
use crate::primitive_json::primitive_to_json;

/// Prepares a caller-supplied item for storage: normalizes numbers so that
/// later integer-valued comparisons succeed. Does not touch the key; the
/// key attribute is injected on the read path instead, so writes never
/// need to worry about a caller omitting or duplicating it.
#[must_use]
pub fn encode_item_for_write(mut item: Map<String, Value>) -> Map<String, Value> {
    for value in item.values_mut() {
        normalize_numbers_for_write(value);
    }
    item
}

/// Injects `key`'s attribute back into a decoded item, overwriting any
/// stale value already present under that name (§3 invariant: decoded
/// items always contain their key attribute).
#[must_use]
pub fn decode_item(mut stored: Map<String, Value>, key: &DbKey) -> Map<String, Value> {
    stored.insert(key.attribute_name().to_string(), primitive_to_json(key.value()));
    stored
}
