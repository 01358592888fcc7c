//! Polystore Item Round-Trip Codec (§4.5, §4.9 via `polystore-common`).
//!
//! Providers store items as `serde_json::Value` objects. This crate is the
//! single place that normalizes numbers on write, injects the key attribute
//! on read, converts between `Primitive` and its JSON wire form, and
//! provides the stable ordering utilities the conformance suite and
//! `ArrayElementExists` rely on.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod item;
mod numeric;
mod ordering;
mod primitive_json;

pub use item::{decode_item, encode_item_for_write};
pub use numeric::normalize_numbers_for_write;
pub use ordering::{compare_values, sort_entries_alphabetically};
pub use primitive_json::{json_to_primitive, primitive_to_json};
