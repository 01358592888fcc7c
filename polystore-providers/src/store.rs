//! Shared in-memory storage shape for both reference providers.
//!
//! `DashMap`-sharded collections, one `Arc` per table so readers never
//! block on a table they're not touching, entry-level locking standing
//! in for a real backend's per-item lock.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{Map, Value};

use polystore_common::{DbKey, Primitive};

/// One stored document plus the synthetic version token the CAS emulator
/// (§4.6) guards its writes with — the in-process stand-in for a real
/// backend's ETag or item-version attribute.
#[derive(Debug, Clone)]
pub struct VersionedItem {
    pub version: u64,
    pub key: DbKey,
    /// The document without its key attribute; the codec injects that back
    /// in on every read (§4.5).
    pub document: Map<String, Value>,
}

/// Identifies one item within a table. Two items with the same `Primitive`
/// value but different key attribute names are distinct (§3) — the
/// attribute name is part of the identity, not just decoration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    attribute_name: String,
    encoded_value: String,
}

impl StorageKey {
    /// A stable sort key used to give paginated scans a deterministic order.
    #[must_use]
    pub fn sort_key(&self) -> (&str, &str) {
        (&self.attribute_name, &self.encoded_value)
    }

    #[must_use]
    pub fn from_db_key(key: &DbKey) -> Self {
        let encoded_value = match key.value() {
            Primitive::String(s) => format!("s:{s}"),
            Primitive::Integer(i) => format!("i:{i}"),
            Primitive::Double(d) => format!("d:{}", d.to_bits()),
            Primitive::Boolean(b) => format!("b:{b}"),
            Primitive::Bytes(b) => format!("y:{}", base64::encode(b)),
        };
        Self {
            attribute_name: key.attribute_name().to_string(),
            encoded_value,
        }
    }
}

pub type TableStore = DashMap<StorageKey, VersionedItem>;

/// All tables owned by one provider instance for its lifetime (§5 resource
/// policy: one shared table-map, no per-call allocation).
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: DashMap<String, Arc<TableStore>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the named table, creating it if this is the first write
    /// (§3: tables are created lazily on first write).
    pub fn table_for_write(&self, name: &str) -> Arc<TableStore> {
        self.tables
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(DashMap::new()))
            .clone()
    }

    /// Returns the named table if it has been written to at least once.
    #[must_use]
    pub fn table_for_read(&self, name: &str) -> Option<Arc<TableStore>> {
        self.tables.get(name).map(|entry| entry.clone())
    }

    /// Removes the table. Idempotent: dropping an already-absent table
    /// still succeeds (§8 property 6); the returned bool only reports
    /// whether a table actually existed.
    pub fn drop_table(&self, name: &str) -> bool {
        self.tables.remove(name).is_some()
    }

    #[must_use]
    pub fn list_tables(&self) -> BTreeSet<String> {
        self.tables.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_common::Primitive;

    #[test]
    fn different_key_attribute_names_are_distinct_identities() {
        let a = DbKey::new("id", Primitive::integer(1)).unwrap();
        let b = DbKey::new("code", Primitive::integer(1)).unwrap();
        assert_ne!(StorageKey::from_db_key(&a), StorageKey::from_db_key(&b));
    }

    #[test]
    fn table_for_read_is_none_before_any_write() {
        let store = InMemoryStore::new();
        assert!(store.table_for_read("missing").is_none());
    }

    #[test]
    fn drop_table_is_idempotent() {
        let store = InMemoryStore::new();
        store.table_for_write("t");
        assert!(store.drop_table("t"));
        assert!(!store.drop_table("t"));
    }
}
