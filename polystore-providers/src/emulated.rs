//! The wide-column-style reference provider (§4.7, §5). Array-membership
//! conditions cannot be expressed in one atomic check here, so those writes
//! fall back to the CAS emulator; everything else commits inside a single
//! `DashMap` entry critical section.

use std::collections::BTreeSet;

use async_trait::async_trait;

use polystore_common::config::{PaginationConfig, RetryConfig};
use polystore_common::{DbKey, OperationResult, Primitive, Result, ReturnBehavior};
use polystore_condition::ConditionTree;
use polystore_service::{DatabaseService, Item, ScanPage};

use crate::core::Core;
use crate::dialects::EmulatedDialect;

pub struct EmulatedProvider {
    core: Core<EmulatedDialect>,
}

impl EmulatedProvider {
    #[must_use]
    pub fn new(retry: RetryConfig, pagination: PaginationConfig) -> Self {
        Self {
            core: Core::new(EmulatedDialect, retry, pagination),
        }
    }
}

impl Default for EmulatedProvider {
    fn default() -> Self {
        Self::new(RetryConfig::default(), PaginationConfig::default())
    }
}

#[async_trait]
impl DatabaseService for EmulatedProvider {
    async fn put(
        &self,
        table: &str,
        key: &DbKey,
        item: Item,
        overwrite_if_exists: bool,
        return_behavior: ReturnBehavior,
        conditions: ConditionTree,
    ) -> Result<OperationResult<Item>> {
        self.core
            .put(table, key, item, overwrite_if_exists, return_behavior, conditions)
            .await
    }

    async fn get(&self, table: &str, key: &DbKey) -> Result<OperationResult<Option<Item>>> {
        self.core.get(table, key).await
    }

    async fn get_many(&self, table: &str, keys: &[DbKey]) -> Result<OperationResult<Vec<Item>>> {
        self.core.get_many(table, keys).await
    }

    async fn exists(&self, table: &str, key: &DbKey, conditions: ConditionTree) -> Result<OperationResult<bool>> {
        self.core.exists(table, key, conditions).await
    }

    async fn update(
        &self,
        table: &str,
        key: &DbKey,
        partial_item: Item,
        return_behavior: ReturnBehavior,
        conditions: ConditionTree,
    ) -> Result<OperationResult<Item>> {
        self.core.update(table, key, partial_item, return_behavior, conditions).await
    }

    async fn delete(
        &self,
        table: &str,
        key: &DbKey,
        return_behavior: ReturnBehavior,
        conditions: ConditionTree,
    ) -> Result<OperationResult<Item>> {
        self.core.delete(table, key, return_behavior, conditions).await
    }

    async fn increment(
        &self,
        table: &str,
        key: &DbKey,
        attribute: &str,
        delta: f64,
        conditions: ConditionTree,
    ) -> Result<OperationResult<f64>> {
        self.core.increment(table, key, attribute, delta, conditions).await
    }

    async fn add_to_array(
        &self,
        table: &str,
        key: &DbKey,
        attribute: &str,
        elements: Vec<Primitive>,
        return_behavior: ReturnBehavior,
        conditions: ConditionTree,
    ) -> Result<OperationResult<Item>> {
        self.core
            .add_to_array(table, key, attribute, elements, return_behavior, conditions)
            .await
    }

    async fn remove_from_array(
        &self,
        table: &str,
        key: &DbKey,
        attribute: &str,
        elements: Vec<Primitive>,
        return_behavior: ReturnBehavior,
        conditions: ConditionTree,
    ) -> Result<OperationResult<Item>> {
        self.core
            .remove_from_array(table, key, attribute, elements, return_behavior, conditions)
            .await
    }

    async fn scan_table(&self, table: &str) -> Result<OperationResult<ScanPage>> {
        self.core.scan_table(table).await
    }

    async fn scan_table_filtered(&self, table: &str, conditions: ConditionTree) -> Result<OperationResult<ScanPage>> {
        self.core.scan_table_filtered(table, conditions).await
    }

    async fn scan_paginated(
        &self,
        table: &str,
        page_size: usize,
        page_token: Option<String>,
    ) -> Result<OperationResult<ScanPage>> {
        self.core.scan_paginated(table, page_size, page_token).await
    }

    async fn drop_table(&self, table: &str) -> Result<OperationResult<bool>> {
        self.core.drop_table(table).await
    }

    async fn list_tables(&self) -> Result<OperationResult<BTreeSet<String>>> {
        self.core.list_tables().await
    }

    async fn list_key_names(&self, table: &str) -> Result<OperationResult<BTreeSet<String>>> {
        self.core.list_key_names(table).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_common::ReturnBehavior;
    use serde_json::json;

    fn key(id: i64) -> DbKey {
        DbKey::new("id", Primitive::integer(id)).unwrap()
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let provider = EmulatedProvider::default();
        let mut item = Item::new();
        item.insert("name".to_string(), json!("ada"));
        provider
            .put("users", &key(1), item, true, ReturnBehavior::DoNotReturn, ConditionTree::Empty)
            .await
            .unwrap();

        let fetched = provider.get("users", &key(1)).await.unwrap();
        assert!(fetched.success);
        assert_eq!(fetched.data.unwrap().get("name").unwrap(), "ada");
    }

    #[tokio::test]
    async fn array_membership_condition_routes_through_cas_emulator() {
        let provider = EmulatedProvider::default();
        let mut item = Item::new();
        item.insert("tags".to_string(), json!(["a", "b"]));
        provider
            .put("docs", &key(1), item, true, ReturnBehavior::DoNotReturn, ConditionTree::Empty)
            .await
            .unwrap();

        let condition = provider.conditions().array_element_exists("tags", "a");
        let result = provider
            .update(
                "docs",
                &key(1),
                Item::new(),
                ReturnBehavior::DoNotReturn,
                condition,
            )
            .await
            .unwrap();
        assert!(result.success);
    }
}
