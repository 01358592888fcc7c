//! The `DatabaseService` contract (§4.3).

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::{Map, Value};

use polystore_common::{DbKey, OperationResult, Primitive, Result, ReturnBehavior};
use polystore_condition::ConditionTree;

use crate::factory::ConditionFactory;

/// A decoded or to-be-encoded document: an unordered attribute-name to
/// JSON-value mapping, always including its key attribute once decoded
/// (§3 invariant).
pub type Item = Map<String, Value>;

/// The payload of the three scan variants (§4.3, §4.8).
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    /// Every key attribute name in use across the returned items (and, for
    /// `ScanTable`/`ScanTableFiltered`, across the whole table).
    pub keys: BTreeSet<String>,
    pub items: Vec<Item>,
    /// Present only on the first page of a paginated scan (§4.3 ordering
    /// note); `None` for the unpaginated scan variants.
    pub next_page_token: Option<String>,
}

/// The public operation set every provider implements identically in
/// observable behavior (§4.3). `conditions` being `ConditionTree::Empty`
/// means unconditional — see §8 property 4.
///
/// Expected failures (condition miss, not-found, write-conflict) are
/// folded into the returned `OperationResult` rather than propagated as
/// `Err`; only programmer errors (validation) return `Err` (§7).
#[async_trait]
pub trait DatabaseService: Send + Sync {
    /// Condition leaves/trees are constructed through this factory rather
    /// than directly on `Primitive` (§6).
    fn conditions(&self) -> ConditionFactory {
        ConditionFactory
    }

    async fn put(
        &self,
        table: &str,
        key: &DbKey,
        item: Item,
        overwrite_if_exists: bool,
        return_behavior: ReturnBehavior,
        conditions: ConditionTree,
    ) -> Result<OperationResult<Item>>;

    async fn get(&self, table: &str, key: &DbKey) -> Result<OperationResult<Option<Item>>>;

    async fn get_many(&self, table: &str, keys: &[DbKey]) -> Result<OperationResult<Vec<Item>>>;

    async fn exists(
        &self,
        table: &str,
        key: &DbKey,
        conditions: ConditionTree,
    ) -> Result<OperationResult<bool>>;

    async fn update(
        &self,
        table: &str,
        key: &DbKey,
        partial_item: Item,
        return_behavior: ReturnBehavior,
        conditions: ConditionTree,
    ) -> Result<OperationResult<Item>>;

    async fn delete(
        &self,
        table: &str,
        key: &DbKey,
        return_behavior: ReturnBehavior,
        conditions: ConditionTree,
    ) -> Result<OperationResult<Item>>;

    async fn increment(
        &self,
        table: &str,
        key: &DbKey,
        attribute: &str,
        delta: f64,
        conditions: ConditionTree,
    ) -> Result<OperationResult<f64>>;

    async fn add_to_array(
        &self,
        table: &str,
        key: &DbKey,
        attribute: &str,
        elements: Vec<Primitive>,
        return_behavior: ReturnBehavior,
        conditions: ConditionTree,
    ) -> Result<OperationResult<Item>>;

    async fn remove_from_array(
        &self,
        table: &str,
        key: &DbKey,
        attribute: &str,
        elements: Vec<Primitive>,
        return_behavior: ReturnBehavior,
        conditions: ConditionTree,
    ) -> Result<OperationResult<Item>>;

    async fn scan_table(&self, table: &str) -> Result<OperationResult<ScanPage>>;

    async fn scan_table_filtered(
        &self,
        table: &str,
        conditions: ConditionTree,
    ) -> Result<OperationResult<ScanPage>>;

    async fn scan_paginated(
        &self,
        table: &str,
        page_size: usize,
        page_token: Option<String>,
    ) -> Result<OperationResult<ScanPage>>;

    async fn drop_table(&self, table: &str) -> Result<OperationResult<bool>>;

    async fn list_tables(&self) -> Result<OperationResult<BTreeSet<String>>>;

    async fn list_key_names(&self, table: &str) -> Result<OperationResult<BTreeSet<String>>>;
}
