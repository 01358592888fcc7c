//! The operation engine shared by both reference providers (§4.3, §4.6,
//! §4.7). A provider is just a [`Core`] parameterized by its
//! [`LeafDialect`]: if the dialect can render a condition, the mutation
//! runs inside one atomic `DashMap` entry critical section; otherwise it
//! falls back to the generic CAS retry loop from `polystore-service`.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use serde_json::{Map, Value};
use tracing::debug;

use polystore_common::config::{PaginationConfig, RetryConfig};
use polystore_common::error::ValidationError;
use polystore_common::{DbKey, Error, OperationResult, Primitive, Result, ReturnBehavior};
use polystore_condition::{compile_with_dialect, evaluate, ConditionTree, LeafDialect};
use polystore_service::{run_cas_loop, CasOutcome, CasStep};

use crate::store::{InMemoryStore, StorageKey, TableStore, VersionedItem};

type Item = polystore_service::Item;
type ScanPage = polystore_service::ScanPage;

/// What a mutation should do to the stored document: `None` deletes the
/// item, `Some` upserts it. `payload` is handed back to the caller
/// regardless of `ReturnBehavior` — only `Increment` uses it for anything
/// beyond `()`.
struct MutationPlan<R> {
    new_document: Option<Map<String, Value>>,
    payload: R,
}

enum DomainOutcome<R> {
    Reject { status_code: u16, message: String },
    Apply(MutationPlan<R>),
}

struct MutateOutcome<R> {
    success: bool,
    status_code: u16,
    message: String,
    old_item: Option<Item>,
    new_item: Option<Item>,
    payload: Option<R>,
}

impl<R> MutateOutcome<R> {
    fn rejected(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code,
            message: message.into(),
            old_item: None,
            new_item: None,
            payload: None,
        }
    }

    fn applied(old_item: Option<Item>, new_item: Option<Item>, payload: R) -> Self {
        Self {
            success: true,
            status_code: 200,
            message: String::new(),
            old_item,
            new_item,
            payload: Some(payload),
        }
    }
}

fn decode(versioned: &VersionedItem) -> Item {
    polystore_codec::decode_item(versioned.document.clone(), &versioned.key)
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Rejects an empty table name synchronously, before any store access
/// (§7.1): `store.table_for_write` would otherwise happily create a table
/// named `""`.
fn require_table_name(table_name: &str) -> Result<()> {
    if table_name.is_empty() {
        return Err(Error::Validation(ValidationError::EmptyTableName));
    }
    Ok(())
}

/// Rejects an attribute path containing `.` (§4.2): the in-process
/// evaluator only does flat key lookup, so a dotted path would silently
/// match a literal `"a.b"` key instead of a nested field.
fn require_flat_attribute(name: &str) -> Result<()> {
    if name.contains('.') {
        return Err(Error::Validation(ValidationError::DottedPathUnsupported(
            name.to_string(),
        )));
    }
    Ok(())
}

/// Rejects a condition tree referencing any dotted attribute path.
fn require_flat_conditions(conditions: &ConditionTree) -> Result<()> {
    match conditions.first_dotted_leaf() {
        Some(leaf) => Err(Error::Validation(ValidationError::DottedPathUnsupported(
            leaf.attribute_name().to_string(),
        ))),
        None => Ok(()),
    }
}

/// Runs `decide` inside a single atomic `DashMap` entry critical section —
/// the path taken when the provider's dialect can express `conditions`
/// natively, so there is no read/write race to guard against (§4.7).
async fn atomic_mutate<R>(
    table: &TableStore,
    storage_key: &StorageKey,
    key: &DbKey,
    conditions: &ConditionTree,
    require_existing: bool,
    mut decide: impl FnMut(Option<&Item>) -> Result<DomainOutcome<R>>,
) -> Result<MutateOutcome<R>> {
    match table.entry(storage_key.clone()) {
        Entry::Occupied(mut occupied) => {
            let old_item = decode(occupied.get());
            if !evaluate(conditions, &Value::Object(old_item.clone())) {
                return Ok(MutateOutcome::rejected(412, "condition not satisfied"));
            }
            match decide(Some(&old_item))? {
                DomainOutcome::Reject { status_code, message } => {
                    Ok(MutateOutcome::rejected(status_code, message))
                }
                DomainOutcome::Apply(plan) => {
                    let next_version = occupied.get().version + 1;
                    match plan.new_document {
                        Some(document) => {
                            let new_item = polystore_codec::decode_item(document.clone(), key);
                            occupied.insert(VersionedItem {
                                version: next_version,
                                key: key.clone(),
                                document,
                            });
                            Ok(MutateOutcome::applied(Some(old_item), Some(new_item), plan.payload))
                        }
                        None => {
                            occupied.remove();
                            Ok(MutateOutcome::applied(Some(old_item), None, plan.payload))
                        }
                    }
                }
            }
        }
        Entry::Vacant(vacant) => {
            if require_existing {
                return Ok(MutateOutcome::rejected(404, "item not found"));
            }
            if !evaluate(conditions, &empty_object()) {
                return Ok(MutateOutcome::rejected(412, "condition not satisfied"));
            }
            match decide(None)? {
                DomainOutcome::Reject { status_code, message } => {
                    Ok(MutateOutcome::rejected(status_code, message))
                }
                DomainOutcome::Apply(plan) => match plan.new_document {
                    Some(document) => {
                        let new_item = polystore_codec::decode_item(document.clone(), key);
                        vacant.insert(VersionedItem {
                            version: 1,
                            key: key.clone(),
                            document,
                        });
                        Ok(MutateOutcome::applied(None, Some(new_item), plan.payload))
                    }
                    None => Ok(MutateOutcome::applied(None, None, plan.payload)),
                },
            }
        }
    }
}

struct Pending<R> {
    old_item: Option<Item>,
    plan: MutationPlan<R>,
}

/// Runs `decide` through the CAS retry loop (§4.6) — the path taken when
/// the dialect cannot express `conditions` atomically (array-membership
/// leaves on the emulated provider).
async fn cas_mutate<R>(
    table: Arc<TableStore>,
    storage_key: StorageKey,
    key: DbKey,
    retry: RetryConfig,
    conditions: ConditionTree,
    require_existing: bool,
    mut decide: impl FnMut(Option<&Item>) -> Result<DomainOutcome<R>>,
) -> Result<MutateOutcome<R>> {
    let outcome = run_cas_loop(
        &retry,
        || async {
            let existing = table.get(&storage_key).map(|entry| entry.clone());
            if existing.is_none() && require_existing {
                return Ok(CasStep::Rejected {
                    status_code: 404,
                    message: "item not found".to_string(),
                });
            }
            let old_item = existing.as_ref().map(decode);
            let json = old_item
                .as_ref()
                .map_or_else(empty_object, |item| Value::Object(item.clone()));
            if !evaluate(&conditions, &json) {
                return Ok(CasStep::Rejected {
                    status_code: 412,
                    message: "condition not satisfied".to_string(),
                });
            }
            match decide(old_item.as_ref())? {
                DomainOutcome::Reject { status_code, message } => {
                    Ok(CasStep::Rejected { status_code, message })
                }
                DomainOutcome::Apply(plan) => {
                    let expected_version = existing.as_ref().map_or(0, |item| item.version);
                    Ok(CasStep::Proceed {
                        expected_version,
                        payload: Pending { old_item, plan },
                    })
                }
            }
        },
        |expected_version, pending: &Pending<R>| async {
            match table.entry(storage_key.clone()) {
                Entry::Occupied(mut occupied) => {
                    if expected_version == 0 || occupied.get().version != expected_version {
                        return Ok(false);
                    }
                    match &pending.plan.new_document {
                        Some(document) => {
                            occupied.insert(VersionedItem {
                                version: expected_version + 1,
                                key: key.clone(),
                                document: document.clone(),
                            });
                            Ok(true)
                        }
                        None => {
                            occupied.remove();
                            Ok(true)
                        }
                    }
                }
                Entry::Vacant(vacant) => {
                    if expected_version != 0 {
                        return Ok(false);
                    }
                    match &pending.plan.new_document {
                        Some(document) => {
                            vacant.insert(VersionedItem {
                                version: 1,
                                key: key.clone(),
                                document: document.clone(),
                            });
                            Ok(true)
                        }
                        None => Ok(true),
                    }
                }
            }
        },
    )
    .await?;

    Ok(match outcome {
        CasOutcome::Committed(pending) => {
            let new_item = pending
                .plan
                .new_document
                .map(|document| polystore_codec::decode_item(document, &key));
            MutateOutcome::applied(pending.old_item, new_item, pending.plan.payload)
        }
        CasOutcome::Rejected { status_code, message } => MutateOutcome::rejected(status_code, message),
        CasOutcome::Exhausted => {
            MutateOutcome::rejected(409, "write conflict: CAS retry budget exhausted")
        }
    })
}

fn finish_item_result(outcome: MutateOutcome<()>, return_behavior: ReturnBehavior) -> OperationResult<Item> {
    if !outcome.success {
        return OperationResult::failure(outcome.status_code, outcome.message);
    }
    let data = match return_behavior {
        ReturnBehavior::DoNotReturn => None,
        ReturnBehavior::ReturnOldValues => outcome.old_item,
        ReturnBehavior::ReturnNewValues => outcome.new_item,
    };
    OperationResult::ok(data)
}

fn encode_offset(offset: usize) -> String {
    base64::encode(offset.to_string())
}

fn decode_offset(token: &str) -> Result<usize> {
    let invalid = || Error::Validation(ValidationError::InvalidPageToken(token.to_string()));
    let bytes = base64::decode(token).map_err(|_| invalid())?;
    let text = String::from_utf8(bytes).map_err(|_| invalid())?;
    text.parse::<usize>().map_err(|_| invalid())
}

/// The shared engine both `EmulatedProvider` and `NativeProvider` wrap.
/// `D` decides, per condition tree, whether this provider can express it
/// as a native atomic check or must fall back to the CAS loop.
pub struct Core<D> {
    store: InMemoryStore,
    retry: RetryConfig,
    pagination: PaginationConfig,
    dialect: D,
}

impl<D> Core<D>
where
    D: LeafDialect + Send + Sync,
{
    pub fn new(dialect: D, retry: RetryConfig, pagination: PaginationConfig) -> Self {
        Self {
            store: InMemoryStore::new(),
            retry,
            pagination,
            dialect,
        }
    }

    fn dialect_supports(&self, conditions: &ConditionTree) -> bool {
        match compile_with_dialect(conditions, &self.dialect) {
            Ok(compiled) => {
                debug!(expression = %compiled.expression, "condition compiled natively");
                true
            }
            Err(unsupported) => {
                debug!(%unsupported, "condition needs the CAS emulator");
                false
            }
        }
    }

    pub async fn put(
        &self,
        table_name: &str,
        key: &DbKey,
        item: Item,
        overwrite_if_exists: bool,
        return_behavior: ReturnBehavior,
        conditions: ConditionTree,
    ) -> Result<OperationResult<Item>> {
        require_table_name(table_name)?;
        require_flat_conditions(&conditions)?;
        let encoded = polystore_codec::encode_item_for_write(item);
        let table = self.store.table_for_write(table_name);
        let storage_key = StorageKey::from_db_key(key);

        let decide = |existing: Option<&Item>| -> Result<DomainOutcome<()>> {
            if existing.is_some() && !overwrite_if_exists {
                return Ok(DomainOutcome::Reject {
                    status_code: 409,
                    message: "item already exists".to_string(),
                });
            }
            Ok(DomainOutcome::Apply(MutationPlan {
                new_document: Some(encoded.clone()),
                payload: (),
            }))
        };

        let outcome = if self.dialect_supports(&conditions) {
            atomic_mutate(&table, &storage_key, key, &conditions, false, decide).await?
        } else {
            cas_mutate(table, storage_key, key.clone(), self.retry, conditions, false, decide).await?
        };
        Ok(finish_item_result(outcome, return_behavior))
    }

    pub async fn get(&self, table_name: &str, key: &DbKey) -> Result<OperationResult<Option<Item>>> {
        require_table_name(table_name)?;
        let Some(table) = self.store.table_for_read(table_name) else {
            return Ok(OperationResult::ok(None));
        };
        let storage_key = StorageKey::from_db_key(key);
        let item = table.get(&storage_key).map(|entry| decode(&entry));
        Ok(OperationResult::ok(item))
    }

    pub async fn get_many(&self, table_name: &str, keys: &[DbKey]) -> Result<OperationResult<Vec<Item>>> {
        require_table_name(table_name)?;
        let mut items = Vec::new();
        if let Some(table) = self.store.table_for_read(table_name) {
            for key in keys {
                let storage_key = StorageKey::from_db_key(key);
                if let Some(entry) = table.get(&storage_key) {
                    items.push(decode(&entry));
                }
            }
        }
        Ok(OperationResult::ok(Some(items)))
    }

    pub async fn exists(
        &self,
        table_name: &str,
        key: &DbKey,
        conditions: ConditionTree,
    ) -> Result<OperationResult<bool>> {
        require_table_name(table_name)?;
        require_flat_conditions(&conditions)?;
        let Some(table) = self.store.table_for_read(table_name) else {
            return Ok(OperationResult::not_found("table does not exist"));
        };
        let storage_key = StorageKey::from_db_key(key);
        let Some(versioned) = table.get(&storage_key).map(|entry| entry.clone()) else {
            return Ok(OperationResult::not_found("item does not exist"));
        };
        let json = Value::Object(decode(&versioned));
        if evaluate(&conditions, &json) {
            Ok(OperationResult::ok(Some(true)))
        } else {
            Ok(OperationResult::condition_failed("condition not satisfied"))
        }
    }

    pub async fn update(
        &self,
        table_name: &str,
        key: &DbKey,
        partial_item: Item,
        return_behavior: ReturnBehavior,
        conditions: ConditionTree,
    ) -> Result<OperationResult<Item>> {
        require_table_name(table_name)?;
        require_flat_conditions(&conditions)?;
        let encoded_patch = polystore_codec::encode_item_for_write(partial_item);
        let table = self.store.table_for_write(table_name);
        let storage_key = StorageKey::from_db_key(key);

        let decide = |existing: Option<&Item>| -> Result<DomainOutcome<()>> {
            let mut new_item = existing.cloned().unwrap_or_default();
            for (attribute, value) in &encoded_patch {
                if value.is_null() {
                    new_item.remove(attribute);
                } else {
                    new_item.insert(attribute.clone(), value.clone());
                }
            }
            Ok(DomainOutcome::Apply(MutationPlan {
                new_document: Some(new_item),
                payload: (),
            }))
        };

        let outcome = if self.dialect_supports(&conditions) {
            atomic_mutate(&table, &storage_key, key, &conditions, false, decide).await?
        } else {
            cas_mutate(table, storage_key, key.clone(), self.retry, conditions, false, decide).await?
        };
        Ok(finish_item_result(outcome, return_behavior))
    }

    pub async fn delete(
        &self,
        table_name: &str,
        key: &DbKey,
        return_behavior: ReturnBehavior,
        conditions: ConditionTree,
    ) -> Result<OperationResult<Item>> {
        require_table_name(table_name)?;
        require_flat_conditions(&conditions)?;
        let table = self.store.table_for_write(table_name);
        let storage_key = StorageKey::from_db_key(key);

        let decide = |_existing: Option<&Item>| -> Result<DomainOutcome<()>> {
            Ok(DomainOutcome::Apply(MutationPlan {
                new_document: None,
                payload: (),
            }))
        };

        let outcome = if self.dialect_supports(&conditions) {
            atomic_mutate(&table, &storage_key, key, &conditions, true, decide).await?
        } else {
            cas_mutate(table, storage_key, key.clone(), self.retry, conditions, true, decide).await?
        };
        Ok(finish_item_result(outcome, return_behavior))
    }

    pub async fn increment(
        &self,
        table_name: &str,
        key: &DbKey,
        attribute: &str,
        delta: f64,
        conditions: ConditionTree,
    ) -> Result<OperationResult<f64>> {
        require_table_name(table_name)?;
        require_flat_attribute(attribute)?;
        require_flat_conditions(&conditions)?;
        if !delta.is_finite() {
            return Err(Error::Validation(ValidationError::NonFiniteIncrementDelta(
                delta.to_string(),
            )));
        }
        let table = self.store.table_for_write(table_name);
        let storage_key = StorageKey::from_db_key(key);

        let decide = |existing: Option<&Item>| -> Result<DomainOutcome<f64>> {
            let current = existing.and_then(|item| item.get(attribute));
            let current_value = match current {
                None => 0.0,
                Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
                Some(_) => {
                    return Ok(DomainOutcome::Reject {
                        status_code: 409,
                        message: format!("attribute '{attribute}' is not numeric"),
                    })
                }
            };
            let new_value = current_value + delta;
            let mut new_item = existing.cloned().unwrap_or_default();
            new_item.insert(attribute.to_string(), numeric_json(new_value));
            Ok(DomainOutcome::Apply(MutationPlan {
                new_document: Some(new_item),
                payload: new_value,
            }))
        };

        let outcome = if self.dialect_supports(&conditions) {
            atomic_mutate(&table, &storage_key, key, &conditions, false, decide).await?
        } else {
            cas_mutate(table, storage_key, key.clone(), self.retry, conditions, false, decide).await?
        };
        Ok(if outcome.success {
            OperationResult::ok(outcome.payload)
        } else {
            OperationResult::failure(outcome.status_code, outcome.message)
        })
    }

    pub async fn add_to_array(
        &self,
        table_name: &str,
        key: &DbKey,
        attribute: &str,
        elements: Vec<Primitive>,
        return_behavior: ReturnBehavior,
        conditions: ConditionTree,
    ) -> Result<OperationResult<Item>> {
        require_table_name(table_name)?;
        require_flat_attribute(attribute)?;
        require_flat_conditions(&conditions)?;
        let table = self.store.table_for_write(table_name);
        let storage_key = StorageKey::from_db_key(key);

        let decide = |existing: Option<&Item>| -> Result<DomainOutcome<()>> {
            let mut array = match existing.and_then(|item| item.get(attribute)) {
                None => Vec::new(),
                Some(Value::Array(elements)) => elements.clone(),
                Some(_) => {
                    return Ok(DomainOutcome::Reject {
                        status_code: 409,
                        message: format!("attribute '{attribute}' is not an array"),
                    })
                }
            };
            for element in &elements {
                array.push(polystore_codec::primitive_to_json(element));
            }
            let mut new_item = existing.cloned().unwrap_or_default();
            new_item.insert(attribute.to_string(), Value::Array(array));
            Ok(DomainOutcome::Apply(MutationPlan {
                new_document: Some(new_item),
                payload: (),
            }))
        };

        let outcome = if self.dialect_supports(&conditions) {
            atomic_mutate(&table, &storage_key, key, &conditions, false, decide).await?
        } else {
            cas_mutate(table, storage_key, key.clone(), self.retry, conditions, false, decide).await?
        };
        Ok(finish_item_result(outcome, return_behavior))
    }

    pub async fn remove_from_array(
        &self,
        table_name: &str,
        key: &DbKey,
        attribute: &str,
        elements: Vec<Primitive>,
        return_behavior: ReturnBehavior,
        conditions: ConditionTree,
    ) -> Result<OperationResult<Item>> {
        require_table_name(table_name)?;
        require_flat_attribute(attribute)?;
        require_flat_conditions(&conditions)?;
        let table = self.store.table_for_write(table_name);
        let storage_key = StorageKey::from_db_key(key);

        let decide = |existing: Option<&Item>| -> Result<DomainOutcome<()>> {
            let array = match existing.and_then(|item| item.get(attribute)) {
                None => Vec::new(),
                Some(Value::Array(elements)) => elements.clone(),
                Some(_) => {
                    return Ok(DomainOutcome::Reject {
                        status_code: 409,
                        message: format!("attribute '{attribute}' is not an array"),
                    })
                }
            };
            let filtered: Vec<Value> = array
                .into_iter()
                .filter(|value| {
                    let as_primitive = polystore_codec::json_to_primitive(value);
                    !elements.iter().any(|needle| as_primitive.as_ref() == Some(needle))
                })
                .collect();
            let mut new_item = existing.cloned().unwrap_or_default();
            new_item.insert(attribute.to_string(), Value::Array(filtered));
            Ok(DomainOutcome::Apply(MutationPlan {
                new_document: Some(new_item),
                payload: (),
            }))
        };

        let outcome = if self.dialect_supports(&conditions) {
            atomic_mutate(&table, &storage_key, key, &conditions, false, decide).await?
        } else {
            cas_mutate(table, storage_key, key.clone(), self.retry, conditions, false, decide).await?
        };
        Ok(finish_item_result(outcome, return_behavior))
    }

    pub async fn scan_table(&self, table_name: &str) -> Result<OperationResult<ScanPage>> {
        require_table_name(table_name)?;
        self.scan_with_filter(table_name, &ConditionTree::Empty).await
    }

    pub async fn scan_table_filtered(
        &self,
        table_name: &str,
        conditions: ConditionTree,
    ) -> Result<OperationResult<ScanPage>> {
        require_table_name(table_name)?;
        require_flat_conditions(&conditions)?;
        self.scan_with_filter(table_name, &conditions).await
    }

    async fn scan_with_filter(
        &self,
        table_name: &str,
        conditions: &ConditionTree,
    ) -> Result<OperationResult<ScanPage>> {
        let Some(table) = self.store.table_for_read(table_name) else {
            return Ok(OperationResult::ok(Some(ScanPage::default())));
        };
        let mut keys = BTreeSet::new();
        let mut items = Vec::new();
        for entry in table.iter() {
            let versioned = entry.value();
            let decoded = decode(versioned);
            if evaluate(conditions, &Value::Object(decoded.clone())) {
                keys.insert(versioned.key.attribute_name().to_string());
                items.push(decoded);
            }
        }
        Ok(OperationResult::ok(Some(ScanPage {
            keys,
            items,
            next_page_token: None,
        })))
    }

    pub async fn scan_paginated(
        &self,
        table_name: &str,
        page_size: usize,
        page_token: Option<String>,
    ) -> Result<OperationResult<ScanPage>> {
        require_table_name(table_name)?;
        let Some(table) = self.store.table_for_read(table_name) else {
            return Ok(OperationResult::ok(Some(ScanPage::default())));
        };
        if page_size == 0 {
            return Err(Error::Validation(ValidationError::NonPositivePageSize));
        }
        let page_size = page_size.min(self.pagination.max_page_size);
        let offset = match page_token {
            Some(token) => decode_offset(&token)?,
            None => 0,
        };

        let mut all: Vec<VersionedItem> = table.iter().map(|entry| entry.value().clone()).collect();
        all.sort_by(|a, b| {
            StorageKey::from_db_key(&a.key)
                .sort_key()
                .cmp(&StorageKey::from_db_key(&b.key).sort_key())
        });

        let mut keys = BTreeSet::new();
        let items: Vec<Item> = all
            .iter()
            .skip(offset)
            .take(page_size)
            .map(|versioned| {
                keys.insert(versioned.key.attribute_name().to_string());
                decode(versioned)
            })
            .collect();

        let next_offset = offset + items.len();
        let next_page_token = if next_offset < all.len() {
            Some(encode_offset(next_offset))
        } else {
            None
        };

        Ok(OperationResult::ok(Some(ScanPage {
            keys,
            items,
            next_page_token,
        })))
    }

    pub async fn drop_table(&self, table_name: &str) -> Result<OperationResult<bool>> {
        require_table_name(table_name)?;
        let existed = self.store.drop_table(table_name);
        Ok(OperationResult::ok(Some(existed)))
    }

    pub async fn list_tables(&self) -> Result<OperationResult<BTreeSet<String>>> {
        Ok(OperationResult::ok(Some(self.store.list_tables())))
    }

    pub async fn list_key_names(&self, table_name: &str) -> Result<OperationResult<BTreeSet<String>>> {
        require_table_name(table_name)?;
        let Some(table) = self.store.table_for_read(table_name) else {
            return Ok(OperationResult::ok(Some(BTreeSet::new())));
        };
        let names = table
            .iter()
            .map(|entry| entry.value().key.attribute_name().to_string())
            .collect();
        Ok(OperationResult::ok(Some(names)))
    }
}

fn numeric_json(value: f64) -> Value {
    if value.is_finite() && value.fract() == 0.0 && value >= i64::MIN as f64 && value <= i64::MAX as f64 {
        #[allow(clippy::cast_possible_truncation)]
        serde_json::json!(value as i64)
    } else {
        serde_json::json!(value)
    }
}
