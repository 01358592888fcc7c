//! Conformance suite for `DatabaseService` (§8).
//!
//! Every test in this file is parametrized over both reference providers
//! via `rstest` so a single suite proves §8's universal invariants hold
//! independent of which condition dialect backs the service.

use std::sync::Arc;

use rstest::rstest;
use serde_json::json;

use polystore_common::config::{PaginationConfig, RetryConfig};
use polystore_common::{DbKey, Primitive, ReturnBehavior};
use polystore_condition::ConditionTree;
use polystore_providers::{EmulatedProvider, NativeProvider};
use polystore_service::{DatabaseService, Item};

fn emulated() -> Arc<dyn DatabaseService> {
    Arc::new(EmulatedProvider::new(RetryConfig::default(), PaginationConfig::default()))
}

fn native() -> Arc<dyn DatabaseService> {
    Arc::new(NativeProvider::new(RetryConfig::default(), PaginationConfig::default()))
}

fn key(value: i64) -> DbKey {
    DbKey::new("id", Primitive::integer(value)).unwrap()
}

fn item(fields: serde_json::Value) -> Item {
    fields.as_object().unwrap().clone()
}

// ============================================================================
// Universal invariants (§8)
// ============================================================================

#[rstest]
#[case::emulated(emulated())]
#[case::native(native())]
#[tokio::test]
async fn put_then_get_round_trips(#[case] db: Arc<dyn DatabaseService>) {
    let original = item(json!({"name": "ada", "age": 36}));
    db.put("users", &key(1), original.clone(), true, ReturnBehavior::DoNotReturn, ConditionTree::Empty)
        .await
        .unwrap();

    let fetched = db.get("users", &key(1)).await.unwrap();
    assert!(fetched.success);
    let fetched_item = fetched.data.unwrap().unwrap();
    assert_eq!(fetched_item.get("name"), original.get("name"));
    assert_eq!(fetched_item.get("age"), original.get("age"));
    assert_eq!(fetched_item.get("id"), Some(&json!(1)));
}

#[rstest]
#[case::emulated(emulated())]
#[case::native(native())]
#[tokio::test]
async fn failed_conditional_update_leaves_state_untouched(#[case] db: Arc<dyn DatabaseService>) {
    db.put(
        "accounts",
        &key(1),
        item(json!({"balance": 100})),
        true,
        ReturnBehavior::DoNotReturn,
        ConditionTree::Empty,
    )
    .await
    .unwrap();

    let impossible = db.conditions().attribute_equals("balance", 999_i64);
    let result = db
        .update(
            "accounts",
            &key(1),
            item(json!({"balance": 50})),
            ReturnBehavior::DoNotReturn,
            impossible,
        )
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.status_code, 412);

    let unchanged = db.get("accounts", &key(1)).await.unwrap().data.unwrap().unwrap();
    assert_eq!(unchanged.get("balance"), Some(&json!(100)));
}

#[rstest]
#[case::emulated(emulated())]
#[case::native(native())]
#[tokio::test]
async fn empty_condition_is_identity(#[case] db: Arc<dyn DatabaseService>) {
    db.put("docs", &key(1), item(json!({"v": 1})), true, ReturnBehavior::DoNotReturn, ConditionTree::Empty)
        .await
        .unwrap();

    let with_empty = db
        .update(
            "docs",
            &key(1),
            item(json!({"v": 2})),
            ReturnBehavior::ReturnNewValues,
            ConditionTree::Empty,
        )
        .await
        .unwrap();
    assert!(with_empty.success);
    assert_eq!(with_empty.data.unwrap().get("v"), Some(&json!(2)));
}

#[rstest]
#[case::emulated(emulated())]
#[case::native(native())]
#[tokio::test]
async fn array_mutation_preserves_other_attributes(#[case] db: Arc<dyn DatabaseService>) {
    db.put(
        "docs",
        &key(1),
        item(json!({"tags": ["a"], "title": "hello"})),
        true,
        ReturnBehavior::DoNotReturn,
        ConditionTree::Empty,
    )
    .await
    .unwrap();

    let result = db
        .add_to_array(
            "docs",
            &key(1),
            "tags",
            vec![Primitive::string("b")],
            ReturnBehavior::ReturnNewValues,
            ConditionTree::Empty,
        )
        .await
        .unwrap();
    let updated = result.data.unwrap();
    assert_eq!(updated.get("title"), Some(&json!("hello")));
    assert_eq!(updated.get("tags"), Some(&json!(["a", "b"])));
}

#[rstest]
#[case::emulated(emulated())]
#[case::native(native())]
#[tokio::test]
async fn drop_table_is_idempotent(#[case] db: Arc<dyn DatabaseService>) {
    db.put("scratch", &key(1), Item::new(), true, ReturnBehavior::DoNotReturn, ConditionTree::Empty)
        .await
        .unwrap();

    let first = db.drop_table("scratch").await.unwrap();
    let second = db.drop_table("scratch").await.unwrap();
    assert!(first.success);
    assert!(second.success);
}

#[rstest]
#[case::emulated(emulated())]
#[case::native(native())]
#[tokio::test]
async fn pagination_covers_every_item_exactly_once(#[case] db: Arc<dyn DatabaseService>) {
    for i in 0..25i64 {
        db.put(
            "paged",
            &key(i),
            item(json!({"n": i})),
            true,
            ReturnBehavior::DoNotReturn,
            ConditionTree::Empty,
        )
        .await
        .unwrap();
    }

    let mut seen = Vec::new();
    let mut token = None;
    loop {
        let page = db.scan_paginated("paged", 10, token).await.unwrap();
        assert!(page.success);
        let page = page.data.unwrap();
        seen.extend(page.items.iter().map(|i| i["n"].as_i64().unwrap()));
        token = page.next_page_token;
        if token.is_none() {
            break;
        }
    }
    seen.sort_unstable();
    assert_eq!(seen, (0..25).collect::<Vec<_>>());

    let full_scan = db.scan_table("paged").await.unwrap().data.unwrap();
    assert_eq!(full_scan.items.len(), 25);
}

#[rstest]
#[case::emulated(emulated())]
#[case::native(native())]
#[tokio::test]
async fn heterogeneous_key_attribute_names_coexist(#[case] db: Arc<dyn DatabaseService>) {
    let by_id = DbKey::new("id", Primitive::integer(1)).unwrap();
    let by_code = DbKey::new("code", Primitive::string("abc")).unwrap();

    db.put("mixed", &by_id, Item::new(), true, ReturnBehavior::DoNotReturn, ConditionTree::Empty)
        .await
        .unwrap();
    db.put("mixed", &by_code, Item::new(), true, ReturnBehavior::DoNotReturn, ConditionTree::Empty)
        .await
        .unwrap();

    let key_names = db.list_key_names("mixed").await.unwrap().data.unwrap();
    assert!(key_names.contains("id"));
    assert!(key_names.contains("code"));
}

// ============================================================================
// Concrete scenarios (S1-S8)
// ============================================================================

#[rstest]
#[case::emulated(emulated())]
#[case::native(native())]
#[tokio::test]
async fn overwrite_guard_rejects_existing_item(#[case] db: Arc<dyn DatabaseService>) {
    db.put("guarded", &key(1), Item::new(), true, ReturnBehavior::DoNotReturn, ConditionTree::Empty)
        .await
        .unwrap();

    let result = db
        .put("guarded", &key(1), Item::new(), false, ReturnBehavior::DoNotReturn, ConditionTree::Empty)
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.status_code, 409);
}

#[rstest]
#[case::emulated(emulated())]
#[case::native(native())]
#[tokio::test]
async fn increment_on_missing_attribute_starts_from_zero(#[case] db: Arc<dyn DatabaseService>) {
    db.put("counters", &key(1), Item::new(), true, ReturnBehavior::DoNotReturn, ConditionTree::Empty)
        .await
        .unwrap();

    let result = db
        .increment("counters", &key(1), "views", 5.0, ConditionTree::Empty)
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.data, Some(5.0));
}

#[rstest]
#[case::emulated(emulated())]
#[case::native(native())]
#[tokio::test]
async fn remove_from_array_drops_only_the_named_elements(#[case] db: Arc<dyn DatabaseService>) {
    db.put(
        "docs",
        &key(1),
        item(json!({"tags": ["a", "b", "c"]})),
        true,
        ReturnBehavior::DoNotReturn,
        ConditionTree::Empty,
    )
    .await
    .unwrap();

    let result = db
        .remove_from_array(
            "docs",
            &key(1),
            "tags",
            vec![Primitive::string("b")],
            ReturnBehavior::ReturnNewValues,
            ConditionTree::Empty,
        )
        .await
        .unwrap();
    assert_eq!(result.data.unwrap().get("tags"), Some(&json!(["a", "c"])));
}

#[rstest]
#[case::emulated(emulated())]
#[case::native(native())]
#[tokio::test]
async fn complex_boolean_condition_over_existence_and_membership(#[case] db: Arc<dyn DatabaseService>) {
    db.put(
        "docs",
        &key(1),
        item(json!({"status": "active", "tags": ["urgent"]})),
        true,
        ReturnBehavior::DoNotReturn,
        ConditionTree::Empty,
    )
    .await
    .unwrap();

    let condition = db.conditions().and(
        db.conditions().attribute_exists("status"),
        db.conditions().array_element_exists("tags", "urgent"),
    );
    let result = db.exists("docs", &key(1), condition).await.unwrap();
    assert!(result.success);

    let mismatched = db.conditions().and(
        db.conditions().attribute_exists("status"),
        db.conditions().array_element_exists("tags", "missing"),
    );
    let result = db.exists("docs", &key(1), mismatched).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.status_code, 412);
}

#[rstest]
#[case::emulated(emulated())]
#[case::native(native())]
#[tokio::test]
async fn delete_of_missing_item_is_not_found(#[case] db: Arc<dyn DatabaseService>) {
    let result = db
        .delete("empty_table", &key(1), ReturnBehavior::DoNotReturn, ConditionTree::Empty)
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.status_code, 404);
}
