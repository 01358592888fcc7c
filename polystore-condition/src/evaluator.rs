//! In-memory reference evaluator (§4.2, §4.6).
//!
//! Walks a [`ConditionTree`] against a `serde_json::Value` item, the same
//! shape the codec produces after decoding a stored item. Used directly by
//! tests and as the fallback path for providers whose native dialect cannot
//! express a given leaf (the emulated provider's array-membership leaves).

use serde_json::Value;

use polystore_common::Primitive;

use crate::leaf::ConditionLeaf;
use crate::tree::{BoolOp, ConditionTree};

/// Evaluates `tree` against `item`. An empty tree is always satisfied.
#[must_use]
pub fn evaluate(tree: &ConditionTree, item: &Value) -> bool {
    match tree {
        ConditionTree::Empty => true,
        ConditionTree::Leaf(leaf) => evaluate_leaf(leaf, item),
        ConditionTree::Node { op, left, right } => match op {
            BoolOp::And => evaluate(left, item) && evaluate(right, item),
            BoolOp::Or => evaluate(left, item) || evaluate(right, item),
        },
    }
}

fn evaluate_leaf(leaf: &ConditionLeaf, item: &Value) -> bool {
    match leaf {
        ConditionLeaf::AttributeExists(name) => lookup(item, name).is_some(),
        ConditionLeaf::AttributeNotExists(name) => lookup(item, name).is_none(),
        ConditionLeaf::AttributeEquals(name, expected) => {
            matches_primitive(lookup(item, name), expected, |a, b| a == b)
        }
        ConditionLeaf::AttributeNotEquals(name, expected) => match lookup(item, name) {
            // Absent is not a witness of "not equal" in the same sense a
            // present-but-different value is; it has nothing to compare
            // against, so the leaf fails just like the other comparisons do.
            None => false,
            Some(value) => to_primitive(value).is_some_and(|actual| actual != *expected),
        },
        ConditionLeaf::AttributeGreater(name, expected) => {
            compare_numeric(lookup(item, name), expected, |ord| ord.is_gt())
        }
        ConditionLeaf::AttributeGreaterOrEqual(name, expected) => {
            compare_numeric(lookup(item, name), expected, |ord| ord.is_ge())
        }
        ConditionLeaf::AttributeLess(name, expected) => {
            compare_numeric(lookup(item, name), expected, |ord| ord.is_lt())
        }
        ConditionLeaf::AttributeLessOrEqual(name, expected) => {
            compare_numeric(lookup(item, name), expected, |ord| ord.is_le())
        }
        ConditionLeaf::ArrayElementExists(name, needle) => array_contains(item, name, needle),
        ConditionLeaf::ArrayElementNotExists(name, needle) => !array_contains(item, name, needle),
    }
}

fn lookup<'a>(item: &'a Value, name: &str) -> Option<&'a Value> {
    item.as_object().and_then(|map| map.get(name))
}

fn matches_primitive(
    found: Option<&Value>,
    expected: &Primitive,
    cmp: impl Fn(&Primitive, &Primitive) -> bool,
) -> bool {
    found
        .and_then(to_primitive)
        .is_some_and(|actual| cmp(&actual, expected))
}

fn compare_numeric(
    found: Option<&Value>,
    expected: &Primitive,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> bool {
    found
        .and_then(to_primitive)
        .and_then(|actual| actual.partial_cmp_numeric(expected))
        .is_some_and(accept)
}

fn array_contains(item: &Value, name: &str, needle: &Primitive) -> bool {
    let Some(Value::Array(elements)) = lookup(item, name) else {
        return false;
    };
    elements
        .iter()
        .filter_map(to_primitive)
        .any(|element| element == *needle)
}

/// Converts a decoded JSON scalar back into a [`Primitive`] for comparison.
/// Arrays, objects and null never match a primitive leaf directly.
fn to_primitive(value: &Value) -> Option<Primitive> {
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
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_tree_always_satisfied() {
        assert!(evaluate(&ConditionTree::Empty, &json!({})));
    }

    #[test]
    fn exists_and_not_exists_are_complementary() {
        let item = json!({"a": 1});
        assert!(evaluate(
            &ConditionTree::leaf(ConditionLeaf::AttributeExists("a".into())),
            &item
        ));
        assert!(evaluate(
            &ConditionTree::leaf(ConditionLeaf::AttributeNotExists("b".into())),
            &item
        ));
        assert!(!evaluate(
            &ConditionTree::leaf(ConditionLeaf::AttributeExists("b".into())),
            &item
        ));
    }

    #[test]
    fn comparisons_fail_on_absent_attribute() {
        let item = json!({});
        let leaves = [
            ConditionLeaf::AttributeEquals("x".into(), Primitive::integer(1)),
            ConditionLeaf::AttributeNotEquals("x".into(), Primitive::integer(1)),
            ConditionLeaf::AttributeGreater("x".into(), Primitive::integer(1)),
            ConditionLeaf::AttributeLess("x".into(), Primitive::integer(1)),
        ];
        for leaf in leaves {
            assert!(!evaluate(&ConditionTree::leaf(leaf), &item));
        }
    }

    #[test]
    fn and_short_circuits_and_or_is_inclusive() {
        let item = json!({"a": 1});
        let a_exists = ConditionTree::leaf(ConditionLeaf::AttributeExists("a".into()));
        let b_exists = ConditionTree::leaf(ConditionLeaf::AttributeExists("b".into()));
        assert!(!evaluate(&a_exists.clone().and(b_exists.clone()), &item));
        assert!(evaluate(&a_exists.or(b_exists), &item));
    }

    #[test]
    fn array_membership_checks_element_equality() {
        let item = json!({"tags": ["x", "y"]});
        assert!(evaluate(
            &ConditionTree::leaf(ConditionLeaf::ArrayElementExists(
                "tags".into(),
                Primitive::string("x")
            )),
            &item
        ));
        assert!(evaluate(
            &ConditionTree::leaf(ConditionLeaf::ArrayElementNotExists(
                "tags".into(),
                Primitive::string("z")
            )),
            &item
        ));
    }

    #[test]
    fn numeric_comparison_crosses_integer_and_double() {
        let item = json!({"n": 5});
        assert!(evaluate(
            &ConditionTree::leaf(ConditionLeaf::AttributeGreater(
                "n".into(),
                Primitive::double(4.5)
            )),
            &item
        ));
    }
}
