//! Condition tree construction, held by the service rather than attached
//! to `Primitive` itself (§6), so a provider is free to attach optimization
//! hints at construction without reopening `polystore-common`.

use polystore_common::Primitive;
use polystore_condition::{ConditionLeaf, ConditionTree};

/// Builds `ConditionTree`s from their constituent leaves. Stateless today;
/// kept as a type (rather than free functions) so a provider can grow one
/// with its own optimization hints without changing the `DatabaseService`
/// trait's shape.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConditionFactory;

impl ConditionFactory {
    #[must_use]
    pub fn attribute_exists(self, name: impl Into<String>) -> ConditionTree {
        ConditionTree::leaf(ConditionLeaf::AttributeExists(name.into()))
    }

    #[must_use]
    pub fn attribute_not_exists(self, name: impl Into<String>) -> ConditionTree {
        ConditionTree::leaf(ConditionLeaf::AttributeNotExists(name.into()))
    }

    #[must_use]
    pub fn attribute_equals(self, name: impl Into<String>, value: impl Into<Primitive>) -> ConditionTree {
        ConditionTree::leaf(ConditionLeaf::AttributeEquals(name.into(), value.into()))
    }

    #[must_use]
    pub fn attribute_not_equals(self, name: impl Into<String>, value: impl Into<Primitive>) -> ConditionTree {
        ConditionTree::leaf(ConditionLeaf::AttributeNotEquals(name.into(), value.into()))
    }

    #[must_use]
    pub fn attribute_greater(self, name: impl Into<String>, value: impl Into<Primitive>) -> ConditionTree {
        ConditionTree::leaf(ConditionLeaf::AttributeGreater(name.into(), value.into()))
    }

    #[must_use]
    pub fn attribute_greater_or_equal(self, name: impl Into<String>, value: impl Into<Primitive>) -> ConditionTree {
        ConditionTree::leaf(ConditionLeaf::AttributeGreaterOrEqual(name.into(), value.into()))
    }

    #[must_use]
    pub fn attribute_less(self, name: impl Into<String>, value: impl Into<Primitive>) -> ConditionTree {
        ConditionTree::leaf(ConditionLeaf::AttributeLess(name.into(), value.into()))
    }

    #[must_use]
    pub fn attribute_less_or_equal(self, name: impl Into<String>, value: impl Into<Primitive>) -> ConditionTree {
        ConditionTree::leaf(ConditionLeaf::AttributeLessOrEqual(name.into(), value.into()))
    }

    #[must_use]
    pub fn array_element_exists(self, name: impl Into<String>, value: impl Into<Primitive>) -> ConditionTree {
        ConditionTree::leaf(ConditionLeaf::ArrayElementExists(name.into(), value.into()))
    }

    #[must_use]
    pub fn array_element_not_exists(self, name: impl Into<String>, value: impl Into<Primitive>) -> ConditionTree {
        ConditionTree::leaf(ConditionLeaf::ArrayElementNotExists(name.into(), value.into()))
    }

    #[must_use]
    pub fn and(self, left: ConditionTree, right: ConditionTree) -> ConditionTree {
        left.and(right)
    }

    #[must_use]
    pub fn or(self, left: ConditionTree, right: ConditionTree) -> ConditionTree {
        left.or(right)
    }

    #[must_use]
    pub fn aggregate_and(self, trees: impl IntoIterator<Item = ConditionTree>) -> ConditionTree {
        ConditionTree::aggregate_and(trees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_combined_tree() {
        let factory = ConditionFactory;
        let tree = factory.and(
            factory.attribute_exists("status"),
            factory.attribute_equals("status", "active"),
        );
        assert!(!tree.is_empty());
    }
}
