//! Per-provider condition dialects (§4.7).
//!
//! Both dialects render a DynamoDB-flavored expression string — enough to
//! demonstrate the placeholder compiler and to log what was sent "over the
//! wire" (§4.10). Truth is decided in-process by `polystore_condition::evaluate`
//! against the live document, the same way a real backend's own engine
//! would interpret the expression it just compiled; the dialect's only
//! real job here is reporting whether it *can* express a leaf at all.

use polystore_condition::{ConditionLeaf, LeafDialect, PlaceholderAllocator};

/// Wide-column-style dialect: cannot express array-membership leaves in a
/// conditional-write expression, so those route through the CAS emulator.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmulatedDialect;

impl LeafDialect for EmulatedDialect {
    fn render(&self, leaf: &ConditionLeaf, alloc: &mut PlaceholderAllocator) -> Option<String> {
        if leaf.is_array_membership() {
            return None;
        }
        Some(render_attribute_leaf(leaf, alloc))
    }
}

/// Document-store-style dialect: its update-expression language has a
/// native `CONTAINS`, so it can express every leaf atomically and never
/// needs the emulator.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeDialect;

impl LeafDialect for NativeDialect {
    fn render(&self, leaf: &ConditionLeaf, alloc: &mut PlaceholderAllocator) -> Option<String> {
        Some(render_attribute_leaf(leaf, alloc))
    }
}

fn render_attribute_leaf(leaf: &ConditionLeaf, alloc: &mut PlaceholderAllocator) -> String {
    match leaf {
        ConditionLeaf::AttributeExists(name) => format!("attribute_exists({})", alloc.name(name)),
        ConditionLeaf::AttributeNotExists(name) => {
            format!("attribute_not_exists({})", alloc.name(name))
        }
        ConditionLeaf::AttributeEquals(name, value) => {
            format!("{} = {}", alloc.name(name), alloc.value(value.clone()))
        }
        ConditionLeaf::AttributeNotEquals(name, value) => {
            format!("{} <> {}", alloc.name(name), alloc.value(value.clone()))
        }
        ConditionLeaf::AttributeGreater(name, value) => {
            format!("{} > {}", alloc.name(name), alloc.value(value.clone()))
        }
        ConditionLeaf::AttributeGreaterOrEqual(name, value) => {
            format!("{} >= {}", alloc.name(name), alloc.value(value.clone()))
        }
        ConditionLeaf::AttributeLess(name, value) => {
            format!("{} < {}", alloc.name(name), alloc.value(value.clone()))
        }
        ConditionLeaf::AttributeLessOrEqual(name, value) => {
            format!("{} <= {}", alloc.name(name), alloc.value(value.clone()))
        }
        ConditionLeaf::ArrayElementExists(name, value) => {
            format!("contains({}, {})", alloc.name(name), alloc.value(value.clone()))
        }
        ConditionLeaf::ArrayElementNotExists(name, value) => {
            format!("(not contains({}, {}))", alloc.name(name), alloc.value(value.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_condition::compile_with_dialect;
    use polystore_common::Primitive;

    #[test]
    fn emulated_dialect_rejects_array_membership() {
        let leaf = ConditionLeaf::ArrayElementExists("tags".into(), Primitive::string("x"));
        let tree = polystore_condition::ConditionTree::leaf(leaf);
        assert!(compile_with_dialect(&tree, &EmulatedDialect).is_err());
    }

    #[test]
    fn native_dialect_accepts_array_membership() {
        let leaf = ConditionLeaf::ArrayElementExists("tags".into(), Primitive::string("x"));
        let tree = polystore_condition::ConditionTree::leaf(leaf);
        assert!(compile_with_dialect(&tree, &NativeDialect).is_ok());
    }
}
