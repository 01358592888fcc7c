//! Generic native-condition compiler scaffolding (§4.7).
//!
//! A provider's condition compiler supplies a [`LeafDialect`] — the
//! vocabulary it can render a leaf into — and reuses
//! [`compile_with_dialect`] to walk the tree, allocate placeholders and
//! join rendered leaves with the backend's boolean operators. A dialect
//! that cannot express a particular leaf (e.g. array membership on a
//! backend with no native "contains" operator) returns `None` from
//! `render`, and the walk fails with [`UnsupportedLeaf`] so the caller can
//! fall back to the CAS emulator (§4.6) instead.

use std::collections::HashMap;
use std::fmt;

use polystore_common::Primitive;

use crate::leaf::ConditionLeaf;
use crate::tree::{BoolOp, ConditionTree};

/// Assigns stable placeholder tokens for attribute names and values during
/// one compile pass. Repeated attribute names within the same tree share a
/// placeholder; each value occurrence gets its own, since values aren't
/// required to implement value-identity/hashing.
#[derive(Debug, Default)]
pub struct PlaceholderAllocator {
    names: HashMap<String, String>,
    next_name: usize,
    next_value: usize,
    values: HashMap<String, Primitive>,
}

impl PlaceholderAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the placeholder for `attribute_name`, allocating one the
    /// first time this name is seen.
    pub fn name(&mut self, attribute_name: &str) -> String {
        if let Some(existing) = self.names.get(attribute_name) {
            return existing.clone();
        }
        let placeholder = format!("#n{}", self.next_name);
        self.next_name += 1;
        self.names.insert(attribute_name.to_string(), placeholder.clone());
        placeholder
    }

    /// Allocates a fresh placeholder bound to `value`.
    pub fn value(&mut self, value: Primitive) -> String {
        let placeholder = format!(":v{}", self.next_value);
        self.next_value += 1;
        self.values.insert(placeholder.clone(), value);
        placeholder
    }

    fn into_names_map(self) -> (HashMap<String, String>, HashMap<String, Primitive>) {
        let names = self
            .names
            .into_iter()
            .map(|(real, placeholder)| (placeholder, real))
            .collect();
        (names, self.values)
    }
}

/// The rendered form of a condition tree for one provider's native query
/// language, along with the placeholder maps the backend call needs
/// alongside the expression string.
#[derive(Debug, Clone)]
pub struct CompiledCondition {
    pub expression: String,
    /// Placeholder -> real attribute name.
    pub names: HashMap<String, String>,
    /// Placeholder -> bound value.
    pub values: HashMap<String, Primitive>,
}

/// The leaf a dialect could not render natively.
#[derive(Debug, Clone)]
pub struct UnsupportedLeaf(pub ConditionLeaf);

impl fmt::Display for UnsupportedLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "condition leaf on attribute '{}' has no native rendering for this provider",
            self.0.attribute_name()
        )
    }
}

impl std::error::Error for UnsupportedLeaf {}

/// A provider's native rendering of atomic condition leaves.
///
/// Implementors only need to handle the leaves their backend can express
/// natively; returning `None` for the rest lets the caller fall back to
/// the CAS emulator instead of failing the whole compile.
pub trait LeafDialect {
    /// Renders one leaf as a fragment of the backend's condition
    /// expression language, using `alloc` for any placeholders it needs.
    /// Returns `None` if this dialect cannot express the leaf at all.
    fn render(&self, leaf: &ConditionLeaf, alloc: &mut PlaceholderAllocator) -> Option<String>;

    /// The backend's native AND token, e.g. `"AND"`.
    fn and_token(&self) -> &str {
        "AND"
    }

    /// The backend's native OR token, e.g. `"OR"`.
    fn or_token(&self) -> &str {
        "OR"
    }
}

/// Walks `tree`, rendering each leaf through `dialect` and joining the
/// results with the dialect's boolean tokens. An `Empty` tree compiles to
/// an empty expression that the caller should treat as "no condition".
///
/// # Errors
/// Returns the first leaf the dialect cannot render.
pub fn compile_with_dialect(
    tree: &ConditionTree,
    dialect: &impl LeafDialect,
) -> Result<CompiledCondition, UnsupportedLeaf> {
    let mut alloc = PlaceholderAllocator::new();
    let expression = render_tree(tree, dialect, &mut alloc)?;
    let (names, values) = alloc.into_names_map();
    Ok(CompiledCondition {
        expression,
        names,
        values,
    })
}

fn render_tree(
    tree: &ConditionTree,
    dialect: &impl LeafDialect,
    alloc: &mut PlaceholderAllocator,
) -> Result<String, UnsupportedLeaf> {
    match tree {
        ConditionTree::Empty => Ok(String::new()),
        ConditionTree::Leaf(leaf) => dialect
            .render(leaf, alloc)
            .ok_or_else(|| UnsupportedLeaf(leaf.clone())),
        ConditionTree::Node { op, left, right } => {
            let left_expr = render_tree(left, dialect, alloc)?;
            let right_expr = render_tree(right, dialect, alloc)?;
            let token = match op {
                BoolOp::And => dialect.and_token(),
                BoolOp::Or => dialect.or_token(),
            };
            Ok(format!("({left_expr} {token} {right_expr})"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ToyDialect;

    impl LeafDialect for ToyDialect {
        fn render(&self, leaf: &ConditionLeaf, alloc: &mut PlaceholderAllocator) -> Option<String> {
            match leaf {
                ConditionLeaf::AttributeExists(name) => {
                    Some(format!("attribute_exists({})", alloc.name(name)))
                }
                ConditionLeaf::AttributeEquals(name, value) => {
                    let n = alloc.name(name);
                    let v = alloc.value(value.clone());
                    Some(format!("{n} = {v}"))
                }
                _ => None,
            }
        }
    }

    #[test]
    fn renders_leaf_with_placeholders() {
        let tree = ConditionTree::leaf(ConditionLeaf::AttributeEquals(
            "status".into(),
            Primitive::string("active"),
        ));
        let compiled = compile_with_dialect(&tree, &ToyDialect).unwrap();
        assert_eq!(compiled.expression, "#n0 = :v0");
        assert_eq!(compiled.names.get("#n0").unwrap(), "status");
        assert_eq!(compiled.values.get(":v0").unwrap(), &Primitive::string("active"));
    }

    #[test]
    fn repeated_name_reuses_placeholder() {
        let tree = ConditionTree::leaf(ConditionLeaf::AttributeExists("status".into())).and(
            ConditionTree::leaf(ConditionLeaf::AttributeEquals(
                "status".into(),
                Primitive::integer(1),
            )),
        );
        let compiled = compile_with_dialect(&tree, &ToyDialect).unwrap();
        assert_eq!(compiled.names.len(), 1);
        assert!(compiled.expression.contains("#n0"));
    }

    #[test]
    fn unsupported_leaf_is_reported() {
        let tree = ConditionTree::leaf(ConditionLeaf::ArrayElementExists(
            "tags".into(),
            Primitive::string("x"),
        ));
        let err = compile_with_dialect(&tree, &ToyDialect).unwrap_err();
        assert_eq!(err.0.attribute_name(), "tags");
    }
}
