//! The boolean condition tree (§3, §4.2).
//!
//! Immutable and structurally shared: `And`/`Or` allocate a new node and
//! share operands via `Arc`, never mutating them. There are no parent
//! pointers, so a subtree can be reused across many larger trees cheaply.

use std::sync::Arc;

use crate::leaf::ConditionLeaf;

/// The combinator joining two subtrees at a `Node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

/// A boolean expression over attribute and array predicates.
///
/// `Empty` is the tautology: combined with any tree `T` under `and`/`or` it
/// yields `T` unchanged, and on its own it never rejects an operation
/// (§3 invariant, §8 property 4).
#[derive(Debug, Clone)]
pub enum ConditionTree {
    Empty,
    Leaf(ConditionLeaf),
    Node {
        op: BoolOp,
        left: Arc<ConditionTree>,
        right: Arc<ConditionTree>,
    },
}

impl ConditionTree {
    #[must_use]
    pub fn leaf(leaf: ConditionLeaf) -> Self {
        ConditionTree::Leaf(leaf)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, ConditionTree::Empty)
    }

    /// `And(a, b)`. Neither operand is mutated; `Empty` is absorbed.
    #[must_use]
    pub fn and(self, other: ConditionTree) -> ConditionTree {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => other,
            (_, true) => self,
            (false, false) => ConditionTree::Node {
                op: BoolOp::And,
                left: Arc::new(self),
                right: Arc::new(other),
            },
        }
    }

    /// `Or(a, b)`. Neither operand is mutated; `Empty` is absorbed.
    #[must_use]
    pub fn or(self, other: ConditionTree) -> ConditionTree {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => other,
            (_, true) => self,
            (false, false) => ConditionTree::Node {
                op: BoolOp::Or,
                left: Arc::new(self),
                right: Arc::new(other),
            },
        }
    }

    /// Builds a left-deep AND chain from a list of trees, folding left to
    /// right so short-circuit evaluation proceeds in the given order.
    #[must_use]
    pub fn aggregate_and(trees: impl IntoIterator<Item = ConditionTree>) -> ConditionTree {
        trees
            .into_iter()
            .fold(ConditionTree::Empty, ConditionTree::and)
    }

    /// The first leaf (in left-to-right order) whose attribute path
    /// contains `.`, if any (§4.2).
    #[must_use]
    pub fn first_dotted_leaf(&self) -> Option<&ConditionLeaf> {
        match self {
            ConditionTree::Empty => None,
            ConditionTree::Leaf(leaf) => leaf.has_dotted_path().then_some(leaf),
            ConditionTree::Node { left, right, .. } => {
                left.first_dotted_leaf().or_else(|| right.first_dotted_leaf())
            }
        }
    }
}
