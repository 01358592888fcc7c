//! Polystore Condition Algebra
//!
//! Provides:
//! - The `ConditionLeaf` / `ConditionTree` data model (§4.2).
//! - An in-memory reference evaluator used both by tests and by providers
//!   that cannot express a condition natively (§4.6).
//! - Generic scaffolding (`PlaceholderAllocator`, `LeafDialect`,
//!   `compile_with_dialect`) that per-provider condition compilers build on
//!   (§4.7).

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod compiler;
mod evaluator;
mod leaf;
mod tree;

pub use compiler::{compile_with_dialect, CompiledCondition, LeafDialect, PlaceholderAllocator, UnsupportedLeaf};
pub use evaluator::evaluate;
pub use leaf::ConditionLeaf;
pub use tree::{BoolOp, ConditionTree};
