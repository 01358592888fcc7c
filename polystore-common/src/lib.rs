//! Polystore Common - Shared scalar types, error taxonomy and configuration
//!
//! This crate provides the vocabulary used across every Polystore component:
//! - `Primitive` / `DbKey`: the typed scalar system that bridges keys and
//!   condition operands with schema-less JSON documents.
//! - Error types and the `Result` alias.
//! - `OperationResult` / `ReturnBehavior`: the uniform return envelope.
//! - Configuration management.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod result;
pub mod value;

pub use config::Config;
pub use error::{Error, Result};
pub use result::{OperationResult, ReturnBehavior};
pub use value::{DbKey, Primitive};
