//! Polystore Providers - Two in-process `DatabaseService` reference
//! implementations (§4.7, §5).
//!
//! `EmulatedProvider` models a wide-column-style backend whose native
//! conditional-write dialect cannot express array-membership leaves, so
//! those mutations fall back to the CAS emulator from `polystore-service`.
//! `NativeProvider` models a document-store-style backend whose dialect
//! expresses every leaf, so it never leaves the atomic single-entry path.
//! Both share the same mutation engine in [`core`], differing only in the
//! [`polystore_condition::LeafDialect`] they're built with.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod core;
mod dialects;
mod emulated;
mod native;
mod store;

use std::sync::Arc;

use polystore_common::config::ProviderConfig;
use polystore_common::error::Error;
use polystore_service::DatabaseService;

pub use dialects::{EmulatedDialect, NativeDialect};
pub use emulated::EmulatedProvider;
pub use native::NativeProvider;

/// Builds the provider named by `config.kind` (§4.9).
///
/// # Errors
/// Returns [`Error::Config`] if `config.kind` names neither `"emulated"`
/// nor `"native"`.
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn DatabaseService>, Error> {
    match config.kind.as_str() {
        "emulated" => Ok(Arc::new(EmulatedProvider::default())),
        "native" => Ok(Arc::new(NativeProvider::default())),
        other => Err(Error::Config(format!("unknown provider kind '{other}'"))),
    }
}
