//! The Polystore `DatabaseService` contract (§4.3, §6), its condition
//! factory, and the generic CAS retry loop (§4.6) providers build their
//! emulated-provider code paths on.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod emulator;
mod factory;
mod service;

pub use emulator::{run_cas_loop, CasOutcome, CasStep};
pub use factory::ConditionFactory;
pub use service::{DatabaseService, Item, ScanPage};
