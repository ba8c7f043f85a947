//! typegraph: a term/type graph engine.
//!
//! This crate re-exports the engine from `tg-core` and the shared
//! definitions from `tg-common`, and owns process-level setup such as the
//! tracing subscriber.

pub use tg_common::{Atom, NameInterner, limits};
pub use tg_core::*;

pub mod tracing_config;
