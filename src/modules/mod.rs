//! Editor capability modules.
//!
//! A module wraps one area of the host editor behind a trait so tools can be
//! written (and tested) without the editor. Each operation returns either the
//! record describing what happened or a [`ModuleError`] carrying a specific,
//! human-readable reason; tools turn the latter into `isError` results.
//!
//! Modules are constructed once at start-up and handed to tools as
//! `Arc<dyn Module>`; nothing here is a process-wide singleton.

pub mod actor;

pub use actor::{ActorInfo, ActorModule, InMemoryActorModule, Rotator, Vector};

use thiserror::Error;

/// Why a module operation failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleError {
    /// A named object (actor, asset, ...) does not exist.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// What was looked up, e.g. "Actor".
        kind: &'static str,
        /// The identifier that failed to resolve.
        name: String,
    },
}
