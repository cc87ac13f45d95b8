//! Context carried through a pipeline run.
//!
//! This module provides:
//! - Run identity for correlating events
//! - The per-stage context used for events and tool calls

#[cfg(test)]
mod context_tests;
mod execution;
mod identity;

pub use execution::StageContext;
pub use identity::RunIdentity;
