//! Pipeline building and execution.
//!
//! This module provides:
//! - Stage specifications
//! - Pipeline builder with validation
//! - Strictly sequential execution with per-stage traces

mod builder;
mod definition;
mod spec;

#[cfg(test)]
mod integration_tests;

pub use builder::PipelineBuilder;
pub use definition::{PipelineDefinition, PipelineRun, StageRecord};
pub use spec::StageSpec;
