//! Testing utilities for agentflow pipelines.
//!
//! This module provides:
//! - A scripted language model
//! - Static and failing tools
//! - Recording and failing stages
//! - Assertions over results and failures

mod assertions;
mod mocks;

pub use assertions::{assert_failed_at, assert_fields_non_empty, assert_sentinel, assert_stage_order};
pub use mocks::{FailingStage, FailingTool, RecordingStage, ScriptedModel, StaticTool};
