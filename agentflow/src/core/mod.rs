//! Core domain model types for agentflow.
//!
//! This module contains the fundamental types used throughout the framework:
//! - Stage status and kind enums
//! - Raw content with its failure sentinel
//! - The stage value passed between stages

mod output;
#[cfg(test)]
mod output_tests;
mod status;

pub use output::{RawContent, StageValue, FAILURE_MARKER};
pub use status::{StageKind, StageStatus};
