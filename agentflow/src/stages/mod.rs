//! Stage trait and implementations.
//!
//! Stages are the units of work in a pipeline. Each one receives its
//! predecessor's value and produces the value its successor receives.

mod tool_stage;
mod transform;

pub use tool_stage::ToolStage;
pub use transform::{StageInstruction, TransformStage, DEFAULT_MAX_TOOL_ROUNDS};

use crate::context::StageContext;
use crate::contracts::SchemaContract;
use crate::core::{StageKind, StageValue};
use crate::errors::StageError;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for pipeline stages.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage.
    fn name(&self) -> &str;

    /// Returns the kind of work the stage performs.
    fn kind(&self) -> StageKind;

    /// Returns the contract the stage's output satisfies, if any.
    fn output_contract(&self) -> Option<&SchemaContract> {
        None
    }

    /// Runs the stage on its predecessor's value.
    ///
    /// # Errors
    ///
    /// Returns a [`StageError`] for failures that must stop the run. Tool
    /// failures are not errors; they come back as sentinel content.
    async fn run(&self, ctx: &StageContext, input: StageValue) -> Result<StageValue, StageError>;
}
