//! Stage specifications.

use crate::contracts::{codes, ContractErrorInfo, SchemaContract};
use crate::core::StageKind;
use crate::errors::PipelineValidationError;
use crate::stages::Stage;
use std::sync::Arc;

/// One position in a pipeline: a name and the stage that runs there.
#[derive(Debug, Clone)]
pub struct StageSpec {
    /// The unique name of the stage within its pipeline.
    pub name: String,
    /// The stage implementation.
    pub runner: Arc<dyn Stage>,
}

impl StageSpec {
    /// Creates a spec named after the stage itself.
    #[must_use]
    pub fn new(runner: Arc<dyn Stage>) -> Self {
        Self {
            name: runner.name().to_string(),
            runner,
        }
    }

    /// Creates a spec under an explicit name.
    #[must_use]
    pub fn named(name: impl Into<String>, runner: Arc<dyn Stage>) -> Self {
        Self {
            name: name.into(),
            runner,
        }
    }

    /// Returns the stage kind.
    #[must_use]
    pub fn kind(&self) -> StageKind {
        self.runner.kind()
    }

    /// Returns the contract the stage's output must satisfy, if any.
    #[must_use]
    pub fn output_contract(&self) -> Option<&SchemaContract> {
        self.runner.output_contract()
    }

    /// Validates the stage specification.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or whitespace-only.
    pub fn validate(&self) -> Result<(), PipelineValidationError> {
        if self.name.trim().is_empty() {
            return Err(PipelineValidationError::new("Stage name cannot be empty")
                .with_stages(vec![self.name.clone()])
                .with_error_info(
                    ContractErrorInfo::new(codes::NAME, "Stage name is blank")
                        .with_fix_hint("Give every stage a non-empty name."),
                ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingStage;
    use parking_lot::Mutex;

    fn stage(name: &str) -> Arc<dyn Stage> {
        Arc::new(RecordingStage::new(name, Arc::new(Mutex::new(Vec::new()))))
    }

    #[test]
    fn test_spec_takes_stage_name() {
        let spec = StageSpec::new(stage("clean"));
        assert_eq!(spec.name, "clean");
        assert_eq!(spec.kind(), StageKind::Transform);
        assert!(spec.output_contract().is_none());
    }

    #[test]
    fn test_blank_name_rejected() {
        let err = StageSpec::named("  ", stage("clean")).validate().unwrap_err();
        assert_eq!(err.code(), Some(codes::NAME));
    }
}
