//! Pipeline builder with validation.

use super::{PipelineDefinition, StageSpec};
use crate::contracts::{codes, ContractErrorInfo};
use crate::errors::PipelineValidationError;
use crate::stages::Stage;
use std::collections::HashSet;
use std::sync::Arc;

/// Builder for creating validated linear pipelines.
///
/// Stages run in the order they are added.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    /// The pipeline name.
    name: String,
    /// The stage specifications, in execution order.
    stages: Vec<StageSpec>,
    /// Names already taken.
    names: HashSet<String>,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            names: HashSet::new(),
        }
    }

    /// Appends a stage under its own name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or already used.
    pub fn stage(mut self, runner: Arc<dyn Stage>) -> Result<Self, PipelineValidationError> {
        self.add_stage_spec(StageSpec::new(runner))?;
        Ok(self)
    }

    /// Appends a stage under an explicit name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or already used.
    pub fn named_stage(
        mut self,
        name: impl Into<String>,
        runner: Arc<dyn Stage>,
    ) -> Result<Self, PipelineValidationError> {
        self.add_stage_spec(StageSpec::named(name, runner))?;
        Ok(self)
    }

    /// Appends a stage specification.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn add_stage_spec(&mut self, spec: StageSpec) -> Result<(), PipelineValidationError> {
        spec.validate()?;

        if self.names.contains(&spec.name) {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' is already part of pipeline '{}'",
                spec.name, self.name
            ))
            .with_stages(vec![spec.name.clone()])
            .with_error_info(
                ContractErrorInfo::new(
                    codes::DUPLICATE,
                    format!("Stage name '{}' appears twice", spec.name),
                )
                .with_fix_hint("Use StageSpec::named to give the second occurrence its own name.")
                .with_context("position", serde_json::json!(self.stages.len())),
            ));
        }

        self.names.insert(spec.name.clone());
        self.stages.push(spec);
        Ok(())
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline name is blank or there are no stages.
    pub fn build(self) -> Result<PipelineDefinition, PipelineValidationError> {
        if self.name.trim().is_empty() {
            return Err(PipelineValidationError::new("Pipeline name cannot be empty")
                .with_error_info(
                    ContractErrorInfo::new(codes::NAME, "Pipeline name is blank")
                        .with_fix_hint("Name the pipeline so failures can be attributed to it."),
                ));
        }
        if self.stages.is_empty() {
            return Err(PipelineValidationError::new("Pipeline has no stages")
                .with_error_info(
                    ContractErrorInfo::new(codes::EMPTY, "Cannot build an empty pipeline")
                        .with_fix_hint("Add at least one stage to the pipeline before building."),
                ));
        }

        Ok(PipelineDefinition::new(self.name, self.stages))
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}
