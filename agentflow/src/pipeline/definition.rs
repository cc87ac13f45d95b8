//! Linear pipeline execution.

use super::StageSpec;
use crate::context::{RunIdentity, StageContext};
use crate::contracts::{SchemaContract, StructuredValue, ValidationError};
use crate::core::{StageKind, StageStatus, StageValue};
use crate::errors::{PipelineError, StageError};
use crate::events::{
    EventSink, NoOpEventSink, PIPELINE_COMPLETED, PIPELINE_FAILED, PIPELINE_STARTED,
    STAGE_COMPLETED, STAGE_FAILED, STAGE_STARTED,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// What happened at one stage of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRecord {
    /// Stage name.
    pub stage: String,
    /// Stage kind.
    pub kind: StageKind,
    /// Whether the stage produced a value.
    pub status: StageStatus,
    /// Wall time spent in the stage.
    pub duration_ms: f64,
    /// Whether the stage's output was a failure sentinel.
    pub sentinel: bool,
}

/// A finished run with its per-stage trace.
#[derive(Debug)]
pub struct PipelineRun {
    /// Identity the run executed under.
    pub identity: RunIdentity,
    /// Final value, or the error that ended the run.
    pub output: Result<StageValue, PipelineError>,
    /// One record per stage that ran, in execution order.
    pub records: Vec<StageRecord>,
    /// Wall time of the whole run.
    pub duration_ms: f64,
}

impl PipelineRun {
    /// Returns true if the run produced a value.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.output.is_ok()
    }

    /// Returns the record for `stage`, if it ran.
    #[must_use]
    pub fn record(&self, stage: &str) -> Option<&StageRecord> {
        self.records.iter().find(|r| r.stage == stage)
    }

    /// Consumes the run, returning its outcome.
    pub fn into_output(self) -> Result<StageValue, PipelineError> {
        self.output
    }
}

/// An immutable, validated sequence of stages.
///
/// Cloning is cheap and clones share their stages, so one definition can
/// serve any number of concurrent runs.
#[derive(Clone)]
pub struct PipelineDefinition {
    name: String,
    stages: Arc<[StageSpec]>,
    event_sink: Arc<dyn EventSink>,
}

impl PipelineDefinition {
    /// Creates a definition. Use [`super::PipelineBuilder`] to get validation.
    pub(crate) fn new(name: String, stages: Vec<StageSpec>) -> Self {
        Self {
            name,
            stages: stages.into(),
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sends lifecycle events of every run to `sink`.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stage specifications in execution order.
    #[must_use]
    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false for a built pipeline.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns the contract of the final stage, if it declares one.
    #[must_use]
    pub fn output_contract(&self) -> Option<&SchemaContract> {
        self.stages.last().and_then(StageSpec::output_contract)
    }

    /// Runs every stage in order, feeding each output to the next stage.
    ///
    /// # Errors
    ///
    /// Returns the first hard stage error, or a schema violation if the final
    /// value does not satisfy the final stage's contract.
    pub async fn run(&self, initial: impl Into<StageValue>) -> Result<StageValue, PipelineError> {
        self.run_traced(initial).await.into_output()
    }

    /// Runs the pipeline and requires a structured final value.
    ///
    /// # Errors
    ///
    /// As [`Self::run`], plus `UnstructuredOutput` when the final value is
    /// raw text.
    pub async fn run_structured(
        &self,
        initial: impl Into<StageValue>,
    ) -> Result<StructuredValue, PipelineError> {
        self.run_structured_as(RunIdentity::new(), initial.into()).await
    }

    /// Like [`Self::run_structured`], under a caller-supplied identity.
    ///
    /// # Errors
    ///
    /// As [`Self::run_structured`].
    pub async fn run_structured_as(
        &self,
        identity: RunIdentity,
        initial: StageValue,
    ) -> Result<StructuredValue, PipelineError> {
        match self.run_with_identity(identity, initial).await.into_output()? {
            StageValue::Structured(value) => Ok(value),
            StageValue::Raw(_) => Err(PipelineError::UnstructuredOutput {
                pipeline: self.name.clone(),
                stage: self.last_stage_name().to_string(),
            }),
        }
    }

    /// Runs the pipeline under a fresh identity and keeps the per-stage trace.
    pub async fn run_traced(&self, initial: impl Into<StageValue>) -> PipelineRun {
        self.run_with_identity(RunIdentity::new(), initial.into()).await
    }

    /// Runs the pipeline under `identity` and keeps the per-stage trace.
    #[instrument(
        skip(self, identity, initial),
        fields(pipeline = %self.name, run_id = %identity.pipeline_run_id)
    )]
    pub async fn run_with_identity(&self, identity: RunIdentity, initial: StageValue) -> PipelineRun {
        let started = Instant::now();
        let mut records = Vec::with_capacity(self.stages.len());

        self.emit(&identity, PIPELINE_STARTED, json!({ "stages": self.stage_names() }));
        info!(stages = self.stages.len(), "Pipeline started");

        let output = self.drive(&identity, initial, &mut records).await;
        let duration_ms = elapsed_ms(started);

        match output {
            Ok(ref value) => {
                self.emit(
                    &identity,
                    PIPELINE_COMPLETED,
                    json!({
                        "duration_ms": duration_ms,
                        "structured": value.as_structured().is_some(),
                    }),
                );
                info!(duration_ms, "Pipeline completed");
            }
            Err(ref err) => {
                let mut data = serde_json::Map::new();
                data.extend(err.to_dict());
                data.insert("duration_ms".to_string(), json!(duration_ms));
                self.emit(&identity, PIPELINE_FAILED, Value::Object(data));
                warn!(stage = err.stage(), kind = %err.kind(), error = %err, "Pipeline failed");
            }
        }

        PipelineRun {
            identity,
            output,
            records,
            duration_ms,
        }
    }

    async fn drive(
        &self,
        identity: &RunIdentity,
        initial: StageValue,
        records: &mut Vec<StageRecord>,
    ) -> Result<StageValue, PipelineError> {
        let mut value = initial;
        let last = self.stages.len().saturating_sub(1);

        for (index, spec) in self.stages.iter().enumerate() {
            let ctx = StageContext::new(
                identity.clone(),
                &self.name,
                &spec.name,
                index,
                Arc::clone(&self.event_sink),
            );
            ctx.try_emit_event(STAGE_STARTED, json!({ "kind": spec.kind() }));
            debug!(stage = %spec.name, index, "Stage started");

            let stage_started = Instant::now();
            let result = spec.runner.run(&ctx, value).await;
            let result = match result {
                Ok(output) if index == last => conform_final(spec, output),
                other => other,
            };
            let duration_ms = elapsed_ms(stage_started);

            match result {
                Ok(output) => {
                    let sentinel = output.is_failure_sentinel();
                    ctx.try_emit_event(
                        STAGE_COMPLETED,
                        json!({ "duration_ms": duration_ms, "sentinel": sentinel }),
                    );
                    records.push(StageRecord {
                        stage: spec.name.clone(),
                        kind: spec.kind(),
                        status: StageStatus::Ok,
                        duration_ms,
                        sentinel,
                    });
                    value = output;
                }
                Err(source) => {
                    ctx.try_emit_event(
                        STAGE_FAILED,
                        json!({
                            "duration_ms": duration_ms,
                            "failure_kind": source.kind().to_string(),
                            "error": source.to_string(),
                        }),
                    );
                    records.push(StageRecord {
                        stage: spec.name.clone(),
                        kind: spec.kind(),
                        status: StageStatus::Fail,
                        duration_ms,
                        sentinel: false,
                    });
                    return Err(PipelineError::StageFailed {
                        pipeline: self.name.clone(),
                        stage: spec.name.clone(),
                        index,
                        source,
                    });
                }
            }
        }

        Ok(value)
    }

    fn emit(&self, identity: &RunIdentity, event_type: &str, data: Value) {
        let mut data = match data {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        data.insert(
            "pipeline_run_id".to_string(),
            json!(identity.pipeline_run_id.to_string()),
        );
        data.insert("pipeline".to_string(), json!(self.name));
        self.event_sink.try_emit(event_type, Some(Value::Object(data)));
    }

    fn last_stage_name(&self) -> &str {
        self.stages.last().map_or("", |s| s.name.as_str())
    }
}

impl fmt::Debug for PipelineDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineDefinition")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

/// Re-checks the final value against the final stage's contract.
fn conform_final(spec: &StageSpec, output: StageValue) -> Result<StageValue, StageError> {
    let Some(contract) = spec.output_contract() else {
        return Ok(output);
    };
    match output {
        StageValue::Structured(ref value) => {
            contract.revalidate(value)?;
            Ok(output)
        }
        StageValue::Raw(_) => Err(StageError::SchemaViolation(ValidationError::malformed(
            contract.name(),
            "expected structured output, found raw text",
        ))),
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
