//! Per-stage execution context.

use super::RunIdentity;
use crate::events::{EventSink, NoOpEventSink, TOOL_COMPLETED, TOOL_FAILED, TOOL_INVOKED};
use crate::tools::{Tool, ToolInput, ToolOutput, ToolRegistry};
use crate::errors::ToolError;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// What a stage knows about the run it is part of.
///
/// Created by the pipeline for each stage; stages never construct one during
/// a run. Event emission and tool invocation go through here so every event
/// carries the run, pipeline and stage.
#[derive(Clone)]
pub struct StageContext {
    identity: RunIdentity,
    pipeline: String,
    stage: String,
    index: usize,
    event_sink: Arc<dyn EventSink>,
}

impl StageContext {
    /// Creates a context.
    #[must_use]
    pub fn new(
        identity: RunIdentity,
        pipeline: impl Into<String>,
        stage: impl Into<String>,
        index: usize,
        event_sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            identity,
            pipeline: pipeline.into(),
            stage: stage.into(),
            index,
            event_sink,
        }
    }

    /// Creates a context outside of any pipeline, discarding events.
    #[must_use]
    pub fn detached(stage: impl Into<String>) -> Self {
        Self::new(
            RunIdentity::new(),
            "detached",
            stage,
            0,
            Arc::new(NoOpEventSink),
        )
    }

    /// Returns the run identity.
    #[must_use]
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Returns the pipeline run ID.
    #[must_use]
    pub fn pipeline_run_id(&self) -> Uuid {
        self.identity.pipeline_run_id
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn pipeline_name(&self) -> &str {
        &self.pipeline
    }

    /// Returns the stage name.
    #[must_use]
    pub fn stage_name(&self) -> &str {
        &self.stage
    }

    /// Returns the stage position.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Emits an event enriched with run, pipeline and stage fields.
    pub fn try_emit_event(&self, event_type: &str, data: Value) {
        let mut data = match data {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        data.insert(
            "pipeline_run_id".to_string(),
            json!(self.identity.pipeline_run_id.to_string()),
        );
        data.insert("pipeline".to_string(), json!(self.pipeline));
        data.insert("stage".to_string(), json!(self.stage));
        data.insert("index".to_string(), json!(self.index));
        self.event_sink.try_emit(event_type, Some(Value::Object(data)));
    }

    /// Invokes a tool, emitting `tool.*` events around the call.
    pub async fn invoke_tool(&self, tool: &dyn Tool, payload: Value) -> ToolOutput {
        let input = ToolInput::new(tool.name(), payload).with_run_id(self.pipeline_run_id());
        self.emit_invoked(&input);
        let output = tool.invoke(&input).await;
        self.emit_outcome(&input, &output);
        output
    }

    /// Invokes a tool by name. An unknown name becomes a contained failure.
    pub async fn invoke_registered(
        &self,
        registry: &ToolRegistry,
        name: &str,
        payload: Value,
    ) -> ToolOutput {
        match registry.get(name) {
            Some(tool) => self.invoke_tool(tool.as_ref(), payload).await,
            None => {
                let input = ToolInput::new(name, payload).with_run_id(self.pipeline_run_id());
                self.emit_invoked(&input);
                let output = ToolOutput::from(ToolError::not_found(name));
                self.emit_outcome(&input, &output);
                output
            }
        }
    }

    fn emit_invoked(&self, input: &ToolInput) {
        self.try_emit_event(
            TOOL_INVOKED,
            json!({"tool": input.tool_name, "action_id": input.action_id.to_string()}),
        );
    }

    fn emit_outcome(&self, input: &ToolInput, output: &ToolOutput) {
        match output {
            ToolOutput::Content { text } => self.try_emit_event(
                TOOL_COMPLETED,
                json!({
                    "tool": input.tool_name,
                    "action_id": input.action_id.to_string(),
                    "chars": text.chars().count(),
                }),
            ),
            ToolOutput::Failed(failure) => self.try_emit_event(
                TOOL_FAILED,
                json!({
                    "tool": input.tool_name,
                    "action_id": input.action_id.to_string(),
                    "error_type": failure.error_type,
                    "cause": failure.cause,
                }),
            ),
        }
    }
}

impl std::fmt::Debug for StageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("pipeline_run_id", &self.identity.pipeline_run_id)
            .field("pipeline", &self.pipeline)
            .field("stage", &self.stage)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}
