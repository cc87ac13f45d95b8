//! Test doubles for models, tools and stages.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::context::StageContext;
use crate::core::{StageKind, StageValue};
use crate::errors::{ModelError, StageError, ToolError};
use crate::llm::{LanguageModel, ModelRequest, ModelResponse};
use crate::stages::Stage;
use crate::tools::{Tool, ToolDefinition, ToolInput};

type Responder = dyn Fn(&ModelRequest) -> Result<ModelResponse, ModelError> + Send + Sync;

/// A language model that answers from a script and records every request.
///
/// Queued responses are served first, in order. Once the queue is empty the
/// responder closure answers, if one is set; otherwise the call fails with a
/// transport error.
pub struct ScriptedModel {
    name: String,
    queue: Mutex<VecDeque<Result<ModelResponse, ModelError>>>,
    responder: Option<Box<Responder>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    /// Creates a model with an empty script.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue: Mutex::new(VecDeque::new()),
            responder: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Creates a model that always answers with `text`.
    #[must_use]
    pub fn replying(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new("scripted").respond_with(move |_| Ok(ModelResponse::text("scripted", text.clone())))
    }

    /// Queues responses served before the responder.
    #[must_use]
    pub fn with_responses(self, responses: Vec<Result<ModelResponse, ModelError>>) -> Self {
        self.queue.lock().extend(responses);
        self
    }

    /// Sets a closure that answers once the queue is empty.
    #[must_use]
    pub fn respond_with<F>(mut self, responder: F) -> Self
    where
        F: Fn(&ModelRequest) -> Result<ModelResponse, ModelError> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Returns every request received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().clone()
    }

    /// Returns the number of calls received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl fmt::Debug for ScriptedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedModel")
            .field("name", &self.name)
            .field("queued", &self.queue.lock().len())
            .field("calls", &self.call_count())
            .finish()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        self.requests.lock().push(request.clone());

        if let Some(next) = self.queue.lock().pop_front() {
            return next;
        }
        match self.responder {
            Some(ref responder) => responder(request),
            None => Err(ModelError::Transport("no scripted response left".to_string())),
        }
    }
}

/// A tool that always returns the same content.
#[derive(Debug, Clone)]
pub struct StaticTool {
    name: String,
    content: String,
    calls: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl StaticTool {
    /// Creates a new static tool.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns the payloads received.
    #[must_use]
    pub fn payloads(&self) -> Vec<serde_json::Value> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(&self.name).with_description("Returns fixed content")
    }

    async fn call(&self, input: &ToolInput) -> Result<String, ToolError> {
        self.calls.lock().push(input.payload.clone());
        Ok(self.content.clone())
    }
}

/// A tool that always fails with the same error.
#[derive(Debug, Clone)]
pub struct FailingTool {
    name: String,
    error: ToolError,
}

impl FailingTool {
    /// Creates a new failing tool.
    #[must_use]
    pub fn new(name: impl Into<String>, error: ToolError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(&self.name).with_description("Always fails")
    }

    async fn call(&self, _input: &ToolInput) -> Result<String, ToolError> {
        Err(self.error.clone())
    }
}

/// A stage that appends its name to a shared log and to its input text.
#[derive(Debug, Clone)]
pub struct RecordingStage {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingStage {
    /// Creates a stage writing to `log`.
    #[must_use]
    pub fn new(name: impl Into<String>, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.into(),
            log,
        }
    }
}

#[async_trait]
impl Stage for RecordingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        StageKind::Transform
    }

    async fn run(&self, ctx: &StageContext, input: StageValue) -> Result<StageValue, StageError> {
        self.log.lock().push(format!("{}#{}", self.name, ctx.index()));
        Ok(StageValue::raw(format!("{} > {}", input.as_context_text(), self.name)))
    }
}

/// A stage that always fails with the same error.
#[derive(Debug, Clone)]
pub struct FailingStage {
    name: String,
    error: StageError,
    log: Option<Arc<Mutex<Vec<String>>>>,
}

impl FailingStage {
    /// Creates a new failing stage.
    #[must_use]
    pub fn new(name: impl Into<String>, error: StageError) -> Self {
        Self {
            name: name.into(),
            error,
            log: None,
        }
    }

    /// Records calls into a shared log.
    #[must_use]
    pub fn with_log(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.log = Some(log);
        self
    }
}

#[async_trait]
impl Stage for FailingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        StageKind::Transform
    }

    async fn run(&self, ctx: &StageContext, _input: StageValue) -> Result<StageValue, StageError> {
        if let Some(ref log) = self.log {
            log.lock().push(format!("{}#{}", self.name, ctx.index()));
        }
        Err(self.error.clone())
    }
}
