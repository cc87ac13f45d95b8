//! Request dispatch over the two concrete pipelines.

use crate::agents::{resource_summary_pipeline, translation_pipeline, BilingualText, ResourceSummary};
use crate::config::{AgentflowConfig, ModelConfig};
use crate::context::RunIdentity;
use crate::contracts::{StructuredRecord, StructuredValue};
use crate::core::StageValue;
use crate::errors::{AgentflowError, PipelineValidationError};
use crate::events::EventSink;
use crate::llm::{LanguageModel, OpenAiChatModel};
use crate::pipeline::PipelineDefinition;
use crate::tools::{FetchTool, HttpFetcher, Tool};
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument};
use url::Url;
use uuid::Uuid;

/// One unit of work for the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Text to translate.
    Text(String),
    /// A resource to fetch and summarize.
    Url(Url),
}

impl Request {
    /// Classifies a raw string.
    ///
    /// An absolute `http`/`https` URL without whitespace is a [`Request::Url`];
    /// anything else is [`Request::Text`], kept exactly as given.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for empty or whitespace-only input.
    pub fn parse(raw: &str) -> Result<Self, AgentflowError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AgentflowError::InvalidRequest("request is empty".to_string()));
        }
        if !trimmed.contains(char::is_whitespace) {
            if let Ok(url) = Url::parse(trimmed) {
                if matches!(url.scheme(), "http" | "https") {
                    return Ok(Self::Url(url));
                }
            }
        }
        Ok(Self::Text(raw.to_string()))
    }

    /// Returns the pipeline input for this request.
    #[must_use]
    pub fn to_stage_value(&self) -> StageValue {
        match self {
            Self::Text(text) => StageValue::raw(text.as_str()),
            Self::Url(url) => StageValue::raw(url.as_str()),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Url(_) => "url",
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "text({} chars)", text.chars().count()),
            Self::Url(url) => write!(f, "url({url})"),
        }
    }
}

/// Routes requests to the translation or resource-summary pipeline.
///
/// Holds no per-request state; one runner can serve concurrent requests.
#[derive(Debug, Clone)]
pub struct Runner {
    translation: PipelineDefinition,
    summary: PipelineDefinition,
}

impl Runner {
    /// Creates a runner over two prebuilt pipelines.
    #[must_use]
    pub fn new(translation: PipelineDefinition, summary: PipelineDefinition) -> Self {
        Self {
            translation,
            summary,
        }
    }

    /// Builds both pipelines around one model and one fetch tool.
    ///
    /// # Errors
    ///
    /// Only fails if a pipeline layout is rejected.
    pub fn from_parts(
        model: Arc<dyn LanguageModel>,
        fetch_tool: Arc<dyn Tool>,
        config: &ModelConfig,
    ) -> Result<Self, PipelineValidationError> {
        Ok(Self::new(
            translation_pipeline(Arc::clone(&model), config)?,
            resource_summary_pipeline(model, config, fetch_tool)?,
        ))
    }

    /// Wires the OpenAI-compatible model, the HTTP fetcher and the fetch tool.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid or a client cannot be built.
    pub fn from_config(config: &AgentflowConfig) -> Result<Self, AgentflowError> {
        config.validate()?;
        let model = OpenAiChatModel::from_config(&config.model)?;
        let fetcher = HttpFetcher::new(&config.fetch)?;
        let fetch_tool = FetchTool::new(Arc::new(fetcher), config.fetch.clone());
        Ok(Self::from_parts(Arc::new(model), Arc::new(fetch_tool), &config.model)?)
    }

    /// Sends lifecycle events of both pipelines to `sink`.
    #[must_use]
    pub fn with_event_sink(self, sink: Arc<dyn EventSink>) -> Self {
        Self {
            translation: self.translation.with_event_sink(Arc::clone(&sink)),
            summary: self.summary.with_event_sink(sink),
        }
    }

    /// Returns the pipeline that serves `request`.
    #[must_use]
    pub fn pipeline_for(&self, request: &Request) -> &PipelineDefinition {
        match request {
            Request::Text(_) => &self.translation,
            Request::Url(_) => &self.summary,
        }
    }

    /// Runs the pipeline for one request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for blank text, otherwise the pipeline's
    /// terminal error.
    #[instrument(skip(self, request), fields(request = %request))]
    pub async fn execute(&self, request: Request) -> Result<StructuredValue, AgentflowError> {
        if let Request::Text(ref text) = request {
            if text.trim().is_empty() {
                return Err(AgentflowError::InvalidRequest("request is empty".to_string()));
            }
        }

        let pipeline = self.pipeline_for(&request);
        let identity = RunIdentity::new().with_request_id(Uuid::new_v4());
        info!(
            kind = request.kind(),
            pipeline = pipeline.name(),
            request_id = ?identity.request_id,
            "Dispatching request"
        );

        let value = pipeline
            .run_structured_as(identity, request.to_stage_value())
            .await?;
        Ok(value)
    }

    /// Classifies a raw string and runs it.
    ///
    /// # Errors
    ///
    /// As [`Request::parse`] and [`Self::execute`].
    pub async fn execute_str(&self, raw: &str) -> Result<StructuredValue, AgentflowError> {
        let request = Request::parse(raw)?;
        self.execute(request).await
    }

    /// Runs independent requests concurrently; results keep the input order.
    pub async fn execute_many(
        &self,
        requests: Vec<Request>,
    ) -> Vec<Result<StructuredValue, AgentflowError>> {
        join_all(requests.into_iter().map(|request| self.execute(request))).await
    }

    /// Translates `text` into a typed record.
    ///
    /// # Errors
    ///
    /// As [`Self::execute`].
    pub async fn translate(&self, text: impl Into<String>) -> Result<BilingualText, AgentflowError> {
        let value = self.execute(Request::Text(text.into())).await?;
        Ok(BilingualText::from_structured(&value)?)
    }

    /// Fetches and summarizes `url` into a typed record.
    ///
    /// # Errors
    ///
    /// As [`Self::execute`].
    pub async fn summarize(&self, url: Url) -> Result<ResourceSummary, AgentflowError> {
        let value = self.execute(Request::Url(url)).await?;
        Ok(ResourceSummary::from_structured(&value)?)
    }
}
