//! Error types for the agentflow framework.
//!
//! Terminal failures (model invocation, schema violation) travel as
//! [`StageError`] wrapped in a [`PipelineError`]. Tool failures never show up
//! here at run time: they are contained at the tool boundary and travel by
//! value as sentinel content (see [`crate::tools::ToolOutput`]).

use crate::contracts::{ContractErrorInfo, ValidationError};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for agentflow operations.
#[derive(Debug, Error)]
pub enum AgentflowError {
    /// A pipeline run terminated with a hard error.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// A pipeline definition was rejected at construction time.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// Configuration could not be loaded or is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A model client could not be constructed.
    #[error("{0}")]
    Model(#[from] ModelError),

    /// A structured value could not be converted into a typed record.
    #[error("{0}")]
    Contract(#[from] ValidationError),

    /// The top-level request was rejected before any stage ran.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Logging could not be initialised.
    #[error("Observability setup failed: {0}")]
    Observability(String),
}

/// Error raised when a pipeline definition fails validation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the contract error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("message".to_string(), serde_json::json!(self.message));
        map.insert("stages".to_string(), serde_json::json!(self.stages));
        if let Some(ref info) = self.error_info {
            map.insert("error_info".to_string(), serde_json::json!(info.to_dict()));
        }
        map
    }
}

/// Errors raised inside a tool. Never escapes [`crate::tools::Tool::invoke`].
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// Tool was not found in the registry.
    #[error("Tool not found: {name}")]
    NotFound {
        /// The tool name.
        name: String,
    },

    /// The tool received parameters it cannot use.
    #[error("Invalid input for tool {name}: {reason}")]
    InvalidInput {
        /// The tool name.
        name: String,
        /// Why the input was rejected.
        reason: String,
    },

    /// The tool's deadline elapsed.
    #[error("Tool {name} timed out after {timeout_seconds}s")]
    Timeout {
        /// The tool name.
        name: String,
        /// The configured deadline.
        timeout_seconds: f64,
    },

    /// A remote resource answered with a non-success status.
    #[error("Tool {name} received HTTP {status} from {url}")]
    HttpStatus {
        /// The tool name.
        name: String,
        /// HTTP status code.
        status: u16,
        /// The URL requested.
        url: String,
    },

    /// Tool execution failed.
    #[error("Tool execution failed: {name} - {reason}")]
    ExecutionFailed {
        /// The tool name.
        name: String,
        /// The reason for failure.
        reason: String,
    },
}

impl ToolError {
    /// Creates a tool not found error.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(name: impl Into<String>, timeout_seconds: f64) -> Self {
        Self::Timeout {
            name: name.into(),
            timeout_seconds,
        }
    }

    /// Creates an HTTP status error.
    #[must_use]
    pub fn http_status(name: impl Into<String>, status: u16, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            name: name.into(),
            status,
            url: url.into(),
        }
    }

    /// Creates an execution failed error.
    #[must_use]
    pub fn execution_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns the name of the tool that failed.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        match self {
            Self::NotFound { name }
            | Self::InvalidInput { name, .. }
            | Self::Timeout { name, .. }
            | Self::HttpStatus { name, .. }
            | Self::ExecutionFailed { name, .. } => name,
        }
    }

    /// Describes the failure without repeating the tool name.
    #[must_use]
    pub fn cause(&self) -> String {
        match self {
            Self::NotFound { name } => format!("no tool named '{name}' is available"),
            Self::InvalidInput { reason, .. } | Self::ExecutionFailed { reason, .. } => {
                reason.clone()
            }
            Self::Timeout {
                timeout_seconds, ..
            } => format!("timed out after {timeout_seconds}s"),
            Self::HttpStatus { status, url, .. } => format!("HTTP {status} from {url}"),
        }
    }

    /// Returns a stable name for the error variant.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "ToolNotFound",
            Self::InvalidInput { .. } => "ToolInvalidInput",
            Self::Timeout { .. } => "ToolTimeout",
            Self::HttpStatus { .. } => "ToolHttpStatus",
            Self::ExecutionFailed { .. } => "ToolExecutionError",
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();

        if let Self::HttpStatus { status, url, .. } = self {
            map.insert("status".to_string(), serde_json::json!(status));
            map.insert("url".to_string(), serde_json::json!(url));
        }

        map.insert("type".to_string(), serde_json::json!(self.error_type()));
        map.insert("name".to_string(), serde_json::json!(self.tool_name()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Errors from the language-model collaborator.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// The request never produced an HTTP response.
    #[error("Model transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("Model provider returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// The provider response could not be decoded.
    #[error("Model response could not be decoded: {0}")]
    Decode(String),

    /// The provider returned neither content nor tool calls.
    #[error("Model returned an empty response")]
    EmptyResponse,

    /// The client is misconfigured (missing key, bad base URL).
    #[error("Model client configuration error: {0}")]
    Configuration(String),
}

/// Hard failures of a single stage. Each one is terminal for its run.
#[derive(Debug, Clone, Error)]
pub enum StageError {
    /// The model call itself failed.
    #[error("model invocation failed: {0}")]
    ModelInvocation(#[from] ModelError),

    /// The stage output does not satisfy its declared contract.
    #[error("schema violation: {0}")]
    SchemaViolation(#[from] ValidationError),

    /// The model kept requesting tools after the round budget was spent.
    #[error("model requested tools after {rounds} tool round(s); budget exhausted")]
    ToolBudgetExhausted {
        /// Rounds that were allowed.
        rounds: usize,
    },
}

impl StageError {
    /// Returns the failure kind.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ModelInvocation(_) => FailureKind::ModelInvocation,
            Self::SchemaViolation(_) => FailureKind::SchemaViolation,
            Self::ToolBudgetExhausted { .. } => FailureKind::ToolBudgetExhausted,
        }
    }
}

/// Classification of terminal pipeline failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The model call failed.
    ModelInvocation,
    /// A contract was not satisfied.
    SchemaViolation,
    /// The tool round budget was exceeded.
    ToolBudgetExhausted,
    /// The final stage produced raw text where a structured value was required.
    UnstructuredOutput,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModelInvocation => write!(f, "model_invocation"),
            Self::SchemaViolation => write!(f, "schema_violation"),
            Self::ToolBudgetExhausted => write!(f, "tool_budget_exhausted"),
            Self::UnstructuredOutput => write!(f, "unstructured_output"),
        }
    }
}

/// Terminal error of a pipeline run, naming the stage that caused it.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage failed; later stages did not run.
    #[error("pipeline '{pipeline}' failed at stage '{stage}' (#{index}): {source}")]
    StageFailed {
        /// Pipeline name.
        pipeline: String,
        /// Failing stage name.
        stage: String,
        /// Zero-based position of the stage.
        index: usize,
        /// The stage failure.
        source: StageError,
    },

    /// A structured result was required but the final stage produced text.
    #[error("pipeline '{pipeline}' final stage '{stage}' produced unstructured output")]
    UnstructuredOutput {
        /// Pipeline name.
        pipeline: String,
        /// Final stage name.
        stage: String,
    },
}

impl PipelineError {
    /// Returns the failure kind.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::StageFailed { source, .. } => source.kind(),
            Self::UnstructuredOutput { .. } => FailureKind::UnstructuredOutput,
        }
    }

    /// Returns the name of the stage the failure is attributed to.
    #[must_use]
    pub fn stage(&self) -> &str {
        match self {
            Self::StageFailed { stage, .. } | Self::UnstructuredOutput { stage, .. } => stage,
        }
    }

    /// Returns the contract violation, if that is what failed.
    #[must_use]
    pub fn validation_error(&self) -> Option<&ValidationError> {
        match self {
            Self::StageFailed {
                source: StageError::SchemaViolation(err),
                ..
            } => Some(err),
            _ => None,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("kind".to_string(), serde_json::json!(self.kind().to_string()));
        map.insert("stage".to_string(), serde_json::json!(self.stage()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        match self {
            Self::StageFailed {
                pipeline, index, ..
            } => {
                map.insert("pipeline".to_string(), serde_json::json!(pipeline));
                map.insert("index".to_string(), serde_json::json!(index));
            }
            Self::UnstructuredOutput { pipeline, .. } => {
                map.insert("pipeline".to_string(), serde_json::json!(pipeline));
            }
        }
        map
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The configuration is not valid TOML for this schema.
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds an unusable value.
    #[error("invalid config field '{field}': {message}")]
    Invalid {
        /// Dotted field path.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}

impl ConfigError {
    /// Creates an invalid field error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_validation_error_to_dict() {
        let err = PipelineValidationError::new("Test error")
            .with_stages(vec!["stage1".to_string(), "stage2".to_string()]);

        let dict = err.to_dict();
        assert_eq!(dict.get("message").unwrap(), "Test error");
        assert_eq!(dict["stages"], serde_json::json!(["stage1", "stage2"]));
        assert!(err.code().is_none());
    }

    #[test]
    fn test_tool_error_to_dict() {
        let err = ToolError::not_found("my_tool");
        let dict = err.to_dict();

        assert_eq!(dict.get("type").unwrap(), "ToolNotFound");
        assert_eq!(dict.get("name").unwrap(), "my_tool");
    }

    #[test]
    fn test_tool_error_http_status_dict() {
        let err = ToolError::http_status("fetch_url", 404, "https://example.com/missing");
        let dict = err.to_dict();

        assert_eq!(dict["type"], "ToolHttpStatus");
        assert_eq!(dict["status"], 404);
        assert_eq!(err.tool_name(), "fetch_url");
        assert_eq!(err.cause(), "HTTP 404 from https://example.com/missing");
    }

    #[test]
    fn test_stage_error_kinds() {
        let err = StageError::from(ModelError::EmptyResponse);
        assert_eq!(err.kind(), FailureKind::ModelInvocation);

        let err = StageError::ToolBudgetExhausted { rounds: 1 };
        assert_eq!(err.kind(), FailureKind::ToolBudgetExhausted);
        assert!(err.to_string().contains("1 tool round"));
    }

    #[test]
    fn test_pipeline_error_names_stage() {
        let err = PipelineError::StageFailed {
            pipeline: "translation".to_string(),
            stage: "translate".to_string(),
            index: 0,
            source: StageError::from(ModelError::Transport("connection reset".to_string())),
        };

        assert_eq!(err.stage(), "translate");
        assert_eq!(err.kind(), FailureKind::ModelInvocation);
        assert!(err.validation_error().is_none());
        let message = err.to_string();
        assert!(message.contains("'translate'"));
        assert!(message.contains("connection reset"));

        let dict = err.to_dict();
        assert_eq!(dict["kind"], "model_invocation");
        assert_eq!(dict["index"], 0);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("model.base_url", "must not be empty");
        assert_eq!(
            err.to_string(),
            "invalid config field 'model.base_url': must not be empty"
        );
    }
}
