//! Tool definitions and I/O types.

use crate::core::RawContent;
use crate::errors::ToolError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Definition of a tool, also what is advertised to a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name.
    pub name: String,
    /// Description of what the tool does.
    pub description: String,
    /// JSON Schema for the input payload.
    pub input_schema: serde_json::Value,
}

impl ToolDefinition {
    /// Creates a new tool definition.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Sets the input schema.
    #[must_use]
    pub fn with_input_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = schema;
        self
    }
}

/// Input to a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    /// Identifies this invocation in events and logs.
    pub action_id: Uuid,
    /// The tool name.
    pub tool_name: String,
    /// The input payload.
    pub payload: serde_json::Value,
    /// The pipeline run ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_run_id: Option<Uuid>,
}

impl ToolInput {
    /// Creates a new tool input.
    #[must_use]
    pub fn new(tool_name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            action_id: Uuid::new_v4(),
            tool_name: tool_name.into(),
            payload,
            pipeline_run_id: None,
        }
    }

    /// Attaches the run the invocation belongs to.
    #[must_use]
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.pipeline_run_id = Some(run_id);
        self
    }

    /// Returns a string parameter from the payload.
    #[must_use]
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(serde_json::Value::as_str)
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("action_id".to_string(), serde_json::json!(self.action_id.to_string()));
        map.insert("tool_name".to_string(), serde_json::json!(self.tool_name));
        map.insert("payload".to_string(), self.payload.clone());

        if let Some(id) = self.pipeline_run_id {
            map.insert("pipeline_run_id".to_string(), serde_json::json!(id.to_string()));
        }

        map
    }
}

/// A contained tool failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFailure {
    /// Tool that failed.
    pub tool: String,
    /// Error variant name, e.g. `ToolHttpStatus`.
    pub error_type: String,
    /// What went wrong.
    pub cause: String,
}

impl From<&ToolError> for ToolFailure {
    fn from(error: &ToolError) -> Self {
        Self {
            tool: error.tool_name().to_string(),
            error_type: error.error_type().to_string(),
            cause: error.cause(),
        }
    }
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.tool, self.cause)
    }
}

/// Result of invoking a tool. Failures are values, never errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutput {
    /// The tool produced content.
    Content {
        /// The produced text.
        text: String,
    },
    /// The tool failed and the failure was contained.
    Failed(ToolFailure),
}

impl ToolOutput {
    /// Creates a successful output.
    #[must_use]
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content { text: text.into() }
    }

    /// Returns true if the tool failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Renders the output as raw content; failures become `"[ERROR] <tool>: <cause>"`.
    #[must_use]
    pub fn into_raw_content(self) -> RawContent {
        match self {
            Self::Content { text } => RawContent::new(text),
            Self::Failed(failure) => RawContent::from_failure(&failure.tool, &failure.cause),
        }
    }
}

impl From<ToolError> for ToolOutput {
    fn from(error: ToolError) -> Self {
        Self::Failed(ToolFailure::from(&error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definition_creation() {
        let def = ToolDefinition::new("fetch_url").with_description("Fetches things");

        assert_eq!(def.name, "fetch_url");
        assert_eq!(def.description, "Fetches things");
        assert_eq!(def.input_schema["type"], "object");
    }

    #[test]
    fn test_tool_input_to_dict() {
        let input = ToolInput::new("tool", serde_json::json!({"url": "https://example.com"}));
        let dict = input.to_dict();
        assert!(dict.contains_key("action_id"));
        assert!(!dict.contains_key("pipeline_run_id"));
        assert_eq!(input.str_param("url"), Some("https://example.com"));

        let dict = input.with_run_id(Uuid::new_v4()).to_dict();
        assert!(dict.contains_key("pipeline_run_id"));
    }

    #[test]
    fn test_content_output() {
        let output = ToolOutput::content("# Example");
        assert!(!output.is_failure());

        let raw = output.into_raw_content();
        assert_eq!(raw.as_str(), "# Example");
        assert!(!raw.is_failure_sentinel());
    }

    #[test]
    fn test_failed_output_becomes_sentinel() {
        let output = ToolOutput::from(ToolError::http_status(
            "fetch_url",
            503,
            "https://example.com/",
        ));
        assert!(output.is_failure());

        let raw = output.into_raw_content();
        assert_eq!(
            raw.as_str(),
            "[ERROR] fetch_url: HTTP 503 from https://example.com/"
        );
        assert!(raw.is_failure_sentinel());
    }

    #[test]
    fn test_tool_output_serialization() {
        let json = serde_json::to_value(ToolOutput::content("x")).unwrap();
        assert_eq!(json, serde_json::json!({"status": "content", "text": "x"}));
    }
}
