//! A stage that wraps exactly one tool.

use super::Stage;
use crate::context::StageContext;
use crate::core::{StageKind, StageValue};
use crate::errors::StageError;
use crate::tools::Tool;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Runs one tool and returns its output verbatim as raw content.
///
/// Raw input text is bound to a single named parameter; structured input has
/// its fields merged into the payload. Static parameters declared at
/// construction are applied last and win over upstream values.
#[derive(Debug, Clone)]
pub struct ToolStage {
    name: String,
    tool: Arc<dyn Tool>,
    input_param: String,
    static_params: Map<String, Value>,
}

impl ToolStage {
    /// Creates a stage binding raw input text to `input_param`.
    #[must_use]
    pub fn new(name: impl Into<String>, tool: Arc<dyn Tool>, input_param: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tool,
            input_param: input_param.into(),
            static_params: Map::new(),
        }
    }

    /// Adds a fixed parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.static_params.insert(key.into(), value);
        self
    }

    /// Returns the wrapped tool's name.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        self.tool.name()
    }

    /// Builds the tool payload for an upstream value.
    #[must_use]
    pub fn payload_for(&self, input: &StageValue) -> Value {
        let mut payload = Map::new();
        match input {
            StageValue::Raw(raw) => {
                payload.insert(self.input_param.clone(), Value::String(raw.as_str().to_string()));
            }
            StageValue::Structured(value) => {
                payload.extend(value.fields().clone());
            }
        }
        payload.extend(self.static_params.clone());
        Value::Object(payload)
    }
}

#[async_trait]
impl Stage for ToolStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        StageKind::Tool
    }

    #[instrument(skip(self, ctx, input), fields(stage = %self.name, tool = %self.tool.name()))]
    async fn run(&self, ctx: &StageContext, input: StageValue) -> Result<StageValue, StageError> {
        let payload = self.payload_for(&input);
        let output = ctx.invoke_tool(self.tool.as_ref(), payload).await;
        let raw = output.into_raw_content();
        debug!(sentinel = raw.is_failure_sentinel(), chars = raw.as_str().len(), "tool stage finished");
        Ok(StageValue::Raw(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{FieldType, SchemaContract};
    use crate::errors::ToolError;
    use crate::testing::{FailingTool, StaticTool};
    use serde_json::json;

    #[test]
    fn test_payload_binding() {
        let stage = ToolStage::new("fetch", Arc::new(StaticTool::new("echo", "")), "url")
            .with_param("lang", json!("zh-TW"));

        assert_eq!(
            stage.payload_for(&StageValue::raw("https://example.com")),
            json!({"url": "https://example.com", "lang": "zh-TW"})
        );

        let structured = SchemaContract::new("c", "")
            .field("url", FieldType::Url, "")
            .field("lang", FieldType::String, "")
            .validate(&json!({"url": "https://example.com", "lang": "en"}))
            .unwrap();
        assert_eq!(
            stage.payload_for(&StageValue::Structured(structured)),
            json!({"url": "https://example.com", "lang": "zh-TW"})
        );
    }

    #[tokio::test]
    async fn test_returns_tool_content_verbatim() {
        let stage = ToolStage::new("echo", Arc::new(StaticTool::new("echo", "  body  ")), "text");
        assert_eq!(stage.kind(), StageKind::Tool);
        assert!(stage.output_contract().is_none());

        let out = stage
            .run(&StageContext::detached("echo"), StageValue::raw("in"))
            .await
            .unwrap();
        assert_eq!(out, StageValue::raw("  body  "));
    }

    #[tokio::test]
    async fn test_tool_failure_is_sentinel_not_error() {
        let tool = FailingTool::new("fetch_url", ToolError::http_status("fetch_url", 500, "https://x.test/"));
        let stage = ToolStage::new("fetch", Arc::new(tool), "url");
        assert_eq!(stage.tool_name(), "fetch_url");

        let out = stage
            .run(&StageContext::detached("fetch"), StageValue::raw("https://x.test/"))
            .await
            .unwrap();
        assert!(out.is_failure_sentinel());
        assert_eq!(
            out.as_context_text(),
            "[ERROR] fetch_url: HTTP 500 from https://x.test/"
        );
    }
}
