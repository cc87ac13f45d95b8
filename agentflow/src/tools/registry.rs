//! The tool trait and an owned registry of tool instances.

use super::{ToolDefinition, ToolInput, ToolOutput};
use crate::errors::ToolError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Trait for tool implementations.
///
/// Implementors write [`Tool::call`]; callers use [`Tool::invoke`], which
/// never fails.
#[async_trait]
pub trait Tool: Send + Sync + fmt::Debug {
    /// Returns the tool's name.
    fn name(&self) -> &str;

    /// Returns the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Performs the operation.
    async fn call(&self, input: &ToolInput) -> Result<String, ToolError>;

    /// Performs the operation, containing any failure as a value.
    async fn invoke(&self, input: &ToolInput) -> ToolOutput {
        match self.call(input).await {
            Ok(text) => {
                debug!(tool = %self.name(), action_id = %input.action_id, chars = text.len(), "tool succeeded");
                ToolOutput::content(text)
            }
            Err(error) => {
                warn!(
                    tool = %self.name(),
                    action_id = %input.action_id,
                    error_type = error.error_type(),
                    error = %error,
                    "tool failed; returning failure sentinel"
                );
                ToolOutput::from(error)
            }
        }
    }
}

/// Registry of tool instances, keyed by name.
///
/// Registries are plain values owned by the stage that uses them.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, returning any tool it replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        self.tools.insert(tool.name().to_string(), tool)
    }

    /// Builder-style registration.
    #[must_use]
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Gets a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Checks if a tool is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Lists registered tool names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Returns the definitions of every registered tool.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invokes the named tool. An unknown name yields a contained failure.
    pub async fn invoke(&self, input: &ToolInput) -> ToolOutput {
        match self.tools.get(&input.tool_name) {
            Some(tool) => tool.invoke(input).await,
            None => {
                warn!(tool = %input.tool_name, "tool not registered");
                ToolOutput::from(ToolError::not_found(&input.tool_name))
            }
        }
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
