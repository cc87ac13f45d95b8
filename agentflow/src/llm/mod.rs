//! The language-model collaborator.
//!
//! Stages hold an `Arc<dyn LanguageModel>`; the model is opaque to them.

mod openai;
mod types;

use crate::errors::ModelError;
use async_trait::async_trait;
use std::fmt;

pub use openai::OpenAiChatModel;
pub use types::{ChatMessage, ModelRequest, ModelResponse, Role, ToolCall};

/// A text-in, text-out model that may also request tool calls.
#[async_trait]
pub trait LanguageModel: Send + Sync + fmt::Debug {
    /// Identifies the model in logs and events.
    fn name(&self) -> &str;

    /// Runs one completion.
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError>;
}
