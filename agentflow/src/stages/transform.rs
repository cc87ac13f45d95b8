//! Model-driven transform stages.

use super::Stage;
use crate::context::StageContext;
use crate::contracts::{extract_json_object, SchemaContract, ValidationError};
use crate::core::{StageKind, StageValue};
use crate::errors::StageError;
use crate::llm::{ChatMessage, LanguageModel, ModelRequest, ModelResponse};
use crate::tools::ToolRegistry;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Tool rounds allowed when a stage does not say otherwise.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 1;

/// A fixed instruction paired with the contract its output must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageInstruction {
    text: String,
    contract: Option<SchemaContract>,
}

impl StageInstruction {
    /// Creates an instruction with free-form output.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            contract: None,
        }
    }

    /// Requires the output to satisfy `contract`.
    #[must_use]
    pub fn with_contract(mut self, contract: SchemaContract) -> Self {
        self.contract = Some(contract);
        self
    }

    /// Returns the instruction text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the target contract.
    #[must_use]
    pub fn contract(&self) -> Option<&SchemaContract> {
        self.contract.as_ref()
    }

    /// Renders the system prompt: the instruction, then the contract's hint.
    #[must_use]
    pub fn system_prompt(&self) -> String {
        match self.contract {
            Some(ref contract) => format!("{}\n\n{}", self.text, contract.prompt_hint()),
            None => self.text.clone(),
        }
    }
}

/// Applies a fixed instruction to its input with a language model.
///
/// The model is called without retry. When tools are attached the model may
/// call them for up to `max_tool_rounds` rounds; tool results are appended to
/// the same conversation.
#[derive(Debug, Clone)]
pub struct TransformStage {
    name: String,
    model: Arc<dyn LanguageModel>,
    model_name: String,
    instruction: StageInstruction,
    tools: ToolRegistry,
    max_tool_rounds: usize,
}

impl TransformStage {
    /// Creates a stage using the model's default model name.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        model: Arc<dyn LanguageModel>,
        instruction: StageInstruction,
    ) -> Self {
        Self {
            name: name.into(),
            model,
            model_name: String::new(),
            instruction,
            tools: ToolRegistry::new(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Requests a specific model name.
    #[must_use]
    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    /// Exposes tools to the model.
    #[must_use]
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the tool round budget.
    #[must_use]
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Returns the instruction.
    #[must_use]
    pub fn instruction(&self) -> &StageInstruction {
        &self.instruction
    }

    fn initial_request(&self, input: &StageValue) -> ModelRequest {
        let mut request = ModelRequest::new(&self.model_name, self.instruction.system_prompt())
            .with_message(ChatMessage::user(input.as_context_text()));
        if let Some(contract) = self.instruction.contract() {
            request = request.with_schema(contract.to_json_schema());
        }
        if !self.tools.is_empty() {
            request = request.with_tools(self.tools.definitions());
        }
        request
    }

    async fn converse(
        &self,
        ctx: &StageContext,
        mut request: ModelRequest,
    ) -> Result<ModelResponse, StageError> {
        let mut rounds = 0;
        loop {
            let response = self.model.invoke(&request).await?;
            debug!(attributes = ?response.to_otel_attributes(), "model call finished");

            if !response.has_tool_calls() {
                return Ok(response);
            }
            if rounds >= self.max_tool_rounds {
                warn!(rounds, "model requested tools beyond its budget");
                return Err(StageError::ToolBudgetExhausted {
                    rounds: self.max_tool_rounds,
                });
            }
            rounds += 1;

            request.messages.push(ChatMessage::assistant(
                response.content.clone(),
                response.tool_calls.clone(),
            ));
            for call in response.tool_calls {
                let output = ctx
                    .invoke_registered(&self.tools, &call.name, call.arguments)
                    .await;
                request.messages.push(ChatMessage::tool_result(
                    call.id,
                    output.into_raw_content().into_string(),
                ));
            }
        }
    }

    fn conform(&self, text: String) -> Result<StageValue, StageError> {
        let Some(contract) = self.instruction.contract() else {
            return Ok(StageValue::raw(text));
        };

        let candidate = extract_json_object(&text)
            .map_err(|reason| ValidationError::malformed(contract.name(), reason))?;
        let value = contract.validate(&candidate)?;
        Ok(StageValue::Structured(value))
    }
}

#[async_trait]
impl Stage for TransformStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        StageKind::Transform
    }

    fn output_contract(&self) -> Option<&SchemaContract> {
        self.instruction.contract()
    }

    #[instrument(skip(self, ctx, input), fields(stage = %self.name, model = %self.model.name()))]
    async fn run(&self, ctx: &StageContext, input: StageValue) -> Result<StageValue, StageError> {
        let request = self.initial_request(&input);
        let response = self.converse(ctx, request).await?;
        self.conform(response.content.unwrap_or_default())
    }
}
