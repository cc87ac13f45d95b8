//! Translation into English and Traditional Chinese.

use crate::config::ModelConfig;
use crate::contracts::{FieldType, SchemaContract, StructuredRecord};
use crate::errors::PipelineValidationError;
use crate::llm::LanguageModel;
use crate::pipeline::{PipelineBuilder, PipelineDefinition};
use crate::stages::{StageInstruction, TransformStage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name of the translation pipeline.
pub const TRANSLATION_PIPELINE: &str = "translation";
/// Name of its only stage.
pub const TRANSLATE_STAGE: &str = "translate";

/// A text alongside its English and Traditional Chinese renderings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilingualText {
    /// The text as given.
    pub source: String,
    /// English translation.
    pub en: String,
    /// Traditional Chinese translation.
    pub zh_tw: String,
}

impl StructuredRecord for BilingualText {
    fn contract() -> SchemaContract {
        SchemaContract::new("bilingual_text", "A text with English and Traditional Chinese translations")
            .field("source", FieldType::NonEmptyString, "The original text, unchanged")
            .field("en", FieldType::NonEmptyString, "English translation")
            .field("zh_tw", FieldType::NonEmptyString, "Traditional Chinese (Taiwan) translation")
    }
}

/// Returns the translation instruction bound to [`BilingualText`].
#[must_use]
pub fn translation_instruction() -> StageInstruction {
    StageInstruction::new(
        "You receive a text in any language. Translate it to English and to \
         Traditional Chinese as used in Taiwan. Copy the original text into \
         `source` unchanged. If the text is already English or Chinese, still \
         fill every field.",
    )
    .with_contract(BilingualText::contract())
}

/// Builds the single-stage translation pipeline.
///
/// # Errors
///
/// Only fails if the builder rejects the stage layout.
pub fn translation_pipeline(
    model: Arc<dyn LanguageModel>,
    config: &ModelConfig,
) -> Result<PipelineDefinition, PipelineValidationError> {
    let stage = TransformStage::new(TRANSLATE_STAGE, model, translation_instruction())
        .with_model_name(&config.model)
        .with_max_tool_rounds(config.max_tool_rounds);

    PipelineBuilder::new(TRANSLATION_PIPELINE)
        .stage(Arc::new(stage))?
        .build()
}
