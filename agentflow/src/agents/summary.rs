//! Fetch a resource and summarize it in Traditional Chinese.

use crate::config::ModelConfig;
use crate::contracts::{FieldType, SchemaContract, StructuredRecord};
use crate::core::FAILURE_MARKER;
use crate::errors::PipelineValidationError;
use crate::llm::LanguageModel;
use crate::pipeline::{PipelineBuilder, PipelineDefinition};
use crate::stages::{StageInstruction, ToolStage, TransformStage};
use crate::tools::Tool;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name of the resource-summary pipeline.
pub const RESOURCE_SUMMARY_PIPELINE: &str = "resource_summary";
/// Name of the fetch stage.
pub const FETCH_STAGE: &str = "fetch";
/// Name of the summarizing stage.
pub const SUMMARIZE_STAGE: &str = "summarize";

/// Title and short excerpt of a fetched resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSummary {
    /// Where the resource was fetched from.
    pub url: String,
    /// Resource title.
    pub title: String,
    /// Summary in Traditional Chinese.
    pub excerpt: String,
}

impl StructuredRecord for ResourceSummary {
    // One sentence is accepted so a fetch failure can be reported briefly.
    fn contract() -> SchemaContract {
        SchemaContract::new("resource_summary", "Title and Traditional Chinese excerpt of a web page")
            .field("url", FieldType::Url, "Source URL")
            .field(
                "title",
                FieldType::NonEmptyString,
                "Page title, from <title> or a more precise rewrite",
            )
            .field(
                "excerpt",
                FieldType::Sentences { min: 1, max: Some(4) },
                "Summary in Traditional Chinese, 2 to 4 sentences",
            )
    }
}

/// Returns the summarizing instruction bound to [`ResourceSummary`].
#[must_use]
pub fn summary_instruction() -> StageInstruction {
    StageInstruction::new(format!(
        "You receive the text of a web page, converted to Markdown, headed by its \
         Title and URL. Produce its title and a 2 to 4 sentence excerpt in \
         Traditional Chinese. Use the URL from the header. If the text starts with \
         {FAILURE_MARKER}, the page could not be fetched: do not invent a summary; \
         use the URL as the title and write an excerpt that states the fetch failed \
         and why."
    ))
    .with_contract(ResourceSummary::contract())
}

/// Builds the two-stage resource-summary pipeline.
///
/// The fetch stage binds the incoming URL text to the tool's `url` parameter.
///
/// # Errors
///
/// Only fails if the builder rejects the stage layout.
pub fn resource_summary_pipeline(
    model: Arc<dyn LanguageModel>,
    config: &ModelConfig,
    fetch_tool: Arc<dyn Tool>,
) -> Result<PipelineDefinition, PipelineValidationError> {
    let fetch = ToolStage::new(FETCH_STAGE, fetch_tool, "url");
    let summarize = TransformStage::new(SUMMARIZE_STAGE, model, summary_instruction())
        .with_model_name(&config.model)
        .with_max_tool_rounds(config.max_tool_rounds);

    PipelineBuilder::new(RESOURCE_SUMMARY_PIPELINE)
        .stage(Arc::new(fetch))?
        .stage(Arc::new(summarize))?
        .build()
}
