//! # Agentflow
//!
//! Linear agent pipelines whose stages either call a tool or ask a language
//! model for output that must satisfy a schema contract.
//!
//! Agentflow provides:
//!
//! - **Schema contracts**: declared fields with semantic types, validated
//!   without coercion, reporting every failing field
//! - **Contained tool failures**: a failed fetch becomes an `[ERROR]`
//!   sentinel that flows to the next stage instead of aborting the run
//! - **Strictly sequential pipelines**: each stage's output is the next
//!   stage's input; any hard error ends the run and names the stage
//! - **Event-driven observability**: lifecycle events through an injected
//!   sink, plus `tracing` spans
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use agentflow::prelude::*;
//!
//! let config = AgentflowConfig::from_path("agentflow.toml")?.with_env_overrides();
//! init_tracing(&config.logging)?;
//!
//! let runner = Runner::from_config(&config)?;
//! let summary = runner.execute(Request::parse("https://example.com")?).await?;
//! println!("{}", summary.to_context_text());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod agents;
pub mod config;
pub mod context;
pub mod contracts;
pub mod core;
pub mod errors;
pub mod events;
pub mod llm;
pub mod observability;
pub mod pipeline;
pub mod runner;
pub mod stages;
pub mod testing;
pub mod tools;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::agents::{
        resource_summary_pipeline, translation_pipeline, BilingualText, ResourceSummary,
    };
    pub use crate::config::{AgentflowConfig, FetchConfig, LogFormat, LoggingConfig, ModelConfig};
    pub use crate::context::{RunIdentity, StageContext};
    pub use crate::contracts::{
        FieldType, SchemaContract, StructuredRecord, StructuredValue, ValidationError,
    };
    pub use crate::core::{RawContent, StageKind, StageStatus, StageValue, FAILURE_MARKER};
    pub use crate::errors::{
        AgentflowError, FailureKind, ModelError, PipelineError, PipelineValidationError,
        StageError, ToolError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::llm::{LanguageModel, ModelRequest, ModelResponse, OpenAiChatModel};
    pub use crate::observability::init_tracing;
    pub use crate::pipeline::{PipelineBuilder, PipelineDefinition, PipelineRun, StageSpec};
    pub use crate::runner::{Request, Runner};
    pub use crate::stages::{Stage, StageInstruction, ToolStage, TransformStage};
    pub use crate::tools::{
        FetchTool, HttpFetcher, Tool, ToolDefinition, ToolInput, ToolOutput, ToolRegistry,
    };
}
