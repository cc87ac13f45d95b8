//! The two concrete pipelines.
//!
//! - Translation: one transform stage producing [`BilingualText`].
//! - Resource summary: a fetch stage, then a transform stage producing
//!   [`ResourceSummary`].

mod summary;
mod translation;

pub use summary::{
    resource_summary_pipeline, summary_instruction, ResourceSummary, FETCH_STAGE,
    RESOURCE_SUMMARY_PIPELINE, SUMMARIZE_STAGE,
};
pub use translation::{
    translation_instruction, translation_pipeline, BilingualText, TRANSLATE_STAGE,
    TRANSLATION_PIPELINE,
};
