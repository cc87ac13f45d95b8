//! Test assertions for pipeline results.

use crate::contracts::StructuredValue;
use crate::core::StageValue;
use crate::errors::{FailureKind, PipelineError};
use crate::pipeline::PipelineRun;

/// Asserts that every named field is a non-empty string.
pub fn assert_fields_non_empty(value: &StructuredValue, fields: &[&str]) {
    for field in fields {
        let text = value.get_str(field);
        assert!(
            text.is_some_and(|t| !t.trim().is_empty()),
            "Expected '{}' to be a non-empty string in {}, got {:?}",
            field,
            value.contract(),
            value.get(field)
        );
    }
}

/// Asserts that a stage value is a failure sentinel.
pub fn assert_sentinel(value: &StageValue) {
    assert!(
        value.is_failure_sentinel(),
        "Expected a failure sentinel, got: {}",
        value.as_context_text()
    );
}

/// Asserts that stages ran in exactly this order.
pub fn assert_stage_order(run: &PipelineRun, expected: &[&str]) {
    let actual: Vec<&str> = run.records.iter().map(|r| r.stage.as_str()).collect();
    assert_eq!(actual, expected, "Unexpected stage order");
}

/// Asserts that a pipeline failed at `stage` with `kind`.
pub fn assert_failed_at(error: &PipelineError, stage: &str, kind: FailureKind) {
    assert_eq!(error.stage(), stage, "Failure attributed to wrong stage: {error}");
    assert_eq!(error.kind(), kind, "Unexpected failure kind: {error}");
}
