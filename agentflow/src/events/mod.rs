//! Lifecycle events emitted during pipeline runs.
//!
//! Sinks are injected into each run; there is no process-wide sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

/// A run began.
pub const PIPELINE_STARTED: &str = "pipeline.started";
/// A run produced its final value.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
/// A run stopped on a hard error.
pub const PIPELINE_FAILED: &str = "pipeline.failed";
/// A stage began.
pub const STAGE_STARTED: &str = "stage.started";
/// A stage produced a value.
pub const STAGE_COMPLETED: &str = "stage.completed";
/// A stage raised a hard error.
pub const STAGE_FAILED: &str = "stage.failed";
/// A tool was called.
pub const TOOL_INVOKED: &str = "tool.invoked";
/// A tool returned content.
pub const TOOL_COMPLETED: &str = "tool.completed";
/// A tool failed and the failure was contained.
pub const TOOL_FAILED: &str = "tool.failed";
