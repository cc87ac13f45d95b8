//! Values that flow between stages.

use crate::contracts::StructuredValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix that marks a [`RawContent`] as a contained failure.
pub const FAILURE_MARKER: &str = "[ERROR]";

/// Unstructured text: caller input or content extracted from a resource.
///
/// May be empty, and may be a failure sentinel produced at a tool boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawContent(String);

impl RawContent {
    /// Wraps text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Builds a sentinel of the form `"[ERROR] <source>: <cause>"`.
    #[must_use]
    pub fn from_failure(source: &str, cause: impl fmt::Display) -> Self {
        Self(format!("{FAILURE_MARKER} {source}: {cause}"))
    }

    /// Returns true if the text starts with [`FAILURE_MARKER`].
    #[must_use]
    pub fn is_failure_sentinel(&self) -> bool {
        self.0.trim_start().starts_with(FAILURE_MARKER)
    }

    /// Borrows the text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RawContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RawContent {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for RawContent {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

/// The value a stage receives and produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StageValue {
    /// Unstructured text.
    Raw(RawContent),
    /// A contract-validated record.
    Structured(StructuredValue),
}

impl StageValue {
    /// Wraps text as a raw value.
    #[must_use]
    pub fn raw(text: impl Into<String>) -> Self {
        Self::Raw(RawContent::new(text))
    }

    /// Renders the value as text for use as model context.
    #[must_use]
    pub fn as_context_text(&self) -> String {
        match self {
            Self::Raw(raw) => raw.as_str().to_string(),
            Self::Structured(value) => value.to_context_text(),
        }
    }

    /// Returns the structured value, if any.
    #[must_use]
    pub fn as_structured(&self) -> Option<&StructuredValue> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    /// Returns the raw content, if any.
    #[must_use]
    pub fn as_raw(&self) -> Option<&RawContent> {
        match self {
            Self::Raw(raw) => Some(raw),
            Self::Structured(_) => None,
        }
    }

    /// Returns true if this is a raw failure sentinel.
    #[must_use]
    pub fn is_failure_sentinel(&self) -> bool {
        self.as_raw().is_some_and(RawContent::is_failure_sentinel)
    }
}

impl From<RawContent> for StageValue {
    fn from(raw: RawContent) -> Self {
        Self::Raw(raw)
    }
}

impl From<StructuredValue> for StageValue {
    fn from(value: StructuredValue) -> Self {
        Self::Structured(value)
    }
}

impl From<String> for StageValue {
    fn from(text: String) -> Self {
        Self::Raw(RawContent::new(text))
    }
}

impl From<&str> for StageValue {
    fn from(text: &str) -> Self {
        Self::Raw(RawContent::new(text))
    }
}
