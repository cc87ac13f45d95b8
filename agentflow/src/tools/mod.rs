//! Tools subsystem.
//!
//! This module provides:
//! - Tool definitions and the never-failing [`ToolOutput`]
//! - The [`Tool`] trait and an owned [`ToolRegistry`]
//! - The `fetch_url` tool and its [`Fetcher`] seam
//! - HTML to Markdown conversion

mod definitions;
mod fetch;
mod markdown;
mod registry;

pub use definitions::{ToolDefinition, ToolFailure, ToolInput, ToolOutput};
#[cfg(test)]
pub use fetch::MockFetcher;
pub use fetch::{FetchOptions, FetchTool, FetchedPage, Fetcher, HttpFetcher, FETCH_TOOL_NAME};
pub use markdown::{extract_title, html_to_markdown, truncate_chars, MarkdownOptions};
pub use registry::{Tool, ToolRegistry};
