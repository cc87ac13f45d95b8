//! Resource fetching: the [`Fetcher`] seam, its reqwest implementation, and
//! the `fetch_url` tool built on top.

use super::markdown::{html_to_markdown, truncate_chars, MarkdownOptions};
use super::{Tool, ToolDefinition, ToolInput};
use crate::config::FetchConfig;
use crate::errors::{ConfigError, ToolError};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Name under which [`FetchTool`] registers.
pub const FETCH_TOOL_NAME: &str = "fetch_url";

/// Per-request options passed to a [`Fetcher`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// Deadline for the whole request.
    pub timeout: Duration,
    /// Whether scripts should run before the page is read.
    pub render_scripts: bool,
}

/// A fetched resource, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// URL after redirects.
    pub final_url: Url,
    /// HTTP status code.
    pub status: u16,
    /// `Content-Type` header, if present.
    pub content_type: Option<String>,
    /// Response body decoded as text.
    pub body: String,
}

impl FetchedPage {
    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true if the body should be treated as HTML.
    #[must_use]
    pub fn is_html(&self) -> bool {
        match self.content_type.as_deref() {
            Some(ct) => ct.contains("html"),
            None => self.body.trim_start().starts_with('<'),
        }
    }
}

/// Retrieves a resource by URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url`.
    ///
    /// Returns the page for any HTTP status; errors are reserved for
    /// transport failures and timeouts.
    async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<FetchedPage, ToolError>;
}

/// [`Fetcher`] backed by a shared reqwest client.
///
/// Serves the static HTML of a page. Script rendering would need a headless
/// browser, so `render_scripts` is logged and otherwise ignored.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a client from the fetch configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the client cannot be built.
    pub fn new(config: &FetchConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(config.timeout()?)
            .build()
            .map_err(|e| ConfigError::invalid("fetch", format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self, options), fields(url = %url))]
    async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<FetchedPage, ToolError> {
        if options.render_scripts {
            debug!("script rendering requested; serving static HTML");
        }

        let response = self
            .client
            .get(url.clone())
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| map_transport_error(&e, options.timeout))?;

        let final_url = response.url().clone();
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error(&e, options.timeout))?;

        debug!(status, bytes = body.len(), "fetched");
        Ok(FetchedPage {
            final_url,
            status,
            content_type,
            body,
        })
    }
}

fn map_transport_error(error: &reqwest::Error, timeout: Duration) -> ToolError {
    if error.is_timeout() {
        ToolError::timeout(FETCH_TOOL_NAME, timeout.as_secs_f64())
    } else {
        ToolError::execution_failed(FETCH_TOOL_NAME, format!("request failed: {error}"))
    }
}

/// Tool that fetches a URL and returns its content as Markdown.
///
/// Expects a payload of the form `{"url": "https://..."}`.
#[derive(Clone)]
pub struct FetchTool {
    fetcher: Arc<dyn Fetcher>,
    config: FetchConfig,
}

impl FetchTool {
    /// Creates the tool.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, config: FetchConfig) -> Self {
        Self { fetcher, config }
    }

    fn parse_url(&self, input: &ToolInput) -> Result<Url, ToolError> {
        let raw = input
            .str_param("url")
            .ok_or_else(|| ToolError::invalid_input(FETCH_TOOL_NAME, "missing 'url' parameter"))?;

        let url = Url::parse(raw.trim()).map_err(|e| {
            ToolError::invalid_input(FETCH_TOOL_NAME, format!("malformed URL '{raw}': {e}"))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ToolError::invalid_input(
                FETCH_TOOL_NAME,
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        Ok(url)
    }
}

impl std::fmt::Debug for FetchTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchTool")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for FetchTool {
    fn name(&self) -> &str {
        FETCH_TOOL_NAME
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(FETCH_TOOL_NAME)
            .with_description("Fetch a web page and return its content as Markdown.")
            .with_input_schema(serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "format": "uri",
                        "description": "Absolute http(s) URL to fetch",
                    }
                },
                "required": ["url"],
            }))
    }

    #[instrument(skip(self, input), fields(action_id = %input.action_id))]
    async fn call(&self, input: &ToolInput) -> Result<String, ToolError> {
        let url = self.parse_url(input)?;
        let timeout = self
            .config
            .timeout()
            .map_err(|e| ToolError::invalid_input(FETCH_TOOL_NAME, e.to_string()))?;
        let options = FetchOptions {
            timeout,
            render_scripts: self.config.render_scripts,
        };

        let page = self.fetcher.fetch(&url, &options).await?;
        if !page.is_success() {
            return Err(ToolError::http_status(
                FETCH_TOOL_NAME,
                page.status,
                page.final_url.as_str(),
            ));
        }

        let content = if page.is_html() {
            let options = MarkdownOptions {
                include_links: self.config.include_links,
                include_images: self.config.include_images,
            };
            html_to_markdown(&page.body, &page.final_url, options)
                .map_err(|reason| ToolError::execution_failed(FETCH_TOOL_NAME, reason))?
        } else {
            page.body
        };

        Ok(truncate_chars(&content, self.config.max_content_chars).to_string())
    }
}
