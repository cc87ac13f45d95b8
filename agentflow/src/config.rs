//! Runtime configuration.
//!
//! Configuration comes from an optional TOML file, then environment
//! overrides, then defaults. The API key itself is never stored in the file;
//! the file names the environment variable that holds it.
//!
//! ```toml
//! [model]
//! model = "gpt-4o-mini"
//! base_url = "https://api.openai.com/v1"
//! api_key_env = "OPENAI_API_KEY"
//!
//! [fetch]
//! timeout_seconds = 20.0
//! include_links = false
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Environment variable overriding `model.model`.
pub const ENV_MODEL: &str = "AGENTFLOW_MODEL";
/// Environment variable overriding `model.base_url`.
pub const ENV_BASE_URL: &str = "AGENTFLOW_BASE_URL";
/// Environment variable overriding `logging.level`.
pub const ENV_LOG: &str = "AGENTFLOW_LOG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentflowConfig {
    /// Language model settings.
    #[serde(default)]
    pub model: ModelConfig,
    /// Resource fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AgentflowConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it is not valid.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Applies overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    #[must_use]
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(model) = non_empty(ENV_MODEL) {
            self.model.model = model;
        }
        if let Some(base_url) = non_empty(ENV_BASE_URL) {
            self.model.base_url = base_url;
        }
        if let Some(level) = non_empty(ENV_LOG) {
            self.logging.level = level;
        }
        if self.model.api_key.is_none() {
            self.model.api_key = non_empty(&self.model.api_key_env);
        }
        self
    }

    /// Checks every field for usable values.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.model.validate()?;
        self.fetch.validate()?;
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid("logging.level", "must not be empty"));
        }
        Ok(())
    }
}

/// `[model]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name sent with each request.
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the env var holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Resolved API key; never read from or written to the file.
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_model_timeout")]
    pub timeout_seconds: f64,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Tool rounds allowed per tool-augmented transform.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_model_timeout() -> f64 {
    60.0
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tool_rounds() -> usize {
    1
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            api_key: None,
            timeout_seconds: default_model_timeout(),
            temperature: default_temperature(),
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

impl ModelConfig {
    /// Sets the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the API key directly.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Gets timeout as Duration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the timeout is not a positive,
    /// representable number of seconds.
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        timeout_duration("model.timeout_seconds", self.timeout_seconds)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::invalid("model.model", "must not be empty"));
        }
        match Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ConfigError::invalid(
                    "model.base_url",
                    format!("unsupported scheme '{}'", url.scheme()),
                ))
            }
            Err(e) => return Err(ConfigError::invalid("model.base_url", e.to_string())),
        }
        self.timeout()?;
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::invalid(
                "model.temperature",
                "must be between 0.0 and 2.0",
            ));
        }
        Ok(())
    }
}

/// `[fetch]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_seconds: f64,
    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Keep hyperlinks in the Markdown output.
    #[serde(default)]
    pub include_links: bool,
    /// Keep images in the Markdown output.
    #[serde(default)]
    pub include_images: bool,
    /// Ask the fetcher to execute scripts before reading the page.
    #[serde(default)]
    pub render_scripts: bool,
    /// Maximum characters of content handed downstream.
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

fn default_fetch_timeout() -> f64 {
    20.0
}

fn default_max_redirects() -> usize {
    5
}

fn default_user_agent() -> String {
    concat!("agentflow/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_content_chars() -> usize {
    20_000
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_fetch_timeout(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
            include_links: false,
            include_images: false,
            render_scripts: false,
            max_content_chars: default_max_content_chars(),
        }
    }
}

impl FetchConfig {
    /// Creates a new fetch configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Keeps links in the output.
    #[must_use]
    pub fn with_links(mut self, include: bool) -> Self {
        self.include_links = include;
        self
    }

    /// Keeps images in the output.
    #[must_use]
    pub fn with_images(mut self, include: bool) -> Self {
        self.include_images = include;
        self
    }

    /// Requests script rendering.
    #[must_use]
    pub fn with_render_scripts(mut self, render: bool) -> Self {
        self.render_scripts = render;
        self
    }

    /// Sets the content cap.
    #[must_use]
    pub fn with_max_content_chars(mut self, max: usize) -> Self {
        self.max_content_chars = max;
        self
    }

    /// Gets timeout as Duration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the timeout is not a positive,
    /// representable number of seconds.
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        timeout_duration("fetch.timeout_seconds", self.timeout_seconds)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.timeout()?;
        if self.max_content_chars == 0 {
            return Err(ConfigError::invalid(
                "fetch.max_content_chars",
                "must be greater than zero",
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::invalid("fetch.user_agent", "must not be empty"));
        }
        Ok(())
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Multi-line, human-oriented.
    Pretty,
    /// Single-line, human-oriented.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `agentflow=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn timeout_duration(field: &str, seconds: f64) -> Result<Duration, ConfigError> {
    if !(seconds.is_finite() && seconds > 0.0) {
        return Err(ConfigError::invalid(field, "must be a positive number of seconds"));
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| ConfigError::invalid(field, format!("out of range: {e}")))
}
