//! Configuration for the agent runtime.
//!
//! Configuration is read once at startup and passed explicitly into
//! constructors; nothing reads the environment after that. Environment
//! variables:
//! - `API_KEY` - Required. Key for the OpenAI-compatible endpoint.
//! - `MODEL_ID` - Required. Model identifier sent with every request.
//! - `API_URL` - Required. API base URL (e.g. `https://api.openai.com/v1`).
//! - `MAX_ITERATIONS` - Optional. Loop iteration cap. Defaults to `10`.
//! - `MAX_TOOL_FAILURES` - Optional. Consecutive tool-failure cap. Defaults to `3`.
//! - `REQUEST_TIMEOUT_SECS` - Optional. Model request timeout. Defaults to `30`.
//! - `SERPAPI_API_KEY` - Optional. Enables the web search tool.
//!
//! Loading a `.env` file is the host application's concern.

use std::time::Duration;

use thiserror::Error;

use crate::llm::RetryConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Runtime configuration shared by agents, the model client, and tools.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the model endpoint
    pub api_key: String,

    /// Model identifier (provider format, e.g. `gpt-4o-mini`)
    pub model_id: String,

    /// Base URL of the OpenAI-compatible API
    pub api_url: String,

    /// Maximum iterations for an agent loop
    pub max_iterations: usize,

    /// Consecutive failed tool dispatches before a run aborts
    pub max_consecutive_tool_failures: usize,

    /// Timeout for one model request
    pub request_timeout: Duration,

    /// Retry policy for model calls
    pub retry: RetryConfig,

    /// SerpApi key for the web search tool, if configured
    pub search_api_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `API_KEY`, `MODEL_ID`, or
    /// `API_URL` is not set, and `ConfigError::InvalidValue` if a numeric
    /// variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = require_env("API_KEY")?;
        let model_id = require_env("MODEL_ID")?;
        let api_url = require_env("API_URL")?;

        let max_iterations = std::env::var("MAX_ITERATIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("MAX_ITERATIONS".to_string(), format!("{}", e)))?;

        let max_consecutive_tool_failures = std::env::var("MAX_TOOL_FAILURES")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("MAX_TOOL_FAILURES".to_string(), format!("{}", e)))?;

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("REQUEST_TIMEOUT_SECS".to_string(), format!("{}", e))
            })?;

        let search_api_key = std::env::var("SERPAPI_API_KEY").ok();

        Ok(Self {
            api_key,
            model_id,
            api_url,
            max_iterations,
            max_consecutive_tool_failures,
            request_timeout: Duration::from_secs(request_timeout_secs),
            retry: RetryConfig::default(),
            search_api_key,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, model_id: String, api_url: String) -> Self {
        Self {
            api_key,
            model_id,
            api_url,
            max_iterations: 10,
            max_consecutive_tool_failures: 3,
            request_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            search_api_key: None,
        }
    }
}

fn require_env(name: &str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnvVar(name.to_string())),
    }
}
