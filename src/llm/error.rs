//! Model client error types.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by model-call plumbing.
///
/// Only the transient variants are retried by the client; see
/// [`LlmError::is_retryable`]. Everything that survives the retry loop
/// surfaces to agent loops as a fatal run error.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP 429 from the provider.
    #[error("rate limited by provider")]
    RateLimited {
        /// Cooldown suggested by the `Retry-After` response header.
        retry_after: Option<Duration>,
    },

    /// Non-success HTTP status other than the cases above.
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The body did not decode as a chat completion.
    #[error("malformed provider response: {0}")]
    InvalidResponse(String),

    /// The request exceeded the configured timeout.
    #[error("model request timed out")]
    Timeout,

    /// HTTP 401/403: the API key was rejected.
    #[error("provider rejected credentials")]
    Auth,

    /// Connection-level failure before any HTTP status arrived.
    #[error("network error: {0}")]
    Network(String),
}

impl LlmError {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Rate limits, timeouts, connection drops, and server errors are
    /// transient. Bad credentials and malformed responses are not: the
    /// retry would fail identically.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout | Self::Network(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Auth | Self::InvalidResponse(_) => false,
        }
    }
}
