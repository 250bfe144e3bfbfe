//! Model client: chat messages and the completion seam.
//!
//! Agent loops speak to the model through the [`ModelClient`] trait: a list
//! of role-tagged messages in, generated text out. The concrete
//! [`OpenAiClient`] talks to any OpenAI-compatible `/chat/completions`
//! endpoint and owns retry/backoff, so loops never retry themselves.

mod client;
mod error;
mod retry;

pub use client::OpenAiClient;
pub use error::LlmError;
pub use retry::RetryConfig;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role of a chat participant, serialized in the OpenAI wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// Human/task input, including tool observations fed back to the model.
    User,
    /// Model output.
    Assistant,
}

/// One message in a chat conversation.
///
/// The orchestration protocol here is purely textual, so there is no tool
/// role: observations travel back to the model as user messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Abstraction over a chat-completion model.
///
/// Implementations receive the full conversation and return the generated
/// text of a single completion. Retrying transient failures is the
/// implementation's responsibility; callers treat an `Err` as final.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}
