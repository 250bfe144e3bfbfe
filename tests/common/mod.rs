//! Shared test doubles for the agent scenario tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use serde_json::Value;

use agentry::llm::{ChatMessage, LlmError, ModelClient};
use agentry::tools::Tool;
use agentry::Config;

/// Route agent logs through the test harness; filter with `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Config pointing at nothing in particular; the scripted client never
/// touches the network.
pub fn test_config() -> Config {
    Config::new(
        "test-key".to_string(),
        "gpt-test".to_string(),
        "http://localhost:0/v1".to_string(),
    )
}

/// Model client that replays a fixed sequence of replies.
///
/// Replies are consumed in order; when the script runs out, the last
/// reply repeats (convenient for cap tests that need "the model keeps
/// doing the same thing"). Calling it with an empty script is an error.
pub struct ScriptedClient {
    replies: Vec<String>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new<S: Into<String>>(replies: Vec<S>) -> Self {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of completions requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, LlmError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .get(call)
            .or_else(|| self.replies.last())
            .ok_or_else(|| LlmError::InvalidResponse("scripted client has no replies".into()))?;
        Ok(reply.clone())
    }
}

/// Tool that records every invocation and returns a canned reply.
pub struct RecordingTool {
    name: String,
    description: String,
    output: String,
    invocations: Arc<Mutex<Vec<Value>>>,
}

impl RecordingTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            output: output.into(),
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle for asserting on recorded invocations after the run.
    pub fn invocations(&self) -> Arc<Mutex<Vec<Value>>> {
        Arc::clone(&self.invocations)
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        self.invocations
            .lock()
            .expect("invocation log poisoned")
            .push(args);
        Ok(self.output.clone())
    }
}

/// Tool that always fails, for failure-cap tests.
pub struct AlwaysFailingTool;

#[async_trait]
impl Tool for AlwaysFailingTool {
    fn name(&self) -> &str {
        "flaky"
    }

    fn description(&self) -> &str {
        "A tool that always fails."
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("upstream service unavailable"))
    }
}
