//! Tools the agent can invoke, and the registry that dispatches them.
//!
//! A [`Tool`] is a named async capability with a description the model
//! reads when deciding what to call. The [`ToolRegistry`] owns every
//! registered tool and is the single dispatch point: agent loops never
//! hold tools directly.

mod search;

pub use search::WebSearchTool;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// A capability the model can invoke by name.
///
/// `execute` receives a JSON object mapping argument names to values and
/// returns human-readable output destined for the model's next
/// observation. Tools report their own failures through the `Result`;
/// the registry wraps them, and loops absorb them into the transcript.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to select this tool.
    fn name(&self) -> &str;

    /// One-paragraph description shown to the model.
    fn description(&self) -> &str;

    /// Run the tool with the given arguments.
    async fn execute(&self, args: Value) -> anyhow::Result<String>;
}

/// Errors from registering or dispatching tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A tool with this name is already registered.
    #[error("tool '{0}' is already registered")]
    AlreadyRegistered(String),

    /// No tool with this name exists.
    #[error("unknown tool '{0}'")]
    NotFound(String),

    /// The tool ran and failed (bad arguments, network error, timeout).
    #[error("tool '{name}' failed: {source}")]
    Execution {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Name-keyed collection of tools.
///
/// Populated once at startup, then shared read-only across runs (wrap in
/// `Arc` for that). Names are unique: re-registering is an error rather
/// than a silent replacement.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool under its own name.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::AlreadyRegistered` if the name is taken.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<(), ToolError> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a tool that is already behind an `Arc`.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::AlreadyRegistered(name));
        }
        tracing::debug!(tool = %name, "Registered tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Whether a tool with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All registered tool names, sorted.
    pub fn list_tools(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// `(name, description)` pairs in name order, for prompt building.
    pub fn descriptions(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .tools
            .values()
            .map(|tool| (tool.name(), tool.description()))
            .collect();
        pairs.sort_unstable_by_key(|(name, _)| *name);
        pairs
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry holds no tools.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch one invocation to the named tool.
    ///
    /// # Errors
    ///
    /// `ToolError::NotFound` if the name is unknown, or
    /// `ToolError::Execution` wrapping the tool's own failure. No
    /// retries happen here; callers decide what a failure means.
    pub async fn execute(&self, name: &str, args: Value) -> Result<String, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        tracing::debug!(tool = %name, "Dispatching tool");
        tool.execute(args)
            .await
            .map_err(|source| ToolError::Execution {
                name: name.to_string(),
                source,
            })
    }
}
