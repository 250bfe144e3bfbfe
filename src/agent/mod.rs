//! Agent loops built on the tool registry and model client.
//!
//! Three patterns share one protocol and plumbing:
//! - [`ReActAgent`]: think, act, observe, repeat until a final answer.
//! - [`PlanAndSolveAgent`]: plan once, execute steps in order, aggregate.
//! - [`ReflectionAgent`]: draft, critique, improve, repeat.
//!
//! Runs end in a [`RunOutcome`]: either a final answer or a structured
//! [`AgentFailure`] (caps, cancellation). Only model-call failures and
//! unparseable plans are `Err`; tool failures become observations the
//! model can react to.

mod parser;
mod plan_and_solve;
mod prompt;
mod react;
mod reflection;
mod transcript;

pub use plan_and_solve::{Plan, PlanAndSolveAgent, PlanRunReport};
pub use react::{ReActAgent, RunReport};
pub use reflection::ReflectionAgent;
pub use transcript::{Action, StepRecord, Transcript};

use serde::Serialize;
use thiserror::Error;

use crate::llm::LlmError;
use crate::tools::{ToolError, ToolRegistry};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The model produced a final answer.
    FinalAnswer { answer: String },
    /// The run stopped without one.
    Failure { failure: AgentFailure },
}

impl RunOutcome {
    /// The answer text, if the run produced one.
    pub fn final_answer(&self) -> Option<&str> {
        match self {
            Self::FinalAnswer { answer } => Some(answer),
            Self::Failure { .. } => None,
        }
    }

    /// Whether the run stopped without an answer.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }
}

/// Why a run stopped without a final answer.
///
/// These are ordinary outcomes, not errors: the transcript up to the
/// stop is intact and the caller decides what to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AgentFailure {
    /// The loop hit its iteration cap.
    MaxIterations { limit: usize },
    /// Tool dispatch failed this many times in a row.
    ConsecutiveToolFailures { limit: usize },
    /// The caller cancelled the run.
    Cancelled,
}

impl std::fmt::Display for AgentFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MaxIterations { limit } => {
                write!(f, "iteration cap ({}) reached without a final answer", limit)
            }
            Self::ConsecutiveToolFailures { limit } => {
                write!(f, "{} consecutive tool failures", limit)
            }
            Self::Cancelled => write!(f, "run cancelled"),
        }
    }
}

/// Fatal errors that abort a run outright.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model call failed after the client exhausted its retries.
    #[error("model call failed: {0}")]
    Model(#[from] LlmError),

    /// The planning reply contained no recognizable steps.
    #[error("could not parse a plan from the model reply: {detail}")]
    PlanParse {
        detail: String,
        /// The raw reply, kept for diagnosis.
        response: String,
    },
}

/// Dispatch one tool action, folding failures into observation text.
///
/// This is the single point where a [`ToolError`] joins the conversation
/// instead of aborting it: the observation tells the model what went
/// wrong so it can pick another tool or fix its arguments. Returns the
/// observation and whether the dispatch succeeded.
pub(crate) async fn dispatch_action(
    tools: &ToolRegistry,
    name: &str,
    args: serde_json::Value,
) -> (String, bool) {
    match tools.execute(name, args).await {
        Ok(output) => (output, true),
        Err(err @ ToolError::NotFound(_)) => {
            tracing::warn!(tool = %name, "Model requested an unknown tool");
            (format!("Tool failed: {}", err), false)
        }
        Err(err) => {
            tracing::warn!(tool = %name, error = %err, "Tool dispatch failed");
            (format!("Tool failed: {}", err), false)
        }
    }
}

/// Truncate a string for logging, respecting char boundaries.
pub(crate) fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}
