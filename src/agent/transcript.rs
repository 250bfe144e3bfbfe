//! Run transcripts: the append-only record of what an agent did.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// What the model decided to do in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Invoke a registered tool.
    ToolCall {
        name: String,
        arguments: Value,
    },
    /// Finish the run with this answer.
    FinalAnswer {
        answer: String,
    },
}

/// One reasoning/acting/observing cycle.
///
/// `action` is `None` when the model's reply could not be decoded; the
/// cycle still occupies one transcript slot and counts against the
/// iteration cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// The model's reasoning text for this cycle.
    pub thought: String,
    /// The decoded action, if any.
    pub action: Option<Action>,
    /// Tool output, step result, or an explanation of what went wrong.
    pub observation: String,
    /// When the cycle completed.
    pub at: DateTime<Utc>,
}

impl StepRecord {
    /// Record a completed cycle, stamped now.
    pub fn new(
        thought: impl Into<String>,
        action: Option<Action>,
        observation: impl Into<String>,
    ) -> Self {
        Self {
            thought: thought.into(),
            action,
            observation: observation.into(),
            at: Utc::now(),
        }
    }
}

/// Append-only history of a single run.
///
/// Owned by the run that produces it; serializable so callers can persist
/// or display it afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Unique id for this run.
    pub run_id: Uuid,
    /// The task the run was started with.
    pub task: String,
    /// When the run began.
    pub started_at: DateTime<Utc>,
    /// Completed cycles, in execution order.
    pub steps: Vec<StepRecord>,
}

impl Transcript {
    /// Start an empty transcript for a task.
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            task: task.into(),
            started_at: Utc::now(),
            steps: Vec::new(),
        }
    }

    /// Append one completed cycle.
    pub fn record(&mut self, step: StepRecord) {
        self.steps.push(step);
    }

    /// Number of recorded cycles.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no cycles have been recorded.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Observations in step order, for building aggregation context.
    pub fn observations(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|step| step.observation.as_str())
    }
}
