//! ReAct loop: alternate model reasoning with tool execution.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::llm::{ChatMessage, ModelClient};
use crate::tools::ToolRegistry;

use super::parser;
use super::prompt::build_react_system_prompt;
use super::transcript::{Action, StepRecord, Transcript};
use super::{dispatch_action, truncate_for_log, AgentError, AgentFailure, RunOutcome};

/// Follow-up sent when a reply does not follow the tagged format.
const FORMAT_CORRECTION: &str = "Your reply did not follow the expected format. \
Respond with a Thought: line, an Action: line naming a tool or \"Final Answer\", \
and an Action Input: line.";

/// Everything a finished ReAct run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub transcript: Transcript,
}

/// Agent that alternates reasoning (model) and acting (tools) until the
/// model declares a final answer or a cap stops the run.
pub struct ReActAgent {
    llm: Arc<dyn ModelClient>,
    tools: Arc<ToolRegistry>,
    max_iterations: usize,
    max_consecutive_tool_failures: usize,
    cancel: CancellationToken,
}

impl ReActAgent {
    /// Create an agent over a shared model client and tool registry.
    pub fn new(llm: Arc<dyn ModelClient>, tools: Arc<ToolRegistry>, config: &Config) -> Self {
        tracing::debug!(
            max_iterations = config.max_iterations,
            tools = tools.len(),
            "ReAct agent initialized"
        );
        Self {
            llm,
            tools,
            max_iterations: config.max_iterations,
            max_consecutive_tool_failures: config.max_consecutive_tool_failures,
            cancel: CancellationToken::new(),
        }
    }

    /// Attach a cancellation token. It is checked at the top of each
    /// iteration, never mid-call; a cancelled run ends with
    /// [`AgentFailure::Cancelled`] and an intact transcript.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run the loop on one question.
    ///
    /// Tool failures are absorbed into the transcript as observations.
    /// The only `Err` is a model call failing after the client's retries
    /// are exhausted.
    pub async fn run(&self, question: &str) -> Result<RunReport, AgentError> {
        tracing::info!(task = %truncate_for_log(question, 80), "ReAct run started");

        let mut transcript = Transcript::new(question);
        let mut messages = vec![
            ChatMessage::system(build_react_system_prompt(&self.tools)),
            ChatMessage::user(question),
        ];
        let mut consecutive_failures = 0usize;

        for iteration in 0..self.max_iterations {
            if self.cancel.is_cancelled() {
                tracing::warn!(iteration, "Run cancelled");
                return Ok(RunReport {
                    outcome: RunOutcome::Failure {
                        failure: AgentFailure::Cancelled,
                    },
                    transcript,
                });
            }
            tracing::info!(iteration = iteration + 1, "ReAct iteration");

            let response = self.llm.complete(&messages).await?;
            tracing::debug!(response = %truncate_for_log(&response, 200), "Model reply");

            let parsed = parser::parse_react_reply(&response);
            let thought = parsed.thought.unwrap_or_default();
            if !thought.is_empty() {
                tracing::info!(thought = %truncate_for_log(&thought, 120), "Thought");
            }

            let Some(action) = parsed.action else {
                // A reply without an Action cannot advance the run; ask
                // for the format again. The cycle still counts against
                // the cap.
                tracing::warn!("Reply had no Action line, requesting the format again");
                transcript.record(StepRecord::new(
                    thought,
                    None,
                    "Reply did not contain an Action line",
                ));
                messages.push(ChatMessage::assistant(&response));
                messages.push(ChatMessage::user(FORMAT_CORRECTION));
                continue;
            };

            if action.eq_ignore_ascii_case("final answer") {
                let answer =
                    parser::extract_final_answer(parsed.action_input.as_deref().unwrap_or(""));
                tracing::info!(answer = %truncate_for_log(&answer, 120), "Final answer");
                transcript.record(StepRecord::new(
                    thought,
                    Some(Action::FinalAnswer {
                        answer: answer.clone(),
                    }),
                    String::new(),
                ));
                return Ok(RunReport {
                    outcome: RunOutcome::FinalAnswer { answer },
                    transcript,
                });
            }

            let args = parser::parse_action_input(parsed.action_input.as_deref().unwrap_or(""));
            tracing::info!(tool = %action, "Acting");
            messages.push(ChatMessage::assistant(&response));

            let (observation, succeeded) =
                dispatch_action(&self.tools, &action, args.clone()).await;
            tracing::info!(observation = %truncate_for_log(&observation, 120), "Observation");

            transcript.record(StepRecord::new(
                thought,
                Some(Action::ToolCall {
                    name: action,
                    arguments: args,
                }),
                observation.clone(),
            ));

            if succeeded {
                consecutive_failures = 0;
            } else {
                consecutive_failures += 1;
                if consecutive_failures >= self.max_consecutive_tool_failures {
                    tracing::warn!(
                        limit = self.max_consecutive_tool_failures,
                        "Consecutive tool failures hit the cap"
                    );
                    return Ok(RunReport {
                        outcome: RunOutcome::Failure {
                            failure: AgentFailure::ConsecutiveToolFailures {
                                limit: self.max_consecutive_tool_failures,
                            },
                        },
                        transcript,
                    });
                }
            }

            messages.push(ChatMessage::user(format!("\nObservation: {}", observation)));
        }

        tracing::warn!(
            limit = self.max_iterations,
            "Iteration cap reached without a final answer"
        );
        Ok(RunReport {
            outcome: RunOutcome::Failure {
                failure: AgentFailure::MaxIterations {
                    limit: self.max_iterations,
                },
            },
            transcript,
        })
    }
}
