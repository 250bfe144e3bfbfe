//! Plan-and-Solve loop: plan once, execute steps in order, aggregate.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::llm::{ChatMessage, ModelClient};
use crate::tools::ToolRegistry;

use super::parser;
use super::prompt::{build_aggregation_prompt, build_execution_prompt, build_planning_prompt};
use super::transcript::{Action, StepRecord, Transcript};
use super::{dispatch_action, truncate_for_log, AgentError, AgentFailure, RunOutcome};

/// Ordered step descriptions produced by the planning phase.
///
/// Immutable once parsed; steps execute strictly in this order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    steps: Vec<String>,
}

impl Plan {
    pub(crate) fn new(steps: Vec<String>) -> Self {
        Self { steps }
    }

    /// The step descriptions, in execution order.
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Number of planned steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Everything a finished Plan-and-Solve run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PlanRunReport {
    /// The plan as parsed from the planning reply.
    pub plan: Plan,
    pub outcome: RunOutcome,
    /// One step record per executed plan step.
    pub transcript: Transcript,
}

/// Agent that plans first, then executes each step sequentially, then
/// synthesizes the step results into one answer.
pub struct PlanAndSolveAgent {
    llm: Arc<dyn ModelClient>,
    tools: Arc<ToolRegistry>,
    max_iterations: usize,
    cancel: CancellationToken,
}

impl PlanAndSolveAgent {
    /// Create an agent over a shared model client and tool registry.
    pub fn new(llm: Arc<dyn ModelClient>, tools: Arc<ToolRegistry>, config: &Config) -> Self {
        tracing::debug!(
            max_iterations = config.max_iterations,
            tools = tools.len(),
            "Plan-and-Solve agent initialized"
        );
        Self {
            llm,
            tools,
            max_iterations: config.max_iterations,
            cancel: CancellationToken::new(),
        }
    }

    /// Attach a cancellation token, checked before each step and before
    /// aggregation.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run the plan/execute/aggregate pipeline on one question.
    ///
    /// # Errors
    ///
    /// `AgentError::PlanParse` if the planning reply contains no
    /// recognizable steps (before any tool runs), or `AgentError::Model`
    /// if a model call fails after retries.
    pub async fn run(&self, question: &str) -> Result<PlanRunReport, AgentError> {
        tracing::info!(task = %truncate_for_log(question, 80), "Plan-and-Solve run started");

        let mut transcript = Transcript::new(question);
        let plan = self.create_plan(question).await?;
        tracing::info!(steps = plan.len(), "Plan created");
        for (i, step) in plan.steps().iter().enumerate() {
            tracing::debug!(step = i + 1, text = %truncate_for_log(step, 120), "Plan step");
        }

        // EXECUTING: strictly sequential; each step gets a fresh prompt
        // carrying the results of every step executed so far.
        let mut step_results: Vec<String> = Vec::new();

        for (index, step) in plan.steps().iter().enumerate() {
            if index >= self.max_iterations {
                tracing::warn!(
                    executed = index,
                    planned = plan.len(),
                    "Iteration cap reached, skipping remaining plan steps"
                );
                break;
            }
            if self.cancel.is_cancelled() {
                tracing::warn!(step = index + 1, "Run cancelled");
                return Ok(PlanRunReport {
                    plan,
                    outcome: RunOutcome::Failure {
                        failure: AgentFailure::Cancelled,
                    },
                    transcript,
                });
            }

            tracing::info!(
                step = index + 1,
                total = plan.len(),
                text = %truncate_for_log(step, 80),
                "Executing plan step"
            );

            let prompt = build_execution_prompt(question, &plan, index, &step_results, &self.tools);
            let response = self.llm.complete(&[ChatMessage::system(prompt)]).await?;
            tracing::debug!(response = %truncate_for_log(&response, 200), "Step reply");

            let parsed = parser::parse_react_reply(&response);
            let thought = parsed.thought.unwrap_or_default();
            let action = parsed.action.unwrap_or_default();

            if action.eq_ignore_ascii_case("final answer") {
                let answer =
                    parser::extract_final_answer(parsed.action_input.as_deref().unwrap_or(""));
                tracing::info!(
                    step = index + 1,
                    answer = %truncate_for_log(&answer, 120),
                    "Step declared the final answer"
                );
                let result = format!("Step {} answer: {}", index + 1, answer);
                transcript.record(StepRecord::new(
                    thought,
                    Some(Action::FinalAnswer { answer }),
                    result.clone(),
                ));
                step_results.push(result);
                // The model declared itself done; remaining steps are moot.
                break;
            }

            if action.eq_ignore_ascii_case("continue") {
                let result = format!("Step {} thought: {}", index + 1, thought);
                tracing::info!(step = index + 1, "Step resolved by reasoning");
                transcript.record(StepRecord::new(thought, None, result.clone()));
                step_results.push(result);
                continue;
            }

            if action.is_empty() {
                tracing::warn!(step = index + 1, "Could not parse step reply");
                let result = format!("Step {} produced no usable result", index + 1);
                transcript.record(StepRecord::new(thought, None, result.clone()));
                step_results.push(result);
                continue;
            }

            let args = parser::parse_action_input(parsed.action_input.as_deref().unwrap_or(""));
            let (observation, _succeeded) =
                dispatch_action(&self.tools, &action, args.clone()).await;
            tracing::info!(
                step = index + 1,
                observation = %truncate_for_log(&observation, 120),
                "Step result"
            );

            let result = format!("Step {} result: {}", index + 1, observation);
            transcript.record(StepRecord::new(
                thought,
                Some(Action::ToolCall {
                    name: action,
                    arguments: args,
                }),
                observation,
            ));
            step_results.push(result);
        }

        if self.cancel.is_cancelled() {
            return Ok(PlanRunReport {
                plan,
                outcome: RunOutcome::Failure {
                    failure: AgentFailure::Cancelled,
                },
                transcript,
            });
        }

        // AGGREGATING: one synthesis call over everything the steps
        // produced, even when a step already declared an answer.
        tracing::info!(results = step_results.len(), "Aggregating step results");
        let prompt = build_aggregation_prompt(question, &plan, &step_results);
        let answer = self.llm.complete(&[ChatMessage::user(prompt)]).await?;
        let answer = answer.trim().to_string();
        tracing::info!(answer = %truncate_for_log(&answer, 120), "Final answer");

        Ok(PlanRunReport {
            plan,
            outcome: RunOutcome::FinalAnswer { answer },
            transcript,
        })
    }

    /// PLANNING: one model call, parsed into a [`Plan`].
    async fn create_plan(&self, question: &str) -> Result<Plan, AgentError> {
        let messages = [
            ChatMessage::system(build_planning_prompt()),
            ChatMessage::user(question),
        ];
        let response = self.llm.complete(&messages).await?;
        tracing::debug!(response = %truncate_for_log(&response, 200), "Planning reply");

        let steps = parser::parse_plan(&response);
        if steps.is_empty() {
            return Err(AgentError::PlanParse {
                detail: "no numbered or bulleted steps found".to_string(),
                response,
            });
        }
        Ok(Plan::new(steps))
    }
}
