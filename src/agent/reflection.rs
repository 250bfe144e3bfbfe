//! Reflection loop: draft an answer, critique it, improve it.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::llm::{ChatMessage, ModelClient};

use super::parser;
use super::prompt::{
    build_improvement_request, build_initial_answer_request, build_reflection_request,
    build_reflection_system_prompt,
};
use super::{truncate_for_log, AgentError, AgentFailure, RunOutcome};

/// Default number of critique/improve rounds.
const DEFAULT_MAX_ROUNDS: usize = 3;

/// Model-only agent that iterates on its own answer.
///
/// Flow: draft an answer, then up to `max_rounds` times ask the model to
/// critique it; an approving critique (or exhausting the rounds) returns
/// the current draft, otherwise the critique is applied and the loop
/// continues. No tools are involved.
pub struct ReflectionAgent {
    llm: Arc<dyn ModelClient>,
    max_rounds: usize,
    cancel: CancellationToken,
}

impl ReflectionAgent {
    /// Create an agent with the default round cap.
    pub fn new(llm: Arc<dyn ModelClient>) -> Self {
        tracing::debug!(max_rounds = DEFAULT_MAX_ROUNDS, "Reflection agent initialized");
        Self {
            llm,
            max_rounds: DEFAULT_MAX_ROUNDS,
            cancel: CancellationToken::new(),
        }
    }

    /// Override the critique/improve round cap.
    #[must_use]
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Attach a cancellation token, checked at the top of each round.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run the draft/critique/improve loop on one question.
    ///
    /// Exhausting the rounds is not a failure: the latest draft is the
    /// answer. The only `Err` is a model call failing after retries.
    pub async fn run(&self, question: &str) -> Result<RunOutcome, AgentError> {
        tracing::info!(task = %truncate_for_log(question, 80), "Reflection run started");

        let mut messages = vec![
            ChatMessage::system(build_reflection_system_prompt()),
            ChatMessage::user(build_initial_answer_request(question)),
        ];

        let mut draft = self.llm.complete(&messages).await?;
        tracing::info!(draft = %truncate_for_log(&draft, 120), "Initial draft");
        messages.push(ChatMessage::assistant(&draft));

        for round in 0..self.max_rounds {
            if self.cancel.is_cancelled() {
                tracing::warn!(round, "Run cancelled");
                return Ok(RunOutcome::Failure {
                    failure: AgentFailure::Cancelled,
                });
            }
            tracing::info!(round = round + 1, "Reflection round");

            messages.push(ChatMessage::user(build_reflection_request(&draft)));
            let critique = self.llm.complete(&messages).await?;
            tracing::info!(critique = %truncate_for_log(&critique, 120), "Critique");
            messages.push(ChatMessage::assistant(&critique));

            if parser::reflection_approves(&critique) {
                let answer = parser::extract_reflection_answer(&draft);
                tracing::info!(answer = %truncate_for_log(&answer, 120), "Critique approved the draft");
                return Ok(RunOutcome::FinalAnswer { answer });
            }

            messages.push(ChatMessage::user(build_improvement_request(&draft, &critique)));
            draft = self.llm.complete(&messages).await?;
            tracing::info!(draft = %truncate_for_log(&draft, 120), "Improved draft");
            messages.push(ChatMessage::assistant(&draft));
        }

        tracing::warn!(
            limit = self.max_rounds,
            "Reflection rounds exhausted, returning the latest draft"
        );
        Ok(RunOutcome::FinalAnswer { answer: draft })
    }
}
