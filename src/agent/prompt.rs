//! Prompt templates for the agent loops.

use crate::tools::ToolRegistry;

use super::plan_and_solve::Plan;

/// Render the registry as a `- name: description` list for prompts.
fn format_tool_list(tools: &ToolRegistry) -> String {
    tools
        .descriptions()
        .iter()
        .map(|(name, description)| format!("- {}: {}", name, description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// System prompt for the ReAct loop: tool list plus the tagged-line
/// format contract. Task-independent; the task arrives as the first
/// user message.
pub fn build_react_system_prompt(tools: &ToolRegistry) -> String {
    let tool_descriptions = format_tool_list(tools);
    let tool_names = tools.list_tools().join(", ");

    format!(
        r#"You are a capable assistant that answers questions using tools.

You have access to the following tools:
{tool_descriptions}

Important: respond in exactly this format, one tag per line:

Thought: your reasoning about the problem
Action: the tool to use (one of: {tool_names}) or "Final Answer"
Action Input: the tool arguments as JSON (e.g. {{"query": "search terms"}}) or the final answer as JSON (e.g. {{"answer": "your answer"}})

When you need a tool, output Thought and Action, then stop and wait for the tool result before the next Thought.

Example:
Thought: I need to find out who created Python
Action: web_search
Action Input: {{"query": "who created Python"}}

Observation: (the tool result appears here)

Thought: The search result gives me the answer
Action: Final Answer
Action Input: {{"answer": "Python was created by Guido van Rossum"}}

Now answer the question.
You must start with a Thought: line."#,
        tool_descriptions = tool_descriptions,
        tool_names = tool_names
    )
}

/// System prompt for the planning phase of Plan-and-Solve.
pub fn build_planning_prompt() -> String {
    r#"You are a capable assistant that solves complex problems by breaking them into steps.

First, write a plan for solving the problem. The plan is a list of steps.

Important: respond in exactly this format:

Plan:
1. first step
2. second step
3. third step
...

Each step must be clear and concrete, and executing them in order must solve the problem.

Now write the plan:"#
        .to_string()
}

/// Prompt for executing one plan step.
///
/// `current_step` is 0-indexed; `prior_results` carries the results of
/// every step executed so far, in order (empty for the first step).
pub fn build_execution_prompt(
    question: &str,
    plan: &Plan,
    current_step: usize,
    prior_results: &[String],
    tools: &ToolRegistry,
) -> String {
    let tool_names = tools.list_tools().join(", ");
    let steps_text = plan
        .steps()
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {}", i + 1, step))
        .collect::<Vec<_>>()
        .join("\n");
    let context_text = if prior_results.is_empty() {
        String::new()
    } else {
        format!(
            "\n\nResults of the steps executed so far:\n{}",
            prior_results.join("\n")
        )
    };
    let step_number = current_step + 1;
    let total = plan.len();
    let remaining = total.saturating_sub(step_number);
    let current = plan
        .steps()
        .get(current_step)
        .map(String::as_str)
        .unwrap_or("");

    format!(
        r#"Original question: {question}

The plan ({total} steps):
{steps_text}

You are executing step {step_number}: {current}
{remaining} steps remain after this one.{context_text}

You have access to the following tools:
{tool_descriptions}

Respond in exactly this format:

Thought: your reasoning about the current step
Action: the tool to use ({tool_names}), or "Continue", or "Final Answer"
Action Input: the tool arguments as JSON, or empty if none are needed

Rules:
- If the step needs outside information, use a tool and output its Action.
- If the step can be resolved by reasoning over the context alone, output Action: Continue (your thought becomes the step result).
- On the last step (step {total}), output Action: Final Answer.
- Final answer format: {{"answer": "your answer"}}

Now execute step {step_number}:"#,
        question = question,
        total = total,
        steps_text = steps_text,
        step_number = step_number,
        current = current,
        remaining = remaining,
        context_text = context_text,
        tool_descriptions = format_tool_list(tools),
        tool_names = tool_names
    )
}

/// Prompt for the aggregation call that closes a Plan-and-Solve run.
pub fn build_aggregation_prompt(question: &str, plan: &Plan, step_results: &[String]) -> String {
    let steps_text = plan
        .steps()
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {}", i + 1, step))
        .collect::<Vec<_>>()
        .join("\n");
    let results_text = if step_results.is_empty() {
        "(no steps were executed)".to_string()
    } else {
        step_results.join("\n")
    };

    format!(
        r#"Original question: {question}

The plan that was executed:
{steps_text}

Step results, in order:
{results_text}

Write the final answer to the original question by synthesizing the step results above. Respond with the answer only."#,
        question = question,
        steps_text = steps_text,
        results_text = results_text
    )
}

/// System prompt for the reflection loop.
pub fn build_reflection_system_prompt() -> String {
    r#"You are a capable assistant that improves its answers through reflection.

Your workflow:
1. Answer the user's question
2. Reflect on whether the answer is correct, complete, and clear
3. If you find problems, improve the answer
4. Repeat steps 2-3 until satisfied

In each reflection round:
- Assess the quality of the current answer
- Identify problems or gaps
- Decide whether improvement is needed

Important:
- Output "FINAL ANSWER" only when the answer needs no further improvement
- If improvement is needed, write the improved answer"#
        .to_string()
}

/// User message that requests the initial draft.
pub fn build_initial_answer_request(question: &str) -> String {
    format!("Question: {}\n\nAnswer the question directly.", question)
}

/// User message that asks the model to critique the current draft.
pub fn build_reflection_request(draft: &str) -> String {
    format!(
        r#"Reflect on the following answer:

---
{draft}
---

Assess its quality:
1. Is it correct?
2. Is it complete?
3. Is it clear?
4. Are there gaps or mistakes?

If the answer needs no further improvement, output:
FINAL ANSWER: the answer you consider final

If improvement is needed, write your critique and then the improved answer."#,
        draft = draft
    )
}

/// User message that asks the model to apply a critique to the draft.
pub fn build_improvement_request(draft: &str, critique: &str) -> String {
    format!(
        r#"Improve your answer based on the critique below.

Original answer:
---
{draft}
---

Critique:
---
{critique}
---

Output the improved answer directly, without repeating the critique."#,
        draft = draft,
        critique = critique
    )
}
