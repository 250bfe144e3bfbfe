//! Parsing for the text protocol the agents speak with the model.
//!
//! Replies follow a tagged line format:
//!
//! ```text
//! Thought: reasoning about the problem
//! Action: tool name, "Continue", or "Final Answer"
//! Action Input: {"query": "..."}
//! ```
//!
//! Plans are numbered or bulleted lists. All parsing is tolerant: models
//! drift from the format, and the loops decide what a partial parse means.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static THOUGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Thought:\s*(.+?)(?:\nAction:|$)").unwrap());

static ACTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Action:\s*(.+?)(?:\nAction Input:|$)").unwrap());

static ACTION_INPUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)Action Input:\s*(\{.+?\}|".*?"|.+?)(?:\n|$)"#).unwrap());

static PLAN_STEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)[.)]\s*(.+)$").unwrap());

/// Fields extracted from one model reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedReply {
    pub thought: Option<String>,
    pub action: Option<String>,
    pub action_input: Option<String>,
}

impl ParsedReply {
    /// True when none of the tagged fields were present.
    pub fn is_empty(&self) -> bool {
        self.thought.is_none() && self.action.is_none() && self.action_input.is_none()
    }
}

/// Extract `Thought` / `Action` / `Action Input` from a reply.
///
/// Each field is matched independently, so a reply missing one tag still
/// yields the others.
pub fn parse_react_reply(response: &str) -> ParsedReply {
    let capture = |re: &Regex| {
        re.captures(response)
            .map(|caps| caps[1].trim().to_string())
            .filter(|text| !text.is_empty())
    };

    ParsedReply {
        thought: capture(&THOUGHT_RE),
        action: capture(&ACTION_RE),
        action_input: capture(&ACTION_INPUT_RE),
    }
}

/// Decode an `Action Input` value into a JSON argument object.
///
/// Anything that is not a JSON object degrades to `{"query": <input>}`
/// so a model writing bare search terms still reaches the tool.
pub fn parse_action_input(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => value,
        Ok(Value::String(text)) => serde_json::json!({ "query": text }),
        _ => serde_json::json!({ "query": raw }),
    }
}

/// Pull the answer text out of a `Final Answer` action input.
///
/// Accepts `{"answer": "..."}`, a bare JSON string, or raw text (with
/// surrounding quotes stripped).
pub fn extract_final_answer(action_input: &str) -> String {
    match serde_json::from_str::<Value>(action_input) {
        Ok(Value::Object(map)) => match map.get("answer") {
            Some(Value::String(answer)) => answer.clone(),
            Some(other) => other.to_string(),
            None => action_input.to_string(),
        },
        Ok(Value::String(answer)) => answer,
        Ok(_) => action_input.trim().to_string(),
        Err(_) => action_input.trim().trim_matches('"').to_string(),
    }
}

/// Parse a planning reply into ordered step descriptions.
///
/// Accepts `1.` / `1)` numbering and `-` / `•` bullets; everything else
/// (including a `Plan:` header) is ignored. An empty result means the
/// reply contained no recognizable plan.
pub fn parse_plan(response: &str) -> Vec<String> {
    let mut steps = Vec::new();

    for line in response.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = PLAN_STEP_RE.captures(line) {
            let step = caps[2].trim().to_string();
            if !step.is_empty() {
                steps.push(step);
            }
        } else if line.starts_with('-') || line.starts_with('•') {
            let step = line.trim_start_matches(['-', '•']).trim().to_string();
            if !step.is_empty() {
                steps.push(step);
            }
        }
    }

    steps
}

/// Whether a critique declares the current draft final.
pub fn reflection_approves(critique: &str) -> bool {
    let lower = critique.to_lowercase();
    if lower.trim_start().starts_with("final answer") {
        return true;
    }
    if lower.contains("final answer") && lower.contains(':') {
        return true;
    }
    lower.contains("no further improvement")
}

/// Extract the final answer from a reflection draft.
///
/// Prefers the text after a `FINAL ANSWER:` line, then the line after a
/// bare `FINAL ANSWER` marker, then the whole draft.
pub fn extract_reflection_answer(draft: &str) -> String {
    let lines: Vec<&str> = draft.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        if line.to_lowercase().contains("final answer") {
            if let Some((_, after)) = line.split_once(':') {
                return after.trim().to_string();
            }
            if let Some(next) = lines.get(i + 1) {
                return next.trim().to_string();
            }
        }
    }
    draft.trim().to_string()
}
