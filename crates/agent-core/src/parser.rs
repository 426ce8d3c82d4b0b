//! ReAct Output Parser
//!
//! Turns one LLM completion into either a tool action or a final answer.

use std::sync::LazyLock;

use regex::Regex;

pub const FINAL_ANSWER_ACTION: &str = "Final Answer:";
pub const MISSING_ACTION_AFTER_THOUGHT: &str = "Invalid Format: Missing 'Action:' after 'Thought:'";
pub const MISSING_ACTION_INPUT_AFTER_ACTION: &str =
    "Invalid Format: Missing 'Action Input:' after 'Action:'";
pub const FINAL_ANSWER_AND_PARSABLE_ACTION: &str =
    "Parsing LLM output produced both a final answer and a parse-able action:";
/// Observation for failures whose details are not shown to the LLM
pub const INVALID_RESPONSE: &str = "Invalid or incomplete response";

static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
        .expect("action regex is valid")
});
static ACTION_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)").expect("label regex is valid"));
static ACTION_INPUT_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)").expect("input regex is valid")
});

/// One decoded reasoning step
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgentStep {
    /// Call `tool` with `input`
    Action { tool: String, input: String, log: String },
    /// Stop and answer
    Finish { output: String, log: String },
}

/// Output that matched neither an action nor a final answer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseFailure {
    /// Short description, shown in errors and logs
    pub message: String,
    /// Text fed back to the LLM as the next observation
    pub observation: String,
    /// Scratchpad entry standing in for the completion
    pub log: String,
}

impl ParseFailure {
    /// Failure whose observation tells the LLM how to fix its format;
    /// the raw completion stays in the scratchpad
    fn for_llm(message: impl Into<String>, observation: &str, llm_output: &str) -> Self {
        Self {
            message: message.into(),
            observation: observation.to_string(),
            log: llm_output.to_string(),
        }
    }

    /// Failure the LLM only sees as an invalid response; the error text
    /// replaces the completion in the scratchpad
    fn opaque(message: String) -> Self {
        Self {
            observation: INVALID_RESPONSE.to_string(),
            log: message.clone(),
            message,
        }
    }
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Parse a `Thought / Action / Action Input` or `Final Answer` completion
pub fn parse(text: &str) -> Result<AgentStep, ParseFailure> {
    let includes_answer = text.contains(FINAL_ANSWER_ACTION);

    if let Some(caps) = ACTION_RE.captures(text) {
        if includes_answer {
            return Err(ParseFailure::opaque(format!(
                "{FINAL_ANSWER_AND_PARSABLE_ACTION}: {text}"
            )));
        }
        let tool = caps[1].trim().to_string();
        let input = caps[2].trim().trim_matches('"').to_string();
        return Ok(AgentStep::Action { tool, input, log: text.to_string() });
    }

    if includes_answer {
        let output = text
            .rsplit(FINAL_ANSWER_ACTION)
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        return Ok(AgentStep::Finish { output, log: text.to_string() });
    }

    if !ACTION_LABEL_RE.is_match(text) {
        return Err(ParseFailure::for_llm(
            format!("Could not parse LLM output: `{text}`"),
            MISSING_ACTION_AFTER_THOUGHT,
            text,
        ));
    }
    if !ACTION_INPUT_LABEL_RE.is_match(text) {
        return Err(ParseFailure::for_llm(
            format!("Could not parse LLM output: `{text}`"),
            MISSING_ACTION_INPUT_AFTER_ACTION,
            text,
        ));
    }
    Err(ParseFailure::opaque(format!("Could not parse LLM output: `{text}`")))
}
