//! Prompt Templates
//!
//! `{name}` placeholders, rendered in one pass so substituted values are
//! never re-scanned. `{{` and `}}` produce literal braces.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{AgentError, Result};

/// Identifier of the standard ReAct prompt
pub const REACT_PROMPT_ID: &str = "hwchase17/react";

const REACT_TEMPLATE: &str = "Answer the following questions as best you can. You have access to the following tools:

{tools}

Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question

Begin!

Question: {input}
Thought:{agent_scratchpad}";

/// A string template with named placeholders
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
    input_variables: Vec<String>,
}

enum Segment<'a> {
    Text(&'a str),
    Brace(char),
    Var(&'a str),
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split a template into literal text, escaped braces and variables
fn segments(template: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        if pos > 0 {
            out.push(Segment::Text(&rest[..pos]));
        }
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push(Segment::Brace(tail.as_bytes()[0] as char));
            rest = &tail[2..];
            continue;
        }

        if tail.starts_with('{') {
            if let Some(end) = tail.find('}') {
                let name = &tail[1..end];
                if is_identifier(name) {
                    out.push(Segment::Var(name));
                    rest = &tail[end + 1..];
                    continue;
                }
            }
        }

        out.push(Segment::Text(&tail[..1]));
        rest = &tail[1..];
    }

    if !rest.is_empty() {
        out.push(Segment::Text(rest));
    }
    out
}

impl PromptTemplate {
    /// Create a template, discovering its placeholders
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let mut input_variables: Vec<String> = Vec::new();
        for segment in segments(&template) {
            if let Segment::Var(name) = segment {
                if !input_variables.iter().any(|v| v == name) {
                    input_variables.push(name.to_string());
                }
            }
        }
        Self { template, input_variables }
    }

    /// Placeholder names in order of first appearance
    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    /// Raw template text
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Substitute every placeholder; a missing variable is an error
    pub fn render(&self, vars: &HashMap<&str, String>) -> Result<String> {
        let mut out = String::with_capacity(self.template.len());
        for segment in segments(&self.template) {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Brace(c) => out.push(c),
                Segment::Var(name) => {
                    let value = vars.get(name).ok_or_else(|| {
                        AgentError::Prompt(format!("missing variable '{name}'"))
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// Source of named prompt templates, consulted on every turn
#[async_trait]
pub trait PromptHub: Send + Sync {
    async fn pull(&self, identifier: &str) -> Result<PromptTemplate>;
}

/// Prompt hub backed by templates compiled into the binary
pub struct BuiltinPromptHub {
    prompts: HashMap<String, PromptTemplate>,
}

impl Default for BuiltinPromptHub {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinPromptHub {
    /// Hub holding the standard ReAct prompt
    pub fn new() -> Self {
        let mut prompts = HashMap::new();
        prompts.insert(REACT_PROMPT_ID.to_string(), PromptTemplate::new(REACT_TEMPLATE));
        Self { prompts }
    }
}

#[async_trait]
impl PromptHub for BuiltinPromptHub {
    async fn pull(&self, identifier: &str) -> Result<PromptTemplate> {
        tracing::debug!(prompt = identifier, "Pulling prompt");
        self.prompts
            .get(identifier)
            .cloned()
            .ok_or_else(|| AgentError::Prompt(format!("unknown prompt '{identifier}'")))
    }
}
