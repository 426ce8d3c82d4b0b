//! Agent Callbacks
//!
//! Hooks the reasoning loop fires while a turn is in flight, so a UI can
//! render streamed tokens and intermediate thoughts.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// Observer of one agent invocation
pub trait AgentCallback: Send + Sync {
    /// A streamed text delta from the LLM
    fn on_llm_token(&self, _token: &str) {}

    /// The agent decided to call a tool
    fn on_agent_action(&self, _tool: &str, _input: &str, _log: &str) {}

    /// A tool (or the parse-error handler) produced an observation
    fn on_tool_end(&self, _tool: &str, _observation: &str) {}

    /// The LLM output could not be parsed
    fn on_parse_error(&self, _message: &str) {}

    /// The agent produced its final answer
    fn on_agent_finish(&self, _output: &str) {}
}

/// Callback that ignores everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCallback;

impl AgentCallback for NoopCallback {}

/// One tool call and what came back
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThoughtStep {
    pub tool: String,
    pub input: String,
    /// The LLM text that led to the call
    pub log: String,
    /// `None` while the tool is still running
    pub observation: Option<String>,
}

impl ThoughtStep {
    /// A step is complete once its observation arrived
    pub const fn is_complete(&self) -> bool {
        self.observation.is_some()
    }
}

/// Collects thought steps for rendering after the turn
#[derive(Debug, Default)]
pub struct StepRecorder {
    steps: Mutex<Vec<ThoughtStep>>,
}

impl StepRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps recorded so far
    pub fn steps(&self) -> Vec<ThoughtStep> {
        self.steps.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Consume the recorder
    pub fn into_steps(self) -> Vec<ThoughtStep> {
        self.steps.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AgentCallback for StepRecorder {
    fn on_agent_action(&self, tool: &str, input: &str, log: &str) {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ThoughtStep {
                tool: tool.to_string(),
                input: input.to_string(),
                log: log.to_string(),
                observation: None,
            });
    }

    fn on_tool_end(&self, tool: &str, observation: &str) {
        let mut steps = self.steps.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(step) = steps
            .iter_mut()
            .rev()
            .find(|s| s.tool == tool && s.observation.is_none())
        {
            step.observation = Some(observation.to_string());
        }
    }
}
