//! Reasoning Loop
//!
//! Implements the ReAct (Reason + Act) pattern: the LLM writes a thought and
//! either an action or a final answer; actions run a tool and the observation
//! is appended to the scratchpad for the next step.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;

use crate::callback::AgentCallback;
use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::parser::{self, AgentStep};
use crate::prompt::PromptTemplate;
use crate::provider::{GenerationOptions, LlmProvider};
use crate::tool::{ToolCall, ToolRegistry};

/// Output returned when the step cap is hit under `EarlyStopping::Force`
pub const STOPPED_OUTPUT: &str = "Agent stopped due to iteration limit or time limit.";

/// Stop sequence keeping the LLM from inventing its own observations
pub const OBSERVATION_STOP: &str = "\nObservation";

/// What to do when `max_iterations` is exhausted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EarlyStopping {
    /// Return `STOPPED_OUTPUT` as the answer
    #[default]
    Force,
    /// Fail with `AgentError::MaxIterations`
    Error,
}

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Maximum reasoning iterations before giving up
    pub max_iterations: usize,

    /// Generation options
    pub generation: GenerationOptions,

    /// Feed unparseable output back to the LLM instead of failing
    pub handle_parsing_errors: bool,

    /// Behavior once the step cap is reached
    pub early_stopping: EarlyStopping,

    /// Use the provider's streaming endpoint
    pub streaming: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            generation: GenerationOptions {
                stop_sequences: vec![OBSERVATION_STOP.into()],
                ..GenerationOptions::default()
            },
            handle_parsing_errors: true,
            early_stopping: EarlyStopping::Force,
            streaming: true,
        }
    }
}

/// A single-turn ReAct agent
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    prompt: PromptTemplate,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        prompt: PromptTemplate,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            prompt,
            config,
        }
    }

    /// Render the prompt for the current scratchpad
    fn build_prompt(&self, input: &str, scratchpad: &str) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("tools", self.tools.render_descriptions());
        vars.insert("tool_names", self.tools.names().join(", "));
        vars.insert("input", input.to_string());
        vars.insert("agent_scratchpad", scratchpad.to_string());
        self.prompt.render(&vars)
    }

    /// Answer `input`, calling tools as the LLM requests
    pub async fn invoke(&self, input: &str, callback: &dyn AgentCallback) -> Result<String> {
        let mut scratchpad = String::new();

        for iteration in 1..=self.config.max_iterations {
            let prompt = self.build_prompt(input, &scratchpad)?;
            let text = self.generate(&prompt, callback).await?;
            tracing::debug!(iteration, chars = text.len(), "LLM step");

            match parser::parse(&text) {
                Ok(AgentStep::Finish { output, .. }) => {
                    callback.on_agent_finish(&output);
                    return Ok(output);
                }
                Ok(AgentStep::Action { tool, input: tool_input, log }) => {
                    callback.on_agent_action(&tool, &tool_input, &log);
                    let observation = self.run_tool(&tool, &tool_input).await;
                    callback.on_tool_end(&tool, &observation);
                    push_step(&mut scratchpad, &log, &observation);
                }
                Err(failure) => {
                    if !self.config.handle_parsing_errors {
                        return Err(AgentError::Parse(failure.message));
                    }
                    tracing::warn!(iteration, error = %failure, "Unparseable LLM output");
                    callback.on_parse_error(&failure.message);
                    push_step(&mut scratchpad, &failure.log, &failure.observation);
                }
            }
        }

        match self.config.early_stopping {
            EarlyStopping::Force => {
                tracing::info!(max = self.config.max_iterations, "Step cap reached");
                callback.on_agent_finish(STOPPED_OUTPUT);
                Ok(STOPPED_OUTPUT.to_string())
            }
            EarlyStopping::Error => Err(AgentError::MaxIterations(self.config.max_iterations)),
        }
    }

    /// One LLM call; streamed deltas are forwarded to the callback.
    ///
    /// Output is cut at the first stop sequence. While streaming, any tail
    /// that could still grow into a stop sequence is held back, so text past
    /// the cut never reaches the callback.
    async fn generate(&self, prompt: &str, callback: &dyn AgentCallback) -> Result<String> {
        let messages = [Message::user(prompt)];
        let options = &self.config.generation;
        let stops = &options.stop_sequences;

        if !self.config.streaming {
            let mut text = self.provider.complete(&messages, options).await?.content;
            if let Some(pos) = first_stop(&text, stops) {
                text.truncate(pos);
            }
            return Ok(text);
        }

        let mut stream = self.provider.complete_stream(&messages, options).await?;
        let mut text = String::new();
        let mut emitted = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            text.push_str(&chunk.delta);

            // Providers are asked to stop here but not all of them honour it
            if let Some(pos) = first_stop(&text, stops) {
                text.truncate(pos);
                break;
            }

            let safe = text.len() - held_back(&text, stops);
            if safe > emitted {
                callback.on_llm_token(&text[emitted..safe]);
                emitted = safe;
            }
            if chunk.done {
                break;
            }
        }

        if text.len() > emitted {
            callback.on_llm_token(&text[emitted..]);
        }
        Ok(text)
    }

    /// Run a tool and turn any outcome into observation text
    async fn run_tool(&self, tool: &str, input: &str) -> String {
        if self.tools.get(tool).is_none() {
            return format!(
                "{tool} is not a valid tool, try one of [{}].",
                self.tools.names().join(", ")
            );
        }

        tracing::debug!(tool, input, "Executing tool");
        match self.tools.execute(&ToolCall::query(tool, input)).await {
            Ok(result) => result.output,
            Err(e) => {
                tracing::warn!(tool, error = %e, "Tool failed");
                format!("Error: {e}")
            }
        }
    }
}

/// Earliest position of any stop sequence
fn first_stop(text: &str, stops: &[String]) -> Option<usize> {
    stops
        .iter()
        .filter(|stop| !stop.is_empty())
        .filter_map(|stop| text.find(stop.as_str()))
        .min()
}

/// Length of the longest tail of `text` that is a proper prefix of a stop sequence
fn held_back(text: &str, stops: &[String]) -> usize {
    stops
        .iter()
        .flat_map(|stop| {
            stop.char_indices()
                .skip(1)
                .map(|(end, _)| &stop[..end])
                .filter(|prefix| text.ends_with(prefix))
                .map(str::len)
        })
        .max()
        .unwrap_or(0)
}

fn push_step(scratchpad: &mut String, log: &str, observation: &str) {
    scratchpad.push_str(log);
    scratchpad.push_str("\nObservation: ");
    scratchpad.push_str(observation);
    scratchpad.push_str("\nThought: ");
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Arc<ToolRegistry>,
    prompt: Option<PromptTemplate>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: Arc::new(ToolRegistry::new()),
            prompt: None,
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = Some(prompt);
        self
    }

    #[must_use]
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    #[must_use]
    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    #[must_use]
    pub const fn handle_parsing_errors(mut self, handle: bool) -> Self {
        self.config.handle_parsing_errors = handle;
        self
    }

    #[must_use]
    pub const fn early_stopping(mut self, mode: EarlyStopping) -> Self {
        self.config.early_stopping = mode;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self.provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;
        let prompt = self.prompt
            .ok_or_else(|| AgentError::Config("Prompt is required".into()))?;

        Ok(Agent::new(provider, self.tools, prompt, self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::{NoopCallback, StepRecorder};
    use crate::mock::{EchoLookupTool, ScriptedProvider};
    use crate::prompt::{BuiltinPromptHub, PromptHub, REACT_PROMPT_ID};

    async fn agent_with(provider: Arc<ScriptedProvider>) -> AgentBuilder {
        let mut tools = ToolRegistry::new();
        tools.register(EchoLookupTool::new("Search"));
        tools.register(EchoLookupTool::new("wikipedia"));
        let prompt = BuiltinPromptHub::new().pull(REACT_PROMPT_ID).await.unwrap();
        AgentBuilder::new()
            .provider(provider)
            .tools(Arc::new(tools))
            .prompt(prompt)
    }

    #[tokio::test]
    async fn test_direct_final_answer() {
        let provider = Arc::new(ScriptedProvider::new([
            " I know this.\nFinal Answer: Paris",
        ]));
        let agent = agent_with(provider.clone()).await.build().unwrap();

        let answer = agent.invoke("Capital of France?", &NoopCallback).await.unwrap();
        assert_eq!(answer, "Paris");
        assert_eq!(provider.call_count(), 1);

        let prompt = &provider.requests()[0][0].content;
        assert!(prompt.contains("Question: Capital of France?"));
        assert!(prompt.contains("[Search, wikipedia]"));
        assert!(prompt.ends_with("Thought:"));
    }

    #[tokio::test]
    async fn test_tool_then_answer() {
        let provider = Arc::new(ScriptedProvider::new([
            " Look it up.\nAction: wikipedia\nAction Input: machine learning",
            " I now know the final answer\nFinal Answer: ML learns from data.",
        ]));
        let agent = agent_with(provider.clone()).await.build().unwrap();
        let recorder = StepRecorder::new();

        let answer = agent.invoke("What is machine learning?", &recorder).await.unwrap();
        assert_eq!(answer, "ML learns from data.");

        let steps = recorder.into_steps();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].tool, "wikipedia");
        assert_eq!(steps[0].observation.as_deref(), Some("wikipedia: machine learning"));

        let second = &provider.requests()[1][0].content;
        assert!(second.contains(
            "Action Input: machine learning\nObservation: wikipedia: machine learning\nThought: "
        ));
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_observation() {
        let provider = Arc::new(ScriptedProvider::new([
            "Action: calculator\nAction Input: 2+2",
            "Final Answer: 4",
        ]));
        let agent = agent_with(provider.clone()).await.build().unwrap();

        assert_eq!(agent.invoke("2+2?", &NoopCallback).await.unwrap(), "4");
        let second = &provider.requests()[1][0].content;
        assert!(second.contains("calculator is not a valid tool, try one of [Search, wikipedia]."));
    }

    #[tokio::test]
    async fn test_parse_error_is_fed_back() {
        let provider = Arc::new(ScriptedProvider::new([
            "I'm not sure what to do",
            "Final Answer: done",
        ]));
        let agent = agent_with(provider.clone()).await.build().unwrap();

        assert_eq!(agent.invoke("hi", &NoopCallback).await.unwrap(), "done");
        let second = &provider.requests()[1][0].content;
        assert!(second.contains("Observation: Invalid Format: Missing 'Action:' after 'Thought:'"));
    }

    #[tokio::test]
    async fn test_answer_with_action_is_fed_back_as_invalid() {
        let provider = Arc::new(ScriptedProvider::new([
            "Action: Search\nAction Input: x\nFinal Answer: y",
            "Final Answer: y",
        ]));
        let agent = agent_with(provider.clone()).await.build().unwrap();

        assert_eq!(agent.invoke("q", &NoopCallback).await.unwrap(), "y");
        let second = &provider.requests()[1][0].content;
        assert!(second.contains(
            "a parse-able action:: Action: Search\nAction Input: x\nFinal Answer: y\nObservation: Invalid or incomplete response\nThought: "
        ));
    }

    #[tokio::test]
    async fn test_parse_error_fails_when_unhandled() {
        let provider = Arc::new(ScriptedProvider::new(["gibberish"]));
        let agent = agent_with(provider).await
            .handle_parsing_errors(false)
            .build()
            .unwrap();

        assert!(matches!(
            agent.invoke("hi", &NoopCallback).await,
            Err(AgentError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_step_cap_forces_stop() {
        let looping = "Action: Search\nAction Input: again";
        let provider = Arc::new(ScriptedProvider::new([looping; 5]));
        let agent = agent_with(provider.clone()).await.build().unwrap();

        let answer = agent.invoke("loop", &NoopCallback).await.unwrap();
        assert_eq!(answer, STOPPED_OUTPUT);
        assert_eq!(provider.call_count(), 5);
    }

    #[tokio::test]
    async fn test_step_cap_error_mode() {
        let provider = Arc::new(ScriptedProvider::new(["Action: Search\nAction Input: a"; 2]));
        let agent = agent_with(provider).await
            .max_iterations(2)
            .early_stopping(EarlyStopping::Error)
            .build()
            .unwrap();

        assert!(matches!(
            agent.invoke("loop", &NoopCallback).await,
            Err(AgentError::MaxIterations(2))
        ));
    }

    #[tokio::test]
    async fn test_invented_observation_is_cut() {
        let provider = Arc::new(ScriptedProvider::new([
            "Action: Search\nAction Input: rust\nObservation: made up",
            "Final Answer: ok",
        ]));
        let agent = agent_with(provider.clone()).await.build().unwrap();

        agent.invoke("q", &NoopCallback).await.unwrap();
        let second = &provider.requests()[1][0].content;
        assert!(!second.contains("made up"));
    }

    /// Concatenates every streamed token
    #[derive(Default)]
    struct TokenSink(std::sync::Mutex<String>);

    impl AgentCallback for TokenSink {
        fn on_llm_token(&self, token: &str) {
            self.0.lock().unwrap().push_str(token);
        }
    }

    #[tokio::test]
    async fn test_invented_observation_is_never_streamed() {
        let provider = Arc::new(ScriptedProvider::new([
            "Action: Search\nAction Input: rust\nObservation: made up",
            "Final Answer: ok",
        ]));
        let agent = agent_with(provider).await.build().unwrap();
        let sink = TokenSink::default();

        agent.invoke("q", &sink).await.unwrap();
        let streamed = sink.0.into_inner().unwrap();
        assert_eq!(streamed, "Action: Search\nAction Input: rustFinal Answer: ok");
        assert!(!streamed.contains("Observation"));
    }

    #[tokio::test]
    async fn test_trailing_newline_is_released_at_end_of_stream() {
        let provider = Arc::new(ScriptedProvider::new(["Final Answer: ok\n"]));
        let agent = agent_with(provider).await.build().unwrap();
        let sink = TokenSink::default();

        agent.invoke("q", &sink).await.unwrap();
        assert_eq!(sink.0.into_inner().unwrap(), "Final Answer: ok\n");
    }

    #[tokio::test]
    async fn test_blocking_completion() {
        let provider = Arc::new(ScriptedProvider::new([
            "Action: Search\nAction Input: rust\nObservation: made up",
            "Final Answer: ok",
        ]));
        let config = AgentConfig {
            streaming: false,
            ..AgentConfig::default()
        };
        let agent = agent_with(provider.clone()).await.config(config).build().unwrap();
        let sink = TokenSink::default();

        assert_eq!(agent.invoke("q", &sink).await.unwrap(), "ok");
        assert!(sink.0.into_inner().unwrap().is_empty());
        let second = &provider.requests()[1][0].content;
        assert!(second.contains("Observation: Search: rust"));
        assert!(!second.contains("made up"));
    }

    #[test]
    fn test_held_back_tail() {
        let stops = vec![OBSERVATION_STOP.to_string()];
        assert_eq!(held_back("Action Input: rust\n", &stops), 1);
        assert_eq!(held_back("Action Input: rust\nObs", &stops), 4);
        assert_eq!(held_back("Action Input: rust", &stops), 0);
        assert_eq!(first_stop("a\nObservation: b", &stops), Some(1));
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let provider = Arc::new(ScriptedProvider::failing("connection refused"));
        let agent = agent_with(provider).await.build().unwrap();

        let err = agent.invoke("q", &NoopCallback).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_builder_requires_provider() {
        assert!(matches!(AgentBuilder::new().build(), Err(AgentError::Config(_))));
    }
}
