//! Scripted Test Doubles
//!
//! Offline stand-ins for the LLM provider and lookup tools, used by the
//! test suites of every crate in the workspace.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::credential::ApiKey;
use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{
    Completion, CompletionStream, FinishReason, GenerationOptions, LlmProvider, ModelInfo,
    ProviderFactory, ProviderInfo, StreamChunk,
};
use crate::tool::{ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema};

/// Provider that replays canned completions in order
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<std::result::Result<String, String>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    /// Replay `responses`, one per call
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(responses.into_iter().map(|s| Ok(s.into())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail every call with a provider error
    pub fn failing(message: impl Into<String>) -> Self {
        let provider = Self::default();
        provider.push_error(message);
        provider
    }

    /// Queue a provider error
    pub fn push_error(&self, message: impl Into<String>) {
        self.lock_script().push_back(Err(message.into()));
    }

    /// Number of completion requests received
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Messages sent with every request, oldest first
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<std::result::Result<String, String>>> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next(&self, messages: &[Message]) -> Result<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(messages.to_vec());

        let mut script = self.lock_script();
        let next = if script.len() == 1 {
            // The last entry keeps answering
            script.front().cloned()
        } else {
            script.pop_front()
        };
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(AgentError::Provider(message)),
            None => Err(AgentError::Provider("script exhausted".into())),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        Ok(ProviderInfo {
            name: "Scripted".into(),
            models: self.list_models().await?,
            supports_streaming: true,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        Ok(Completion {
            content: self.next(messages)?,
            model: options.model.clone(),
            usage: None,
            finish_reason: Some(FinishReason::Stop),
        })
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        _options: &GenerationOptions,
    ) -> Result<CompletionStream> {
        let text = self.next(messages)?;

        // Split after whitespace so deltas concatenate back to the original
        let mut chunks: Vec<Result<StreamChunk>> = text
            .split_inclusive(char::is_whitespace)
            .map(|piece| {
                Ok(StreamChunk {
                    delta: piece.to_string(),
                    ..StreamChunk::default()
                })
            })
            .collect();
        chunks.push(Ok(StreamChunk {
            done: true,
            ..StreamChunk::default()
        }));

        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            id: "scripted".into(),
            owned_by: None,
            context_length: None,
        }])
    }
}

/// Factory handing out one shared provider and counting how often it is asked
pub struct MockProviderFactory {
    provider: Arc<dyn LlmProvider>,
    created: AtomicUsize,
}

impl MockProviderFactory {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            created: AtomicUsize::new(0),
        }
    }

    /// How many providers were built
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ProviderFactory for MockProviderFactory {
    fn create(&self, _key: &ApiKey) -> Result<Arc<dyn LlmProvider>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.provider))
    }
}

/// Lookup tool answering `"<name>: <query>"`
pub struct EchoLookupTool {
    name: String,
}

impl EchoLookupTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Tool for EchoLookupTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.clone(),
            description: format!("Echo lookup named {}", self.name),
            parameters: vec![ParameterSchema::query("Search query")],
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let query = call.query_arg().unwrap_or_default();
        Ok(ToolResult::success(&self.name, format!("{}: {query}", self.name)))
    }
}
