//! Groq LLM Provider
//!
//! Implementation of `LlmProvider` for Groq's OpenAI-compatible
//! chat-completions API.

use std::sync::Arc;
use std::time::Duration;

use agent_core::{
    credential::ApiKey,
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{
        Completion, CompletionStream, FinishReason, GenerationOptions, LlmProvider, ModelInfo,
        ProviderFactory, ProviderInfo, StreamChunk, TokenUsage,
    },
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::sse::SseDecoder;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Groq caps the number of stop sequences per request
const MAX_STOP_SEQUENCES: usize = 4;

/// Groq provider configuration
#[derive(Clone, Debug)]
pub struct GroqConfig {
    /// API root, without trailing slash
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 120,
        }
    }
}

impl GroqConfig {
    pub fn from_env() -> Self {
        let base_url = std::env::var("GROQ_BASE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let timeout_secs = std::env::var("GROQ_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(120);

        Self {
            base_url,
            timeout_secs,
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    #[serde(skip_serializing_if = "no_stops")]
    stop: &'a [String],
    stream: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn no_stops(stop: &&[String]) -> bool {
    stop.is_empty()
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<Choice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkResponse {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    x_groq: Option<XGroq>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XGroq {
    usage: Option<WireUsage>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<WireUsage> for TokenUsage {
    fn from(u: WireUsage) -> Self {
        Self {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<WireModel>,
}

#[derive(Debug, Deserialize)]
struct WireModel {
    id: String,
    owned_by: Option<String>,
    context_window: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

// ============================================================================
// Provider
// ============================================================================

/// Groq LLM provider bound to one API key
pub struct GroqProvider {
    client: reqwest::Client,
    config: GroqConfig,
    api_key: ApiKey,
}

impl GroqProvider {
    /// Create a provider with default settings
    pub fn new(api_key: ApiKey) -> Result<Self> {
        Self::from_config(GroqConfig::default(), api_key)
    }

    /// Create from configuration
    pub fn from_config(config: GroqConfig, api_key: ApiKey) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    /// Convert agent messages to wire format
    fn convert_messages(messages: &[Message]) -> Vec<WireMessage<'_>> {
        messages
            .iter()
            .map(|m| WireMessage {
                role: match m.role {
                    Role::System => "system",
                    Role::Assistant => "assistant",
                    // Tools appear as user context
                    Role::User | Role::Tool => "user",
                },
                content: &m.content,
            })
            .collect()
    }

    fn build_request<'a>(
        messages: &'a [Message],
        opts: &'a GenerationOptions,
        stream: bool,
    ) -> ChatRequest<'a> {
        let stop_len = opts.stop_sequences.len().min(MAX_STOP_SEQUENCES);
        ChatRequest {
            model: &opts.model,
            messages: Self::convert_messages(messages),
            temperature: opts.temperature,
            max_tokens: opts.max_tokens,
            top_p: opts.top_p,
            stop: &opts.stop_sequences[..stop_len],
            stream,
        }
    }

    async fn post_chat(&self, request: &ChatRequest<'_>) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(self.api_key.expose())
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        check_status(response).await
    }
}

fn map_transport_error(err: reqwest::Error) -> AgentError {
    if err.is_connect() || err.is_timeout() {
        AgentError::ProviderUnavailable(err.to_string())
    } else {
        AgentError::Provider(err.to_string())
    }
}

/// Map an HTTP error status to the matching agent error
fn map_status(status: StatusCode, body: &str) -> AgentError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    let message = format!("{status}: {message}");

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(message),
        s if s.is_server_error() => AgentError::ProviderUnavailable(message),
        _ => AgentError::Provider(message),
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(%status, "Groq request failed");
    Err(map_status(status, &body))
}

/// Decode one SSE payload; `None` for keep-alives with nothing to report
fn parse_chunk(payload: &str) -> Option<Result<StreamChunk>> {
    if payload == "[DONE]" {
        return Some(Ok(StreamChunk {
            done: true,
            ..StreamChunk::default()
        }));
    }

    if let Ok(err) = serde_json::from_str::<ErrorBody>(payload) {
        return Some(Err(AgentError::Provider(err.error.message)));
    }

    match serde_json::from_str::<ChunkResponse>(payload) {
        Ok(chunk) => {
            let delta: String = chunk
                .choices
                .into_iter()
                .filter_map(|c| c.delta.content)
                .collect();
            let usage = chunk
                .usage
                .or_else(|| chunk.x_groq.and_then(|x| x.usage))
                .map(TokenUsage::from);

            if delta.is_empty() && usage.is_none() {
                return None;
            }
            Some(Ok(StreamChunk {
                delta,
                done: false,
                usage,
            }))
        }
        Err(e) => Some(Err(AgentError::Provider(format!("Malformed stream chunk: {e}")))),
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        let models = self.list_models().await.unwrap_or_default();

        Ok(ProviderInfo {
            name: "Groq".into(),
            models,
            supports_streaming: true,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        match self.list_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Groq health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let request = Self::build_request(messages, options, false);
        let response: ChatResponse = self
            .post_chat(&request)
            .await?
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("Invalid response body: {e}")))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("Response contained no choices".into()))?;

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            model: response.model,
            usage: response.usage.map(TokenUsage::from),
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::from_wire),
        })
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<CompletionStream> {
        let request = Self::build_request(messages, options, true);
        let response = self.post_chat(&request).await?;

        // Transform the byte stream into chunks
        let chunks = response
            .bytes_stream()
            .scan(SseDecoder::new(), |decoder, item| {
                let out: Vec<Result<StreamChunk>> = match item {
                    Ok(bytes) => decoder
                        .feed(&bytes)
                        .iter()
                        .filter_map(|payload| parse_chunk(payload))
                        .collect(),
                    Err(e) => vec![Err(map_transport_error(e))],
                };
                futures::future::ready(Some(futures::stream::iter(out)))
            })
            .flatten();

        Ok(Box::pin(chunks))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .client
            .get(self.endpoint("models"))
            .bearer_auth(self.api_key.expose())
            .send()
            .await
            .map_err(map_transport_error)?;

        let models: ModelsResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("Invalid models body: {e}")))?;

        Ok(models
            .data
            .into_iter()
            .map(|m| ModelInfo {
                id: m.id,
                owned_by: m.owned_by,
                context_length: m.context_window,
            })
            .collect())
    }
}

/// Builds a `GroqProvider` for each turn's API key
#[derive(Clone, Debug, Default)]
pub struct GroqProviderFactory {
    config: GroqConfig,
}

impl GroqProviderFactory {
    pub const fn new(config: GroqConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(GroqConfig::from_env())
    }
}

impl ProviderFactory for GroqProviderFactory {
    fn create(&self, key: &ApiKey) -> Result<Arc<dyn LlmProvider>> {
        Ok(Arc::new(GroqProvider::from_config(self.config.clone(), key.clone())?))
    }
}
