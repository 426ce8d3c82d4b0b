//! HTTP/WebSocket Handlers

use axum::{
    Json,
    extract::{Path, Query, State, WebSocketUpgrade, ws::{Message as WsMessage, WebSocket}},
    http::StatusCode,
    response::Response,
};
use futures::{SinkExt, StreamExt, stream::SplitSink};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use agent_core::{
    AgentCallback, AgentError, ApiKey, Message, SessionId, StepRecorder, ThoughtStep, TurnOutcome,
    session::{SessionSummary, SharedSession},
};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub api_key_configured: bool,
    pub tools: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Omitted: a fresh session is started
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
    /// Key typed into the sidebar
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: SessionId,
    pub answer: String,
    pub outcome: TurnOutcome,
    pub transcript: Vec<Message>,
    pub steps: Vec<ThoughtStep>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: SessionId,
    pub title: String,
    pub transcript: Vec<Message>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

const fn default_list_limit() -> usize {
    50
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: &AgentError) -> ApiError {
    let (status, code) = match err {
        AgentError::MissingCredential => (StatusCode::BAD_REQUEST, "MISSING_API_KEY"),
        AgentError::EmptyInput => (StatusCode::BAD_REQUEST, "EMPTY_INPUT"),
        AgentError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR"),
    };
    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            code: code.into(),
        }),
    )
}

/// Checks that need no session, in the order a turn applies them: blank
/// input first, then the key. Nothing is created for a rejected request.
fn admit(state: &AppState, request: &ChatRequest) -> Result<ApiKey, AgentError> {
    if request.message.trim().is_empty() {
        return Err(AgentError::EmptyInput);
    }
    state
        .resolve_key(request.api_key.as_deref())
        .ok_or(AgentError::MissingCredential)
}

/// Existing session by id, or a new one when none was given
async fn open_session(state: &AppState, id: Option<&str>) -> Result<(SessionId, SharedSession), AgentError> {
    match id {
        Some(raw) => {
            let id = SessionId::from_string(raw);
            let session = state.sessions.get(&id).await?;
            Ok((id, session))
        }
        None => Ok(state.sessions.create().await),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        api_key_configured: state.default_key.is_some(),
        tools: state.runner.tools().names(),
    })
}

/// Start a chat seeded with the greeting
pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionResponse>) {
    let (id, session) = state.sessions.create().await;
    let session = session.lock().await;

    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id: id,
            title: session.title(),
            transcript: session.transcript.messages().to_vec(),
        }),
    )
}

/// Fetch a session's transcript
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let id = SessionId::from_string(id);
    let session = state.sessions.get(&id).await.map_err(|e| api_error(&e))?;
    let session = session.lock().await;

    Ok(Json(SessionResponse {
        session_id: id,
        title: session.title(),
        transcript: session.transcript.messages().to_vec(),
    }))
}

/// Recently active sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Vec<SessionSummary>> {
    Json(state.sessions.list(params.limit).await)
}

/// Forget a session
pub async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    if state.sessions.remove(&SessionId::from_string(id)).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Main chat endpoint (non-streaming)
///
/// Agent failures are not HTTP errors: they come back as a `failed` outcome
/// and are already part of the transcript.
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let key = admit(&state, &payload).map_err(|e| {
        tracing::warn!(error = %e, "Chat request rejected");
        api_error(&e)
    })?;
    let (session_id, session) = open_session(&state, payload.session_id.as_deref())
        .await
        .map_err(|e| api_error(&e))?;
    let recorder = StepRecorder::new();

    let mut session = session.lock().await;
    let outcome = session
        .submit(&payload.message, Some(&key), &state.runner, &recorder)
        .await
        .map_err(|e| {
            tracing::warn!(session = %session_id, error = %e, "Chat request rejected");
            api_error(&e)
        })?;

    Ok(Json(ChatResponse {
        session_id,
        answer: outcome.text().to_string(),
        outcome,
        transcript: session.transcript.messages().to_vec(),
        steps: recorder.into_steps(),
    }))
}

// ============================================================================
// Streaming
// ============================================================================

/// Events pushed over the chat WebSocket
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Token { content: String },
    Action { tool: String, input: String },
    Observation { tool: String, content: String },
    ParseError { message: String },
    Finish { output: String },
    Error { error: String, code: String },
    Done {
        session_id: SessionId,
        outcome: TurnOutcome,
        transcript: Vec<Message>,
    },
}

/// Forwards agent callbacks into the socket's outbound queue
struct ChannelCallback {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl ChannelCallback {
    fn emit(&self, event: StreamEvent) {
        // The receiver only goes away once the turn is over
        let _ = self.tx.send(event);
    }
}

impl AgentCallback for ChannelCallback {
    fn on_llm_token(&self, token: &str) {
        self.emit(StreamEvent::Token { content: token.to_string() });
    }

    fn on_agent_action(&self, tool: &str, input: &str, _log: &str) {
        self.emit(StreamEvent::Action {
            tool: tool.to_string(),
            input: input.to_string(),
        });
    }

    fn on_tool_end(&self, tool: &str, observation: &str) {
        self.emit(StreamEvent::Observation {
            tool: tool.to_string(),
            content: observation.to_string(),
        });
    }

    fn on_parse_error(&self, message: &str) {
        self.emit(StreamEvent::ParseError { message: message.to_string() });
    }

    fn on_agent_finish(&self, output: &str) {
        self.emit(StreamEvent::Finish { output: output.to_string() });
    }
}

/// WebSocket streaming chat
pub async fn chat_stream_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_stream(socket, state))
}

async fn send_event(sender: &mut SplitSink<WebSocket, WsMessage>, event: &StreamEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => sender.send(WsMessage::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to encode stream event: {}", e);
            true
        }
    }
}

fn error_event(err: &AgentError) -> StreamEvent {
    let (_, Json(body)) = api_error(err);
    StreamEvent::Error {
        error: body.error,
        code: body.code,
    }
}

/// One streamed turn. Every event, the closing `done` or `error`
/// included, goes to `events`; the channel closes when this returns.
async fn stream_turn(state: &AppState, raw: &str, events: mpsc::UnboundedSender<StreamEvent>) {
    let callback = ChannelCallback { tx: events };

    let last = match serde_json::from_str::<ChatRequest>(raw) {
        Ok(request) => match streamed_submit(state, &request, &callback).await {
            Ok(done) => done,
            Err(e) => {
                tracing::warn!(error = %e, "Streamed chat request rejected");
                error_event(&e)
            }
        },
        Err(e) => StreamEvent::Error {
            error: e.to_string(),
            code: "INVALID_REQUEST".into(),
        },
    };
    callback.emit(last);
}

async fn streamed_submit(
    state: &AppState,
    request: &ChatRequest,
    callback: &ChannelCallback,
) -> Result<StreamEvent, AgentError> {
    let key = admit(state, request)?;
    let (session_id, session) = open_session(state, request.session_id.as_deref()).await?;

    let mut session = session.lock().await;
    let outcome = session
        .submit(&request.message, Some(&key), &state.runner, callback)
        .await?;

    Ok(StreamEvent::Done {
        session_id,
        outcome,
        transcript: session.transcript.messages().to_vec(),
    })
}

async fn handle_stream(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) => break,
            Err(e) => {
                tracing::error!("WebSocket error: {}", e);
                break;
            }
            _ => continue,
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let turn = stream_turn(&state, msg.as_str(), tx);

        // Drains until the turn drops its sender
        let forward = async {
            let mut connected = true;
            while let Some(event) = rx.recv().await {
                if connected && !send_event(&mut sender, &event).await {
                    tracing::debug!("Client went away mid-turn");
                    connected = false;
                }
            }
            connected
        };

        let ((), connected) = tokio::join!(turn, forward);
        if !connected {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use agent_core::{
        BuiltinPromptHub, LlmProvider, SessionStore, ToolRegistry, TurnRunner,
        mock::{EchoLookupTool, MockProviderFactory, ScriptedProvider},
    };

    use super::*;
    use crate::routes::api_router;

    struct Harness {
        app: Router,
        state: AppState,
        factory: Arc<MockProviderFactory>,
    }

    fn harness(provider: ScriptedProvider, default_key: Option<&str>) -> Harness {
        let provider: Arc<dyn LlmProvider> = Arc::new(provider);
        let factory = Arc::new(MockProviderFactory::new(provider));

        let mut tools = ToolRegistry::new();
        tools.register(EchoLookupTool::new("Search"));
        tools.register(EchoLookupTool::new("arxiv"));
        tools.register(EchoLookupTool::new("wikipedia"));

        let runner = TurnRunner::new(
            factory.clone(),
            Arc::new(BuiltinPromptHub::new()),
            Arc::new(tools),
        );
        let state = AppState {
            runner: Arc::new(runner),
            sessions: Arc::new(SessionStore::new()),
            default_key: default_key.and_then(agent_core::ApiKey::new),
        };

        Harness {
            app: api_router().with_state(state.clone()),
            state,
            factory,
        }
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn new_session(app: &Router) -> String {
        let (status, body) = call(app, "POST", "/api/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_lists_tools() {
        let h = harness(ScriptedProvider::new(["Final Answer: hi"]), None);
        let (status, body) = call(&h.app, "GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["api_key_configured"], false);
        assert_eq!(body["tools"], json!(["Search", "arxiv", "wikipedia"]));
    }

    #[tokio::test]
    async fn test_new_session_is_seeded_with_greeting() {
        let h = harness(ScriptedProvider::new(["Final Answer: hi"]), None);
        let id = new_session(&h.app).await;

        let (status, body) = call(&h.app, "GET", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let transcript = body["transcript"].as_array().unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0]["role"], "assistant");
        assert_eq!(transcript[0]["content"], agent_core::message::GREETING);
    }

    #[tokio::test]
    async fn test_missing_key_is_rejected_without_side_effects() {
        let provider = ScriptedProvider::new(["Final Answer: hi"]);
        let h = harness(provider, None);
        let id = new_session(&h.app).await;

        let (status, body) = call(
            &h.app,
            "POST",
            "/api/chat",
            Some(json!({ "session_id": id, "message": "What is machine learning?", "api_key": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "MISSING_API_KEY");
        assert_eq!(h.factory.created(), 0);

        let (_, body) = call(&h.app, "GET", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(body["transcript"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_chat_appends_question_and_answer() {
        let provider = ScriptedProvider::new([
            "Thought: look it up\nAction: Search\nAction Input: machine learning",
            "Thought: I know now\nFinal Answer: ML learns patterns from data.",
        ]);
        let h = harness(provider, None);
        let id = new_session(&h.app).await;

        let (status, body) = call(
            &h.app,
            "POST",
            "/api/chat",
            Some(json!({ "session_id": id, "message": "What is machine learning?", "api_key": "gsk_test" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "ML learns patterns from data.");
        assert_eq!(body["outcome"]["status"], "answered");

        let transcript = body["transcript"].as_array().unwrap();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[1]["role"], "user");
        assert_eq!(transcript[1]["content"], "What is machine learning?");
        assert_eq!(transcript[2]["role"], "assistant");

        let steps = body["steps"].as_array().unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0]["tool"], "Search");
        assert_eq!(steps[0]["observation"], "Search: machine learning");
        assert_eq!(h.factory.created(), 1);
    }

    #[tokio::test]
    async fn test_environment_key_is_used_when_none_typed() {
        let h = harness(ScriptedProvider::new(["Final Answer: hello"]), Some("gsk_env"));

        let (status, body) = call(&h.app, "POST", "/api/chat", Some(json!({ "message": "hi" }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "hello");
        assert!(body["session_id"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_provider_failure_lands_in_transcript() {
        let h = harness(ScriptedProvider::failing("upstream exploded"), None);
        let id = new_session(&h.app).await;

        let (status, body) = call(
            &h.app,
            "POST",
            "/api/chat",
            Some(json!({ "session_id": id, "message": "hi", "api_key": "gsk_test" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"]["status"], "failed");
        let transcript = body["transcript"].as_array().unwrap();
        assert_eq!(transcript.len(), 3);
        let last = transcript[2]["content"].as_str().unwrap();
        assert!(last.starts_with("An error occurred:"));
        assert!(last.contains("upstream exploded"));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let h = harness(ScriptedProvider::new(["Final Answer: hi"]), None);

        let (status, body) = call(
            &h.app,
            "POST",
            "/api/chat",
            Some(json!({ "session_id": "nope", "message": "hi", "api_key": "gsk_test" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "SESSION_NOT_FOUND");

        let (status, _) = call(&h.app, "GET", "/api/sessions/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected() {
        let h = harness(ScriptedProvider::new(["Final Answer: hi"]), Some("gsk_env"));
        let (status, body) = call(&h.app, "POST", "/api/chat", Some(json!({ "message": "   " }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "EMPTY_INPUT");
        assert_eq!(h.factory.created(), 0);
    }

    #[tokio::test]
    async fn test_delete_and_list_sessions() {
        let h = harness(ScriptedProvider::new(["Final Answer: hi"]), None);
        let id = new_session(&h.app).await;

        let (status, body) = call(&h.app, "GET", "/api/sessions", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, _) = call(&h.app, "DELETE", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&h.app, "DELETE", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rejected_requests_leave_no_session_behind() {
        let h = harness(ScriptedProvider::new(["Final Answer: hi"]), None);

        for _ in 0..3 {
            let (status, body) = call(
                &h.app,
                "POST",
                "/api/chat",
                Some(json!({ "message": "What is machine learning?" })),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["code"], "MISSING_API_KEY");
        }
        let (status, _) = call(&h.app, "POST", "/api/chat", Some(json!({ "message": " ", "api_key": "gsk_test" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(h.state.sessions.len().await, 0);
        assert_eq!(h.factory.created(), 0);
    }

    /// Run one streamed turn and collect its events as JSON
    async fn stream(state: &AppState, raw: &str) -> Vec<Value> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        stream_turn(state, raw, tx).await;

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(serde_json::to_value(&event).unwrap());
        }
        events
    }

    fn kinds(events: &[Value]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| e["type"].as_str())
            .filter(|kind| *kind != "token")
            .collect()
    }

    #[tokio::test]
    async fn test_stream_event_order() {
        let provider = ScriptedProvider::new([
            "Thought: look it up\nAction: Search\nAction Input: machine learning",
            "Thought: I know now\nFinal Answer: ML learns patterns from data.",
        ]);
        let h = harness(provider, None);
        let id = new_session(&h.app).await;

        let request = json!({ "session_id": id, "message": "What is machine learning?", "api_key": "gsk_test" });
        let events = stream(&h.state, &request.to_string()).await;

        assert_eq!(kinds(&events), vec!["action", "observation", "finish", "done"]);
        assert!(events.iter().any(|e| e["type"] == "token"));

        let action = events.iter().find(|e| e["type"] == "action").unwrap();
        assert_eq!(action["tool"], "Search");
        assert_eq!(action["input"], "machine learning");

        let done = events.last().unwrap();
        assert_eq!(done["session_id"], id.as_str());
        assert_eq!(done["outcome"]["status"], "answered");
        assert_eq!(done["transcript"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_stream_missing_key_is_an_error_event() {
        let h = harness(ScriptedProvider::new(["Final Answer: hi"]), None);
        let id = new_session(&h.app).await;

        let request = json!({ "session_id": id, "message": "What is machine learning?" });
        let events = stream(&h.state, &request.to_string()).await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["type"], "error");
        assert_eq!(events[0]["code"], "MISSING_API_KEY");
        assert_eq!(h.factory.created(), 0);

        let (_, body) = call(&h.app, "GET", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(body["transcript"].as_array().unwrap().len(), 1);

        let events = stream(&h.state, r#"{ "message": "hi" }"#).await;
        assert_eq!(events[0]["code"], "MISSING_API_KEY");
        assert_eq!(h.state.sessions.len().await, 1);
    }

    #[tokio::test]
    async fn test_stream_rejects_malformed_json() {
        let h = harness(ScriptedProvider::new(["Final Answer: hi"]), Some("gsk_env"));

        let events = stream(&h.state, "{ not json").await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["type"], "error");
        assert_eq!(events[0]["code"], "INVALID_REQUEST");
        assert_eq!(h.state.sessions.len().await, 0);
    }

    #[tokio::test]
    async fn test_stream_failure_still_finishes_with_done() {
        let h = harness(ScriptedProvider::failing("upstream exploded"), Some("gsk_env"));

        let events = stream(&h.state, r#"{ "message": "hi" }"#).await;
        let done = events.last().unwrap();
        assert_eq!(done["type"], "done");
        assert_eq!(done["outcome"]["status"], "failed");
        assert!(done["outcome"]["text"].as_str().unwrap().contains("upstream exploded"));
        assert_eq!(h.state.sessions.len().await, 1);
    }

    #[test]
    fn test_stream_event_wire_format() {
        let event = StreamEvent::Action {
            tool: "Search".into(),
            input: "rust".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, json!({ "type": "action", "tool": "Search", "input": "rust" }));
    }
}
