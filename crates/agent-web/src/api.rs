//! API Client
//!
//! Wire types shared with the server, plus the REST call that starts a chat.
//! Turns themselves travel over the chat socket (see `stream`).

use serde::{Deserialize, Serialize};

/// Code the server returns when neither the sidebar nor the environment
/// supplied a key
pub const MISSING_API_KEY: &str = "MISSING_API_KEY";

/// One transcript entry as the server sends it
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// A tool call the agent made while answering
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThoughtStep {
    pub tool: String,
    pub input: String,
    pub log: String,
    pub observation: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SessionView {
    pub session_id: String,
    pub transcript: Vec<ChatMessage>,
}

/// Error body of a rejected request
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    pub error: String,
    #[serde(default)]
    pub code: String,
}

impl ApiError {
    fn transport(err: &reqwest::Error) -> Self {
        Self {
            error: err.to_string(),
            code: "NETWORK".into(),
        }
    }

    pub fn is_missing_key(&self) -> bool {
        self.code == MISSING_API_KEY
    }
}

/// Events the chat socket delivers while a turn runs
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Token { content: String },
    Action { tool: String, input: String },
    Observation { tool: String, content: String },
    ParseError { message: String },
    Finish { output: String },
    Error { error: String, code: String },
    Done {
        session_id: String,
        transcript: Vec<ChatMessage>,
    },
}

/// One question sent over the chat socket
#[derive(Debug, Serialize)]
pub struct ChatBody {
    session_id: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
}

impl ChatBody {
    /// A blank key is left out so the server can fall back to its own
    pub fn new(session_id: String, message: String, api_key: &str) -> Self {
        let api_key = Some(api_key.trim()).filter(|k| !k.is_empty()).map(str::to_string);
        Self {
            session_id,
            message,
            api_key,
        }
    }
}

/// Absolute URL for an API path; reqwest on wasm needs a base
fn api_url(path: &str) -> String {
    let origin = web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_else(|| "http://localhost:3000".into());
    format!("{origin}{path}")
}

async fn read_error(response: reqwest::Response) -> ApiError {
    let status = response.status();
    response.json().await.unwrap_or_else(|_| ApiError {
        error: format!("Request failed ({status})"),
        code: "HTTP".into(),
    })
}

/// Start a new chat; the transcript comes back seeded with the greeting
pub async fn create_session() -> Result<SessionView, ApiError> {
    let response = reqwest::Client::new()
        .post(api_url("/api/sessions"))
        .send()
        .await
        .map_err(|e| ApiError::transport(&e))?;

    if response.status().is_success() {
        response.json().await.map_err(|e| ApiError::transport(&e))
    } else {
        Err(read_error(response).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_done_event_decodes_server_shape() {
        let json = r#"{
            "type": "done",
            "session_id": "abc",
            "outcome": { "status": "answered", "text": "ML learns from data." },
            "transcript": [
                { "role": "assistant", "content": "hi", "timestamp": "2024-01-01T00:00:00Z" },
                { "role": "user", "content": "What is machine learning?", "timestamp": "2024-01-01T00:00:01Z" },
                { "role": "assistant", "content": "ML learns from data.", "timestamp": "2024-01-01T00:00:02Z" }
            ]
        }"#;

        match serde_json::from_str::<StreamEvent>(json).unwrap() {
            StreamEvent::Done { session_id, transcript } => {
                assert_eq!(session_id, "abc");
                assert_eq!(transcript.len(), 3);
                assert_eq!(transcript[1].role, "user");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_step_events_decode() {
        let action: StreamEvent =
            serde_json::from_str(r#"{ "type": "action", "tool": "Search", "input": "rust" }"#).unwrap();
        assert_eq!(action, StreamEvent::Action { tool: "Search".into(), input: "rust".into() });

        let error: StreamEvent = serde_json::from_str(
            r#"{ "type": "error", "error": "Please enter your Groq API Key in the sidebar", "code": "MISSING_API_KEY" }"#,
        )
        .unwrap();
        assert!(matches!(error, StreamEvent::Error { ref code, .. } if code == MISSING_API_KEY));
    }

    #[test]
    fn test_blank_key_is_omitted() {
        let json = serde_json::to_value(ChatBody::new("abc".into(), "hi".into(), "  ")).unwrap();
        assert!(json.get("api_key").is_none());

        let json = serde_json::to_value(ChatBody::new("abc".into(), "hi".into(), " gsk_1 ")).unwrap();
        assert_eq!(json["api_key"], "gsk_1");
    }
}
