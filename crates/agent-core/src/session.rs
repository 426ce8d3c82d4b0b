//! Session Management
//!
//! A chat session owns the transcript and drives one turn at a time.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::callback::AgentCallback;
use crate::credential::ApiKey;
use crate::error::{AgentError, Result};
use crate::message::{GREETING, Role, Transcript};
use crate::runner::TurnRunner;

/// Answer recorded when the agent returns nothing
pub const NO_RESPONSE: &str = "I couldn't generate a response.";

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a submitted turn ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "lowercase")]
pub enum TurnOutcome {
    /// The agent produced an answer
    Answered(String),
    /// The agent failed; the text is the error shown to the user
    Failed(String),
}

impl TurnOutcome {
    /// Text recorded as the assistant turn
    pub fn text(&self) -> &str {
        match self {
            Self::Answered(text) | Self::Failed(text) => text,
        }
    }

    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// One user's conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatSession {
    /// Unique identifier
    pub id: SessionId,

    /// User/assistant turns, seeded with the greeting
    pub transcript: Transcript,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// Create a new session
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    /// Create with specific ID
    pub fn with_id(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            transcript: Transcript::seeded(GREETING),
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Title from the first user message
    pub fn title(&self) -> String {
        self.transcript
            .messages()
            .iter()
            .find(|m| m.role == Role::User)
            .map_or_else(
                || format!("Session {}", self.id.0.chars().take(8).collect::<String>()),
                |m| {
                    let preview: String = m.content.chars().take(50).collect();
                    if m.content.chars().count() > 50 {
                        format!("{preview}...")
                    } else {
                        preview
                    }
                },
            )
    }

    /// Message count
    pub fn message_count(&self) -> usize {
        self.transcript.len()
    }

    /// Handle one user submission.
    ///
    /// Blank input or a missing key return an error before anything is
    /// recorded or any provider is built. Otherwise the user turn and exactly
    /// one assistant turn are appended; agent failures become that assistant
    /// turn instead of an error.
    pub async fn submit(
        &mut self,
        input: &str,
        key: Option<&ApiKey>,
        runner: &TurnRunner,
        callback: &dyn AgentCallback,
    ) -> Result<TurnOutcome> {
        if input.trim().is_empty() {
            return Err(AgentError::EmptyInput);
        }
        let key = key.ok_or(AgentError::MissingCredential)?;

        self.transcript.push_user(input);
        self.touch();

        let outcome = match runner.run(key, input, callback).await {
            Ok(answer) if answer.trim().is_empty() => TurnOutcome::Answered(NO_RESPONSE.into()),
            Ok(answer) => TurnOutcome::Answered(answer),
            Err(e) => {
                tracing::error!(session = %self.id, error = %e, retryable = e.is_retryable(), "Turn failed");
                TurnOutcome::Failed(format!("An error occurred: {e}"))
            }
        };

        self.transcript.push_assistant(outcome.text());
        self.touch();
        Ok(outcome)
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Listing entry for a session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    pub message_count: usize,
    pub updated_at: DateTime<Utc>,
}

/// Shared handle to a session; the mutex serialises its turns
pub type SharedSession = Arc<Mutex<ChatSession>>;

/// In-memory session store, lives as long as the process
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SharedSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new seeded session
    pub async fn create(&self) -> (SessionId, SharedSession) {
        let session = ChatSession::new();
        let id = session.id.clone();
        let shared = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(id.clone(), Arc::clone(&shared));
        tracing::debug!(session = %id, "Session created");
        (id, shared)
    }

    /// Look up a session
    pub async fn get(&self, id: &SessionId) -> Result<SharedSession> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AgentError::SessionNotFound(id.to_string()))
    }

    /// Drop a session
    pub async fn remove(&self, id: &SessionId) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Check if empty
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Most recently active sessions first
    pub async fn list(&self, limit: usize) -> Vec<SessionSummary> {
        let handles: Vec<SharedSession> = self.sessions.read().await.values().cloned().collect();

        let mut result = Vec::with_capacity(handles.len());
        for handle in handles {
            let session = handle.lock().await;
            result.push(SessionSummary {
                id: session.id.clone(),
                title: session.title(),
                message_count: session.message_count(),
                updated_at: session.updated_at,
            });
        }

        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        result.truncate(limit);
        result
    }
}
