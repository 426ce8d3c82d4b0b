//! Application State

use std::sync::Arc;

use agent_core::{ApiKey, SessionStore, TurnRunner};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Builds provider + agent for each turn
    pub runner: Arc<TurnRunner>,

    /// Live chat sessions
    pub sessions: Arc<SessionStore>,

    /// Key loaded from the environment, if any
    pub default_key: Option<ApiKey>,
}

impl AppState {
    /// Typed key first, then the environment key
    pub fn resolve_key(&self, typed: Option<&str>) -> Option<ApiKey> {
        ApiKey::resolve(typed, self.default_key.as_ref())
    }
}
