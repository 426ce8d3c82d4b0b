//! # agent-core
//!
//! Chat sessions driven by a ReAct (Reason + Act) agent with a
//! provider-agnostic LLM abstraction and a pluggable lookup-tool system.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  ChatSession (transcript)                                    │
//! │      │ submit(input, credential)                             │
//! │      ▼                                                       │
//! │  TurnRunner ── ProviderFactory ── PromptHub ── ToolRegistry  │
//! │      │                                                       │
//! │      ▼                                                       │
//! │  Agent: prompt ─► LLM (stream) ─► parser ─► tool ─► scratch  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A fresh `Agent` is built for every turn; only the transcript outlives it.

pub mod callback;
pub mod credential;
pub mod error;
pub mod message;
pub mod mock;
pub mod parser;
pub mod prompt;
pub mod provider;
pub mod reasoning;
pub mod runner;
pub mod session;
pub mod tool;

pub use callback::{AgentCallback, NoopCallback, StepRecorder, ThoughtStep};
pub use credential::ApiKey;
pub use error::{AgentError, Result};
pub use message::{Message, Role, Transcript};
pub use prompt::{BuiltinPromptHub, PromptHub, PromptTemplate};
pub use provider::{LlmProvider, ProviderFactory};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, EarlyStopping};
pub use runner::TurnRunner;
pub use session::{ChatSession, SessionId, SessionStore, TurnOutcome};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
