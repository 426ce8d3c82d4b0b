//! # agent-runtime
//!
//! Hosted LLM providers for search-chat.
//!
//! ## Providers
//!
//! - **Groq** (default): OpenAI-compatible chat completions with SSE streaming
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::groq::GroqProviderFactory;
//!
//! let factory = Arc::new(GroqProviderFactory::from_env());
//! let runner = TurnRunner::new(factory, prompts, tools);
//! ```

#[cfg(feature = "groq")]
pub mod groq;
pub mod sse;

#[cfg(feature = "groq")]
pub use groq::{GroqConfig, GroqProvider, GroqProviderFactory};

// Re-export core types for convenience
pub use agent_core::{
    Agent, AgentError, ApiKey, LlmProvider, Message, ProviderFactory, Result, Role, Tool,
    ToolRegistry,
};
