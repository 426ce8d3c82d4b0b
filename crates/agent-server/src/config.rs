//! Server Configuration
//!
//! Read from the environment after `.env` has been loaded.

use std::str::FromStr;

use anyhow::Context;

use agent_core::{ApiKey, provider::DEFAULT_MODEL};
use agent_runtime::GroqConfig;
use search_tools::LookupConfig;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,

    /// Key used when the user leaves the sidebar field empty
    pub api_key: Option<ApiKey>,

    /// Chat model identifier
    pub model: String,

    /// Reasoning step cap per turn
    pub max_iterations: usize,

    /// Result/character caps shared by the lookup tools
    pub lookup: LookupConfig,

    /// Directory holding the compiled web UI
    pub static_dir: String,

    /// Groq connection settings
    pub groq: GroqConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            api_key: None,
            model: DEFAULT_MODEL.into(),
            max_iterations: 5,
            lookup: LookupConfig::default(),
            static_dir: "static".into(),
            groq: GroqConfig::default(),
        }
    }
}

fn env_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw:?}")),
        _ => Ok(default),
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let config = Self {
            bind_addr: env_or("BIND_ADDR", defaults.bind_addr)?,
            api_key: std::env::var("GROQ_API_KEY").ok().and_then(ApiKey::new),
            model: env_or("GROQ_MODEL", defaults.model)?,
            max_iterations: env_or("AGENT_MAX_ITERATIONS", defaults.max_iterations)?,
            lookup: LookupConfig {
                top_k_results: env_or("TOOL_TOP_K_RESULTS", defaults.lookup.top_k_results)?,
                doc_content_chars_max: env_or("TOOL_MAX_CHARS", defaults.lookup.doc_content_chars_max)?,
            },
            static_dir: env_or("STATIC_DIR", defaults.static_dir)?,
            groq: GroqConfig::from_env(),
        };

        if config.max_iterations == 0 {
            anyhow::bail!("AGENT_MAX_ITERATIONS must be at least 1");
        }
        Ok(config)
    }
}
