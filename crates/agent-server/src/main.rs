//! search-chat HTTP Server
//!
//! Axum-based server providing the chat REST API, a WebSocket stream of
//! agent events and the compiled web UI.

mod config;
mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{
    AgentConfig, BuiltinPromptHub, LlmProvider, ProviderFactory, SessionStore, TurnRunner,
    provider::GenerationOptions,
};
use agent_runtime::GroqProviderFactory;

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    // Providers are built per turn from the user's key
    let providers = Arc::new(GroqProviderFactory::new(config.groq.clone()));

    match &config.api_key {
        Some(key) => {
            let provider: Arc<dyn LlmProvider> = providers.create(key)?;
            match provider.health_check().await {
                Ok(true) => tracing::info!("✓ Groq reachable with the configured key"),
                Ok(false) | Err(_) => {
                    tracing::warn!("⚠ Groq did not accept the configured key");
                    tracing::warn!("  Users can still enter their own key in the sidebar");
                }
            }
        }
        None => {
            tracing::warn!("⚠ GROQ_API_KEY not set - users must enter a key in the sidebar");
        }
    }

    // Lookup tools
    let tools = search_tools::default_tools(config.lookup)?;
    tracing::info!("Registered {} tools:", tools.len());
    for name in tools.names() {
        tracing::info!("  • {}", name);
    }

    let agent_config = AgentConfig {
        max_iterations: config.max_iterations,
        generation: GenerationOptions {
            model: config.model.clone(),
            ..AgentConfig::default().generation
        },
        ..AgentConfig::default()
    };

    let runner = TurnRunner::new(providers, Arc::new(BuiltinPromptHub::new()), Arc::new(tools))
        .with_config(agent_config);

    // Build application state
    let state = AppState {
        runner: Arc::new(runner),
        sessions: Arc::new(SessionStore::new()),
        default_key: config.api_key.clone(),
    };

    let app = routes::app(state, &config.static_dir);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🔎 search-chat server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Model: {} (max {} steps)", config.model, config.max_iterations);
    tracing::info!("Endpoints:");
    tracing::info!("  GET    /health             - Health check");
    tracing::info!("  POST   /api/sessions       - Start a chat");
    tracing::info!("  GET    /api/sessions/{{id}}  - Chat transcript");
    tracing::info!("  POST   /api/chat           - Send message");
    tracing::info!("  GET    /api/chat/stream    - WebSocket streaming");

    axum::serve(listener, app).await?;

    Ok(())
}
