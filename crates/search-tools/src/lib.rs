//! # search-tools
//!
//! Read-only lookup tools the chat agent can call before answering:
//!
//! | Tool        | Source            | Output                                    |
//! |-------------|-------------------|-------------------------------------------|
//! | `Search`    | DuckDuckGo (HTML) | result snippets                           |
//! | `arxiv`     | arXiv export API  | revision date / title / authors / summary |
//! | `wikipedia` | MediaWiki API     | page title / intro summary                |
//!
//! Every tool takes a single `query` and carries a [`LookupConfig`]: how many
//! results to request and how many characters of formatted text to return.
//! The config is handed to the client unchanged on every call.

pub mod client;
pub mod error;
pub mod model;
pub mod svckit;

use std::sync::Arc;

use agent_core::ToolRegistry;

pub use client::LookupClient;
pub use error::{LookupError, Result};
pub use model::{Document, LookupConfig};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{ArxivQueryTool, WebSearchTool, WikipediaQueryTool};
}

/// Register web search, arXiv and Wikipedia tools (in that order) on the given clients
pub fn register_lookup_tools(
    registry: &mut ToolRegistry,
    web: Arc<dyn LookupClient>,
    arxiv: Arc<dyn LookupClient>,
    wikipedia: Arc<dyn LookupClient>,
    config: LookupConfig,
) {
    registry.register(tools::WebSearchTool::new(web, config));
    registry.register(tools::ArxivQueryTool::new(arxiv, config));
    registry.register(tools::WikipediaQueryTool::new(wikipedia, config));
}

/// Registry with the three live lookup tools
pub fn default_tools(config: LookupConfig) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    register_lookup_tools(
        &mut registry,
        Arc::new(client::DuckDuckGoClient::new()?),
        Arc::new(client::ArxivClient::new()?),
        Arc::new(client::WikipediaClient::new()?),
        config,
    );
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::mock::ScriptedProvider;
    use agent_core::prompt::{BuiltinPromptHub, PromptHub, REACT_PROMPT_ID};
    use agent_core::{AgentBuilder, NoopCallback, ToolCall};
    use client::MockLookupClient;

    fn mocks() -> [Arc<MockLookupClient>; 3] {
        [
            Arc::new(MockLookupClient::new(vec![Document::new("w", "web snippet")])),
            Arc::new(MockLookupClient::new(vec![Document::new("a", "paper abstract")])),
            Arc::new(MockLookupClient::new(vec![Document::new("p", "page summary")])),
        ]
    }

    fn registry(mocks: &[Arc<MockLookupClient>; 3], config: LookupConfig) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        register_lookup_tools(
            &mut registry,
            mocks[0].clone(),
            mocks[1].clone(),
            mocks[2].clone(),
            config,
        );
        registry
    }

    #[test]
    fn test_registration_order() {
        let registry = registry(&mocks(), LookupConfig::default());
        assert_eq!(registry.names(), vec!["Search", "arxiv", "wikipedia"]);
    }

    #[tokio::test]
    async fn test_caps_passed_through_to_every_tool() {
        let mocks = mocks();
        let config = LookupConfig::default();
        let registry = registry(&mocks, config);

        for name in ["Search", "arxiv", "wikipedia"] {
            registry.execute(&ToolCall::query(name, "machine learning")).await.unwrap();
        }

        for mock in &mocks {
            let calls = mock.calls();
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].config, LookupConfig { top_k_results: 1, doc_content_chars_max: 200 });
            assert_eq!(calls[0].query, "machine learning");
        }
    }

    #[tokio::test]
    async fn test_agent_calls_lookup_tool() {
        let mocks = mocks();
        let config = LookupConfig { top_k_results: 3, doc_content_chars_max: 50 };
        let provider = Arc::new(ScriptedProvider::new([
            "I should check the encyclopedia.\nAction: wikipedia\nAction Input: machine learning",
            "I now know the final answer\nFinal Answer: It is a field of AI.",
        ]));
        let agent = AgentBuilder::new()
            .provider(provider.clone())
            .tools(Arc::new(registry(&mocks, config)))
            .prompt(BuiltinPromptHub::new().pull(REACT_PROMPT_ID).await.unwrap())
            .build()
            .unwrap();

        let answer = agent.invoke("What is machine learning?", &NoopCallback).await.unwrap();
        assert_eq!(answer, "It is a field of AI.");

        assert!(mocks[0].calls().is_empty());
        assert!(mocks[1].calls().is_empty());
        assert_eq!(mocks[2].calls()[0].config, config);

        let second = &provider.requests()[1][0].content;
        assert!(second.contains("Observation: Page: p\nSummary: page summary"));
    }
}
