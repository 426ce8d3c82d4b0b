//! Turn Runner
//!
//! Builds a fresh provider and agent for every chat turn and invokes it.

use std::sync::Arc;

use crate::callback::AgentCallback;
use crate::credential::ApiKey;
use crate::error::Result;
use crate::prompt::{PromptHub, REACT_PROMPT_ID};
use crate::provider::ProviderFactory;
use crate::reasoning::{AgentBuilder, AgentConfig};
use crate::tool::ToolRegistry;

/// Everything needed to answer one turn
pub struct TurnRunner {
    providers: Arc<dyn ProviderFactory>,
    prompts: Arc<dyn PromptHub>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
    prompt_id: String,
}

impl TurnRunner {
    pub fn new(
        providers: Arc<dyn ProviderFactory>,
        prompts: Arc<dyn PromptHub>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            providers,
            prompts,
            tools,
            config: AgentConfig::default(),
            prompt_id: REACT_PROMPT_ID.into(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_prompt_id(mut self, id: impl Into<String>) -> Self {
        self.prompt_id = id.into();
        self
    }

    /// Answer `input` with a provider bound to `key`
    pub async fn run(&self, key: &ApiKey, input: &str, callback: &dyn AgentCallback) -> Result<String> {
        let provider = self.providers.create(key)?;
        let prompt = self.prompts.pull(&self.prompt_id).await?;

        let agent = AgentBuilder::new()
            .provider(provider)
            .tools(Arc::clone(&self.tools))
            .prompt(prompt)
            .config(self.config.clone())
            .build()?;

        agent.invoke(input, callback).await
    }

    /// Registered tools
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }
}
