//! Web Search Tool
//!
//! General web lookups for current events and anything not covered by the
//! encyclopedia or paper tools.

use std::sync::Arc;

use async_trait::async_trait;

use agent_core::{
    Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema,
    tool::ParameterSchema,
};

use crate::client::LookupClient;
use crate::model::{Document, LookupConfig};

pub const NAME: &str = "Search";
const NO_RESULTS: &str = "No good DuckDuckGo Search Result was found";

/// Tool for searching the web
pub struct WebSearchTool {
    client: Arc<dyn LookupClient>,
    config: LookupConfig,
}

impl WebSearchTool {
    pub fn new(client: Arc<dyn LookupClient>, config: LookupConfig) -> Self {
        Self { client, config }
    }

}

fn format_snippets(docs: &[Document]) -> String {
    docs.iter()
        .map(|d| d.summary.as_str())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl Tool for WebSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: NAME.into(),
            description: "A web search engine. Useful for when you need to answer questions about current events. Input should be a search query.".into(),
            parameters: vec![ParameterSchema::query("Search query")],
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        super::run_lookup(self.client.as_ref(), &self.config, call, NAME, NO_RESULTS, format_snippets).await
    }
}
