//! Wikipedia Query Tool

use std::sync::Arc;

use async_trait::async_trait;

use agent_core::{
    Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema,
    tool::ParameterSchema,
};

use crate::client::LookupClient;
use crate::model::{Document, LookupConfig};

pub const NAME: &str = "wikipedia";
const NO_RESULTS: &str = "No good Wikipedia Search Result was found";

/// Tool for encyclopedia summaries
pub struct WikipediaQueryTool {
    client: Arc<dyn LookupClient>,
    config: LookupConfig,
}

impl WikipediaQueryTool {
    pub fn new(client: Arc<dyn LookupClient>, config: LookupConfig) -> Self {
        Self { client, config }
    }

}

fn format_pages(docs: &[Document]) -> String {
    docs.iter()
        .map(|d| format!("Page: {}\nSummary: {}", d.title, d.summary))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Tool for WikipediaQueryTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: NAME.into(),
            description: "A wrapper around Wikipedia. Useful for when you need to answer general questions about people, places, companies, facts, historical events, or other subjects. Input should be a search query.".into(),
            parameters: vec![ParameterSchema::query("Encyclopedia search query")],
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        super::run_lookup(self.client.as_ref(), &self.config, call, NAME, NO_RESULTS, format_pages).await
    }
}
