//! arXiv Query Tool

use std::sync::Arc;

use async_trait::async_trait;

use agent_core::{
    Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema,
    tool::ParameterSchema,
};

use crate::client::LookupClient;
use crate::model::{Document, LookupConfig};

pub const NAME: &str = "arxiv";
const NO_RESULTS: &str = "No good Arxiv Result was found";

/// Tool for searching scientific papers on arxiv.org
pub struct ArxivQueryTool {
    client: Arc<dyn LookupClient>,
    config: LookupConfig,
}

impl ArxivQueryTool {
    pub fn new(client: Arc<dyn LookupClient>, config: LookupConfig) -> Self {
        Self { client, config }
    }

}

fn format_papers(docs: &[Document]) -> String {
    docs.iter()
        .map(|d| {
            // arXiv's "Published" line shows the latest revision date
            let date = d
                .updated
                .or(d.published)
                .map(|p| p.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            format!(
                "Published: {date}\nTitle: {}\nAuthors: {}\nSummary: {}",
                d.title,
                d.authors.join(", "),
                d.summary
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Tool for ArxivQueryTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: NAME.into(),
            description: "A wrapper around Arxiv.org. Useful for when you need to answer questions about Physics, Mathematics, Computer Science, Quantitative Biology, Quantitative Finance, Statistics, Electrical Engineering, and Economics from scientific articles on arxiv.org. Input should be a search query.".into(),
            parameters: vec![ParameterSchema::query("Paper search query")],
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        super::run_lookup(self.client.as_ref(), &self.config, call, NAME, NO_RESULTS, format_papers).await
    }
}
