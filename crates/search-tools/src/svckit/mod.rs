//! Service Kit - Agent Tools
//!
//! Lookup tools that implement `agent_core::Tool` on top of a `LookupClient`.

mod arxiv_query;
mod web_search;
mod wikipedia_query;

pub use arxiv_query::ArxivQueryTool;
pub use web_search::WebSearchTool;
pub use wikipedia_query::WikipediaQueryTool;

use agent_core::{Result as CoreResult, ToolCall, ToolResult};

use crate::client::LookupClient;
use crate::model::{Document, LookupConfig, truncate_chars};

/// Query the client and format its documents, capped at the configured size.
///
/// Lookup failures are reported back to the agent as a failed tool result.
async fn run_lookup(
    client: &dyn LookupClient,
    config: &LookupConfig,
    call: &ToolCall,
    tool_name: &str,
    no_results: &str,
    format: fn(&[Document]) -> String,
) -> CoreResult<ToolResult> {
    let query = call.query_arg().unwrap_or_default().trim();

    match client.lookup(query, config).await {
        Ok(docs) if docs.is_empty() => Ok(ToolResult::success(tool_name, no_results)),
        Ok(docs) => {
            let output = truncate_chars(&format(&docs), config.doc_content_chars_max);
            Ok(ToolResult::success(tool_name, output))
        }
        Err(e) => {
            tracing::warn!(tool = tool_name, source = client.name(), error = %e, "Lookup failed");
            Ok(ToolResult::failure(tool_name, format!("{tool_name} exception: {e}")))
        }
    }
}
