//! Lookup Clients
//!
//! Read-only search backends behind a common trait, one per source.

mod arxiv;
mod duckduckgo;
mod mock;
mod wikipedia;

pub use arxiv::ArxivClient;
pub use duckduckgo::DuckDuckGoClient;
pub use mock::{MockLookupClient, RecordedLookup};
pub use wikipedia::WikipediaClient;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Document, LookupConfig};

const USER_AGENT: &str = concat!("search-chat/", env!("CARGO_PKG_VERSION"));

/// Lookup client trait (Strategy pattern)
///
/// Implement this for each search source.
#[async_trait]
pub trait LookupClient: Send + Sync {
    /// Return at most `config.top_k_results` documents for `query`
    async fn lookup(&self, query: &str, config: &LookupConfig) -> Result<Vec<Document>>;

    /// Source name
    fn name(&self) -> &str;
}

/// HTTP client shared by the real backends
pub(crate) fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(20))
        .build()?)
}

/// Fail on non-2xx responses
pub(crate) fn check_status(
    source_name: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(crate::error::LookupError::Status {
            source_name,
            status: status.as_u16(),
        })
    }
}
