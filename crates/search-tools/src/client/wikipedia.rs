//! Wikipedia search via the MediaWiki action API

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::{LookupClient, check_status, http_client};
use crate::error::Result;
use crate::model::{Document, LookupConfig, truncate_chars};

const MAX_QUERY_LENGTH: usize = 300;

pub struct WikipediaClient {
    client: reqwest::Client,
    lang: String,
}

impl WikipediaClient {
    /// English Wikipedia
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(http_client()?, "en"))
    }

    pub fn with_client(client: reqwest::Client, lang: impl Into<String>) -> Self {
        Self {
            client,
            lang: lang.into(),
        }
    }

    fn api_url(&self) -> String {
        format!("https://{}.wikipedia.org/w/api.php", self.lang)
    }

    async fn search_titles(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let limit = limit.to_string();
        let response = self
            .client
            .get(self.api_url())
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .send()
            .await?;
        let body = check_status("Wikipedia", response)?.text().await?;
        parse_search(&body)
    }

    async fn fetch_extracts(&self, titles: &[String]) -> Result<HashMap<String, String>> {
        let joined = titles.join("|");
        let response = self
            .client
            .get(self.api_url())
            .query(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", joined.as_str()),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .send()
            .await?;
        let body = check_status("Wikipedia", response)?.text().await?;
        parse_extracts(&body)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    missing: bool,
}

fn parse_search(body: &str) -> Result<Vec<String>> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response
        .query
        .map(|q| q.search.into_iter().map(|hit| hit.title).collect())
        .unwrap_or_default())
}

fn parse_extracts(body: &str) -> Result<HashMap<String, String>> {
    let response: ExtractResponse = serde_json::from_str(body)?;
    Ok(response
        .query
        .map(|q| {
            q.pages
                .into_iter()
                .filter(|p| !p.missing)
                .filter_map(|p| {
                    let extract = p.extract?.trim().to_string();
                    (!extract.is_empty()).then_some((p.title, extract))
                })
                .collect()
        })
        .unwrap_or_default())
}

#[async_trait]
impl LookupClient for WikipediaClient {
    async fn lookup(&self, query: &str, config: &LookupConfig) -> Result<Vec<Document>> {
        let query = truncate_chars(query, MAX_QUERY_LENGTH);
        let titles = self.search_titles(&query, config.top_k_results).await?;
        if titles.is_empty() {
            return Ok(Vec::new());
        }

        let mut extracts = self.fetch_extracts(&titles).await?;

        // Keep search ranking order
        let docs: Vec<Document> = titles
            .into_iter()
            .take(config.top_k_results)
            .filter_map(|title| {
                let summary = extracts.remove(&title)?;
                let url = format!(
                    "https://{}.wikipedia.org/wiki/{}",
                    self.lang,
                    title.replace(' ', "_")
                );
                Some(Document {
                    url: Some(url),
                    ..Document::new(title, summary)
                })
            })
            .collect();

        tracing::debug!(query = %query, hits = docs.len(), "Wikipedia search");
        Ok(docs)
    }

    fn name(&self) -> &str {
        "wikipedia"
    }
}
