//! arXiv paper search via the export API (Atom feed)

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

use super::{LookupClient, check_status, http_client};
use crate::error::{LookupError, Result};
use crate::model::{Document, LookupConfig, normalize_whitespace, truncate_chars};

const QUERY_URL: &str = "https://export.arxiv.org/api/query";

/// The export API rejects longer queries
const MAX_QUERY_LENGTH: usize = 300;

pub struct ArxivClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ArxivClient {
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(http_client()?))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: QUERY_URL.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: String,
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    published: Option<String>,
    #[serde(default)]
    updated: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: String,
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.date_naive())
        .ok()
}

/// Parse an Atom feed into documents
fn parse_feed(xml: &str) -> Result<Vec<Document>> {
    let feed: Feed = quick_xml::de::from_str(xml)?;

    // A failed query comes back as a single entry titled "Error"
    if let [entry] = feed.entries.as_slice() {
        if entry.title.trim() == "Error" && entry.id.contains("api/errors") {
            return Err(LookupError::Api(normalize_whitespace(&entry.summary)));
        }
    }

    Ok(feed
        .entries
        .into_iter()
        .map(|entry| Document {
            title: normalize_whitespace(&entry.title),
            summary: normalize_whitespace(&entry.summary),
            url: Some(entry.id.trim().to_string()),
            published: entry.published.as_deref().and_then(parse_date),
            updated: entry.updated.as_deref().and_then(parse_date),
            authors: entry.authors.into_iter().map(|a| normalize_whitespace(&a.name)).collect(),
        })
        .collect())
}

#[async_trait]
impl LookupClient for ArxivClient {
    async fn lookup(&self, query: &str, config: &LookupConfig) -> Result<Vec<Document>> {
        let query = truncate_chars(query, MAX_QUERY_LENGTH);
        let max_results = config.top_k_results.to_string();

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("search_query", query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
            ])
            .send()
            .await?;
        let xml = check_status("arXiv", response)?.text().await?;

        let mut docs = parse_feed(&xml)?;
        docs.truncate(config.top_k_results);
        tracing::debug!(query = %query, hits = docs.len(), "arXiv search");
        Ok(docs)
    }

    fn name(&self) -> &str {
        "arxiv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <link href="http://arxiv.org/api/query" rel="self" type="application/atom+xml"/>
  <title type="html">ArXiv Query: search_query=all:attention</title>
  <id>http://arxiv.org/api/abc</id>
  <updated>2024-01-01T00:00:00-05:00</updated>
  <opensearch:totalResults xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">1</opensearch:totalResults>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <updated>2023-08-02T00:41:18Z</updated>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All
      You Need</title>
    <summary>  The dominant sequence transduction models are based on complex
recurrent or convolutional neural networks.</summary>
    <author>
      <name>Ashish Vaswani</name>
    </author>
    <author>
      <name>Noam Shazeer</name>
    </author>
    <link href="http://arxiv.org/abs/1706.03762v7" rel="alternate" type="text/html"/>
    <arxiv:primary_category xmlns:arxiv="http://arxiv.org/schemas/atom" term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed() {
        let docs = parse_feed(FEED).unwrap();
        assert_eq!(docs.len(), 1);

        let doc = &docs[0];
        assert_eq!(doc.title, "Attention Is All You Need");
        assert_eq!(doc.authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert_eq!(doc.published, NaiveDate::from_ymd_opt(2017, 6, 12));
        assert_eq!(doc.updated, NaiveDate::from_ymd_opt(2023, 8, 2));
        assert!(doc.summary.starts_with("The dominant sequence transduction models"));
    }

    #[test]
    fn test_empty_feed() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>none</title></feed>"#;
        assert!(parse_feed(xml).unwrap().is_empty());
    }

    #[test]
    fn test_error_entry() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format_for_1234</id>
    <title>Error</title>
    <summary>incorrect id format for 1234</summary>
  </entry>
</feed>"#;
        assert!(matches!(parse_feed(xml), Err(LookupError::Api(_))));
    }
}
