//! DuckDuckGo web search via the HTML endpoint (no API key needed)

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use super::{LookupClient, check_status, http_client};
use crate::error::{LookupError, Result};
use crate::model::{Document, LookupConfig, normalize_whitespace};

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";

pub struct DuckDuckGoClient {
    client: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGoClient {
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(http_client()?))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: SEARCH_URL.into(),
        }
    }
}

#[async_trait]
impl LookupClient for DuckDuckGoClient {
    async fn lookup(&self, query: &str, config: &LookupConfig) -> Result<Vec<Document>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await?;
        let html = check_status("DuckDuckGo", response)?.text().await?;

        let results = extract_results(&html, config.top_k_results)?;
        tracing::debug!(query, hits = results.len(), "DuckDuckGo search");
        Ok(results)
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| LookupError::Parse(e.to_string()))
}

/// Whitespace-normalised text of the first `selector` match under `el`
fn first_text(el: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    let text = normalize_whitespace(&el.select(selector).next()?.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

/// Extract search results from DuckDuckGo HTML.
fn extract_results(html: &str, limit: usize) -> Result<Vec<Document>> {
    let document = Html::parse_document(html);

    let body_selector = selector(".result__body")?;
    let title_selector = selector(".result__a")?;
    let snippet_selector = selector(".result__snippet")?;
    let url_selector = selector(".result__url")?;

    Ok(document
        .select(&body_selector)
        .filter_map(|body| {
            let title = first_text(&body, &title_selector)?;
            let summary = first_text(&body, &snippet_selector).unwrap_or_default();
            Some(Document {
                url: first_text(&body, &url_selector),
                ..Document::new(title, summary)
            })
        })
        .take(limit)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<div class="result results_links results_links_deep web-result ">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fen.wikipedia.org">Machine learning - <b>Wikipedia</b></a>
    </h2>
    <div class="result__extras"><a class="result__url" href="x"> en.wikipedia.org/wiki/Machine_learning </a></div>
    <a class="result__snippet" href="x"><b>Machine</b> <b>learning</b> (ML) is a field of study in AI &amp; statistics.</a>
  </div>
</div>
<div class="result"><div class="links_main result__body">
    <a rel="nofollow" class="result__a" href="y">Second hit</a>
    <a class="result__snippet" href="y">Another snippet</a>
</div></div>
"#;

    #[test]
    fn test_extract_results() {
        let docs = extract_results(PAGE, 5).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].title, "Machine learning - Wikipedia");
        assert_eq!(
            docs[0].summary,
            "Machine learning (ML) is a field of study in AI & statistics."
        );
        assert_eq!(docs[0].url.as_deref(), Some("en.wikipedia.org/wiki/Machine_learning"));
        assert_eq!(docs[1].summary, "Another snippet");
    }

    #[test]
    fn test_extract_respects_limit() {
        assert_eq!(extract_results(PAGE, 1).unwrap().len(), 1);
        assert!(extract_results("<html>nothing</html>", 3).unwrap().is_empty());
    }

    #[test]
    fn test_numeric_entities_and_angle_brackets_in_attributes() {
        let page = r#"<div class="result__body">
            <a class="result__a" data-hint="a > b" href="z">Rust&#8217;s borrow checker</a>
            <a class="result__snippet" href="z">See docs&#x2F;book &lt;ch. 4&gt;</a>
        </div>"#;

        let docs = extract_results(page, 3).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Rust\u{2019}s borrow checker");
        assert_eq!(docs[0].summary, "See docs/book <ch. 4>");
        assert!(docs[0].url.is_none());
    }
}
