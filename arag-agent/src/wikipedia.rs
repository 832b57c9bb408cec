//! Wikipedia search tool.
//!
//! Issues a single MediaWiki `query` request that searches for the phrase and
//! returns the intro extracts of the top pages in one round trip. Rate limits,
//! server errors and timeouts are retried with the configured backoff.

use std::fmt;
use std::time::Duration;

use arag_core::{AragError, Result, RetryPolicy, Tool};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

/// Returned when the search produces no pages.
pub const NO_RESULTS: &str = "No good Wikipedia Search Result was found";

/// Settings for [`WikipediaTool`].
#[derive(Debug, Clone)]
pub struct WikipediaConfig {
    /// Wiki root, e.g. `https://en.wikipedia.org`.
    pub base_url: String,
    /// Number of pages to summarize.
    pub top_k: usize,
    /// Upper bound on the formatted result, in characters.
    pub max_chars: usize,
    pub timeout: Duration,
    /// Backoff for timeouts, 429 and 5xx responses.
    pub retry: RetryPolicy,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://en.wikipedia.org".to_string(),
            top_k: 3,
            max_chars: 4000,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl WikipediaConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    index: usize,
    #[serde(default)]
    extract: String,
}

/// General-knowledge lookup against Wikipedia.
pub struct WikipediaTool {
    client: reqwest::Client,
    config: WikipediaConfig,
}

impl WikipediaTool {
    /// # Errors
    ///
    /// Returns [`AragError::Config`] if the HTTP client cannot be created.
    pub fn new(config: WikipediaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("arag/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AragError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Search Wikipedia and format the top pages as `Page:` / `Summary:` blocks.
    pub async fn search(&self, query: &str) -> Result<String> {
        let url = format!("{}/w/api.php", self.config.base_url.trim_end_matches('/'));
        let limit = self.config.top_k.to_string();
        let params = [
            ("action", "query"),
            ("format", "json"),
            ("formatversion", "2"),
            ("generator", "search"),
            ("gsrsearch", query),
            ("gsrlimit", limit.as_str()),
            ("prop", "extracts"),
            ("exintro", "1"),
            ("explaintext", "1"),
            ("redirects", "1"),
        ];

        let body = self
            .config
            .retry
            .run("wikipedia.search", |f: &SearchFailure| f.transient, || {
                self.search_once(query, &url, &params)
            })
            .await
            .map_err(|f| f.error)?;

        let mut pages = body.query.map(|q| q.pages).unwrap_or_default();
        pages.sort_by_key(|p| p.index);
        pages.truncate(self.config.top_k);

        info!(query, pages = pages.len(), "wikipedia search complete");
        Ok(format_pages(&pages, self.config.max_chars))
    }

    async fn search_once(
        &self,
        query: &str,
        url: &str,
        params: &[(&str, &str)],
    ) -> std::result::Result<SearchResponse, SearchFailure> {
        debug!(query, "searching wikipedia");
        let response =
            self.client.get(url).query(params).send().await.map_err(|e| self.transport(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchFailure {
                error: AragError::Tool(format!("Wikipedia returned HTTP {status}")),
                transient: status.as_u16() == 429 || status.is_server_error(),
            });
        }
        response.json().await.map_err(|e| self.transport(e))
    }

    fn transport(&self, err: reqwest::Error) -> SearchFailure {
        if err.is_timeout() {
            SearchFailure {
                error: AragError::Timeout {
                    service: "Wikipedia".to_string(),
                    after: self.config.timeout,
                },
                transient: true,
            }
        } else {
            SearchFailure {
                transient: err.is_connect(),
                error: AragError::Tool(format!("Wikipedia request failed: {err}")),
            }
        }
    }
}

struct SearchFailure {
    error: AragError,
    transient: bool,
}

impl fmt::Display for SearchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

fn format_pages(pages: &[Page], max_chars: usize) -> String {
    let summaries: Vec<String> = pages
        .iter()
        .map(|p| format!("Page: {}\nSummary: {}", p.title, p.extract.trim()))
        .collect();
    if summaries.is_empty() {
        return NO_RESULTS.to_string();
    }
    summaries.join("\n\n").chars().take(max_chars).collect()
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "Search Wikipedia for general knowledge."
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search phrase" }
            },
            "required": ["query"]
        }))
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| AragError::Tool("wikipedia requires a non-empty 'query'".into()))?;
        Ok(json!({ "result": self.search(query).await? }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(title: &str, index: usize, extract: &str) -> Page {
        Page { title: title.into(), index, extract: extract.into() }
    }

    #[test]
    fn pages_are_formatted_as_blocks() {
        let text = format_pages(
            &[page("Rust", 1, "A language.\n"), page("Cargo", 2, "A build tool.")],
            4000,
        );
        assert_eq!(text, "Page: Rust\nSummary: A language.\n\nPage: Cargo\nSummary: A build tool.");
    }

    #[test]
    fn no_pages_is_reported() {
        assert_eq!(format_pages(&[], 4000), NO_RESULTS);
    }

    #[test]
    fn output_is_truncated_by_characters() {
        let text = format_pages(&[page("日本", 1, &"語".repeat(100))], 20);
        assert_eq!(text.chars().count(), 20);
    }

    #[test]
    fn missing_query_section_parses_as_empty() {
        let body: SearchResponse = serde_json::from_str(r#"{"batchcomplete":true}"#).unwrap();
        assert!(body.query.is_none());
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let tool = WikipediaTool::new(WikipediaConfig::default()).unwrap();
        let err = tool.execute(json!({"query": "  "})).await.unwrap_err();
        assert!(matches!(err, AragError::Tool(_)));
    }
}
