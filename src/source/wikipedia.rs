//! Wikipedia introductions via the MediaWiki extracts API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::TextSource;
use crate::error::{RagError, Result};

const USER_AGENT: &str = concat!(
    "wikiqa/",
    env!("CARGO_PKG_VERSION"),
    " (educational question answering)"
);

/// Fetches plain-text introductions through the MediaWiki extracts API.
#[derive(Clone)]
pub struct WikipediaSource {
    client: Client,
    endpoint: String,
}

impl WikipediaSource {
    /// Builds a source for the `lang` edition (e.g. `en`).
    pub fn new(lang: &str, timeout: Duration) -> Result<Self> {
        let lang = lang.trim();
        if lang.is_empty() || !lang.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-') {
            return Err(RagError::Config(format!("invalid Wikipedia language '{lang}'")));
        }
        Self::with_endpoint(format!("https://{lang}.wikipedia.org/w/api.php"), timeout)
    }

    /// Builds a source against an explicit `api.php` endpoint.
    pub fn with_endpoint(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(RagError::Config(
                "Wikipedia endpoint must be an http(s) URL".into(),
            ));
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|err| {
                RagError::Config(format!("failed to build Wikipedia HTTP client: {err}"))
            })?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl TextSource for WikipediaSource {
    async fn fetch(&self, topic: &str) -> Result<String> {
        let title = topic.trim().replace(' ', "_");
        if title.is_empty() {
            return Err(RagError::Validation("topic must not be empty".into()));
        }
        debug!(topic, "fetching Wikipedia extract");
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("format", "json"),
                ("formatversion", "2"),
                ("titles", title.as_str()),
            ])
            .send()
            .await
            .map_err(|err| RagError::from_transport("Wikipedia", err))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(RagError::from_status("Wikipedia", status, &body));
        }
        let parsed: ExtractResponse = resp
            .json()
            .await
            .map_err(|err| RagError::from_transport("Wikipedia", err))?;
        parsed.into_extract(topic)
    }
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: Vec<ExtractPage>,
}

#[derive(Debug, Deserialize)]
struct ExtractPage {
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    #[serde(default)]
    extract: Option<String>,
}

impl ExtractResponse {
    fn into_extract(self, topic: &str) -> Result<String> {
        let page = self
            .query
            .and_then(|query| query.pages.into_iter().next())
            .ok_or_else(|| RagError::NotFound(format!("Page not found: {topic}")))?;
        if page.missing || page.invalid {
            return Err(RagError::NotFound(format!("Page not found: {topic}")));
        }
        match page.extract {
            Some(extract) if !extract.trim().is_empty() => Ok(extract),
            _ => Err(RagError::NotFound(format!("Page has no extract: {topic}"))),
        }
    }
}
