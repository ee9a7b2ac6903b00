//! Anthropic messages provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CompletionClient, CompletionRequest};
use crate::error::{RagError, Result};
use crate::retry::RetryPolicy;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: usize = 1024;

/// Messages-API client for Anthropic models.
pub struct AnthropicCompleter {
    client: Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl AnthropicCompleter {
    /// Builds a client posting to `<base_url>/messages`.
    pub fn new(api_key: &str, base_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(RagError::Config(
                "ANTHROPIC_API_KEY must be set for the Anthropic provider".into(),
            ));
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| RagError::Config("invalid Anthropic API key".into()))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| {
                RagError::Config(format!("failed to build Anthropic HTTP client: {err}"))
            })?;
        Ok(Self {
            client,
            endpoint: format!("{}/messages", base_url.trim_end_matches('/')),
            retry,
        })
    }

    async fn request(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let body = AnthropicRequest {
            model: request.model,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature,
            messages: vec![AnthropicMessage {
                role: "user",
                content: vec![AnthropicContentBlock {
                    kind: "text",
                    text: request.prompt,
                }],
            }],
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|err| RagError::from_transport("Anthropic messages", err))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(RagError::from_status("Anthropic messages", status, &text));
        }
        let parsed: AnthropicResponse = resp
            .json()
            .await
            .map_err(|err| RagError::from_transport("Anthropic messages", err))?;
        parsed.into_answer()
    }
}

#[async_trait]
impl CompletionClient for AnthropicCompleter {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        self.retry
            .run("anthropic.messages", move || self.request(request))
            .await
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    temperature: f32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: Vec<AnthropicContentBlock<'a>>,
}

#[derive(Serialize)]
struct AnthropicContentBlock<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseBlock>,
}

impl AnthropicResponse {
    fn into_answer(self) -> Result<String> {
        let answer = self
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicResponseBlock::Text { text } => Some(text),
                AnthropicResponseBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        if answer.is_empty() {
            return Err(RagError::service("Anthropic response missing text content"));
        }
        Ok(answer)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn joins_text_blocks_and_skips_others() {
        let raw = r#"{"content":[
            {"type":"text","text":"Mitochondria"},
            {"type":"tool_use","id":"x","name":"n","input":{}},
            {"type":"text","text":"make ATP."}
        ]}"#;
        let parsed: AnthropicResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.into_answer().unwrap(), "Mitochondria\nmake ATP.");
    }

    #[test]
    fn missing_text_is_an_error() {
        let parsed: AnthropicResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert!(parsed.into_answer().is_err());
    }

    #[test]
    fn rejects_blank_key() {
        let result = AnthropicCompleter::new(
            "",
            "https://api.anthropic.com/v1",
            Duration::from_secs(5),
            RetryPolicy::none(),
        );
        assert!(matches!(result, Err(RagError::Config(_))));
    }
}
