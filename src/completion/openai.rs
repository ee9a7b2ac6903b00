//! OpenAI chat-completions provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CompletionClient, CompletionRequest};
use crate::error::{RagError, Result};
use crate::retry::RetryPolicy;

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiCompleter {
    client: Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl OpenAiCompleter {
    /// Builds a client posting to `<base_url>/chat/completions`.
    pub fn new(api_key: &str, base_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(RagError::Config(
                "OPENAI_API_KEY must be set for the OpenAI provider".into(),
            ));
        }
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| RagError::Config("invalid OpenAI API key".into()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| RagError::Config(format!("failed to build OpenAI HTTP client: {err}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            retry,
        })
    }

    async fn request(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let body = ChatRequest {
            model: request.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: vec![ChatMessage {
                role: "system",
                content: request.prompt,
            }],
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|err| RagError::from_transport("OpenAI chat completions", err))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(RagError::from_status("OpenAI chat completions", status, &text));
        }
        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|err| RagError::from_transport("OpenAI chat completions", err))?;
        parsed.into_answer()
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompleter {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        self.retry
            .run("openai.chat", move || self.request(request))
            .await
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl ChatResponse {
    fn into_answer(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| RagError::service("OpenAI response contained no choices"))
    }
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sends_prompt_as_system_message() {
        let body = serde_json::to_value(ChatRequest {
            model: "gpt-4o-mini",
            temperature: 0.25,
            max_tokens: None,
            messages: vec![ChatMessage {
                role: "system",
                content: "Context: ...",
            }],
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "temperature": 0.25,
                "messages": [{"role": "system", "content": "Context: ..."}]
            })
        );
    }

    #[test]
    fn extracts_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"Cells."}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.into_answer().unwrap(), "Cells.");
    }

    #[test]
    fn empty_choices_are_an_error() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(parsed.into_answer().is_err());
    }
}
