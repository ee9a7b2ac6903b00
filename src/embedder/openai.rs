//! OpenAI-based embedding client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::EmbeddingClient;
use crate::error::{RagError, Result};
use crate::retry::RetryPolicy;

/// Async embeddings client that talks to OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    dimensions: Option<usize>,
    retry: RetryPolicy,
}

impl OpenAiEmbedder {
    /// Builds a new OpenAI embeddings client.
    pub fn new(
        api_key: &str,
        base_url: &str,
        dimensions: Option<usize>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(RagError::Config("missing OpenAI API key".into()));
        }
        if dimensions == Some(0) {
            return Err(RagError::Config("embedding dimensions must be positive".into()));
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
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            dimensions,
            retry,
        })
    }

    /// Dimension override sent with each request, if any.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    async fn request(&self, inputs: &[&str], model: &str) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model,
            input: inputs,
            dimensions: self.dimensions,
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| RagError::from_transport("OpenAI embeddings", err))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(RagError::from_status("OpenAI embeddings", status, &body));
        }
        let mut parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|err| RagError::from_transport("OpenAI embeddings", err))?;
        parsed.data.sort_by_key(|entry| entry.index);
        validate_embeddings(parsed.data, inputs.len(), self.dimensions)
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbedder {
    async fn embed_batch(&self, inputs: &[&str], model: &str) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        if model.trim().is_empty() {
            return Err(RagError::Config("missing embedding model name".into()));
        }
        debug!(inputs = inputs.len(), model, "requesting embeddings");
        self.retry
            .run("openai.embeddings", move || self.request(inputs, model))
            .await
    }
}

fn validate_embeddings(
    data: Vec<EmbeddingData>,
    expected_len: usize,
    dimensions: Option<usize>,
) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected_len {
        return Err(RagError::service(format!(
            "OpenAI returned {} embeddings for {} inputs",
            data.len(),
            expected_len
        )));
    }
    let vectors: Vec<Vec<f32>> = data.into_iter().map(|entry| entry.embedding).collect();
    let width = dimensions.or_else(|| vectors.first().map(Vec::len)).unwrap_or(0);
    if let Some(bad) = vectors.iter().find(|vector| vector.len() != width) {
        return Err(RagError::Config(format!(
            "embedding dimension mismatch: expected {width}, got {}",
            bad.len()
        )));
    }
    Ok(vectors)
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    #[serde(borrow)]
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(index: usize, embedding: Vec<f32>) -> EmbeddingData {
        EmbeddingData { embedding, index }
    }

    #[test]
    fn rejects_missing_api_key() {
        let err = OpenAiEmbedder::new(
            "  ",
            "https://api.openai.com/v1",
            None,
            Duration::from_secs(5),
            RetryPolicy::none(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn response_order_follows_index_field() {
        let raw = r#"{"data":[{"embedding":[0.2,0.2],"index":1},{"embedding":[0.1,0.1],"index":0}]}"#;
        let mut parsed: EmbeddingResponse = serde_json::from_str(raw).unwrap();
        parsed.data.sort_by_key(|entry| entry.index);
        let vectors = validate_embeddings(parsed.data, 2, None).unwrap();
        assert_eq!(vectors, vec![vec![0.1, 0.1], vec![0.2, 0.2]]);
    }

    #[test]
    fn count_mismatch_is_a_service_error() {
        let err = validate_embeddings(vec![entry(0, vec![1.0])], 2, None).unwrap_err();
        assert!(matches!(err, RagError::Service { .. }));
    }

    #[test]
    fn dimension_mismatch_is_a_config_error() {
        let err = validate_embeddings(vec![entry(0, vec![1.0, 2.0])], 1, Some(3)).unwrap_err();
        assert!(matches!(err, RagError::Config(_)));

        let err = validate_embeddings(
            vec![entry(0, vec![1.0, 2.0]), entry(1, vec![1.0])],
            2,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn request_skips_absent_dimensions() {
        let inputs = ["a", "b"];
        let body = serde_json::to_value(EmbeddingRequest {
            model: "text-embedding-3-small",
            input: &inputs,
            dimensions: None,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"model": "text-embedding-3-small", "input": ["a", "b"]})
        );
    }
}
