//! Pinecone data-plane REST client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::VectorIndex;
use crate::error::{RagError, Result};
use crate::records::{ChunkMetadata, IndexRecord, QueryMatch};

const API_VERSION: &str = "2024-07";
/// Vectors per upsert request; Pinecone rejects request bodies above 2MB.
const UPSERT_BATCH: usize = 100;

/// Index client bound to one Pinecone index host and optional namespace.
#[derive(Clone)]
pub struct PineconeIndex {
    client: Client,
    host: String,
    namespace: Option<String>,
}

impl PineconeIndex {
    /// Builds a client for `host` (e.g. `my-index-abc123.svc.us-east-1.pinecone.io`).
    pub fn new(
        api_key: &str,
        host: &str,
        namespace: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(RagError::Config("missing Pinecone API key".into()));
        }
        let host = host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(RagError::Config("missing Pinecone index host".into()));
        }
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };
        let mut headers = HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| RagError::Config("invalid Pinecone API key".into()))?,
        );
        headers.insert("X-Pinecone-API-Version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| {
                RagError::Config(format!("failed to build Pinecone HTTP client: {err}"))
            })?;
        Ok(Self {
            client,
            host,
            namespace: namespace.filter(|ns| !ns.trim().is_empty()),
        })
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let resp = self
            .client
            .post(format!("{}{}", self.host, path))
            .json(body)
            .send()
            .await
            .map_err(|err| RagError::from_transport("Pinecone", err))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(RagError::from_status("Pinecone", status, &text));
        }
        resp.json()
            .await
            .map_err(|err| RagError::from_transport("Pinecone", err))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize> {
        let mut written = 0usize;
        for batch in records.chunks(UPSERT_BATCH) {
            let request = UpsertRequest {
                vectors: batch,
                namespace: self.namespace.as_deref(),
            };
            let response: UpsertResponse = self.post("/vectors/upsert", &request).await?;
            debug!(count = response.upserted_count, "pinecone upsert acknowledged");
            written += response.upserted_count;
        }
        Ok(written)
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata,
            include_values: false,
            namespace: self.namespace.as_deref(),
        };
        let response: QueryResponse = self.post("/query", &request).await?;
        Ok(response.into_matches(include_metadata))
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [IndexRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<RawMatch>,
}

#[derive(Debug, Deserialize)]
struct RawMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Value>,
}

impl QueryResponse {
    fn into_matches(self, include_metadata: bool) -> Vec<QueryMatch> {
        self.matches
            .into_iter()
            .map(|raw| {
                let metadata = if include_metadata {
                    raw.metadata.as_ref().and_then(metadata_from_value)
                } else {
                    None
                };
                if include_metadata && metadata.is_none() {
                    warn!(id = %raw.id, "pinecone match without usable metadata");
                }
                QueryMatch {
                    id: raw.id,
                    score: raw.score,
                    metadata,
                }
            })
            .collect()
    }
}

/// Pinecone stores numbers as floats, so `chunkIndex` comes back as e.g. `3.0`.
fn metadata_from_value(value: &Value) -> Option<ChunkMetadata> {
    let text = value.get("text")?.as_str()?.to_string();
    let topic_id = value
        .get("topicId")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let chunk_index = value
        .get("chunkIndex")
        .and_then(Value::as_f64)
        .map(|index| index.max(0.0) as usize)
        .unwrap_or(0);
    Some(ChunkMetadata {
        topic_id,
        chunk_index,
        text,
    })
}
