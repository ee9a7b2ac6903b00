//! Retrieval-augmented question answering over the vector index.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::completion::{CompletionClient, CompletionRequest};
use crate::embedder::EmbeddingClient;
use crate::error::{RagError, Result};
use crate::ingest::DEFAULT_EMBEDDING_MODEL;
use crate::vector_store::VectorIndex;

/// Number of contexts retrieved per question.
pub const DEFAULT_TOP_K: usize = 3;
/// Chat model used for grounded answers.
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o-mini";
/// Sampling temperature for grounded answers.
pub const DEFAULT_ANSWER_TEMPERATURE: f32 = 0.2;
/// Separator placed between retrieved contexts in the prompt.
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Query-time tunables.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Contexts retrieved per question.
    pub top_k: usize,
    /// Must match the model used at ingestion.
    pub embedding_model: String,
    /// Completion model identifier.
    pub completion_model: String,
    /// Completion sampling temperature.
    pub temperature: f32,
    /// Optional cap on generated tokens.
    pub max_tokens: Option<usize>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            completion_model: DEFAULT_COMPLETION_MODEL.to_string(),
            temperature: DEFAULT_ANSWER_TEMPERATURE,
            max_tokens: None,
        }
    }
}

/// Answers questions grounded in previously ingested chunks.
pub struct QueryService {
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    completer: Arc<dyn CompletionClient>,
    options: QueryOptions,
    embedding_cache: Option<Mutex<LruCache<String, Vec<f32>>>>,
}

impl QueryService {
    /// Wires the service to its capabilities.
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        completer: Arc<dyn CompletionClient>,
        options: QueryOptions,
    ) -> Self {
        Self {
            embedder,
            index,
            completer,
            options,
            embedding_cache: None,
        }
    }

    /// Keeps up to `capacity` question embeddings in memory; zero disables the cache.
    pub fn with_embedding_cache(mut self, capacity: usize) -> Self {
        self.embedding_cache = NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap)));
        self
    }

    /// Active options.
    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Returns the stored chunk texts of the top-K matches in index rank order.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<String>> {
        let question = validate_question(question)?;
        let embedding = self.embed_question(question).await?;
        let matches = self
            .index
            .query(&embedding, self.options.top_k, true)
            .await?;
        let mut contexts = Vec::with_capacity(matches.len());
        for hit in matches.into_iter().take(self.options.top_k) {
            match hit.metadata {
                Some(metadata) => contexts.push(metadata.text),
                None => warn!(id = %hit.id, "match carried no metadata; skipping"),
            }
        }
        debug!(contexts = contexts.len(), "retrieved contexts");
        Ok(contexts)
    }

    /// Retrieves contexts and renders the grounded prompt without calling the completion model.
    pub async fn prompt_for(&self, question: &str) -> Result<String> {
        let contexts = self.retrieve(question).await?;
        Ok(build_prompt(question.trim(), &contexts))
    }

    /// Answers `question`; the completion text is returned verbatim.
    pub async fn answer(&self, question: &str) -> Result<String> {
        let prompt = self.prompt_for(question).await?;
        let request = CompletionRequest {
            prompt: &prompt,
            model: &self.options.completion_model,
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        };
        let reply = self.completer.complete(&request).await?;
        info!(chars = reply.len(), "answered question");
        Ok(reply)
    }

    async fn embed_question(&self, question: &str) -> Result<Vec<f32>> {
        if let Some(cache) = &self.embedding_cache {
            if let Some(hit) = cache.lock().await.get(question).cloned() {
                debug!("question embedding cache hit");
                return Ok(hit);
            }
        }
        let embedding = self
            .embedder
            .embed(question, &self.options.embedding_model)
            .await?;
        if let Some(cache) = &self.embedding_cache {
            cache.lock().await.put(question.to_string(), embedding.clone());
        }
        Ok(embedding)
    }
}

fn validate_question(question: &str) -> Result<&str> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(RagError::Validation("message must not be empty".into()));
    }
    Ok(trimmed)
}

/// Renders the grounded prompt: instructions, contexts joined by [`CONTEXT_SEPARATOR`], question.
pub fn build_prompt(question: &str, contexts: &[String]) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are an educational assistant. Use the following excerpts to help answer the student’s question.\n\n",
    );
    prompt.push_str("Context:\n");
    prompt.push_str(&contexts.join(CONTEXT_SEPARATOR));
    prompt.push_str("\n\nQuestion: ");
    prompt.push_str(question);
    prompt.push('\n');
    prompt
}
