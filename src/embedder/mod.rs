//! Embedding capability and its OpenAI-compatible implementation.

use async_trait::async_trait;

use crate::error::{RagError, Result};

pub mod openai;

pub use openai::OpenAiEmbedder;

/// Produces fixed-length vectors for text inputs.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embeds every input with `model`, returning vectors in input order.
    async fn embed_batch(&self, inputs: &[&str], model: &str) -> Result<Vec<Vec<f32>>>;

    /// Embeds a single text.
    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text], model)
            .await?
            .pop()
            .ok_or_else(|| RagError::service("embedding provider returned no vector"))
    }
}
