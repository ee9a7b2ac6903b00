//! Text-completion capability plus OpenAI and Anthropic providers.

use async_trait::async_trait;

use crate::error::Result;

mod anthropic;
mod openai;

pub use anthropic::AnthropicCompleter;
pub use openai::OpenAiCompleter;

/// Request envelope shared by the various providers.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    /// Fully assembled prompt.
    pub prompt: &'a str,
    /// Provider model identifier.
    pub model: &'a str,
    /// Sampling temperature.
    pub temperature: f32,
    /// Optional cap on generated tokens.
    pub max_tokens: Option<usize>,
}

/// Trait implemented by concrete LLM providers.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the generated text for `request`.
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String>;
}
