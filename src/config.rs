//! Command-line/environment argument groups shared by the binaries.

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, ValueEnum};

use crate::chunker::DEFAULT_CHUNK_MAX_LEN;
use crate::completion::{AnthropicCompleter, CompletionClient, OpenAiCompleter};
use crate::embedder::{EmbeddingClient, OpenAiEmbedder};
use crate::error::{RagError, Result};
use crate::ingest::{FailurePolicy, IngestOptions, DEFAULT_EMBEDDING_MODEL};
use crate::query::{QueryOptions, DEFAULT_ANSWER_TEMPERATURE, DEFAULT_COMPLETION_MODEL, DEFAULT_TOP_K};
use crate::retry::RetryPolicy;
use crate::vector_store::{PgVectorIndex, PineconeIndex, TableName, VectorIndex};

/// Credentials and transport settings for OpenAI-compatible endpoints.
#[derive(Args, Debug, Clone)]
pub struct OpenAiArgs {
    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL for OpenAI-compatible endpoints
    #[arg(long, env = "WIKIQA_OPENAI_BASE", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// Seconds before a provider request times out
    #[arg(long, env = "WIKIQA_HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Attempts per provider call, including the first (1 disables retries)
    #[arg(long, env = "WIKIQA_MAX_ATTEMPTS", default_value_t = 5)]
    pub max_attempts: usize,

    /// Base backoff between retries in milliseconds
    #[arg(long, env = "WIKIQA_RETRY_BASE_MS", default_value_t = 500)]
    pub retry_base_ms: u64,
}

impl OpenAiArgs {
    /// Request timeout, at least one second.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Retry policy for embedding and completion calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.retry_base_ms))
    }

    fn api_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| RagError::Config("OPENAI_API_KEY must be set".into()))
    }
}

/// Embedding model selection.
#[derive(Args, Debug, Clone)]
pub struct EmbeddingArgs {
    /// Embedding model identifier; must match between ingestion and query
    #[arg(long, env = "WIKIQA_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// Optional embedding dimension override
    #[arg(long, env = "WIKIQA_EMBEDDING_DIMENSIONS")]
    pub embedding_dimensions: Option<usize>,
}

impl EmbeddingArgs {
    /// Builds the embedding client.
    pub fn build(&self, openai: &OpenAiArgs) -> Result<Arc<dyn EmbeddingClient>> {
        require_model(&self.embedding_model)?;
        let embedder = OpenAiEmbedder::new(
            openai.api_key()?,
            &openai.openai_base_url,
            self.embedding_dimensions,
            openai.timeout(),
            openai.retry_policy(),
        )?;
        Ok(Arc::new(embedder))
    }
}

/// Completion providers.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Provider {
    /// OpenAI chat completions.
    Openai,
    /// Anthropic messages API.
    Anthropic,
}

/// Completion provider and model selection.
#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    /// Completion provider
    #[arg(long, env = "WIKIQA_LLM_PROVIDER", value_enum, default_value_t = Provider::Openai)]
    pub llm_provider: Provider,

    /// OpenAI chat model
    #[arg(long, env = "WIKIQA_CHAT_MODEL", default_value = DEFAULT_COMPLETION_MODEL)]
    pub chat_model: String,

    /// Anthropic API key (required with --llm-provider anthropic)
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    /// Anthropic model identifier
    #[arg(long, env = "WIKIQA_ANTHROPIC_MODEL", default_value = "claude-3-5-haiku-latest")]
    pub anthropic_model: String,

    /// Base URL for the Anthropic API
    #[arg(long, env = "WIKIQA_ANTHROPIC_BASE", default_value = "https://api.anthropic.com/v1")]
    pub anthropic_base_url: String,
}

impl CompletionArgs {
    /// Model identifier for the selected provider.
    pub fn model(&self) -> &str {
        match self.llm_provider {
            Provider::Openai => &self.chat_model,
            Provider::Anthropic => &self.anthropic_model,
        }
    }

    /// Builds the completion client for the selected provider.
    pub fn build(&self, openai: &OpenAiArgs) -> Result<Arc<dyn CompletionClient>> {
        require_model(self.model())?;
        let client: Arc<dyn CompletionClient> = match self.llm_provider {
            Provider::Openai => Arc::new(OpenAiCompleter::new(
                openai.api_key()?,
                &openai.openai_base_url,
                openai.timeout(),
                openai.retry_policy(),
            )?),
            Provider::Anthropic => Arc::new(AnthropicCompleter::new(
                self.anthropic_api_key.as_deref().unwrap_or_default(),
                &self.anthropic_base_url,
                openai.timeout(),
                openai.retry_policy(),
            )?),
        };
        Ok(client)
    }
}

/// Vector index backends.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum IndexBackend {
    /// Pinecone serverless/pod index over REST.
    Pinecone,
    /// Postgres table with the pgvector extension.
    Pgvector,
}

/// Vector index selection and connection settings.
#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    /// Vector index backend
    #[arg(long, env = "WIKIQA_INDEX_BACKEND", value_enum, default_value_t = IndexBackend::Pinecone)]
    pub index_backend: IndexBackend,

    /// Pinecone API key
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pub pinecone_api_key: Option<String>,

    /// Pinecone index host (from the index's connection details)
    #[arg(long, env = "PINECONE_INDEX_HOST")]
    pub pinecone_host: Option<String>,

    /// Optional Pinecone namespace
    #[arg(long, env = "PINECONE_NAMESPACE")]
    pub pinecone_namespace: Option<String>,

    /// Postgres connection string (postgres://...)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Schema for the pgvector table
    #[arg(long, env = "WIKIQA_PG_SCHEMA", default_value = "public")]
    pub pg_schema: String,

    /// Table storing embedded chunks
    #[arg(long, env = "WIKIQA_PG_TABLE", default_value = "study_chunks")]
    pub pg_table: String,
}

impl IndexArgs {
    /// Connects to the selected backend. `prepare_table` creates the pgvector
    /// table on first write and is ignored by Pinecone.
    pub async fn build(&self, timeout: Duration, prepare_table: bool) -> Result<Arc<dyn VectorIndex>> {
        match self.index_backend {
            IndexBackend::Pinecone => {
                let api_key = self
                    .pinecone_api_key
                    .as_deref()
                    .ok_or_else(|| RagError::Config("PINECONE_API_KEY must be set".into()))?;
                let host = self
                    .pinecone_host
                    .as_deref()
                    .ok_or_else(|| RagError::Config("PINECONE_INDEX_HOST must be set".into()))?;
                let index = PineconeIndex::new(api_key, host, self.pinecone_namespace.clone(), timeout)?;
                Ok(Arc::new(index))
            }
            IndexBackend::Pgvector => {
                let url = self
                    .database_url
                    .as_deref()
                    .ok_or_else(|| RagError::Config("DATABASE_URL must be set".into()))?;
                let table = TableName::new(self.pg_schema.clone(), self.pg_table.clone())?;
                let index = PgVectorIndex::connect(url, table, prepare_table).await?;
                Ok(Arc::new(index))
            }
        }
    }
}

/// Chunking, batching and failure handling for ingestion.
#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    /// Maximum chunk length in characters
    #[arg(long, env = "WIKIQA_CHUNK_MAX_LEN", default_value_t = DEFAULT_CHUNK_MAX_LEN)]
    pub chunk_max_len: usize,

    /// Chunk texts per embedding request
    #[arg(long, env = "WIKIQA_EMBED_BATCH", default_value_t = 1)]
    pub embed_batch_size: usize,

    /// Embedding requests in flight per document
    #[arg(long, env = "WIKIQA_EMBED_CONCURRENCY", default_value_t = 1)]
    pub embed_concurrency: usize,

    /// What to do when one document fails
    #[arg(long, env = "WIKIQA_FAILURE_POLICY", value_enum, default_value_t = FailurePolicy::Continue)]
    pub failure_policy: FailurePolicy,
}

impl IngestArgs {
    /// Converts the parsed flags into pipeline options.
    pub fn options(&self, embedding: &EmbeddingArgs) -> IngestOptions {
        IngestOptions {
            chunk_max_len: self.chunk_max_len.max(1),
            embedding_model: embedding.embedding_model.clone(),
            embed_batch_size: self.embed_batch_size.max(1),
            embed_concurrency: self.embed_concurrency.max(1),
            failure_policy: self.failure_policy,
        }
    }
}

/// Retrieval and answer-generation settings.
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Contexts retrieved per question
    #[arg(long, env = "WIKIQA_TOP_K", default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Sampling temperature for answers
    #[arg(long, env = "WIKIQA_TEMPERATURE", default_value_t = DEFAULT_ANSWER_TEMPERATURE)]
    pub temperature: f32,

    /// Optional cap on answer tokens
    #[arg(long, env = "WIKIQA_MAX_TOKENS")]
    pub max_tokens: Option<usize>,

    /// Max cached question embeddings kept in memory (0 disables caching)
    #[arg(long, env = "WIKIQA_EMBEDDING_CACHE", default_value_t = 256)]
    pub embedding_cache_size: usize,
}

impl QueryArgs {
    /// Converts the parsed flags into query options.
    pub fn options(&self, embedding: &EmbeddingArgs, completion: &CompletionArgs) -> QueryOptions {
        QueryOptions {
            top_k: self.top_k.max(1),
            embedding_model: embedding.embedding_model.clone(),
            completion_model: completion.model().to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

fn require_model(model: &str) -> Result<()> {
    if model.trim().is_empty() {
        return Err(RagError::Config("model identifier must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        openai: OpenAiArgs,
        #[command(flatten)]
        embedding: EmbeddingArgs,
        #[command(flatten)]
        completion: CompletionArgs,
        #[command(flatten)]
        ingest: IngestArgs,
        #[command(flatten)]
        query: QueryArgs,
    }

    #[test]
    fn defaults_match_documented_values() {
        let cli = TestCli::parse_from(["test"]);
        let ingest = cli.ingest.options(&cli.embedding);
        assert_eq!(ingest.chunk_max_len, 1000);
        assert_eq!(ingest.embed_concurrency, 1);
        assert_eq!(ingest.failure_policy, FailurePolicy::Continue);

        let query = cli.query.options(&cli.embedding, &cli.completion);
        assert_eq!(query.top_k, 3);
        assert_eq!(query.embedding_model, "text-embedding-3-small");
        assert_eq!(query.completion_model, "gpt-4o-mini");
        assert_eq!(query.temperature, 0.2);
    }

    #[test]
    fn anthropic_provider_selects_its_model() {
        let cli = TestCli::parse_from([
            "test",
            "--llm-provider",
            "anthropic",
            "--anthropic-model",
            "claude-test",
            "--failure-policy",
            "fail-fast",
        ]);
        assert_eq!(cli.completion.model(), "claude-test");
        assert_eq!(cli.ingest.failure_policy, FailurePolicy::FailFast);
    }

    #[test]
    fn blank_models_are_rejected() {
        assert!(require_model("  ").is_err());
        assert!(require_model("gpt-4o-mini").is_ok());
    }
}
