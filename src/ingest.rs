//! Ingestion pipeline: source documents -> chunks -> embeddings -> index records.

use std::sync::Arc;

use clap::ValueEnum;
use futures_util::{stream, StreamExt, TryStreamExt};
use tracing::{debug, error, info};

use crate::chunker::{Chunk, Chunker, DEFAULT_CHUNK_MAX_LEN};
use crate::document::Document;
use crate::embedder::EmbeddingClient;
use crate::error::{RagError, Result};
use crate::records::IndexRecord;
use crate::source::TextSource;
use crate::vector_store::VectorIndex;

/// Default embedding model used at ingestion and query time.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// What to do when a single document fails to ingest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum FailurePolicy {
    /// Log the failure, record it in the report and move on.
    #[default]
    Continue,
    /// Stop at the first failing document and return its error.
    FailFast,
}

/// Tunables for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Maximum chunk length in characters.
    pub chunk_max_len: usize,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Chunk texts sent per embedding request.
    pub embed_batch_size: usize,
    /// Embedding requests in flight per document.
    pub embed_concurrency: usize,
    /// Per-document failure handling.
    pub failure_policy: FailurePolicy,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunk_max_len: DEFAULT_CHUNK_MAX_LEN,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embed_batch_size: 1,
            embed_concurrency: 1,
            failure_policy: FailurePolicy::Continue,
        }
    }
}

/// A topic that could not be processed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFailure {
    /// Topic as requested.
    pub topic: String,
    /// Rendered error message.
    pub error: String,
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Documents fully chunked, embedded and upserted (including empty ones).
    pub documents_processed: usize,
    /// Records acknowledged by the vector index.
    pub chunks_upserted: usize,
    /// Documents skipped under [`FailurePolicy::Continue`].
    pub failures: Vec<TopicFailure>,
}

/// Chunks, embeds and upserts documents into a vector index.
pub struct IngestionPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    chunker: Chunker,
    options: IngestOptions,
}

impl IngestionPipeline {
    /// Wires the pipeline to its embedding and index capabilities.
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        options: IngestOptions,
    ) -> Self {
        Self {
            embedder,
            index,
            chunker: Chunker::new(options.chunk_max_len),
            options,
        }
    }

    /// Active options.
    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Fetches each topic from `source` and ingests it, one document at a time.
    pub async fn ingest<S>(&self, source: &S, topics: &[String]) -> Result<IngestReport>
    where
        S: TextSource + ?Sized,
    {
        let mut report = IngestReport::default();
        for topic in topics {
            let outcome = match source.document(topic).await {
                Ok(document) => self.ingest_document(&document).await,
                Err(err) => Err(err),
            };
            self.record(&mut report, topic, outcome)?;
        }
        info!(
            documents = report.documents_processed,
            chunks = report.chunks_upserted,
            failures = report.failures.len(),
            "ingestion finished"
        );
        Ok(report)
    }

    /// Ingests already-fetched documents.
    pub async fn ingest_documents(&self, documents: &[Document]) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        for document in documents {
            let outcome = self.ingest_document(document).await;
            self.record(&mut report, document.title(), outcome)?;
        }
        info!(
            documents = report.documents_processed,
            chunks = report.chunks_upserted,
            failures = report.failures.len(),
            "ingestion finished"
        );
        Ok(report)
    }

    /// Chunks, embeds and upserts one document; returns the records written.
    pub async fn ingest_document(&self, document: &Document) -> Result<usize> {
        info!(topic = %document.title(), id = %document.id(), "ingesting document");
        let chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            info!(topic = %document.title(), "document produced no chunks");
            return Ok(0);
        }
        debug!(topic = %document.title(), chunks = chunks.len(), "document chunked");
        let vectors = self.embed_chunks(&chunks).await?;
        let records: Vec<IndexRecord> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, values)| IndexRecord::from_chunk(chunk, values))
            .collect();
        let written = self.index.upsert(&records).await?;
        info!(topic = %document.title(), upserted = written, "document upserted");
        Ok(written)
    }

    /// Embeds chunk texts in batches with bounded concurrency; results keep chunk order.
    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let model = self.options.embedding_model.as_str();
        let batches: Vec<Vec<&str>> = chunks
            .chunks(self.options.embed_batch_size.max(1))
            .map(|batch| batch.iter().map(|chunk| chunk.text.as_str()).collect())
            .collect();
        let embedded: Vec<Vec<Vec<f32>>> = stream::iter(batches.iter())
            .map(|batch| self.embedder.embed_batch(batch, model))
            .buffered(self.options.embed_concurrency.max(1))
            .try_collect()
            .await?;
        let vectors: Vec<Vec<f32>> = embedded.into_iter().flatten().collect();
        if vectors.len() != chunks.len() {
            return Err(RagError::service(format!(
                "embedding provider returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }
        Ok(vectors)
    }

    fn record(
        &self,
        report: &mut IngestReport,
        topic: &str,
        outcome: Result<usize>,
    ) -> Result<()> {
        match outcome {
            Ok(written) => {
                report.documents_processed += 1;
                report.chunks_upserted += written;
                Ok(())
            }
            Err(err) => {
                error!(topic, error = %err, "failed to ingest document");
                if self.options.failure_policy == FailurePolicy::FailFast {
                    return Err(err);
                }
                report.failures.push(TopicFailure {
                    topic: topic.to_string(),
                    error: err.to_string(),
                });
                Ok(())
            }
        }
    }
}
