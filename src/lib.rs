#![warn(missing_docs)]
//! Core library for wikiqa: chunk encyclopedia extracts, embed them into a
//! vector index and answer student questions grounded in what was retrieved.

pub mod chunker;
pub mod completion;
pub mod config;
pub mod content;
pub mod document;
pub mod embedder;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod query;
pub mod records;
pub mod retry;
pub mod server;
pub mod source;
pub mod vector_store;

pub use chunker::{chunk_text, Chunk, Chunker, DEFAULT_CHUNK_MAX_LEN};
pub use completion::{CompletionClient, CompletionRequest};
pub use document::{topic_slug, Document};
pub use embedder::EmbeddingClient;
pub use error::{RagError, Result};
pub use ingest::{FailurePolicy, IngestOptions, IngestReport, IngestionPipeline, TopicFailure};
pub use query::{build_prompt, QueryOptions, QueryService};
pub use records::{record_id, ChunkMetadata, IndexRecord, QueryMatch};
pub use retry::RetryPolicy;
pub use source::{DirectorySource, TextSource, WikipediaSource};
pub use vector_store::{MemoryIndex, TableName, VectorIndex};
