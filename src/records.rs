//! Shared index record structures exchanged between ingestion, vector indexes and queries.

use serde::{Deserialize, Serialize};

use crate::chunker::Chunk;

/// Metadata stored beside every vector so matches can be traced back to their chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Identifier of the source document.
    pub topic_id: String,
    /// Chunk ordinal within the document.
    pub chunk_index: usize,
    /// Original chunk text used as retrieval context.
    pub text: String,
}

/// Unit persisted in a vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Deterministic identifier, see [`record_id`].
    pub id: String,
    /// Embedding vector.
    pub values: Vec<f32>,
    /// Traceability metadata.
    pub metadata: ChunkMetadata,
}

impl IndexRecord {
    /// Pairs a chunk with its embedding.
    pub fn from_chunk(chunk: Chunk, values: Vec<f32>) -> Self {
        Self {
            id: record_id(&chunk.document_id, chunk.ordinal),
            values,
            metadata: ChunkMetadata {
                topic_id: chunk.document_id,
                chunk_index: chunk.ordinal,
                text: chunk.text,
            },
        }
    }
}

/// Single ranked hit returned by a vector index query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    /// Record identifier.
    pub id: String,
    /// Similarity score; higher is closer.
    pub score: f32,
    /// Stored metadata when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChunkMetadata>,
}

/// Builds `<document>-chunk-<ordinal>`; re-ingesting the same chunk overwrites the same record.
pub fn record_id(document_id: &str, ordinal: usize) -> String {
    format!("{document_id}-chunk-{ordinal}")
}
