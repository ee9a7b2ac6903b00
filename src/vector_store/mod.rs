//! Vector index capability and its Pinecone, pgvector and in-memory backends.

use async_trait::async_trait;

use crate::error::Result;
use crate::records::{IndexRecord, QueryMatch};

mod memory;
mod pinecone;
mod postgres;

pub use memory::MemoryIndex;
pub use pinecone::PineconeIndex;
pub use postgres::{PgVectorIndex, TableName};

/// Stores embedded chunks and answers nearest-neighbour queries.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Inserts or overwrites records keyed by id; returns the number written.
    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize>;

    /// Returns up to `top_k` matches ordered by descending similarity.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>>;
}
