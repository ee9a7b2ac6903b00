//! In-process vector index used by tests and local runs.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::VectorIndex;
use crate::error::{RagError, Result};
use crate::records::{ChunkMetadata, IndexRecord, QueryMatch};

/// Brute-force cosine index held in process memory.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    state: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    dimensions: Option<usize>,
    entries: HashMap<String, StoredVector>,
}

#[derive(Debug)]
struct StoredVector {
    values: Vec<f32>,
    metadata: ChunkMetadata,
}

impl MemoryIndex {
    /// Creates an empty index whose dimensionality is fixed by the first upsert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty index that only accepts `dimensions`-wide vectors.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            state: RwLock::new(MemoryState {
                dimensions: Some(dimensions),
                entries: HashMap::new(),
            }),
        }
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// True when nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Sorted identifiers of every stored record.
    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.read().await.entries.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize> {
        let mut state = self.state.write().await;
        let expected = state
            .dimensions
            .or_else(|| records.first().map(|record| record.values.len()));
        if let Some(width) = expected {
            if width == 0 {
                return Err(RagError::Config("vectors must not be empty".into()));
            }
            if let Some(bad) = records.iter().find(|record| record.values.len() != width) {
                return Err(RagError::Config(format!(
                    "record {} has dimension {}, index expects {}",
                    bad.id,
                    bad.values.len(),
                    width
                )));
            }
            state.dimensions = Some(width);
        }
        for record in records {
            state.entries.insert(
                record.id.clone(),
                StoredVector {
                    values: record.values.clone(),
                    metadata: record.metadata.clone(),
                },
            );
        }
        Ok(records.len())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>> {
        let state = self.state.read().await;
        if let Some(width) = state.dimensions {
            if vector.len() != width {
                return Err(RagError::Config(format!(
                    "query dimension {} does not match index dimension {}",
                    vector.len(),
                    width
                )));
            }
        }
        let mut scored: Vec<(&String, &StoredVector, f32)> = state
            .entries
            .iter()
            .map(|(id, stored)| (id, stored, cosine_similarity(vector, &stored.values)))
            .collect();
        scored.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(id, stored, score)| QueryMatch {
                id: id.clone(),
                score,
                metadata: include_metadata.then(|| stored.metadata.clone()),
            })
            .collect())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
