#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use wikiqa::{
    CompletionClient, CompletionRequest, EmbeddingClient, IndexRecord, QueryMatch, RagError,
    Result, TextSource, VectorIndex,
};

/// Deterministic 4-wide vector derived from the text itself.
pub fn text_vector(text: &str) -> Vec<f32> {
    let bytes = text.as_bytes();
    let sum: u32 = bytes.iter().map(|b| u32::from(*b)).sum();
    vec![
        text.chars().count() as f32,
        (sum % 97) as f32,
        bytes.first().copied().unwrap_or_default() as f32,
        1.0,
    ]
}

/// Embedder returning [`text_vector`]; earlier calls can be made to finish later.
#[derive(Default)]
pub struct FakeEmbedder {
    calls: AtomicUsize,
    staggered: bool,
    fail_on: Option<String>,
    pub batches: Mutex<Vec<Vec<String>>>,
    pub models: Mutex<Vec<String>>,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each successive call sleeps less than the previous one.
    pub fn staggered() -> Self {
        Self {
            staggered: true,
            ..Self::default()
        }
    }

    /// Fails any batch containing `needle`.
    pub fn failing_on(needle: &str) -> Self {
        Self {
            fail_on: Some(needle.to_string()),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingClient for FakeEmbedder {
    async fn embed_batch(&self, inputs: &[&str], model: &str) -> Result<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.batches
            .lock()
            .unwrap()
            .push(inputs.iter().map(|s| s.to_string()).collect());
        self.models.lock().unwrap().push(model.to_string());
        if self.staggered {
            let wait = 40u64.saturating_sub(call as u64 * 5);
            tokio::time::sleep(Duration::from_millis(wait)).await;
        }
        if let Some(needle) = &self.fail_on {
            if inputs.iter().any(|input| input.contains(needle.as_str())) {
                return Err(RagError::RateLimited("embedding quota exhausted".into()));
            }
        }
        Ok(inputs.iter().map(|input| text_vector(input)).collect())
    }
}

/// Source backed by a fixed topic -> text map.
pub struct MapSource {
    pages: HashMap<String, String>,
}

impl MapSource {
    pub fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(topic, text)| (topic.to_string(), text.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl TextSource for MapSource {
    async fn fetch(&self, topic: &str) -> Result<String> {
        self.pages
            .get(topic)
            .cloned()
            .ok_or_else(|| RagError::NotFound(format!("Page not found: {topic}")))
    }
}

/// Index that records every upsert call and answers queries from a script.
#[derive(Default)]
pub struct RecordingIndex {
    pub upserts: Mutex<Vec<Vec<IndexRecord>>>,
    pub queries: Mutex<Vec<(Vec<f32>, usize, bool)>>,
    scripted: Vec<QueryMatch>,
}

impl RecordingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(matches: Vec<QueryMatch>) -> Self {
        Self {
            scripted: matches,
            ..Self::default()
        }
    }

    pub fn upserted(&self) -> Vec<IndexRecord> {
        self.upserts.lock().unwrap().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl VectorIndex for RecordingIndex {
    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize> {
        self.upserts.lock().unwrap().push(records.to_vec());
        Ok(records.len())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>> {
        self.queries
            .lock()
            .unwrap()
            .push((vector.to_vec(), top_k, include_metadata));
        Ok(self.scripted.clone())
    }
}

/// Completer that replies with a fixed answer and keeps every prompt it saw.
pub struct RecordingCompleter {
    reply: std::result::Result<String, String>,
    pub prompts: Mutex<Vec<String>>,
    pub temperatures: Mutex<Vec<f32>>,
}

impl RecordingCompleter {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
            temperatures: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with a retryable service error.
    pub fn unavailable(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
            temperatures: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionClient for RecordingCompleter {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        self.prompts.lock().unwrap().push(request.prompt.to_string());
        self.temperatures.lock().unwrap().push(request.temperature);
        match &self.reply {
            Ok(reply) => Ok(reply.clone()),
            Err(message) => Err(RagError::transient(message.clone())),
        }
    }
}
