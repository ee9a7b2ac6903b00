//! Text sources that supply document bodies for topics.

use async_trait::async_trait;

use crate::document::Document;
use crate::error::Result;

mod directory;
mod wikipedia;

pub use directory::DirectorySource;
pub use wikipedia::WikipediaSource;

/// Fetches the raw text for a topic identifier.
#[async_trait]
pub trait TextSource: Send + Sync {
    /// Returns the topic's text, or `RagError::NotFound` when the topic does not exist.
    async fn fetch(&self, topic: &str) -> Result<String>;

    /// Fetches a topic and wraps it as a [`Document`].
    async fn document(&self, topic: &str) -> Result<Document> {
        let text = self.fetch(topic).await?;
        Ok(Document::new(topic, text))
    }
}
