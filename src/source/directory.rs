//! Topic markdown read from a local content root.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::TextSource;
use crate::document::topic_slug;
use crate::error::{RagError, Result};

const CONTENT_EXTENSION: &str = "md";

/// Reads topic markdown from a content root.
///
/// A topic resolves to `<root>/<slug>.md` or `<root>/<slug>/<slug>.md`, the
/// second being the layout written by content generation.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Creates a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Content root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path where content generation stores `topic`.
    pub fn topic_path(&self, topic: &str) -> PathBuf {
        let slug = topic_slug(topic);
        self.root
            .join(&slug)
            .join(format!("{slug}.{CONTENT_EXTENSION}"))
    }

    /// Lists topic slugs found in either layout, sorted and de-duplicated.
    pub async fn list_topics(&self) -> Result<Vec<String>> {
        let mut topics = BTreeSet::new();
        let mut entries = fs::read_dir(&self.root).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                RagError::NotFound(format!("content root {}", self.root.display()))
            } else {
                RagError::Io(err)
            }
        })?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_file() && has_content_extension(&path) {
                if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                    topics.insert(stem.to_string());
                }
            } else if file_type.is_dir() {
                if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                    let nested = path.join(format!("{name}.{CONTENT_EXTENSION}"));
                    if fs::metadata(&nested).await.is_ok_and(|meta| meta.is_file()) {
                        topics.insert(name.to_string());
                    }
                }
            }
        }
        Ok(topics.into_iter().collect())
    }

    /// Exact listed names first, then the slugged forms.
    fn candidates(&self, topic: &str) -> Vec<PathBuf> {
        let name = topic.trim();
        let slug = topic_slug(topic);
        let mut paths = Vec::with_capacity(4);
        let plain_name = !name.contains(['/', '\\']) && name != "..";
        if plain_name {
            paths.push(self.root.join(format!("{name}.{CONTENT_EXTENSION}")));
        }
        paths.push(self.root.join(format!("{slug}.{CONTENT_EXTENSION}")));
        if plain_name {
            paths.push(self.root.join(name).join(format!("{name}.{CONTENT_EXTENSION}")));
        }
        paths.push(self.topic_path(topic));
        paths.dedup();
        paths
    }
}

#[async_trait]
impl TextSource for DirectorySource {
    async fn fetch(&self, topic: &str) -> Result<String> {
        if topic.trim().is_empty() {
            return Err(RagError::Validation("topic must not be empty".into()));
        }
        for path in self.candidates(topic) {
            match fs::read_to_string(&path).await {
                Ok(text) => return Ok(text),
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(RagError::Io(err)),
            }
        }
        Err(RagError::NotFound(format!(
            "no content for topic '{topic}' under {}",
            self.root.display()
        )))
    }
}

fn has_content_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(CONTENT_EXTENSION))
}
