//! Source documents and the identifiers derived from their topics.

/// A named unit of source text fetched for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    id: String,
    title: String,
    text: String,
}

impl Document {
    /// Builds a document, deriving its identifier from the topic title.
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            id: topic_slug(&title),
            title,
            text: text.into(),
        }
    }

    /// Stable identifier used as the record-id prefix.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Topic title as requested from the source.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Full document text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Lowercases a topic and replaces whitespace runs with `_` ("Organic Chemistry" -> `organic_chemistry`).
pub fn topic_slug(topic: &str) -> String {
    topic
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_topics() {
        assert_eq!(topic_slug("Biology"), "biology");
        assert_eq!(topic_slug("  Organic   Chemistry "), "organic_chemistry");
        assert_eq!(topic_slug("already_slugged"), "already_slugged");
    }

    #[test]
    fn document_id_follows_title() {
        let doc = Document::new("World History", "text");
        assert_eq!(doc.id(), "world_history");
        assert_eq!(doc.title(), "World History");
    }
}
