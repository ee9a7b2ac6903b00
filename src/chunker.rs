//! Word-boundary-aware splitting of document text into bounded chunks.

use crate::document::Document;

/// Default maximum chunk length, in characters.
pub const DEFAULT_CHUNK_MAX_LEN: usize = 1000;

/// Contiguous piece of a document submitted to the embedding model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Identifier of the owning document.
    pub document_id: String,
    /// 0-based position within the document; contiguous with no gaps.
    pub ordinal: usize,
    /// Trimmed, non-empty chunk text.
    pub text: String,
}

/// Splits text into chunks of at most `max_len` characters.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    max_len: usize,
}

impl Chunker {
    /// Builds a chunker; a zero length is clamped to one character.
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len: max_len.max(1),
        }
    }

    /// Configured maximum chunk length in characters.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Splits raw text into trimmed, non-empty pieces.
    ///
    /// Each cut moves back to the nearest whitespace at or before the length
    /// limit when that whitespace lies strictly after the chunk start;
    /// otherwise the cut lands mid-word so progress is guaranteed.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let total = chars.len();
        let byte_at = |pos: usize| chars.get(pos).map(|(byte, _)| *byte).unwrap_or(text.len());

        let mut pieces = Vec::new();
        let mut start = 0usize;
        while start < total {
            let mut end = (start + self.max_len).min(total);
            if end < total {
                if let Some(split) = (start + 1..=end)
                    .rev()
                    .find(|&pos| chars[pos].1.is_whitespace())
                {
                    end = split;
                }
            }
            let piece = text[byte_at(start)..byte_at(end)].trim();
            if !piece.is_empty() {
                pieces.push(piece.to_string());
            }
            start = end;
        }
        pieces
    }

    /// Splits a document and assigns ordinals after empty pieces are dropped.
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        self.split(document.text())
            .into_iter()
            .enumerate()
            .map(|(ordinal, text)| Chunk {
                document_id: document.id().to_string(),
                ordinal,
                text,
            })
            .collect()
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_MAX_LEN)
    }
}

/// Splits `text` with a one-off [`Chunker`].
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    Chunker::new(max_len).split(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "Biology is the scientific study of life. It is a natural science \
        with a broad scope but has several unifying themes that tie it together as a single, \
        coherent field.\n\nFor instance, all organisms are made up of cells that process \
        hereditary information encoded in genes, which can be transmitted to future generations.";

    fn collapse_whitespace(input: &str) -> String {
        input.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn cuts_at_preceding_spaces() {
        assert_eq!(
            chunk_text("The quick brown fox jumps", 10),
            vec!["The quick", "brown fox", "jumps"]
        );
    }

    #[test]
    fn empty_and_blank_inputs_yield_nothing() {
        assert!(chunk_text("", 10).is_empty());
        assert!(chunk_text(" \n\t  ", 2).is_empty());
    }

    #[test]
    fn short_text_is_a_single_trimmed_chunk() {
        assert_eq!(chunk_text("  photosynthesis  ", 1000), vec!["photosynthesis"]);
    }

    #[test]
    fn long_words_are_cut_mid_word() {
        assert_eq!(chunk_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn chunks_respect_length_and_rejoin_to_source() {
        for max_len in [25, 40, 80, 1000] {
            let chunks = chunk_text(SAMPLE, max_len);
            assert!(!chunks.is_empty());
            for chunk in &chunks {
                assert!(!chunk.is_empty());
                assert!(
                    chunk.chars().count() <= max_len,
                    "chunk {chunk:?} exceeds {max_len}"
                );
            }
            assert_eq!(collapse_whitespace(&chunks.join(" ")), collapse_whitespace(SAMPLE));
        }
    }

    #[test]
    fn counts_characters_not_bytes() {
        let chunks = chunk_text("ökologie über älles", 8);
        assert_eq!(chunks, vec!["ökologie", "über", "älles"]);
    }

    #[test]
    fn is_deterministic() {
        assert_eq!(chunk_text(SAMPLE, 33), chunk_text(SAMPLE, 33));
    }

    #[test]
    fn ordinals_are_contiguous() {
        let doc = Document::new("Biology", SAMPLE);
        let chunks = Chunker::new(50).chunk(&doc);
        assert!(chunks.len() > 2);
        for (idx, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.ordinal, idx);
            assert_eq!(chunk.document_id, "biology");
        }
    }

    #[test]
    fn zero_length_is_clamped() {
        assert_eq!(Chunker::new(0).max_len(), 1);
        assert_eq!(chunk_text("ab", 0), vec!["a", "b"]);
    }
}
