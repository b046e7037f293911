//! Fixed-size word chunking.

use crate::models::{DEFAULT_CHUNK_SIZE, IndexingConfig};

/// Splits text into consecutive, non-overlapping windows of words.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    /// Words per chunk.
    chunk_size: usize,
}

impl TextChunker {
    /// Create a new text chunker with the given configuration.
    pub fn new(config: &IndexingConfig) -> Self {
        Self::with_chunk_size(config.chunk_size)
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Create a chunker with default settings.
    pub fn with_defaults() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Split `text` on whitespace and re-join every `chunk_size` words with single spaces.
    ///
    /// The last chunk may be shorter. Empty or whitespace-only text yields no chunks.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        words
            .chunks(self.chunk_size)
            .map(|window| window.join(" "))
            .collect()
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::with_defaults()
    }
}
