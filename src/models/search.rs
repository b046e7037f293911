//! Retrieval results.

use serde::{Deserialize, Serialize};

/// A single nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Cosine similarity to the query vector.
    pub score: f32,

    /// Chunk text stored in the point payload.
    pub text: String,
}

impl SearchHit {
    pub fn new(score: f32, text: impl Into<String>) -> Self {
        Self {
            score,
            text: text.into(),
        }
    }
}

/// Separator placed between retrieved chunks when they are handed to an LLM.
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Join hit texts into the context block of a prompt.
pub fn join_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| h.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}
