//! Query-time retrieval: enhance, encode, rank, rescore.
//!
//! ```text
//! query → enhancer → QueryEncoder → ranker (top-K over the store) → scorer → results
//! ```
//!
//! [`Retriever`] composes the stages. Each stage is also usable on its own.

use crate::storage::ChunkRecord;
use salesbot_context::ContextEntry;
use serde::Serialize;

pub mod enhancer;
pub mod ranker;
pub mod retriever;
pub mod scorer;

pub use enhancer::enhance;
pub use ranker::{RankError, RankedCandidate, rank};
pub use retriever::{DEFAULT_TOP_K, RetrievalError, Retriever};
pub use scorer::{RelevanceScorer, ScoringConfig};

/// A retrieved chunk with both of its scores.
///
/// Serializes flat: the chunk's own fields followed by `similarity` and
/// `relevance_score`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    #[serde(flatten)]
    pub chunk: ChunkRecord,
    /// Raw cosine similarity, in [-1, 1]
    pub similarity: f32,
    /// Similarity after boosts; unbounded above
    pub relevance_score: f32,
    /// Position of the chunk in the store
    #[serde(skip)]
    pub index: usize,
}

impl RetrievalResult {
    pub fn text(&self) -> &str {
        &self.chunk.text
    }

    pub fn source(&self) -> &str {
        &self.chunk.source
    }
}

impl From<&RetrievalResult> for ContextEntry {
    fn from(result: &RetrievalResult) -> Self {
        ContextEntry {
            text: result.chunk.text.clone(),
            source: result.chunk.source.clone(),
            relevance_score: result.relevance_score,
        }
    }
}
