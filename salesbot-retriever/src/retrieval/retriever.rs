use super::enhancer::enhance;
use super::ranker::{RankError, rank};
use super::scorer::{RelevanceScorer, ScoringConfig, sort_by_relevance};
use super::RetrievalResult;
use crate::config::RetrieverConfig;
use crate::storage::EmbeddingStore;
use salesbot_context::{ContextEntry, build_context};
use salesbot_embed::{EmbedError, QueryEncoder};
use std::sync::Arc;
use tracing::{debug, warn};

/// Results returned when the caller does not ask for a specific count
pub const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Query encoding failed: {0}")]
    Encoding(#[from] EmbedError),

    #[error("Ranking failed: {0}")]
    Rank(#[from] RankError),
}

/// Turns visitor questions into ranked knowledge snippets.
///
/// Cheap to share: wrap in an `Arc` and call from any number of request
/// handlers. The store is read-only and the encoder loads its model at most
/// once, on the first query that needs it.
#[derive(Debug)]
pub struct Retriever {
    store: Arc<EmbeddingStore>,
    encoder: Arc<QueryEncoder>,
    scorer: RelevanceScorer,
    default_top_k: usize,
}

impl Retriever {
    pub fn new(store: Arc<EmbeddingStore>, encoder: Arc<QueryEncoder>) -> Self {
        Self {
            store,
            encoder,
            scorer: RelevanceScorer::default(),
            default_top_k: DEFAULT_TOP_K,
        }
    }

    /// Load the store and prepare (but do not load) the encoder described by `config`.
    pub fn from_config(config: &RetrieverConfig) -> Self {
        let store = EmbeddingStore::load(&config.embeddings_path, &config.metadata_path);
        let encoder = QueryEncoder::fastembed(config.embedding.clone());
        Self::new(Arc::new(store), Arc::new(encoder))
            .with_scoring(&config.scoring)
            .with_default_top_k(config.default_top_k)
    }

    pub fn with_scoring(mut self, scoring: &ScoringConfig) -> Self {
        self.scorer = RelevanceScorer::new(scoring);
        self
    }

    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }

    pub fn encoder(&self) -> &QueryEncoder {
        &self.encoder
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// [`Retriever::retrieve`] with the default result count.
    pub async fn search(&self, query: &str) -> Vec<RetrievalResult> {
        self.retrieve(query, self.default_top_k).await
    }

    /// Up to `top_k` chunks relevant to `query`, most relevant first.
    ///
    /// Never fails: any error is logged and yields no results, which callers
    /// treat as "answer without grounding".
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Vec<RetrievalResult> {
        match self.try_retrieve(query, top_k).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Retrieval failed, answering without context: {e}");
                Vec::new()
            }
        }
    }

    /// Like [`Retriever::retrieve`], but reports why retrieval failed.
    pub async fn try_retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        // Nothing can match; don't pay for a model load.
        if self.store.is_empty() || top_k == 0 {
            debug!("Knowledge base is empty or no results requested");
            return Ok(Vec::new());
        }

        let enhanced = enhance(query);
        debug!("Enhanced query: {enhanced:?}");

        let vector = self.encoder.encode(&enhanced).await?;
        let candidates = rank(&vector, self.store.matrix(), top_k)?;

        let mut results: Vec<RetrievalResult> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let chunk = self.store.chunk(candidate.index)?.clone();
                let relevance_score = self.scorer.score(&chunk.text, candidate.similarity, query);
                Some(RetrievalResult {
                    chunk,
                    similarity: candidate.similarity,
                    relevance_score,
                    index: candidate.index,
                })
            })
            .collect();
        sort_by_relevance(&mut results, |r| r.relevance_score);

        debug!("Found {} relevant knowledge chunks", results.len());
        Ok(results)
    }

    /// Retrieve and render the prompt context block for `query`.
    pub async fn context(&self, query: &str, top_k: usize) -> String {
        let results = self.retrieve(query, top_k).await;
        let entries: Vec<ContextEntry> = results.iter().map(ContextEntry::from).collect();
        build_context(&entries)
    }
}
