//! Storage layer for the pre-embedded knowledge base.
//!
//! The offline ingestion pipeline writes two index-aligned resources: a
//! numeric matrix with one embedding per chunk (`embeddings.npy`) and a JSON
//! array with one metadata record per chunk (`metadata.json`). This module
//! loads both once at startup and never writes to them.
//!
//! ## Key Components
//!
//! - **EmbeddingStore**: the loaded corpus (matrix + records), read-only
//! - **EmbeddingMatrix**: contiguous row-major vectors with cached norms
//! - **ChunkRecord**: typed metadata for one chunk, validated at load time
//! - **npy**: reader/writer for the NumPy array format
//!
//! ## Failure policy
//!
//! [`EmbeddingStore::load`] never fails. A missing file, a parse error or a
//! matrix whose row count differs from the record count all produce the empty
//! corpus plus a warning, so the chatbot keeps answering without grounding.
//! [`EmbeddingStore::try_load`] reports the reason as a [`StoreError`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

pub mod matrix;
pub mod npy;
pub mod store;

pub use matrix::{EmbeddingMatrix, MatrixError};
pub use store::EmbeddingStore;

/// Metadata for one chunk of ingested knowledge.
///
/// `source` is taken from the first present of `source`, `source_url` and
/// `source_file`. Fields the ingestion pipeline adds beyond these (chunk
/// numbers, page titles, ...) are kept in `extra` and serialized back flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawChunkRecord")]
pub struct ChunkRecord {
    pub text: String,
    pub source: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChunkRecord {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            tags: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Shape of a metadata record as written by the ingestion pipeline.
#[derive(Deserialize)]
struct RawChunkRecord {
    text: String,
    source: Option<String>,
    source_url: Option<String>,
    source_file: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<RawChunkRecord> for ChunkRecord {
    type Error = String;

    fn try_from(raw: RawChunkRecord) -> Result<Self, Self::Error> {
        let RawChunkRecord {
            text,
            source,
            source_url,
            source_file,
            tags,
            mut extra,
        } = raw;

        let non_empty = |s: &Option<String>| s.as_deref().is_some_and(|s| !s.trim().is_empty());
        let chosen = [&source, &source_url, &source_file]
            .into_iter()
            .find(|s| non_empty(s))
            .and_then(|s| s.clone())
            .ok_or_else(|| {
                "record has no `source`, `source_url` or `source_file`".to_string()
            })?;

        // Scores belong to a retrieval, not to the chunk; a stale pair would
        // be serialized twice next to the live ones.
        extra.remove("similarity");
        extra.remove("relevance_score");

        // Keep the pipeline's own field names visible to callers.
        for (key, value) in [("source_url", source_url), ("source_file", source_file)] {
            if let Some(value) = value {
                extra.insert(key.to_string(), Value::String(value));
            }
        }

        Ok(ChunkRecord {
            text,
            source: chosen,
            tags,
            extra,
        })
    }
}

/// Why the knowledge base could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// File absent or unreadable
    #[error("Knowledge base resource missing or unreadable: {}: {source}", path.display())]
    ResourceMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File present but its contents are not what the loader expects
    #[error("Malformed knowledge base resource {}: {reason}", path.display())]
    MalformedResource { path: PathBuf, reason: String },

    /// Matrix rows and metadata records do not line up
    #[error("Embedding matrix has {vectors} rows but metadata has {records} records")]
    Misaligned { vectors: usize, records: usize },
}
