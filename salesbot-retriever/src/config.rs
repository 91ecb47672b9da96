//! Retriever configuration, loadable from TOML.
//!
//! ```toml
//! embeddings_path = "embeddings/embeddings.npy"
//! metadata_path = "embeddings/metadata.json"
//! default_top_k = 5
//!
//! [scoring]
//! structure_boost = 1.3
//! query_match_boost = 1.2
//! structural_markers = ["key features:", "benefits:", "pricing tiers:", "faq:"]
//!
//! [embedding]
//! model_name = "all-MiniLM-L6-v2"
//! cache_dir = ".fastembed_cache"
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above.

use crate::retrieval::{DEFAULT_TOP_K, ScoringConfig};
use salesbot_embed::EmbedConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_EMBEDDINGS_PATH: &str = "embeddings/embeddings.npy";
pub const DEFAULT_METADATA_PATH: &str = "embeddings/metadata.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Everything needed to build a [`crate::retrieval::Retriever`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    /// Embedding matrix written by the ingestion pipeline (`.npy` or `.json`)
    pub embeddings_path: PathBuf,
    /// Chunk metadata, one record per matrix row
    pub metadata_path: PathBuf,
    /// Results returned by `Retriever::search`
    pub default_top_k: usize,
    pub scoring: ScoringConfig,
    pub embedding: EmbedConfig,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            embeddings_path: PathBuf::from(DEFAULT_EMBEDDINGS_PATH),
            metadata_path: PathBuf::from(DEFAULT_METADATA_PATH),
            default_top_k: DEFAULT_TOP_K,
            scoring: ScoringConfig::default(),
            embedding: EmbedConfig::default(),
        }
    }
}

impl RetrieverConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn with_embeddings_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.embeddings_path = path.as_ref().to_path_buf();
        self
    }

    pub fn with_metadata_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.metadata_path = path.as_ref().to_path_buf();
        self
    }

    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_embedding(mut self, embedding: EmbedConfig) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_top_k == 0 {
            return Err(ConfigError::Invalid(
                "default_top_k must be at least 1".to_string(),
            ));
        }
        self.scoring.validate().map_err(ConfigError::Invalid)?;
        self.embedding
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}
