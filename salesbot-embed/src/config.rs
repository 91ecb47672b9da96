//! Configuration for the query encoder model

use crate::error::{EmbedError, Result};
use derive_builder::Builder;
use fastembed::EmbeddingModel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Model used when nothing else is configured. It matches the model the
/// knowledge base is embedded with offline.
pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Built-in fastembed models this crate knows how to load, with their output
/// dimension.
const KNOWN_MODELS: &[(&str, EmbeddingModel, usize)] = &[
    ("all-minilm-l6-v2", EmbeddingModel::AllMiniLML6V2, 384),
    ("all-minilm-l12-v2", EmbeddingModel::AllMiniLML12V2, 384),
    ("bge-small-en-v1.5", EmbeddingModel::BGESmallENV15, 384),
    ("bge-base-en-v1.5", EmbeddingModel::BGEBaseENV15, 768),
    (
        "snowflake-arctic-embed-xs",
        EmbeddingModel::SnowflakeArcticEmbedXS,
        384,
    ),
];

/// Configuration for the embedding model behind the query encoder
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
#[serde(default)]
pub struct EmbedConfig {
    /// Name of the embedding model (e.g. "all-MiniLM-L6-v2")
    #[builder(default = "DEFAULT_MODEL_NAME.to_string()")]
    pub model_name: String,
    /// Directory where fastembed caches downloaded model files
    #[builder(default = r#"PathBuf::from(".fastembed_cache")"#)]
    pub cache_dir: PathBuf,
    /// Maximum batch size for embedding generation
    #[builder(default = "32")]
    pub batch_size: usize,
    /// Whether to L2-normalize embeddings
    #[builder(default = "true")]
    pub normalize: bool,
    /// Show a progress bar while the model downloads
    #[builder(default = "false")]
    pub show_download_progress: bool,
}

impl EmbedConfig {
    /// Create a new embedding configuration using the builder
    pub fn builder() -> EmbedConfigBuilder {
        EmbedConfigBuilder::default()
    }

    /// Create a configuration for a named model with all other settings defaulted
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    /// Set the batch size for embedding generation (builder style)
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    /// Set whether to normalize embeddings (builder style)
    pub fn with_normalize(self, normalize: bool) -> Self {
        Self { normalize, ..self }
    }

    /// Set the model cache directory (builder style)
    pub fn with_cache_dir<P: AsRef<Path>>(self, cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
            ..self
        }
    }

    /// Get the model name
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Resolve the configured name to a built-in fastembed model.
    ///
    /// Matching ignores ASCII case, so "all-MiniLM-L6-v2" and
    /// "all-minilm-l6-v2" are the same model.
    pub fn fastembed_model(&self) -> Result<EmbeddingModel> {
        self.lookup().map(|(model, _)| model)
    }

    /// Output dimension the configured model is documented to produce
    pub fn expected_dimension(&self) -> Result<usize> {
        self.lookup().map(|(_, dimension)| dimension)
    }

    fn lookup(&self) -> Result<(EmbeddingModel, usize)> {
        let wanted = self.model_name.to_ascii_lowercase();
        KNOWN_MODELS
            .iter()
            .find(|(name, _, _)| *name == wanted)
            .map(|(_, model, dimension)| (model.clone(), *dimension))
            .ok_or_else(|| {
                EmbedError::invalid_config(format!(
                    "Unsupported embedding model '{}'. Supported: {}",
                    self.model_name,
                    KNOWN_MODELS
                        .iter()
                        .map(|(name, _, _)| *name)
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }

    /// Validate the configuration before any model is loaded
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EmbedError::invalid_config("batch_size must be at least 1"));
        }
        self.lookup()?;
        tracing::debug!("Embedding config valid for: {}", self.model_name);
        Ok(())
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        EmbedConfigBuilder::default()
            .build()
            .expect("every EmbedConfig field has a builder default")
    }
}
