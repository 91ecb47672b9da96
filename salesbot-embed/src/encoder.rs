//! Lazily initialised query encoder.
//!
//! Loading an embedding model costs seconds, so the process starts without
//! one. The first `encode` call runs the configured [`ProviderLoader`]; every
//! caller that arrives while that load is in flight waits for the same load
//! instead of starting its own. Once a load succeeds the provider is kept for
//! the lifetime of the encoder. A failed load is not remembered, so the next
//! caller tries again.
//!
//! The encoder is an ordinary value: construct one, wrap it in an `Arc`, and
//! hand it to whatever needs vectors.

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingResult, FastEmbedProvider};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

/// Something that can produce a ready-to-use embedding provider.
#[async_trait]
pub trait ProviderLoader: Send + Sync {
    /// Perform the (possibly expensive) load
    async fn load(&self) -> Result<Arc<dyn EmbeddingProvider>>;

    /// Short description used in log lines
    fn describe(&self) -> String;
}

#[async_trait]
impl ProviderLoader for EmbedConfig {
    async fn load(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        let provider = FastEmbedProvider::create(self.clone()).await?;
        Ok(Arc::new(provider))
    }

    fn describe(&self) -> String {
        format!("fastembed:{}", self.model_name())
    }
}

/// Loader handing out a provider that already exists.
struct ReadyLoader(Arc<dyn EmbeddingProvider>);

#[async_trait]
impl ProviderLoader for ReadyLoader {
    async fn load(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        Ok(Arc::clone(&self.0))
    }

    fn describe(&self) -> String {
        self.0.provider_name().to_string()
    }
}

/// Maps query text into the embedding space, loading the model on first use.
pub struct QueryEncoder {
    loader: Box<dyn ProviderLoader>,
    provider: OnceCell<Arc<dyn EmbeddingProvider>>,
}

impl std::fmt::Debug for QueryEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEncoder")
            .field("loader", &self.loader.describe())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl QueryEncoder {
    /// Encoder that will run `loader` on first use
    pub fn new(loader: impl ProviderLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            provider: OnceCell::new(),
        }
    }

    /// Encoder backed by a fastembed model described by `config`
    pub fn fastembed(config: EmbedConfig) -> Self {
        Self::new(config)
    }

    /// Encoder wrapping an existing provider
    pub fn from_provider(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::new(ReadyLoader(provider))
    }

    /// Whether the underlying model has been loaded yet
    pub fn is_loaded(&self) -> bool {
        self.provider.initialized()
    }

    /// Dimension of the loaded model, `None` before first use
    pub fn dimension(&self) -> Option<usize> {
        self.provider.get().map(|p| p.embedding_dimension())
    }

    /// Get the provider, loading it if this is the first call.
    pub async fn provider(&self) -> Result<&Arc<dyn EmbeddingProvider>> {
        self.provider
            .get_or_try_init(|| async {
                let description = self.loader.describe();
                tracing::info!("Loading query encoder model ({})", description);
                let started = Instant::now();

                let provider = self.loader.load().await.inspect_err(|e| {
                    tracing::error!("Query encoder load failed ({}): {}", description, e);
                })?;

                tracing::info!(
                    "Query encoder ready ({}, dimension {}) in {:.2}s",
                    description,
                    provider.embedding_dimension(),
                    started.elapsed().as_secs_f64()
                );
                Ok::<_, EmbedError>(provider)
            })
            .await
    }

    /// Encode one text into a vector
    pub async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        self.provider().await?.embed_text(text).await
    }

    /// Encode several texts in one batch
    pub async fn encode_batch(&self, texts: &[String]) -> Result<EmbeddingResult> {
        self.provider().await?.embed_texts(texts).await
    }
}
