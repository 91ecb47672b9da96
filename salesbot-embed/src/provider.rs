//! Embedding provider implementations

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use fastembed::{InitOptions, TextEmbedding};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Result of embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// The generated embeddings, one per input text
    pub embeddings: Vec<Vec<f32>>,
    /// The dimension of each embedding vector
    pub dimension: usize,
}

impl EmbeddingResult {
    /// Create a new embedding result.
    ///
    /// The dimension is inferred from the first embedding vector and is 0 when
    /// there are no embeddings.
    pub fn new(embeddings: Vec<Vec<f32>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    /// Returns the number of embedding vectors in this result.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Returns `true` if this result contains no embedding vectors.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Trait for embedding providers that can generate embeddings from text
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let result = self.embed_texts(&[text.to_string()]).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::invalid_config("No embedding generated for text"))
    }

    /// Generate embeddings for multiple texts (batch processing)
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Get the dimension of embeddings produced by this provider
    fn embedding_dimension(&self) -> usize;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;
}

/// Scale a vector to unit L2 length in place. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// FastEmbed-based embedding provider using local ONNX models
#[derive(Clone)]
pub struct FastEmbedProvider {
    config: EmbedConfig,
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("config", &self.config)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedProvider {
    /// Downloads (if needed) and loads the configured model.
    ///
    /// This is the expensive step: it can take seconds and touches the network
    /// on a cold cache. The load runs on a blocking thread so the async runtime
    /// keeps serving other requests meanwhile.
    pub async fn create(config: EmbedConfig) -> Result<Self> {
        config.validate()?;
        let model_kind = config.fastembed_model()?;

        tracing::info!(
            "Initializing FastEmbed provider for model: {}",
            config.model_name()
        );
        std::fs::create_dir_all(&config.cache_dir)?;

        let load_config = config.clone();
        let (model, dimension) =
            tokio::task::spawn_blocking(move || -> Result<(TextEmbedding, usize)> {
                tracing::info!("Loading embedding model: {}", load_config.model_name());

                let init_options = InitOptions::new(model_kind)
                    .with_cache_dir(load_config.cache_dir.clone())
                    .with_show_download_progress(load_config.show_download_progress);

                let mut model =
                    TextEmbedding::try_new(init_options).map_err(EmbedError::model_init)?;

                // Get dimension by generating a probe embedding
                let probe = model
                    .embed(vec!["dimension probe".to_string()], None)
                    .map_err(EmbedError::model_init)?;
                let dimension = probe.first().map(|emb| emb.len()).unwrap_or(0);

                tracing::info!("Model loaded successfully. Dimension: {}", dimension);
                Ok((model, dimension))
            })
            .await??;

        if dimension == 0 {
            return Err(EmbedError::invalid_config(
                "Model validation failed: empty embedding",
            ));
        }
        if let Ok(expected) = config.expected_dimension() {
            if expected != dimension {
                tracing::warn!(
                    "Model {} produced dimension {} (expected {})",
                    config.model_name(),
                    dimension,
                    expected
                );
            }
        }

        Ok(Self {
            config,
            model: Arc::new(Mutex::new(model)),
            dimension,
        })
    }

    /// The configuration this provider was created from
    pub fn config(&self) -> &EmbedConfig {
        &self.config
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.config.batch_size) {
            let chunk = chunk.to_vec();
            let model = Arc::clone(&self.model);

            let batch = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
                let mut model_guard = model
                    .lock()
                    .map_err(|_| EmbedError::invalid_config("Embedding model lock poisoned"))?;
                model_guard
                    .embed(chunk, None)
                    .map_err(EmbedError::embedding_gen)
            })
            .await??;

            all_embeddings.extend(batch);
        }

        for embedding in &mut all_embeddings {
            if embedding.iter().any(|v| !v.is_finite()) {
                return Err(EmbedError::invalid_config(
                    "Model produced non-finite values in embedding",
                ));
            }
            if self.config.normalize {
                l2_normalize(embedding);
            }
        }

        tracing::debug!("Generated {} embeddings", all_embeddings.len());
        Ok(EmbeddingResult::new(all_embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }
}

/// Deterministic in-memory provider for tests and offline demos.
///
/// Known texts map to fixed vectors; everything else gets the fallback vector
/// (or an error when no fallback is set). Every embedded text is recorded in
/// `calls`.
#[derive(Debug, Clone)]
pub struct MockProvider {
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
    fallback: Option<Vec<f32>>,
    fail: bool,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    /// Provider returning `fallback` for every text
    pub fn new(fallback: Vec<f32>) -> Self {
        Self {
            dimension: fallback.len(),
            vectors: HashMap::new(),
            fallback: Some(fallback),
            fail: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Provider whose every call fails with an embedding-generation error
    pub fn failing(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: HashMap::new(),
            fallback: None,
            fail: true,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Return `vector` whenever exactly `text` is embedded
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }

    /// Texts embedded so far, in call order
    pub fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EmbeddingProvider for MockProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.extend(texts.iter().cloned());
        }
        if self.fail {
            return Err(EmbedError::embedding_gen(std::io::Error::other(
                "mock provider configured to fail",
            )));
        }

        let embeddings = texts
            .iter()
            .map(|text| {
                self.vectors
                    .get(text)
                    .or(self.fallback.as_ref())
                    .cloned()
                    .ok_or_else(|| {
                        EmbedError::invalid_config(format!("No mock vector for '{text}'"))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(EmbeddingResult::new(embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_result() {
        let result = EmbeddingResult::new(vec![vec![0.1, 0.2, 0.3], vec![0.4, 0.5, 0.6]]);

        assert_eq!(result.len(), 2);
        assert_eq!(result.dimension, 3);
        assert!(!result.is_empty());
        assert_eq!(EmbeddingResult::new(vec![]).dimension, 0);
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_mock_provider_lookup_and_fallback() {
        let provider = MockProvider::new(vec![0.0, 1.0]).with_vector("pricing", vec![1.0, 0.0]);

        let known = tokio_test::block_on(provider.embed_text("pricing")).unwrap();
        let unknown = tokio_test::block_on(provider.embed_text("anything")).unwrap();

        assert_eq!(known, vec![1.0, 0.0]);
        assert_eq!(unknown, vec![0.0, 1.0]);
        assert_eq!(provider.recorded_calls(), vec!["pricing", "anything"]);
        assert_eq!(provider.embedding_dimension(), 2);
        assert_eq!(provider.provider_name(), "mock");
    }

    #[tokio::test]
    async fn test_failing_mock_provider() {
        let provider = MockProvider::failing(4);
        let err = provider.embed_text("hello").await.unwrap_err();
        assert!(matches!(err, EmbedError::EmbeddingGeneration { .. }));
    }

    #[tokio::test]
    #[ignore] // Downloads the real model - run with: cargo test test_fastembed_real_model -- --ignored
    async fn test_fastembed_real_model() -> Result<()> {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .try_init()
            .ok();

        let cache = tempfile::tempdir()?;
        let provider =
            FastEmbedProvider::create(EmbedConfig::default().with_cache_dir(cache.path())).await?;

        assert_eq!(provider.provider_name(), "fastembed");
        assert_eq!(provider.embedding_dimension(), 384);

        let texts = vec![
            "Warehouse management software tracks inventory.".to_string(),
            "Inventory tracking for warehouses.".to_string(),
            "A recipe for banana bread.".to_string(),
        ];
        let result = provider.embed_texts(&texts).await?;
        assert_eq!(result.len(), 3);

        let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
        let related = dot(&result.embeddings[0], &result.embeddings[1]);
        let unrelated = dot(&result.embeddings[0], &result.embeddings[2]);
        assert!(
            related > unrelated,
            "related {related} should beat unrelated {unrelated}"
        );
        Ok(())
    }
}
