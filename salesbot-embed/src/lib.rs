//! # salesbot-embed
//!
//! Turns visitor queries into vectors in the same space as the pre-embedded
//! knowledge base. Models run locally through FastEmbed (ONNX), so answering a
//! question never calls an external embedding API.
//!
//! ## Quick Start
//!
//! ```no_run
//! use salesbot_embed::{EmbedConfig, QueryEncoder};
//!
//! # async fn example() -> salesbot_embed::Result<()> {
//! // Nothing is loaded yet; the model is fetched on the first encode.
//! let encoder = QueryEncoder::fastembed(EmbedConfig::default());
//!
//! let vector = encoder.encode("what does the warehouse module cost?").await?;
//! println!("dimension {}", vector.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`config`]: model selection and batching options
//! - [`provider`]: the [`EmbeddingProvider`] trait, the FastEmbed implementation
//!   and a deterministic mock
//! - [`encoder`]: [`QueryEncoder`], the lazily loaded, load-once front end
//! - [`error`]: error types and result handling
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`] using the crate's [`EmbedError`] type.

pub mod config;
pub mod encoder;
pub mod error;
pub mod provider;

// Re-export main types for easy access
pub use config::{DEFAULT_MODEL_NAME, EmbedConfig};
pub use encoder::{ProviderLoader, QueryEncoder};
pub use error::{EmbedError, Result};
pub use provider::{
    EmbeddingProvider, EmbeddingResult, FastEmbedProvider, MockProvider, l2_normalize,
};
