//! salesbot-retriever: semantic retrieval for a product sales chatbot
//!
//! Turns a visitor's question into a ranked set of knowledge snippets from a
//! pre-embedded corpus. Vector similarity narrows the corpus to a few
//! candidates; cheap text heuristics then reorder them.
//!
//! ## Key Modules
//!
//! - **[`storage`]**: loading the embedding matrix and chunk metadata
//! - **[`retrieval`]**: query enhancement, ranking, rescoring and the [`retrieval::Retriever`] facade
//! - **[`config`]**: TOML-backed configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use salesbot_retriever::{config::RetrieverConfig, retrieval::Retriever};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let retriever = Arc::new(Retriever::from_config(&RetrieverConfig::default()));
//!
//! for result in retriever.retrieve("How much does it cost?", 5).await {
//!     println!("{:.2} {}", result.relevance_score, result.source());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! embeddings.npy + metadata.json → EmbeddingStore ─┐
//!                                                  ↓
//! query → enhance → QueryEncoder → rank (top-K) → rescore → results → context
//! ```
//!
//! Retrieval never fails from the caller's point of view: missing files give
//! an empty corpus and query-time errors give an empty result list, both
//! logged through `tracing`.

pub mod config;
pub mod retrieval;
pub mod storage;
