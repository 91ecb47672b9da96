//! Retrieval over a small in-memory knowledge base with the real embedding model
//!
//! Embeds a handful of chunks with the same encoder used for queries, builds a
//! store from them and prints what a few visitor questions retrieve. The model
//! is downloaded into a temporary directory on first run.

use anyhow::Result;
use salesbot_context::classify_inquiry;
use salesbot_embed::{EmbedConfig, QueryEncoder};
use salesbot_retriever::{
    retrieval::Retriever,
    storage::{ChunkRecord, EmbeddingStore},
};
use std::sync::Arc;
use tempfile::tempdir;

const KNOWLEDGE: [(&str, &str); 5] = [
    (
        "Key features: automatic invoice capture, three-way matching, approval workflows.",
        "https://example.com/product",
    ),
    (
        "Pricing tiers: Starter at $49/month, Business at $199/month, Enterprise on request.",
        "https://example.com/pricing",
    ),
    (
        "Acme Logistics cut invoice processing time by 60% within three months.",
        "acme_case_study.pdf",
    ),
    (
        "The REST API and native connectors integrate with SAP, Xero and QuickBooks.",
        "https://example.com/integrations",
    ),
    (
        "FAQ: Is my data encrypted? Yes, at rest and in transit.",
        "https://example.com/security",
    ),
];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cache_dir = tempdir()?;
    let encoder = Arc::new(QueryEncoder::fastembed(
        EmbedConfig::default().with_cache_dir(cache_dir.path()),
    ));

    println!("🤖 Embedding {} knowledge chunks...", KNOWLEDGE.len());
    let texts: Vec<String> = KNOWLEDGE.iter().map(|(text, _)| text.to_string()).collect();
    let embedded = encoder.encode_batch(&texts).await?;

    let entries = embedded
        .embeddings
        .into_iter()
        .zip(KNOWLEDGE)
        .map(|(vector, (text, source))| (vector, ChunkRecord::new(text, source)))
        .collect();
    let store = EmbeddingStore::from_entries(entries)?;
    println!("✅ Store ready: {} chunks, dimension {}\n", store.len(), store.dimension());

    let retriever = Retriever::new(Arc::new(store), encoder);

    for question in [
        "How much does it cost?",
        "Does it work with QuickBooks?",
        "Which customers use it?",
    ] {
        println!("❓ {question} ({})", classify_inquiry(question));
        for result in retriever.retrieve(question, 2).await {
            println!(
                "   {:.3} (similarity {:.3})  {}",
                result.relevance_score,
                result.similarity,
                result.source()
            );
        }
        println!();
    }

    Ok(())
}
