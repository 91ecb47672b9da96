use clap::{Parser, Subcommand};
use salesbot_context::classify_inquiry;
use salesbot_retriever::{
    config::RetrieverConfig,
    retrieval::{RelevanceScorer, RetrievalResult, Retriever, enhancer},
};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use tracing::Level;

/// Query the sales chatbot knowledge base from the command line.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Embedding matrix (.npy or .json), overrides the config file
    #[arg(long)]
    embeddings: Option<PathBuf>,

    /// Chunk metadata (.json), overrides the config file
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Embedding model name, overrides the config file
    #[arg(long)]
    model: Option<String>,

    /// Model cache directory, overrides the config file
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Retrieve the knowledge chunks most relevant to a query
    Search {
        query: String,
        /// Maximum number of results (defaults to the configured top-K)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show knowledge base statistics
    Stats {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Build the prompt context a chat answer would be grounded on
    Context {
        query: String,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Show the query after keyword expansion
    Enhance { query: String },
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Full,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "full" => Ok(OutputFormat::Full),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[derive(Serialize)]
struct KnowledgeBaseStats {
    total_chunks: usize,
    dimension: usize,
    structured_chunks: usize,
    model: String,
    sources: Vec<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Logs go to stderr so JSON output stays parseable.
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn load_config(args: &Args) -> anyhow::Result<RetrieverConfig> {
    let mut config = match &args.config {
        Some(path) => RetrieverConfig::from_toml_file(path)?,
        None => RetrieverConfig::default(),
    };

    if let Some(path) = &args.embeddings {
        config.embeddings_path = path.clone();
    }
    if let Some(path) = &args.metadata {
        config.metadata_path = path.clone();
    }
    if let Some(model) = &args.model {
        config.embedding.model_name = model.clone();
    }
    if let Some(dir) = &args.cache_dir {
        config.embedding.cache_dir = dir.clone();
    }

    config.validate()?;
    Ok(config)
}

fn print_results(results: &[RetrievalResult], format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results)?);
        }
        OutputFormat::Summary => {
            println!("Found {} relevant chunks:", results.len());
            for result in results {
                let preview: String = result.text().chars().take(80).collect();
                println!(
                    "  Relevance: {:.3} | Similarity: {:.3} | Source: {} | {}",
                    result.relevance_score,
                    result.similarity,
                    result.source(),
                    preview.replace('\n', " ")
                );
            }
        }
        OutputFormat::Full => {
            for result in results {
                println!("Relevance: {:.3}", result.relevance_score);
                println!("Similarity: {:.3}", result.similarity);
                println!("Source: {}", result.source());
                if !result.chunk.tags.is_empty() {
                    println!("Tags: {}", result.chunk.tags.join(", "));
                }
                println!("Content:\n{}", result.text());
                println!("---");
            }
        }
    }
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<()> {
    // Needs neither the corpus nor the model.
    if let Commands::Enhance { query } = &args.command {
        println!("{}", enhancer::enhance(query));
        if let Some(category) = enhancer::detect_category(query) {
            tracing::debug!("Matched query category: {}", category.name);
        }
        return Ok(());
    }

    let config = load_config(&args)?;
    let retriever = Retriever::from_config(&config);

    match args.command {
        Commands::Search {
            query,
            top_k,
            format,
        } => {
            let top_k = top_k.unwrap_or(retriever.default_top_k());
            let results = retriever.try_retrieve(&query, top_k).await?;
            print_results(&results, &format)
        }
        Commands::Stats { format } => {
            let store = retriever.store();
            let scorer = RelevanceScorer::new(&config.scoring);
            let stats = KnowledgeBaseStats {
                total_chunks: store.len(),
                dimension: store.dimension(),
                structured_chunks: store
                    .chunks()
                    .iter()
                    .filter(|chunk| scorer.is_structured(&chunk.text))
                    .count(),
                model: config.embedding.model_name.clone(),
                sources: store.sources().into_iter().map(str::to_string).collect(),
            };

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                }
                OutputFormat::Summary | OutputFormat::Full => {
                    println!("Knowledge Base Statistics:");
                    println!("  Total chunks: {}", stats.total_chunks);
                    println!("  Dimension: {}", stats.dimension);
                    println!("  Structured chunks: {}", stats.structured_chunks);
                    println!("  Embedding model: {}", stats.model);
                    println!("  Unique sources: {}", stats.sources.len());

                    let shown = if format == OutputFormat::Full {
                        stats.sources.len()
                    } else {
                        10
                    };
                    for source in stats.sources.iter().take(shown) {
                        println!("    {source}");
                    }
                    if stats.sources.len() > shown {
                        println!("    ... and {} more", stats.sources.len() - shown);
                    }
                }
            }
            Ok(())
        }
        Commands::Context { query, top_k } => {
            let top_k = top_k.unwrap_or(retriever.default_top_k());
            println!("Inquiry: {}", classify_inquiry(&query));
            println!();
            println!("{}", retriever.context(&query, top_k).await);
            Ok(())
        }
        Commands::Enhance { .. } => Ok(()),
    }
}
