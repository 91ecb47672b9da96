use clap::Parser;
use salesbot_context::{ContextBuilder, ContextEntry, classify_inquiry};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};

/// Build the answer-generator context from retrieval results (a JSON array of
/// objects with `text`, `source` and `relevance_score`).
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON results file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Visitor message, used to report the inquiry kind.
    #[arg(short, long)]
    query: Option<String>,

    /// Emit JSON instead of the plain context block.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ContextOutput<'a> {
    inquiry: Option<&'a str>,
    entries: usize,
    context: String,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let raw = if let Some(input_path) = args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let entries: Vec<ContextEntry> = serde_json::from_str(&raw)?;
    let context = ContextBuilder::default().build(&entries);
    let inquiry = args.query.as_deref().map(|q| classify_inquiry(q).as_str());

    if args.json {
        let output = ContextOutput {
            inquiry,
            entries: entries.len(),
            context,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        if let Some(kind) = inquiry {
            println!("Inquiry: {kind}\n");
        }
        println!("{context}");
    }

    Ok(())
}
