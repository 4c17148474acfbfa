use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::info;

use ollama_rag::chunking::DEFAULT_MAX_CHUNK_CHARS;
use ollama_rag::document::Document;
use ollama_rag::ollama::{OllamaClient, OllamaConfig};
use ollama_rag::rag::{IndexingReport, RagEngine};
use ollama_rag::search::SearchResult;
use ollama_rag::store::VectorStore;

/// Retrieval-augmented question answering over local PDF and text documents,
/// backed by a locally hosted Ollama model.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding the persisted index
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index documents, replacing any previously indexed batch
    Index {
        /// Documents to index (PDF or plain text)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Maximum chunk size in characters
        #[arg(long, default_value_t = DEFAULT_MAX_CHUNK_CHARS)]
        chunk_size: usize,
    },

    /// Ask a single question against the indexed documents
    Ask {
        question: String,

        /// Maximum chunks retrieved per document
        #[arg(long, default_value_t = 2)]
        top_k: usize,
    },

    /// Interactive question loop
    Chat {
        /// Maximum chunks retrieved per document
        #[arg(long, default_value_t = 2)]
        top_k: usize,
    },

    /// Summarize all indexed documents
    Summarize,

    /// Show index statistics
    Stats,

    /// Delete the persisted index
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let store = VectorStore::new(&cli.data_dir);

    match cli.command {
        Command::Stats => {
            let stats = store.stats().context("Failed to read index")?;
            println!("Documents:  {}", stats.documents);
            println!("Chunks:     {}", stats.chunks);
            println!("Dimensions: {}", stats.dimensions);
            return Ok(());
        }
        Command::Clear => {
            store.clear().context("Failed to clear index")?;
            println!("Index cleared.");
            return Ok(());
        }
        _ => {}
    }

    // Everything below needs the model.
    let config = OllamaConfig::from_env();
    let client = OllamaClient::new(config);
    if !client.is_available().await {
        bail!(
            "Ollama is not reachable at {}. Start it with `ollama serve` and \
             make sure the configured models are pulled.",
            client.config().url
        );
    }

    match cli.command {
        Command::Index { files, chunk_size } => {
            for file in &files {
                if !file.exists() {
                    bail!("File not found: {}", file.display());
                }
            }

            let documents = files
                .iter()
                .map(Document::from_file)
                .collect::<ollama_rag::error::Result<Vec<_>>>()
                .context("Failed to read documents")?;

            let engine = RagEngine::new(store, client).with_chunk_size(chunk_size);
            let report = engine
                .index_documents(&documents)
                .await
                .context("Failed to index documents")?;
            print_report(&report);
        }

        Command::Ask { question, top_k } => {
            let engine = RagEngine::new(store, client);
            let results = engine
                .search(&question, top_k)
                .await
                .context("Search failed")?;
            if results.is_empty() {
                println!("No relevant information found.");
                return Ok(());
            }

            let answer = engine
                .answer(&question, &results)
                .await
                .context("Failed to generate answer")?;
            println!("{}\n", answer);
            print_sources(&results);
        }

        Command::Chat { top_k } => {
            let engine = RagEngine::new(store, client);
            engine
                .run_query_loop(top_k)
                .await
                .context("Error in query loop")?;
        }

        Command::Summarize => {
            let engine = RagEngine::new(store, client);
            match engine.summarize().await {
                Ok(summary) => println!("{}", summary),
                Err(ollama_rag::error::RagError::IndexNotFound) => {
                    println!("Nothing indexed yet. Run the index command first.");
                }
                Err(e) => return Err(e).context("Failed to summarize"),
            }
        }

        Command::Stats | Command::Clear => unreachable!("handled above"),
    }

    Ok(())
}

fn print_report(report: &IndexingReport) {
    info!("Indexing run finished");
    println!(
        "Indexed {} of {} documents ({} chunks).",
        report.documents_indexed(),
        report.documents_total,
        report.chunks_indexed
    );
    for skipped in &report.skipped {
        println!("  skipped {}: {}", skipped.file, skipped.reason);
    }
}

fn print_sources(results: &[SearchResult]) {
    println!("Sources:");
    for result in results {
        println!(
            "  {} ({:.1}%): {}",
            result.file,
            result.score * 100.0,
            result.snippet(80)
        );
    }
}
