use chrono::Utc;
use clap::{Parser, Subcommand};
use docrag_core::{
    CharacterNgramEmbedder, ChunkingOptions, Embedder, KnowledgePipeline, PipelineConfig,
    QdrantStore, RemoteEmbedder,
};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docrag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Qdrant base URL
    #[arg(long, env = "DOCRAG_QDRANT_URL", default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Qdrant collection name
    #[arg(long, env = "DOCRAG_COLLECTION", default_value = "docrag_chunks")]
    collection: String,

    /// Embedding endpoint URL; when omitted the deterministic local
    /// character-ngram embedder is used instead
    #[arg(long, env = "DOCRAG_EMBED_ENDPOINT")]
    embed_endpoint: Option<String>,

    /// Embedding API key (required by most hosted endpoints)
    #[arg(long, env = "DOCRAG_EMBED_API_KEY")]
    embed_api_key: Option<String>,

    /// Embedding model name
    #[arg(long, env = "DOCRAG_EMBED_MODEL", default_value = "text-embedding-3-small")]
    embed_model: String,

    /// Embedding vector dimensions for the remote provider
    #[arg(long, env = "DOCRAG_EMBED_DIMENSIONS", default_value = "1536")]
    embed_dimensions: usize,

    /// Maximum chunk size in characters
    #[arg(long, default_value = "800")]
    chunk_size: usize,

    /// Overlap between adjacent chunks in characters
    #[arg(long, default_value = "160")]
    chunk_overlap: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest the given documents: extract, chunk, embed, and upsert.
    Build {
        /// PDF/TXT files to ingest
        paths: Vec<PathBuf>,
        /// Folder to scan recursively for supported documents
        #[arg(long)]
        folder: Option<PathBuf>,
    },
    /// Retrieve the k most similar chunks for a query.
    Query {
        query: String,
        /// Number of results to return (clamped to 1..=20)
        #[arg(long, default_value = "5")]
        top_k: usize,
        /// Include distance scores in the output
        #[arg(long, default_value_t = false)]
        with_scores: bool,
    },
    /// Add free text directly to the store (conclusions, notes).
    AddText {
        text: String,
        /// Label recorded as the entry's source
        #[arg(long, default_value = "manual_entry")]
        source: String,
    },
    /// Report whether the collection exists and how many chunks it holds.
    Info,
}

fn build_embedder(cli: &Cli) -> Box<dyn Embedder> {
    match &cli.embed_endpoint {
        Some(endpoint) => Box::new(RemoteEmbedder::new(
            endpoint,
            &cli.embed_model,
            cli.embed_api_key.clone(),
            cli.embed_dimensions,
        )),
        None => Box::new(CharacterNgramEmbedder::default()),
    }
}

/// Tool-facing boundary: every pipeline failure becomes a status/message
/// object on stdout instead of an escaping error.
fn fail(message: impl ToString) -> ! {
    println!(
        "{}",
        json!({ "status": "error", "message": message.to_string() })
    );
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let store = match QdrantStore::new(&cli.qdrant_url, &cli.collection) {
        Ok(store) => store,
        Err(error) => fail(format!("invalid qdrant url: {error}")),
    };
    let embedder = build_embedder(&cli);

    info!(
        collection = %cli.collection,
        started_at = %Utc::now().to_rfc3339(),
        "docrag boot"
    );

    match cli.command {
        Command::Build { mut paths, folder } => {
            if let Some(folder) = folder {
                paths.extend(docrag_core::discover_documents(&folder));
            }

            let mut pipeline = KnowledgePipeline::new(
                embedder,
                store,
                PipelineConfig {
                    document_paths: paths,
                    chunking: ChunkingOptions::new(cli.chunk_size, cli.chunk_overlap),
                },
            );

            match pipeline.build_and_upsert().await {
                Ok(report) => {
                    for skipped in &report.skipped {
                        println!(
                            "{}",
                            json!({
                                "status": "skipped",
                                "path": skipped.path.display().to_string(),
                                "reason": skipped.reason,
                            })
                        );
                    }
                    println!(
                        "{}",
                        json!({
                            "status": "success",
                            "documents": report.documents.to_string(),
                            "chunks": report.chunks.to_string(),
                            "finished_at": report.finished_at.to_rfc3339(),
                        })
                    );
                }
                Err(error) => fail(error),
            }
        }
        Command::Query {
            query,
            top_k,
            with_scores,
        } => {
            let pipeline = KnowledgePipeline::new(
                embedder,
                store,
                PipelineConfig {
                    chunking: ChunkingOptions::new(cli.chunk_size, cli.chunk_overlap),
                    ..Default::default()
                },
            );

            let result = if with_scores {
                pipeline.query_with_scores(&query, top_k).await
            } else {
                pipeline.query(&query, top_k).await
            };

            match result {
                Ok(hits) => println!("{}", serde_json::to_string_pretty(&hits)?),
                Err(error) => fail(error),
            }
        }
        Command::AddText { text, source } => {
            let pipeline = KnowledgePipeline::new(
                embedder,
                store,
                PipelineConfig {
                    chunking: ChunkingOptions::new(cli.chunk_size, cli.chunk_overlap),
                    ..Default::default()
                },
            );

            match pipeline.add_text(&text, &source).await {
                Ok(report) => println!(
                    "{}",
                    json!({
                        "status": "success",
                        "message": format!(
                            "Added {} chunk(s) from '{}'",
                            report.chunks_added, report.source
                        ),
                        "chunks_added": report.chunks_added.to_string(),
                        "source": report.source,
                    })
                ),
                Err(error) => fail(error),
            }
        }
        Command::Info => {
            let pipeline = KnowledgePipeline::new(embedder, store, PipelineConfig::default());

            match pipeline.get_info().await {
                Ok(info) => println!("{}", serde_json::to_string_pretty(&info)?),
                Err(error) => fail(error),
            }
        }
    }

    Ok(())
}
