//! # RAG Chat Demo
//!
//! Ingests text files into Qdrant through Ollama embeddings, then answers a
//! question against them.
//!
//! Requires running Ollama and Qdrant instances. Connection settings come
//! from the environment (a `.env` file is honoured), for example:
//!
//! ```text
//! OLLAMA_HOST=http://localhost:11434
//! QDRANT_URL=http://localhost:6334
//! ```
//!
//! Run: `cargo run --example rag_chat -- "How do I test agents?" notes.txt guide.md`

use anyhow::{Context, bail};
use jamai_rag::{ChatRequest, IngestFile, RagConfig, RagPipeline, parse_tags};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(question) = args.next() else {
        bail!("usage: rag_chat <question> [file ...]");
    };

    let config = RagConfig::from_env()?;
    let tenant_id = std::env::var("TENANT_ID").ok();
    let tags = std::env::var("TAGS").map(|raw| parse_tags(&raw)).unwrap_or_default();
    let pipeline = RagPipeline::from_config(config)?;

    let mut files = Vec::new();
    for path in args {
        let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
        files.push(IngestFile::new(path, text));
    }

    if !files.is_empty() {
        let report = pipeline.ingest(&files, tenant_id.as_deref(), &tags).await?;
        println!("Indexed {} chunks from {} files", report.chunks_indexed, report.files_processed);
        for (name, reason) in &report.skipped {
            println!("  skipped {name}: {reason}");
        }
    }

    if let Some(tenant) = tenant_id.as_deref() {
        println!("Tenant {tenant} has {} chunks indexed", pipeline.count_matches(tenant).await?);
    }

    let response = pipeline
        .chat(&ChatRequest {
            query: question,
            tenant_id,
            tags: (!tags.is_empty()).then_some(tags),
            ..Default::default()
        })
        .await?;

    println!("\n{}\n", response.answer);
    for source in &response.sources {
        println!("  [{:.3}] {}", source.score, source.source);
    }

    Ok(())
}
