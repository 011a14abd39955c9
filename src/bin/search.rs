use anyhow::Result;
use clap::Parser;
use ragindex::{Config, VectorIndexManager};
use ragindex::embeddings::build_embedder;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "search")]
#[command(about = "Find the chunks nearest to a query in the ragindex vector index")]
struct Args {
    /// Query text
    query: String,

    /// Number of results
    #[arg(short, default_value_t = 3)]
    k: usize,

    /// Config file (default: $RAGINDEX_CONFIG or ./config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if args.query.trim().is_empty() {
        anyhow::bail!("Query cannot be empty");
    }

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "warn")
    ).init();

    let manager = VectorIndexManager::from_config(&config);
    let index = manager.load()?.ok_or_else(|| {
        anyhow::anyhow!(
            "No index found in {}. Run `ingest` first.",
            config.state_dir().display()
        )
    })?;

    let embedder = build_embedder(&config.embeddings)?;

    let start = Instant::now();
    let hits = manager
        .similarity_search(&index, embedder.as_ref(), &args.query, args.k)
        .await?;
    let elapsed = start.elapsed();

    println!("\nQuery: {}", args.query);
    println!("Results: {} (of {} chunks, {:?})\n", hits.len(), index.len(), elapsed);

    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "{}. {} (page {}) [distance: {:.4}]",
            rank + 1,
            hit.chunk.source(),
            hit.chunk.page(),
            hit.distance
        );
        let preview: String = hit.chunk.text.chars().take(200).collect();
        println!("   {}", preview.replace('\n', " "));
        if hit.chunk.text.chars().count() > 200 {
            println!("   ...");
        }
        println!();
    }

    Ok(())
}
