use anyhow::Result;
use clap::Parser;
use ragindex::index::storage;
use ragindex::state::{CommitJournal, ProcessedFileTracker};
use ragindex::{Config, VectorIndexManager};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stats")]
#[command(about = "Show the state of a ragindex vector index")]
struct Args {
    /// Config file (default: $RAGINDEX_CONFIG or ./config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", &config.ragindex.log_level)
    ).init();

    println!("\n=== ragindex Statistics ===\n");
    println!("State folder: {}", config.state_dir().display());

    let manager = VectorIndexManager::from_config(&config);
    let paths = manager.paths();
    if paths.vectors.exists() {
        let vectors = storage::read_vectors(&paths.vectors)?;
        println!("Vectors: {}", vectors.len());
        println!("Dimension: {}", vectors.dim());
    } else {
        println!("Vectors: 0 (no index yet)");
    }
    if paths.docstore.exists() {
        let docstore = storage::read_docstore(&paths.docstore)?;
        println!("Documents: {}", docstore.len());
    }

    let processed = ProcessedFileTracker::from_config(&config).load()?;
    println!("Processed files: {}", processed.len());
    for filename in processed.iter() {
        println!("  - {}", filename);
    }

    let journal = CommitJournal::new(config.state_dir(), config.index_name());
    match journal.pending()? {
        Some(commit) => println!(
            "\nPending commit: {} file(s), index {} -> {}, started {} (resolved on next ingest)",
            commit.files.len(),
            commit.base_len,
            commit.new_len,
            commit.started_at.to_rfc3339()
        ),
        None => println!("\nPending commit: none"),
    }

    Ok(())
}
