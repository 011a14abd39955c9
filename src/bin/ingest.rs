use anyhow::Result;
use clap::Parser;
use ragindex::{Config, IngestionPipeline};
use ragindex::ingest::Recovery;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Ingest new documents into the ragindex vector index (incremental)")]
struct Args {
    /// Config file (default: $RAGINDEX_CONFIG or ./config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", &config.ragindex.log_level)
    ).init();

    log::info!("Starting ragindex ingestion");
    log::info!("Source folder: {}", config.data_dir().display());
    log::info!("State folder: {}", config.state_dir().display());

    let pipeline = IngestionPipeline::from_config(&config)?;

    let start = Instant::now();
    let summary = pipeline.run().await?;

    match &summary.recovery {
        Some(Recovery::RolledForward { files }) => {
            log::info!("Completed interrupted commit of {} file(s)", files.len());
        }
        Some(Recovery::RolledBack { files }) => {
            log::info!("Discarded interrupted commit of {} file(s)", files.len());
        }
        None => {}
    }

    summary.log();
    log::info!("Time: {:?}", start.elapsed());

    if !summary.failed.is_empty() {
        log::warn!("Some files failed to ingest and will be retried next run. Check logs above for details.");
    }

    Ok(())
}
