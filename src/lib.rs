pub mod config;
pub mod embeddings;
pub mod error;
pub mod index;
pub mod ingest;
pub mod state;

pub use config::Config;
pub use error::{RagindexError, Result};
pub use index::{SearchHit, VectorIndex, VectorIndexManager};
pub use ingest::{IngestionPipeline, RunSummary};
