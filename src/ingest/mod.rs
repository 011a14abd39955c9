pub mod chunker;
pub mod convert;
pub mod loader;
pub mod metadata;
pub mod pipeline;
pub mod walker;

pub use chunker::{estimate_tokens, DocChunk, HybridChunker};
pub use convert::{ConverterRegistry, DocumentConverter, StructuredDocument};
pub use loader::{DocumentLoader, FileOutcome, LoadReport};
pub use metadata::{page_locator, Chunk, ChunkMetadata, UNKNOWN_PAGE};
pub use pipeline::{IngestionPipeline, Recovery, RunSummary};
pub use walker::{discover_new, list_source_files};
