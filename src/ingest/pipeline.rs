//! Incremental ingestion run: discover new files, chunk them, embed the
//! chunks into the persistent index and record the files as processed.

use std::path::PathBuf;

use super::loader::DocumentLoader;
use crate::config::Config;
use crate::embeddings::{build_embedder, Embedder};
use crate::error::Result;
use crate::index::VectorIndexManager;
use crate::state::{CommitJournal, PendingCommit, ProcessedFileTracker, RunLock};

/// How an interrupted commit found at startup was resolved
#[derive(Debug, Clone, PartialEq)]
pub enum Recovery {
    /// The index had been fully persisted; its files were marked processed
    RolledForward { files: Vec<String> },
    /// The index was cut back to its pre-commit length; files stay new
    RolledBack { files: Vec<String> },
}

/// Outcome of one ingestion run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub discovered: usize,
    pub ingested: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub empty: Vec<String>,
    pub chunks_added: usize,
    /// Index size after the run; 0 when no index exists
    pub index_len: usize,
    pub recovery: Option<Recovery>,
}

impl RunSummary {
    pub fn log(&self) {
        log::info!("=== Ingestion Complete ===");
        log::info!("New files found: {}", self.discovered);
        log::info!("Files ingested: {}", self.ingested.len());
        log::info!("Chunks added: {}", self.chunks_added);
        log::info!("Index size: {}", self.index_len);
        if !self.empty.is_empty() {
            log::warn!("Files with no text: {}", self.empty.len());
        }
        if !self.failed.is_empty() {
            log::warn!("Files failed: {}", self.failed.len());
            for (filename, reason) in &self.failed {
                log::warn!("  - {}: {}", filename, reason);
            }
        }
    }
}

/// Orchestrates one ingestion run over a source directory
pub struct IngestionPipeline {
    state_dir: PathBuf,
    tracker: ProcessedFileTracker,
    loader: DocumentLoader,
    index_manager: VectorIndexManager,
    journal: CommitJournal,
    embedder: Box<dyn Embedder>,
}

impl IngestionPipeline {
    pub fn new(
        state_dir: impl Into<PathBuf>,
        tracker: ProcessedFileTracker,
        loader: DocumentLoader,
        index_manager: VectorIndexManager,
        journal: CommitJournal,
        embedder: Box<dyn Embedder>,
    ) -> Self {
        Self {
            state_dir: state_dir.into(),
            tracker,
            loader,
            index_manager,
            journal,
            embedder,
        }
    }

    /// Build every component from `config`, including the embedding client
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedder = build_embedder(&config.embeddings)?;
        Ok(Self::with_embedder(config, embedder))
    }

    pub fn with_embedder(config: &Config, embedder: Box<dyn Embedder>) -> Self {
        Self::new(
            config.state_dir(),
            ProcessedFileTracker::from_config(config),
            DocumentLoader::from_config(config),
            VectorIndexManager::from_config(config),
            CommitJournal::new(config.state_dir(), config.index_name()),
            embedder,
        )
    }

    /// Run one ingestion pass.
    ///
    /// Per-file conversion failures are reported in the summary. Embedding
    /// and persistence failures abort the run; in that case nothing new is
    /// recorded as processed.
    pub async fn run(&self) -> Result<RunSummary> {
        let _lock = RunLock::acquire(&self.state_dir)?;

        let recovery = self.recover()?;
        let mut processed = self.tracker.load()?;
        log::info!("{} file(s) already processed", processed.len());

        let new_files = self.loader.discover_new(&processed)?;
        let mut summary = RunSummary {
            discovered: new_files.len(),
            recovery,
            ..RunSummary::default()
        };
        if new_files.is_empty() {
            log::info!("No new files to process in {}", self.loader.source_dir().display());
            summary.index_len = self.index_manager.persisted_lengths()?.0;
            return Ok(summary);
        }
        log::info!("Found {} new file(s)", new_files.len());

        let report = self.loader.load(&new_files);
        summary.failed = report.failed_files();
        summary.empty = report.empty_files();
        if !report.has_chunks() {
            log::warn!("No chunks produced; index and state left unchanged");
            summary.index_len = self.index_manager.persisted_lengths()?.0;
            return Ok(summary);
        }

        let ingested = report.ingested_files();
        let chunks = report.into_chunks();

        let mut index = self.index_manager.open_or_create(self.embedder.as_ref()).await?;
        let base_len = index.len();
        log::info!("Embedding {} chunk(s) with {}", chunks.len(), self.embedder.model_name());
        let added = self
            .index_manager
            .add_chunks(&mut index, chunks, self.embedder.as_ref())
            .await?;

        self.journal
            .begin(&PendingCommit::new(ingested.clone(), base_len, index.len()))?;
        self.index_manager.persist(&index)?;
        processed.extend(ingested.iter().cloned());
        self.tracker.save(&processed)?;
        self.journal.clear()?;

        summary.ingested = ingested;
        summary.chunks_added = added;
        summary.index_len = index.len();
        Ok(summary)
    }

    /// Resolve a commit left unfinished by an interrupted run.
    ///
    /// If the index on disk already holds the commit's entries the commit is
    /// completed; otherwise the index is cut back to its pre-commit length.
    pub fn recover(&self) -> Result<Option<Recovery>> {
        let Some(commit) = self.journal.pending()? else {
            return Ok(None);
        };

        let (vectors, documents) = self.index_manager.persisted_lengths()?;
        let recovery = if vectors == commit.new_len && documents == commit.new_len {
            let mut processed = self.tracker.load()?;
            processed.extend(commit.files.iter().cloned());
            self.tracker.save(&processed)?;
            log::warn!(
                "Recovered interrupted commit: marked {} file(s) processed",
                commit.files.len()
            );
            Recovery::RolledForward { files: commit.files }
        } else {
            if vectors != commit.base_len || documents != commit.base_len {
                self.index_manager.rollback_to(commit.base_len)?;
            }
            log::warn!(
                "Rolled back interrupted commit: index restored to {} entries, {} file(s) will be retried",
                commit.base_len,
                commit.files.len()
            );
            Recovery::RolledBack { files: commit.files }
        };

        self.journal.clear()?;
        Ok(Some(recovery))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::testing::FakeEmbedder;
    use crate::error::RagindexError;
    use crate::index::storage;
    use crate::ingest::Chunk;
    use crate::state::ProcessedFileSet;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        config: Config,
    }

    impl Fixture {
        fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let data_dir = temp_dir.path().join("data");
            fs::create_dir_all(&data_dir).unwrap();
            let config = Config::new(data_dir, temp_dir.path().join("db"));
            Self {
                _temp_dir: temp_dir,
                config,
            }
        }

        fn write_source(&self, name: &str, content: &[u8]) {
            fs::write(self.config.data_dir().join(name), content).unwrap();
        }

        fn pipeline(&self, embedder: FakeEmbedder) -> IngestionPipeline {
            IngestionPipeline::with_embedder(&self.config, Box::new(embedder))
        }

        fn state_path(&self, name: &str) -> std::path::PathBuf {
            self.config.state_dir().join(name)
        }

        fn processed(&self) -> ProcessedFileSet {
            ProcessedFileTracker::from_config(&self.config).load().unwrap()
        }
    }

    fn read_bytes(path: &Path) -> Vec<u8> {
        fs::read(path).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_single_text_file() {
        let fx = Fixture::new();
        fx.write_source(
            "notes.txt",
            b"Ecosystems consist of living and non-living parts.\n\nEnergy flows through trophic levels.",
        );

        let summary = fx.pipeline(FakeEmbedder::new(8)).run().await.unwrap();
        assert_eq!(summary.discovered, 1);
        assert_eq!(summary.ingested, vec!["notes.txt".to_string()]);
        assert_eq!(summary.chunks_added, 1);
        assert_eq!(summary.index_len, 1);

        let index = VectorIndexManager::from_config(&fx.config).load().unwrap().unwrap();
        assert_eq!(index.dim(), 8);
        let (_, chunk) = index.docstore().get_by_position(0).unwrap();
        assert_eq!(chunk.source(), "notes.txt");
        assert_eq!(chunk.page(), "?");
        assert!(chunk.text.contains("trophic levels"));

        let state: Vec<String> = serde_json::from_slice(&read_bytes(&fx.config.state_file())).unwrap();
        assert_eq!(state, vec!["notes.txt".to_string()]);

        // Lock and journal are gone after a clean run
        assert!(!fx.state_path(RunLock::FILE_NAME).exists());
        assert!(!fx.state_path("knowledge_base.pending.json").exists());
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let fx = Fixture::new();
        fx.write_source("a.txt", b"First source document.");
        fx.write_source("b.md", b"# Title\n\nSecond source document.");

        fx.pipeline(FakeEmbedder::new(4)).run().await.unwrap();
        let state_before = read_bytes(&fx.config.state_file());
        let index_before = read_bytes(&fx.state_path("knowledge_base.index"));
        let docstore_before = read_bytes(&fx.state_path("knowledge_base.docstore.json"));

        let embedder = FakeEmbedder::new(4);
        let pipeline = fx.pipeline(embedder);
        let summary = pipeline.run().await.unwrap();
        assert_eq!(summary.discovered, 0);
        assert_eq!(summary.chunks_added, 0);
        assert_eq!(summary.index_len, 2);

        assert_eq!(read_bytes(&fx.config.state_file()), state_before);
        assert_eq!(read_bytes(&fx.state_path("knowledge_base.index")), index_before);
        assert_eq!(read_bytes(&fx.state_path("knowledge_base.docstore.json")), docstore_before);
    }

    #[tokio::test]
    async fn test_failure_isolation() {
        let fx = Fixture::new();
        fx.write_source("a.txt", b"Alpha document about wetlands.");
        fx.write_source("b.pdf", b"this is not a pdf");
        fx.write_source("c.txt", b"Gamma document about deserts.");

        let summary = fx.pipeline(FakeEmbedder::new(4)).run().await.unwrap();
        assert_eq!(summary.ingested, vec!["a.txt".to_string(), "c.txt".to_string()]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "b.pdf");

        let processed = fx.processed();
        assert!(processed.contains("a.txt"));
        assert!(processed.contains("c.txt"));
        assert!(!processed.contains("b.pdf"));

        let index = VectorIndexManager::from_config(&fx.config).load().unwrap().unwrap();
        let sources: Vec<&str> = (0..index.len())
            .map(|i| index.docstore().get_by_position(i).unwrap().1.source())
            .collect();
        assert_eq!(sources, vec!["a.txt", "c.txt"]);

        // The failed file is retried on the next run
        let summary = fx.pipeline(FakeEmbedder::new(4)).run().await.unwrap();
        assert_eq!(summary.discovered, 1);
        assert_eq!(summary.failed[0].0, "b.pdf");
    }

    #[tokio::test]
    async fn test_all_files_fail_no_writes() {
        let fx = Fixture::new();
        fx.write_source("broken.pdf", b"garbage");
        fx.write_source("table.xlsx", b"garbage");

        let summary = fx.pipeline(FakeEmbedder::new(4)).run().await.unwrap();
        assert_eq!(summary.failed.len(), 2);
        assert!(!fx.config.state_file().exists());
        assert!(!VectorIndexManager::from_config(&fx.config).paths().any_exists());
    }

    #[tokio::test]
    async fn test_empty_file_not_marked_processed() {
        let fx = Fixture::new();
        fx.write_source("blank.txt", b"   \n\n  ");
        fx.write_source("real.txt", b"Coral reefs are diverse.");

        let summary = fx.pipeline(FakeEmbedder::new(4)).run().await.unwrap();
        assert_eq!(summary.empty, vec!["blank.txt".to_string()]);
        assert_eq!(summary.ingested, vec!["real.txt".to_string()]);
        assert!(!fx.processed().contains("blank.txt"));
    }

    #[tokio::test]
    async fn test_missing_source_dir_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::new(temp_dir.path().join("nope"), temp_dir.path().join("db"));
        let pipeline = IngestionPipeline::with_embedder(&config, Box::new(FakeEmbedder::new(4)));

        let summary = pipeline.run().await.unwrap();
        assert_eq!(summary.discovered, 0);
        assert!(!config.state_file().exists());
    }

    #[tokio::test]
    async fn test_incremental_run_appends() {
        let fx = Fixture::new();
        fx.write_source("a.txt", b"Alpha.");
        fx.pipeline(FakeEmbedder::new(4)).run().await.unwrap();

        fx.write_source("b.txt", b"Beta.");
        let summary = fx.pipeline(FakeEmbedder::new(4)).run().await.unwrap();
        assert_eq!(summary.ingested, vec!["b.txt".to_string()]);
        assert_eq!(summary.index_len, 2);

        let state: Vec<String> = serde_json::from_slice(&read_bytes(&fx.config.state_file())).unwrap();
        assert_eq!(state, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_embedding_failure_writes_nothing() {
        let fx = Fixture::new();
        fx.write_source("a.txt", b"Alpha document.");
        fx.write_source("b.txt", b"Beta triggers the outage.");

        let err = fx
            .pipeline(FakeEmbedder::failing_on(4, "outage"))
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, RagindexError::Embedding(_)));

        assert!(!fx.config.state_file().exists());
        assert!(!VectorIndexManager::from_config(&fx.config).paths().any_exists());
        assert!(!fx.state_path(RunLock::FILE_NAME).exists());

        // Both files are still new afterwards
        let summary = fx.pipeline(FakeEmbedder::new(4)).run().await.unwrap();
        assert_eq!(summary.ingested.len(), 2);
    }

    #[tokio::test]
    async fn test_run_fails_when_locked() {
        let fx = Fixture::new();
        fx.write_source("a.txt", b"Alpha.");
        let _held = RunLock::acquire(fx.config.state_dir()).unwrap();

        let err = fx.pipeline(FakeEmbedder::new(4)).run().await.unwrap_err();
        assert!(matches!(err, RagindexError::Locked(_)));
        assert!(!fx.config.state_file().exists());
    }

    #[tokio::test]
    async fn test_recover_rolls_forward_persisted_commit() {
        let fx = Fixture::new();
        fx.write_source("a.txt", b"Alpha.");
        fx.pipeline(FakeEmbedder::new(4)).run().await.unwrap();

        // Simulate a crash after persisting the index but before saving state
        let manager = VectorIndexManager::from_config(&fx.config);
        let mut index = manager.load().unwrap().unwrap();
        let embedder = FakeEmbedder::new(4);
        manager
            .add_chunks(&mut index, vec![Chunk::new("Beta.", "b.txt", "?")], &embedder)
            .await
            .unwrap();
        let journal = CommitJournal::new(fx.config.state_dir(), fx.config.index_name());
        journal
            .begin(&PendingCommit::new(vec!["b.txt".to_string()], 1, 2))
            .unwrap();
        manager.persist(&index).unwrap();
        fx.write_source("b.txt", b"Beta.");

        let pipeline = fx.pipeline(FakeEmbedder::new(4));
        let summary = pipeline.run().await.unwrap();
        assert_eq!(
            summary.recovery,
            Some(Recovery::RolledForward {
                files: vec!["b.txt".to_string()]
            })
        );
        // b.txt is not embedded a second time
        assert_eq!(summary.discovered, 0);
        assert_eq!(summary.index_len, 2);
        assert!(fx.processed().contains("b.txt"));
        assert!(journal.pending().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recover_rolls_back_partial_commit() {
        let fx = Fixture::new();
        fx.write_source("a.txt", b"Alpha.");
        fx.pipeline(FakeEmbedder::new(4)).run().await.unwrap();

        // Crash after writing the vector file but before the document store
        let manager = VectorIndexManager::from_config(&fx.config);
        let mut index = manager.load().unwrap().unwrap();
        manager
            .add_chunks(&mut index, vec![Chunk::new("Beta.", "b.txt", "?")], &FakeEmbedder::new(4))
            .await
            .unwrap();
        let journal = CommitJournal::new(fx.config.state_dir(), fx.config.index_name());
        journal
            .begin(&PendingCommit::new(vec!["b.txt".to_string()], 1, 2))
            .unwrap();
        storage::write_vectors(&manager.paths().vectors, index.vectors()).unwrap();
        assert_eq!(manager.persisted_lengths().unwrap(), (2, 1));
        fx.write_source("b.txt", b"Beta.");

        let pipeline = fx.pipeline(FakeEmbedder::new(4));
        let recovery = pipeline.recover().unwrap();
        assert_eq!(
            recovery,
            Some(Recovery::RolledBack {
                files: vec!["b.txt".to_string()]
            })
        );
        assert_eq!(manager.persisted_lengths().unwrap(), (1, 1));
        assert!(!fx.processed().contains("b.txt"));
        assert!(journal.pending().unwrap().is_none());

        // The rolled-back file is ingested normally afterwards
        let summary = pipeline.run().await.unwrap();
        assert_eq!(summary.ingested, vec!["b.txt".to_string()]);
        assert_eq!(summary.index_len, 2);
    }

    #[tokio::test]
    async fn test_recover_rolls_back_first_commit_to_cold_start() {
        let fx = Fixture::new();
        let manager = VectorIndexManager::from_config(&fx.config);
        let embedder = FakeEmbedder::new(4);
        let mut index = manager.open_or_create(&embedder).await.unwrap();
        manager
            .add_chunks(&mut index, vec![Chunk::new("Alpha.", "a.txt", "?")], &embedder)
            .await
            .unwrap();
        let journal = CommitJournal::new(fx.config.state_dir(), fx.config.index_name());
        journal
            .begin(&PendingCommit::new(vec!["a.txt".to_string()], 0, 1))
            .unwrap();
        storage::write_vectors(&manager.paths().vectors, index.vectors()).unwrap();

        let recovery = fx.pipeline(FakeEmbedder::new(4)).recover().unwrap();
        assert!(matches!(recovery, Some(Recovery::RolledBack { .. })));
        assert!(!manager.paths().any_exists());
    }

    #[tokio::test]
    async fn test_recover_without_journal() {
        let fx = Fixture::new();
        assert!(fx.pipeline(FakeEmbedder::new(4)).recover().unwrap().is_none());
    }
}
