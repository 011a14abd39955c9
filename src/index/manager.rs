use std::path::Path;

use super::storage::{self, IndexPaths};
use super::{SearchHit, VectorIndex};
use crate::config::Config;
use crate::embeddings::Embedder;
use crate::error::{RagindexError, Result};
use crate::ingest::Chunk;
use crate::state::remove_if_exists;

/// Owns the persisted index artifacts under the state directory
pub struct VectorIndexManager {
    paths: IndexPaths,
    probe_text: String,
}

impl VectorIndexManager {
    pub fn new(state_dir: &Path, index_name: &str, probe_text: &str) -> Self {
        Self {
            paths: IndexPaths::new(state_dir, index_name),
            probe_text: probe_text.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.state_dir(), config.index_name(), &config.embeddings.probe_text)
    }

    pub fn paths(&self) -> &IndexPaths {
        &self.paths
    }

    /// Load the persisted index, if any
    pub fn load(&self) -> Result<Option<VectorIndex>> {
        storage::load_index(&self.paths)
    }

    /// Load the persisted index, or create an empty one whose dimension is
    /// learned by embedding the probe text
    pub async fn open_or_create(&self, embedder: &dyn Embedder) -> Result<VectorIndex> {
        if let Some(index) = self.load()? {
            log::info!(
                "Loaded index from {} ({} vectors, dim {})",
                self.paths.vectors.display(),
                index.len(),
                index.dim()
            );
            return Ok(index);
        }

        let probe = embedder.embed_query(&self.probe_text).await?;
        log::info!("Creating new index (dim {} from {})", probe.len(), embedder.model_name());
        VectorIndex::new(probe.len())
    }

    /// Embed and append chunks, returning how many were added
    ///
    /// The index is untouched if embedding fails or any vector has the wrong
    /// dimension.
    pub async fn add_chunks(
        &self,
        index: &mut VectorIndex,
        chunks: Vec<Chunk>,
        embedder: &dyn Embedder,
    ) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        let ids = index.append(chunks, embeddings)?;
        log::debug!("Appended {} chunk(s), index now {}", ids.len(), index.len());
        Ok(ids.len())
    }

    /// Replace both artifacts with `index`
    pub fn persist(&self, index: &VectorIndex) -> Result<()> {
        storage::save_index(&self.paths, index)?;
        log::debug!("Persisted index ({} vectors) to {}", index.len(), self.paths.vectors.display());
        Ok(())
    }

    /// Entry counts of the vector file and the document store as found on
    /// disk, each 0 when missing. They differ only after an interrupted commit.
    pub fn persisted_lengths(&self) -> Result<(usize, usize)> {
        let vectors = if self.paths.vectors.exists() {
            storage::read_vectors(&self.paths.vectors)?.len()
        } else {
            0
        };
        let documents = if self.paths.docstore.exists() {
            storage::read_docstore(&self.paths.docstore)?.len()
        } else {
            0
        };
        Ok((vectors, documents))
    }

    /// Cut both artifacts back to their first `len` entries.
    ///
    /// `len == 0` removes the artifacts, restoring a cold start.
    pub fn rollback_to(&self, len: usize) -> Result<()> {
        if len == 0 {
            remove_if_exists(&self.paths.vectors)?;
            remove_if_exists(&self.paths.docstore)?;
            return Ok(());
        }

        let mut vectors = storage::read_vectors(&self.paths.vectors)?;
        let mut docstore = storage::read_docstore(&self.paths.docstore)?;
        if vectors.len() < len || docstore.len() < len {
            return Err(RagindexError::Index(format!(
                "cannot roll back to {} entries: found {} vectors and {} documents",
                len,
                vectors.len(),
                docstore.len()
            )));
        }

        vectors.truncate(len);
        docstore.truncate(len);
        let index = VectorIndex::from_parts(vectors, docstore)?;
        self.persist(&index)
    }

    /// Embed `query` and return the `k` nearest chunks
    pub async fn similarity_search(
        &self,
        index: &VectorIndex,
        embedder: &dyn Embedder,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(RagindexError::InvalidInput("query must not be empty".to_string()));
        }
        let query_vec = embedder.embed_query(query).await?;
        index.search(&query_vec, k)
    }
}
