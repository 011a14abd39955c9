//! Persistent flat vector index with its document store.

pub mod docstore;
pub mod flat;
pub mod manager;
pub mod storage;

pub use docstore::DocStore;
pub use flat::FlatL2Index;
pub use manager::VectorIndexManager;
pub use storage::IndexPaths;

use serde::Serialize;

use crate::error::{RagindexError, Result};
use crate::ingest::Chunk;

/// A chunk returned by similarity search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub chunk: Chunk,
    /// Squared L2 distance to the query; lower is closer
    pub distance: f32,
}

/// Vectors plus the chunks they were computed from.
///
/// The vector count always equals the document count and the dimension is
/// fixed at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    vectors: FlatL2Index,
    docstore: DocStore,
}

impl VectorIndex {
    pub fn new(dim: usize) -> Result<Self> {
        Ok(Self {
            vectors: FlatL2Index::new(dim)?,
            docstore: DocStore::new(),
        })
    }

    pub fn from_parts(vectors: FlatL2Index, docstore: DocStore) -> Result<Self> {
        if vectors.len() != docstore.len() {
            return Err(RagindexError::Index(format!(
                "index holds {} vectors but {} documents",
                vectors.len(),
                docstore.len()
            )));
        }
        Ok(Self { vectors, docstore })
    }

    pub fn dim(&self) -> usize {
        self.vectors.dim()
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn vectors(&self) -> &FlatL2Index {
        &self.vectors
    }

    pub fn docstore(&self) -> &DocStore {
        &self.docstore
    }

    /// Insert chunks with their embeddings, returning the assigned ids.
    ///
    /// Nothing is inserted if the counts differ or any embedding has the
    /// wrong dimension.
    pub fn append(&mut self, chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<Vec<String>> {
        if chunks.len() != embeddings.len() {
            return Err(RagindexError::Index(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        self.vectors.add(&embeddings)?;
        Ok(chunks.into_iter().map(|chunk| self.docstore.push(chunk)).collect())
    }

    /// The `k` chunks nearest to `query`, nearest first
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let mut hits = Vec::new();
        for (position, distance) in self.vectors.search(query, k)? {
            let (id, chunk) = self.docstore.get_by_position(position).ok_or_else(|| {
                RagindexError::Index(format!("no document at position {}", position))
            })?;
            hits.push(SearchHit {
                id: id.to_string(),
                chunk: chunk.clone(),
                distance,
            });
        }
        Ok(hits)
    }

    /// Drop everything after the first `len` entries
    pub fn truncate(&mut self, len: usize) {
        self.vectors.truncate(len);
        self.docstore.truncate(len);
    }
}
