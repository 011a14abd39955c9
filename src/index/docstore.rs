use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{RagindexError, Result};
use crate::ingest::Chunk;

/// Chunks keyed by the identifier assigned to their vector
///
/// `index_to_docstore_id[i]` is the id of the chunk whose vector sits at
/// position `i` of the flat index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocStore {
    index_to_docstore_id: Vec<String>,
    documents: BTreeMap<String, Chunk>,
}

impl DocStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a chunk under a fresh UUID v4, returning the id
    pub fn push(&mut self, chunk: Chunk) -> String {
        let id = Uuid::new_v4().to_string();
        self.index_to_docstore_id.push(id.clone());
        self.documents.insert(id.clone(), chunk);
        id
    }

    pub fn get(&self, id: &str) -> Option<&Chunk> {
        self.documents.get(id)
    }

    pub fn get_by_position(&self, position: usize) -> Option<(&str, &Chunk)> {
        let id = self.index_to_docstore_id.get(position)?;
        self.documents.get(id).map(|chunk| (id.as_str(), chunk))
    }

    pub fn len(&self) -> usize {
        self.index_to_docstore_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_to_docstore_id.is_empty()
    }

    /// Keep only the first `len` positions and their documents
    pub fn truncate(&mut self, len: usize) {
        if len >= self.index_to_docstore_id.len() {
            return;
        }
        for id in self.index_to_docstore_id.drain(len..) {
            self.documents.remove(&id);
        }
    }

    /// Every position maps to exactly one stored document
    pub fn validate(&self) -> Result<()> {
        if self.index_to_docstore_id.len() != self.documents.len() {
            return Err(RagindexError::Index(format!(
                "document store has {} positions but {} documents",
                self.index_to_docstore_id.len(),
                self.documents.len()
            )));
        }
        if let Some(missing) = self
            .index_to_docstore_id
            .iter()
            .find(|id| !self.documents.contains_key(id.as_str()))
        {
            return Err(RagindexError::Index(format!("document {} missing from store", missing)));
        }
        Ok(())
    }
}
