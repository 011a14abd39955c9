use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::chunker::DocChunk;

/// Page locator used when no page information exists
pub const UNKNOWN_PAGE: &str = "?";

/// Provenance stored with every chunk in the document store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Originating filename
    pub source: String,
    /// `"3"`, `"3-5"` or `"?"`
    pub page: String,
}

/// A retrieval-sized passage with source/page provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(text: impl Into<String>, source: impl Into<String>, page: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: ChunkMetadata {
                source: source.into(),
                page: page.into(),
            },
        }
    }

    /// Attach provenance to a chunker output
    pub fn from_doc_chunk(doc_chunk: DocChunk, source: &str) -> Self {
        let page = page_locator(doc_chunk.pages());
        Self::new(doc_chunk.text, source, page)
    }

    pub fn source(&self) -> &str {
        &self.metadata.source
    }

    pub fn page(&self) -> &str {
        &self.metadata.page
    }
}

/// Format the page locator for a set of page numbers.
///
/// Pages are de-duplicated and ordered: a single page yields `"3"`, several
/// pages yield `"min-max"` (e.g. `"3-5"`), no pages yield `"?"`.
pub fn page_locator<I>(pages: I) -> String
where
    I: IntoIterator<Item = u32>,
{
    let pages: BTreeSet<u32> = pages.into_iter().collect();
    match (pages.first(), pages.last()) {
        (Some(first), Some(last)) if first == last => first.to_string(),
        (Some(first), Some(last)) => format!("{}-{}", first, last),
        _ => UNKNOWN_PAGE.to_string(),
    }
}
