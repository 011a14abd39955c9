use std::collections::BTreeSet;

use super::convert::{DocItem, ItemKind, StructuredDocument};
use crate::config::ChunkingConfig;
use crate::error::{RagindexError, Result};

/// Character-based approximation used for token budgets
const CHARS_PER_TOKEN: usize = 4;

/// A chunk produced from a structured document, before provenance formatting
#[derive(Debug, Clone, PartialEq)]
pub struct DocChunk {
    pub text: String,
    /// Heading path in effect for this chunk, outermost first
    pub headings: Vec<String>,
    /// Structural items the chunk was derived from
    pub doc_items: Vec<DocItem>,
}

impl DocChunk {
    pub fn tokens(&self) -> usize {
        estimate_tokens(&self.text)
    }

    /// Sorted, de-duplicated page numbers referenced by this chunk's items
    pub fn pages(&self) -> Vec<u32> {
        self.doc_items
            .iter()
            .flat_map(|item| item.prov.iter().map(|p| p.page_no))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Structure-aware chunker with a token budget
///
/// 1. Every non-heading item becomes a candidate chunk that remembers the
///    heading path above it.
/// 2. Candidates over the budget are split into windows on whitespace.
/// 3. With `merge_peers`, consecutive candidates under the same headings are
///    merged while the result stays within the budget.
#[derive(Debug, Clone, Copy)]
pub struct HybridChunker {
    max_tokens: usize,
    merge_peers: bool,
}

impl HybridChunker {
    pub fn new(max_tokens: usize, merge_peers: bool) -> Self {
        Self {
            max_tokens,
            merge_peers,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.max_tokens, config.merge_peers)
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Chunk a structured document
    pub fn chunk(&self, doc: &StructuredDocument) -> Result<Vec<DocChunk>> {
        if self.max_tokens == 0 {
            return Err(RagindexError::Chunking("max_tokens must be greater than 0".to_string()));
        }

        let mut chunks = Vec::new();
        for candidate in hierarchical_chunks(doc) {
            chunks.extend(self.split_oversized(candidate));
        }

        if self.merge_peers {
            chunks = self.merge(chunks);
        }

        log::debug!("Chunked {} into {} chunk(s)", doc.name, chunks.len());
        Ok(chunks)
    }

    fn split_oversized(&self, chunk: DocChunk) -> Vec<DocChunk> {
        if chunk.tokens() <= self.max_tokens {
            return vec![chunk];
        }

        split_text(&chunk.text, self.max_tokens * CHARS_PER_TOKEN)
            .into_iter()
            .map(|text| DocChunk {
                text,
                headings: chunk.headings.clone(),
                doc_items: chunk.doc_items.clone(),
            })
            .collect()
    }

    fn merge(&self, chunks: Vec<DocChunk>) -> Vec<DocChunk> {
        let mut merged: Vec<DocChunk> = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            if let Some(last) = merged.last_mut() {
                if last.headings == chunk.headings {
                    let combined = format!("{}\n{}", last.text, chunk.text);
                    if estimate_tokens(&combined) <= self.max_tokens {
                        last.text = combined;
                        last.doc_items.extend(chunk.doc_items);
                        continue;
                    }
                }
            }
            merged.push(chunk);
        }

        merged
    }
}

/// One candidate per non-heading item, tagged with the heading path above it
fn hierarchical_chunks(doc: &StructuredDocument) -> Vec<DocChunk> {
    let mut headings: Vec<(u8, String)> = Vec::new();
    let mut chunks = Vec::new();

    for item in &doc.items {
        if let ItemKind::Heading { level } = item.kind {
            headings.retain(|(l, _)| *l < level);
            headings.push((level, item.text.clone()));
            continue;
        }

        chunks.push(DocChunk {
            text: item.text.clone(),
            headings: headings.iter().map(|(_, h)| h.clone()).collect(),
            doc_items: vec![item.clone()],
        });
    }

    chunks
}

/// Split text into windows of at most `max_chars` characters on whitespace.
///
/// A single word longer than the window is cut at character boundaries.
fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut windows = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for word in text.split_whitespace() {
        let word_chars = word.chars().count();
        let separator = usize::from(!current.is_empty());

        if !current.is_empty() && current_chars + separator + word_chars > max_chars {
            windows.push(std::mem::take(&mut current));
            current_chars = 0;
        }

        if word_chars > max_chars {
            let chars: Vec<char> = word.chars().collect();
            windows.extend(chars.chunks(max_chars).map(|piece| piece.iter().collect::<String>()));
            continue;
        }

        if !current.is_empty() {
            current.push(' ');
            current_chars += 1;
        }
        current.push_str(word);
        current_chars += word_chars;
    }

    if !current.is_empty() {
        windows.push(current);
    }

    windows
}

/// Estimate token count from text
///
/// Uses approximation: 1 token ≈ 4 characters (counted as chars, not bytes,
/// so Cyrillic text is not over-counted).
pub fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() + CHARS_PER_TOKEN - 1) / CHARS_PER_TOKEN
}
