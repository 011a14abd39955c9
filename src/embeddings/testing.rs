//! Deterministic in-process embedder for tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::Embedder;
use crate::error::{RagindexError, Result};

/// Hashes text into a fixed-size vector; identical texts embed identically.
pub(crate) struct FakeEmbedder {
    dim: usize,
    fail_on: Option<String>,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub(crate) fn new(dim: usize) -> Self {
        Self {
            dim,
            fail_on: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails any batch containing a text with `needle` in it
    pub(crate) fn failing_on(dim: usize, needle: &str) -> Self {
        Self {
            fail_on: Some(needle.to_string()),
            ..Self::new(dim)
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dim];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % self.dim] += f32::from(byte) / 255.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn model_name(&self) -> &str {
        "fake"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(needle) = &self.fail_on {
            if texts.iter().any(|t| t.contains(needle.as_str())) {
                return Err(RagindexError::Embedding("connection refused".to_string()));
            }
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}
