use crate::error::{RagindexError, Result};

/// Brute-force vector collection ranked by squared Euclidean distance
///
/// Vectors are stored row-major in one contiguous buffer; position `i` holds
/// the vector inserted `i`-th.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    dim: usize,
    vectors: Vec<f32>,
}

impl FlatL2Index {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(RagindexError::Index("vector dimension must be > 0".to_string()));
        }
        Ok(Self {
            dim,
            vectors: Vec::new(),
        })
    }

    /// Rebuild from a row-major buffer, e.g. one read back from disk
    pub fn from_raw(dim: usize, vectors: Vec<f32>) -> Result<Self> {
        if dim == 0 {
            return Err(RagindexError::Index("vector dimension must be > 0".to_string()));
        }
        if vectors.len() % dim != 0 {
            return Err(RagindexError::Index(format!(
                "buffer of {} floats is not a multiple of dimension {}",
                vectors.len(),
                dim
            )));
        }
        Ok(Self { dim, vectors })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn as_raw(&self) -> &[f32] {
        &self.vectors
    }

    /// Append vectors. Every vector is checked before any is inserted.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dim) {
            return Err(RagindexError::Index(format!(
                "dimension mismatch: index has {}, vector has {}",
                self.dim,
                bad.len()
            )));
        }

        self.vectors.reserve(vectors.len() * self.dim);
        for vector in vectors {
            self.vectors.extend_from_slice(vector);
        }
        Ok(())
    }

    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dim)?;
        self.vectors.get(start..start + self.dim)
    }

    /// Positions and squared distances of the `k` nearest vectors, nearest first
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dim {
            return Err(RagindexError::Index(format!(
                "dimension mismatch: index has {}, query has {}",
                self.dim,
                query.len()
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(position, vector)| (position, l2_squared(query, vector)))
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    /// Keep only the first `len` vectors
    pub fn truncate(&mut self, len: usize) {
        self.vectors.truncate(len.saturating_mul(self.dim));
    }
}

/// Squared Euclidean distance; no normalisation is applied
pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}
