//! On-disk artifacts of a vector index.
//!
//! `<name>.index` holds the vectors (little-endian: magic `RIVX`, u32
//! version, u32 dim, u64 count, then `count * dim` f32 values) and
//! `<name>.docstore.json` holds the document store.

use std::path::{Path, PathBuf};

use super::{DocStore, FlatL2Index, VectorIndex};
use crate::error::{RagindexError, Result};
use crate::state::write_atomic;

const MAGIC: &[u8; 4] = b"RIVX";
const VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Paths of the two artifacts making up a persisted index
#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub vectors: PathBuf,
    pub docstore: PathBuf,
}

impl IndexPaths {
    pub fn new(state_dir: &Path, index_name: &str) -> Self {
        Self {
            vectors: state_dir.join(format!("{}.index", index_name)),
            docstore: state_dir.join(format!("{}.docstore.json", index_name)),
        }
    }

    pub fn any_exists(&self) -> bool {
        self.vectors.exists() || self.docstore.exists()
    }

    pub fn both_exist(&self) -> bool {
        self.vectors.exists() && self.docstore.exists()
    }
}

pub fn encode_vectors(index: &FlatL2Index) -> Vec<u8> {
    let raw = index.as_raw();
    let mut bytes = Vec::with_capacity(HEADER_LEN + raw.len() * 4);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.extend_from_slice(&(index.dim() as u32).to_le_bytes());
    bytes.extend_from_slice(&(index.len() as u64).to_le_bytes());
    bytes.extend(raw.iter().flat_map(|f| f.to_le_bytes()));
    bytes
}

pub fn decode_vectors(bytes: &[u8]) -> Result<FlatL2Index> {
    if bytes.len() < HEADER_LEN || &bytes[0..4] != MAGIC {
        return Err(RagindexError::Index("not a ragindex vector file (bad magic)".to_string()));
    }

    let version = u32::from_le_bytes(read_array(&bytes[4..8])?);
    if version != VERSION {
        return Err(RagindexError::Index(format!("unsupported vector file version {}", version)));
    }
    let dim = u32::from_le_bytes(read_array(&bytes[8..12])?) as usize;
    let count = u64::from_le_bytes(read_array(&bytes[12..20])?) as usize;

    let body = &bytes[HEADER_LEN..];
    let expected = count
        .checked_mul(dim)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| RagindexError::Index("vector file header overflows".to_string()))?;
    if body.len() != expected {
        return Err(RagindexError::Index(format!(
            "vector file truncated: header says {} x {} but body has {} bytes",
            count,
            dim,
            body.len()
        )));
    }

    let mut floats = Vec::with_capacity(count * dim);
    for bytes in body.chunks_exact(4) {
        floats.push(f32::from_le_bytes(read_array(bytes)?));
    }
    FlatL2Index::from_raw(dim, floats)
}

fn read_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| RagindexError::Index("vector file truncated".to_string()))
}

pub fn write_vectors(path: &Path, index: &FlatL2Index) -> Result<()> {
    write_atomic(path, &encode_vectors(index))
}

pub fn read_vectors(path: &Path) -> Result<FlatL2Index> {
    decode_vectors(&std::fs::read(path)?)
}

pub fn write_docstore(path: &Path, docstore: &DocStore) -> Result<()> {
    write_atomic(path, &serde_json::to_vec(docstore)?)
}

pub fn read_docstore(path: &Path) -> Result<DocStore> {
    let docstore: DocStore = serde_json::from_slice(&std::fs::read(path)?)?;
    docstore.validate()?;
    Ok(docstore)
}

/// Load both artifacts.
///
/// Returns `None` when neither exists (cold start). Exactly one of the two
/// existing is an incomplete index and an error.
pub fn load_index(paths: &IndexPaths) -> Result<Option<VectorIndex>> {
    match (paths.vectors.exists(), paths.docstore.exists()) {
        (false, false) => Ok(None),
        (true, true) => {
            let vectors = read_vectors(&paths.vectors)?;
            let docstore = read_docstore(&paths.docstore)?;
            VectorIndex::from_parts(vectors, docstore).map(Some)
        }
        (true, false) => Err(RagindexError::Index(format!(
            "{} exists without {}",
            paths.vectors.display(),
            paths.docstore.display()
        ))),
        (false, true) => Err(RagindexError::Index(format!(
            "{} exists without {}",
            paths.docstore.display(),
            paths.vectors.display()
        ))),
    }
}

/// Write both artifacts, vectors first
pub fn save_index(paths: &IndexPaths, index: &VectorIndex) -> Result<()> {
    write_vectors(&paths.vectors, index.vectors())?;
    write_docstore(&paths.docstore, index.docstore())?;
    Ok(())
}
