//! Document loading: conversion and chunking of new source files with
//! per-file failure isolation.

use std::path::{Path, PathBuf};

use super::chunker::HybridChunker;
use super::convert::ConverterRegistry;
use super::metadata::Chunk;
use super::walker;
use crate::config::Config;
use crate::error::Result;
use crate::state::ProcessedFileSet;

/// What happened to one source file during loading
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// Converted and chunked; ready to be embedded
    Chunked { filename: String, chunks: Vec<Chunk> },
    /// Converted but produced no text; stays unprocessed
    Empty { filename: String },
    /// Conversion or chunking failed; stays unprocessed and is retried next run
    Failed { filename: String, reason: String },
}

impl FileOutcome {
    pub fn filename(&self) -> &str {
        match self {
            FileOutcome::Chunked { filename, .. }
            | FileOutcome::Empty { filename }
            | FileOutcome::Failed { filename, .. } => filename,
        }
    }
}

/// Aggregate result of loading a batch of files
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub outcomes: Vec<FileOutcome>,
}

impl LoadReport {
    /// Filenames that produced chunks, in processing order
    pub fn ingested_files(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                FileOutcome::Chunked { filename, .. } => Some(filename.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn failed_files(&self) -> Vec<(String, String)> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                FileOutcome::Failed { filename, reason } => Some((filename.clone(), reason.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn empty_files(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                FileOutcome::Empty { filename } => Some(filename.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn chunk_count(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                FileOutcome::Chunked { chunks, .. } => chunks.len(),
                _ => 0,
            })
            .sum()
    }

    pub fn has_chunks(&self) -> bool {
        self.chunk_count() > 0
    }

    /// All chunks, in file order
    pub fn into_chunks(self) -> Vec<Chunk> {
        self.outcomes
            .into_iter()
            .flat_map(|o| match o {
                FileOutcome::Chunked { chunks, .. } => chunks,
                _ => Vec::new(),
            })
            .collect()
    }
}

/// Turns source files into provenance-tagged chunks
pub struct DocumentLoader {
    source_dir: PathBuf,
    registry: ConverterRegistry,
    chunker: HybridChunker,
}

impl DocumentLoader {
    pub fn new(source_dir: impl Into<PathBuf>, registry: ConverterRegistry, chunker: HybridChunker) -> Self {
        Self {
            source_dir: source_dir.into(),
            registry,
            chunker,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.data_dir(),
            ConverterRegistry::new(),
            HybridChunker::from_config(&config.chunking),
        )
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Filenames in the source directory not yet in `processed`
    pub fn discover_new(&self, processed: &ProcessedFileSet) -> Result<Vec<String>> {
        walker::discover_new(&self.source_dir, processed)
    }

    /// Convert and chunk a single file from the source directory
    pub fn convert_and_chunk(&self, filename: &str) -> Result<Vec<Chunk>> {
        let path = self.source_dir.join(filename);
        let document = self.registry.convert(&path)?;
        let doc_chunks = self.chunker.chunk(&document)?;

        Ok(doc_chunks
            .into_iter()
            .map(|c| Chunk::from_doc_chunk(c, filename))
            .collect())
    }

    /// Convert and chunk every file in `filenames`.
    ///
    /// A failure in one file is recorded in the report and never stops the
    /// remaining files from being processed.
    pub fn load(&self, filenames: &[String]) -> LoadReport {
        let total = filenames.len();
        let mut report = LoadReport::default();

        for (idx, filename) in filenames.iter().enumerate() {
            log::info!("[{}/{}] Processing: {}", idx + 1, total, filename);

            let outcome = match self.convert_and_chunk(filename) {
                Ok(chunks) if chunks.is_empty() => {
                    log::warn!("∅ {}: no text extracted", filename);
                    FileOutcome::Empty {
                        filename: filename.clone(),
                    }
                }
                Ok(chunks) => {
                    log::info!("✓ {} ({} chunks)", filename, chunks.len());
                    FileOutcome::Chunked {
                        filename: filename.clone(),
                        chunks,
                    }
                }
                Err(e) => {
                    log::error!("✗ {}: {}", filename, e);
                    FileOutcome::Failed {
                        filename: filename.clone(),
                        reason: e.to_string(),
                    }
                }
            };
            report.outcomes.push(outcome);
        }

        report
    }
}
