use std::collections::HashSet;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::Result;
use crate::state::ProcessedFileSet;

/// List the filenames of regular files directly inside `source_dir`.
///
/// The source folder is flat: subdirectories are not descended into. Hidden
/// entries (leading `.`) are skipped, as are names that are not valid UTF-8.
/// Names are returned sorted so runs log in a reproducible order. A source
/// directory that cannot be read is an error; an unreadable entry inside it
/// is logged and skipped.
pub fn list_source_files(source_dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(source_dir).max_depth(1).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(std::io::Error::from(e).into()),
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {}", source_dir.display(), e);
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            log::warn!("Skipping non UTF-8 file name: {}", entry.path().display());
            continue;
        };
        if name.starts_with('.') {
            continue;
        }

        files.push(name.to_string());
    }

    files.sort();
    Ok(files)
}

/// Filenames in `source_dir` that are not yet in `processed`.
///
/// A missing source directory or an up-to-date one yields an empty list;
/// both are normal outcomes and are only logged.
pub fn discover_new(source_dir: &Path, processed: &ProcessedFileSet) -> Result<Vec<String>> {
    if !source_dir.is_dir() {
        log::warn!("Directory {} does not exist", source_dir.display());
        return Ok(Vec::new());
    }

    let known: HashSet<&str> = processed.iter().collect();
    let all_files = list_source_files(source_dir)?;
    let total = all_files.len();
    let new_files: Vec<String> = all_files
        .into_iter()
        .filter(|f| !known.contains(f.as_str()))
        .collect();

    if new_files.is_empty() {
        log::info!("Nothing to update: {} file(s) in {} already processed", total, source_dir.display());
    } else {
        log::info!(
            "Discovered {} new file(s) in {} ({} already processed)",
            new_files.len(),
            source_dir.display(),
            total - new_files.len()
        );
    }

    Ok(new_files)
}
