//! Discovery of metadata files in the watched directory.
//!
//! Listing only; no file content is read here.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::debug;

/// List files in `directory` whose name ends with `suffix`
/// (case-insensitive), oldest modification first.
///
/// Ties are broken by path. A missing directory yields an empty list.
pub fn scan(directory: &Path, suffix: &str) -> io::Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let suffix = suffix.to_ascii_lowercase();
    let mut found: Vec<(SystemTime, PathBuf)> = Vec::new();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry in {}: {}", directory.display(), e);
                continue;
            }
        };
        let path = entry.path();

        let matches_suffix = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase().ends_with(&suffix))
            .unwrap_or(false);
        if !matches_suffix {
            continue;
        }

        // The file may vanish between listing and stat
        match fs::metadata(&path).and_then(|m| {
            if m.is_file() {
                m.modified().map(Some)
            } else {
                Ok(None)
            }
        }) {
            Ok(Some(modified)) => found.push((modified, path)),
            Ok(None) => {}
            Err(e) => debug!("Skipping {}: {}", path.display(), e),
        }
    }

    found.sort();
    Ok(found.into_iter().map(|(_, path)| path).collect())
}

/// Entries of `current` not in `seen`, in `current` order.
pub fn delta(current: &[PathBuf], seen: &HashSet<PathBuf>) -> Vec<PathBuf> {
    current
        .iter()
        .filter(|path| !seen.contains(*path))
        .cloned()
        .collect()
}
