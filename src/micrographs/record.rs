use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One processed micrograph made available by an upstream stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicrographRecord {
    /// Micrograph name, usually the file name of the motion-corrected image
    pub name: String,

    /// Where the pixel data lives
    pub location: PathBuf,

    /// Sampling rate in Å/px
    pub sampling_rate: f64,
}

impl MicrographRecord {
    /// Create a record.
    pub fn new(name: impl Into<String>, location: impl Into<PathBuf>, sampling_rate: f64) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            sampling_rate,
        }
    }

    /// Name without its final extension.
    pub fn stem(&self) -> &str {
        file_stem(&self.name)
    }

    /// Pixel data location.
    pub fn location(&self) -> &Path {
        &self.location
    }
}

/// `name` without its final extension (`a.b.tif` -> `a.b`).
pub(crate) fn file_stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}
