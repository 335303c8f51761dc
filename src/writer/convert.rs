//! Pixel data conversion into the output's frame store.

use std::fs;
use std::path::{Path, PathBuf};

use crate::series::PixelLocation;

/// Errors that can occur while converting the pixel data of one image
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// I/O error reading the source or writing the destination
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The micrograph file does not exist
    #[error("Source image not found: {0}")]
    MissingSource(PathBuf),
}

/// Moves one micrograph's pixels to where the tilt series references them.
pub trait PixelConverter: Send + Sync {
    /// Location the image at `index` of series `ts_id` will occupy.
    fn destination_for(&self, ts_id: &str, index: u32, source: &Path) -> PixelLocation;

    /// Produce `destination` from `source`.
    fn convert(&self, source: &Path, destination: &PixelLocation) -> Result<(), ConvertError>;
}

/// Copies each micrograph to `<root>/<ts_id>/<ts_id>_<NN>.<ext>`.
#[derive(Debug, Clone)]
pub struct FrameCopier {
    root: PathBuf,
}

impl FrameCopier {
    /// Copy frames below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Frame store directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PixelConverter for FrameCopier {
    fn destination_for(&self, ts_id: &str, index: u32, source: &Path) -> PixelLocation {
        let mut name = format!("{}_{:02}", ts_id, index);
        if let Some(ext) = source.extension().and_then(|e| e.to_str()) {
            name.push('.');
            name.push_str(ext);
        }
        PixelLocation::single(self.root.join(ts_id).join(name))
    }

    fn convert(&self, source: &Path, destination: &PixelLocation) -> Result<(), ConvertError> {
        if !source.is_file() {
            return Err(ConvertError::MissingSource(source.to_path_buf()));
        }
        if let Some(parent) = destination.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, &destination.path)?;
        Ok(())
    }
}

/// References micrographs where they already are; nothing is copied.
#[derive(Debug, Clone, Copy, Default)]
pub struct InPlace;

impl PixelConverter for InPlace {
    fn destination_for(&self, _ts_id: &str, _index: u32, source: &Path) -> PixelLocation {
        PixelLocation::single(source)
    }

    fn convert(&self, _source: &Path, _destination: &PixelLocation) -> Result<(), ConvertError> {
        Ok(())
    }
}
