//! TOML configuration file support.
//!
//! Settings that rarely change between sessions can live in a file instead of
//! on the command line. Command-line flags win over file values.
//!
//! ```toml
//! # tomostream.toml
//! [stream]
//! time_for_next_tilt = 180
//! time_for_next_micrograph = 12
//! time_for_next_series = 1800
//! workers = 2
//!
//! [micrographs]
//! source = "/data/session/motioncorr"
//! sampling_rate = 1.35
//!
//! [output]
//! directory = "/data/session/tomo"
//! compression_level = 9
//! copy_frames = true
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration structure for tomostream.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Stream timing and concurrency.
    #[serde(default)]
    pub stream: StreamSection,

    /// Where micrographs come from.
    #[serde(default)]
    pub micrographs: MicrographSection,

    /// Output set settings.
    #[serde(default)]
    pub output: OutputSection,
}

/// `[stream]` settings; durations are in seconds.
#[derive(Debug, Default, Deserialize)]
pub struct StreamSection {
    pub time_for_next_tilt: Option<u64>,
    pub time_for_next_micrograph: Option<u64>,
    pub time_for_next_series: Option<u64>,
    pub poll_interval: Option<u64>,
    pub workers: Option<usize>,
    pub mdoc_suffix: Option<String>,
}

/// `[micrographs]` settings.
#[derive(Debug, Default, Deserialize)]
pub struct MicrographSection {
    /// Directory of images or CSV/TSV listing
    pub source: Option<PathBuf>,

    /// Sampling rate in Å/px for directory sources
    pub sampling_rate: Option<f64>,
}

/// `[output]` settings.
#[derive(Debug, Default, Deserialize)]
pub struct OutputSection {
    pub directory: Option<PathBuf>,

    /// ZSTD compression level (1-22).
    pub compression_level: Option<i32>,

    /// Copy micrographs into the set's frame store.
    pub copy_frames: Option<bool>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}
