use std::path::PathBuf;
use std::time::Duration;

/// Series with fewer tilt records are rejected before matching
pub const MIN_TILTS: usize = 3;

/// Default quiet period after which an mdoc file is considered complete
pub const DEFAULT_TIME_FOR_NEXT_TILT: Duration = Duration::from_secs(180);

/// Default wait between micrograph snapshots
pub const DEFAULT_TIME_FOR_NEXT_MICROGRAPH: Duration = Duration::from_secs(12);

/// Default quiet period after which no further series are expected
pub const DEFAULT_TIME_FOR_NEXT_SERIES: Duration = Duration::from_secs(1800);

/// Configuration of a streaming run
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Directory watched for metadata files
    pub watch_directory: PathBuf,

    /// Wait for files and micrographs to grow. When false, everything present
    /// is processed once and the run ends.
    pub streaming_enabled: bool,

    /// A metadata file unmodified for this long is read as final
    pub time_for_next_tilt: Duration,

    /// Wait between micrograph snapshots while a series is short
    pub time_for_next_micrograph: Duration,

    /// With no new metadata file for this long the stream terminates
    pub time_for_next_series: Duration,

    /// Sleep between controller cycles
    pub poll_interval: Duration,

    /// Files ingested concurrently; 1 processes inline
    pub workers: usize,

    /// Metadata file name suffix (case-insensitive)
    pub mdoc_suffix: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            watch_directory: PathBuf::from("."),
            streaming_enabled: true,
            time_for_next_tilt: DEFAULT_TIME_FOR_NEXT_TILT,
            time_for_next_micrograph: DEFAULT_TIME_FOR_NEXT_MICROGRAPH,
            time_for_next_series: DEFAULT_TIME_FOR_NEXT_SERIES,
            poll_interval: Duration::from_secs(5),
            workers: 1,
            mdoc_suffix: ".mdoc".to_string(),
        }
    }
}

impl StreamConfig {
    /// Default configuration watching `watch_directory`.
    pub fn new(watch_directory: impl Into<PathBuf>) -> Self {
        Self {
            watch_directory: watch_directory.into(),
            ..Self::default()
        }
    }

    /// Process what is present once, without waiting.
    pub fn one_shot(watch_directory: impl Into<PathBuf>) -> Self {
        Self {
            streaming_enabled: false,
            ..Self::new(watch_directory)
        }
    }
}
