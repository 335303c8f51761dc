//! Per-file ingestion: wait for a metadata file to go quiet, validate it,
//! then wait for its micrographs.
//!
//! ```text
//! Discovered ──parse──▶ WaitingForTilts ──quiet for time_for_next_tilt──▶ Ready
//!                            │  ▲                                          │
//!                            └──┘ sleep time_for_next_tilt / 2, re-parse   └──▶ Rejected
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use crate::clock::{elapsed_between, Clock, StopHandle};
use crate::matcher::{MatchedMicrographs, Matcher};
use crate::metadata::{MetadataError, ParseOutcome, SeriesMetadata, TiltMetadataSource};
use crate::micrographs::MicrographSource;

use super::config::{StreamConfig, MIN_TILTS};
use super::error::IngestError;

/// A metadata file whose series is ready to be composed.
#[derive(Debug, Clone)]
pub struct PreparedSeries {
    /// Metadata file
    pub path: PathBuf,
    /// Validated series description
    pub metadata: SeriesMetadata,
    /// Micrographs paired with the tilts in file order
    pub matched: MatchedMicrographs,
}

/// Runs ingestion and matching for single files.
///
/// Cheap to clone; each worker thread owns a clone.
#[derive(Clone)]
pub struct Ingestor {
    metadata: Arc<dyn TiltMetadataSource>,
    micrographs: Arc<dyn MicrographSource>,
    matcher: Matcher,
    clock: Arc<dyn Clock>,
    stop: StopHandle,
    time_for_next_tilt: Duration,
    streaming: bool,
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("micrographs", &self.micrographs.describe())
            .field("time_for_next_tilt", &self.time_for_next_tilt)
            .field("streaming", &self.streaming)
            .finish()
    }
}

impl Ingestor {
    /// Build an ingestor from the run configuration.
    pub fn new(
        config: &StreamConfig,
        metadata: Arc<dyn TiltMetadataSource>,
        micrographs: Arc<dyn MicrographSource>,
        clock: Arc<dyn Clock>,
        stop: StopHandle,
    ) -> Self {
        let matcher = Matcher::new(
            clock.clone(),
            stop.clone(),
            config.time_for_next_micrograph,
            config.streaming_enabled,
        );
        Self {
            metadata,
            micrographs,
            matcher,
            clock,
            stop,
            time_for_next_tilt: config.time_for_next_tilt,
            streaming: config.streaming_enabled,
        }
    }

    fn parse(&self, path: &Path) -> Result<ParseOutcome, IngestError> {
        self.metadata
            .parse(path)
            .map_err(|source| IngestError::Metadata {
                path: path.to_path_buf(),
                source,
            })
    }

    fn modified(&self, path: &Path) -> Result<std::time::SystemTime, IngestError> {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| IngestError::Metadata {
                path: path.to_path_buf(),
                source: MetadataError::IoError(e),
            })
    }

    /// Read a metadata file once it has stopped growing.
    ///
    /// A stop observed at any point before the outcome is judged cancels,
    /// including after the first parse of a file that is already quiet.
    pub fn ingest(&self, path: &Path) -> Result<SeriesMetadata, IngestError> {
        let mut outcome = self.parse(path)?;
        let half = self.time_for_next_tilt / 2;

        loop {
            if self.stop.is_stopped() {
                return Err(IngestError::Cancelled {
                    path: path.to_path_buf(),
                });
            }
            if !self.streaming {
                break;
            }
            let modified = self.modified(path)?;
            if elapsed_between(modified, self.clock.now()) >= self.time_for_next_tilt {
                break;
            }
            debug!(
                "{} modified recently ({} tilts so far); waiting {:?}",
                path.display(),
                outcome.tilt_count(),
                half
            );
            self.clock.sleep(half);
            outcome = self.parse(path)?;
        }

        match outcome {
            ParseOutcome::Complete(metadata) if metadata.tilt_count() >= MIN_TILTS => {
                info!(
                    "Read {} tilts from {}",
                    metadata.tilt_count(),
                    path.display()
                );
                Ok(metadata)
            }
            ParseOutcome::Complete(metadata) => Err(IngestError::TooFewTilts {
                path: path.to_path_buf(),
                found: metadata.tilt_count(),
                minimum: MIN_TILTS,
            }),
            ParseOutcome::Incomplete(reason) => Err(IngestError::Incomplete {
                path: path.to_path_buf(),
                reason,
            }),
        }
    }

    /// Ingest a metadata file and match its micrographs.
    pub fn prepare(&self, path: &Path) -> Result<PreparedSeries, IngestError> {
        let metadata = self.ingest(path)?;
        let matched = self
            .matcher
            .match_micrographs(&metadata.tilts, self.micrographs.as_ref())
            .map_err(|source| IngestError::Match {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(PreparedSeries {
            path: path.to_path_buf(),
            metadata,
            matched,
        })
    }
}
