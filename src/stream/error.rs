use std::path::{Path, PathBuf};

use crate::matcher::MatchError;
use crate::metadata::MetadataError;
use crate::writer::SinkError;

/// Why a metadata file did not yield a series.
///
/// Always scoped to one file; never ends the run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The file never became a valid description
    #[error("{}: incomplete metadata: {reason}", .path.display())]
    Incomplete {
        /// Metadata file
        path: PathBuf,
        /// Parser diagnostic
        reason: String,
    },

    /// Too few tilts to form a series
    #[error("{}: found {found} tilts, at least {minimum} required", .path.display())]
    TooFewTilts {
        /// Metadata file
        path: PathBuf,
        /// Tilt records present
        found: usize,
        /// Required minimum
        minimum: usize,
    },

    /// The file could not be read
    #[error("{}: {source}", .path.display())]
    Metadata {
        /// Metadata file
        path: PathBuf,
        /// Underlying error
        source: MetadataError,
    },

    /// Micrographs could not be matched
    #[error("{}: {source}", .path.display())]
    Match {
        /// Metadata file
        path: PathBuf,
        /// Underlying error
        source: MatchError,
    },

    /// A stop was requested while the file was being processed
    #[error("{}: cancelled", .path.display())]
    Cancelled {
        /// Metadata file
        path: PathBuf,
    },

    /// The worker processing the file panicked
    #[error("{}: worker panicked", .path.display())]
    WorkerPanicked {
        /// Metadata file
        path: PathBuf,
    },
}

impl IngestError {
    /// Metadata file the error concerns.
    pub fn path(&self) -> &Path {
        match self {
            IngestError::Incomplete { path, .. }
            | IngestError::TooFewTilts { path, .. }
            | IngestError::Metadata { path, .. }
            | IngestError::Match { path, .. }
            | IngestError::Cancelled { path }
            | IngestError::WorkerPanicked { path } => path,
        }
    }

    /// Whether the file was abandoned because of a stop request.
    ///
    /// Cancelled files are not marked consumed and will be retried by a
    /// later run.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            IngestError::Cancelled { .. }
                | IngestError::Match {
                    source: MatchError::Cancelled,
                    ..
                }
        )
    }
}

/// Errors that end a streaming run.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The output could not be written; durability can no longer be guaranteed
    #[error("Output sink error: {0}")]
    Sink(#[from] SinkError),

    /// A worker thread could not be started
    #[error("Failed to spawn ingestion worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// All workers exited while files were still queued
    #[error("Ingestion workers exited unexpectedly")]
    WorkersGone,
}
