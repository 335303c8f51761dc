//! # Stream controller
//!
//! The top-level loop that turns a directory of growing mdoc files and a
//! growing micrograph collection into committed tilt series.
//!
//! Three independent quiet periods govern the stream:
//!
//! | Timeout | Default | Governs |
//! |---------|---------|---------|
//! | `time_for_next_tilt` | 180 s | when an mdoc file is read as final |
//! | `time_for_next_micrograph` | 12 s | how long a short micrograph snapshot may stay unchanged |
//! | `time_for_next_series` | 1800 s | when the stream stops looking for new mdoc files |
//!
//! Each [`StreamController::tick`] checks for cancellation, commits finished
//! work, then either drains (series timeout elapsed) or scans for new files.
//! A file counts as consumed only in the same sink commit that persists its
//! series or its rejection, so a restarted run resumes exactly where the
//! previous one stopped.

mod config;
mod controller;
mod error;
mod ingest;
mod pool;
mod report;

#[cfg(test)]
mod tests;

pub use config::{
    StreamConfig, DEFAULT_TIME_FOR_NEXT_MICROGRAPH, DEFAULT_TIME_FOR_NEXT_SERIES,
    DEFAULT_TIME_FOR_NEXT_TILT, MIN_TILTS,
};
pub use controller::{ControllerPhase, ControllerState, StreamController, TickOutcome};
pub use error::{IngestError, StreamError};
pub use ingest::{Ingestor, PreparedSeries};
pub use report::{FileOutcome, FileStatus, RunReport, Termination};
