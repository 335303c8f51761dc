use std::path::PathBuf;

use crate::series::{StreamState, TiltSeries};

use super::sink::{summary_line, SeriesSink};
use super::SinkError;

/// [`SeriesSink`] keeping everything in memory.
///
/// Appended series only become visible in [`series`](Self::series) once
/// committed, mirroring the durability of the directory-backed set.
#[derive(Debug, Default)]
pub struct MemorySink {
    state: StreamState,
    staged: Vec<TiltSeries>,
    committed: Vec<TiltSeries>,
    consumed: Vec<PathBuf>,
    summary: Vec<String>,
    commits: usize,
    finalized: bool,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self {
            state: StreamState::Closed,
            ..Self::default()
        }
    }

    /// Committed series, in commit order.
    pub fn series(&self) -> &[TiltSeries] {
        &self.committed
    }

    /// Committed summary lines.
    pub fn summary(&self) -> &[String] {
        &self.summary
    }

    /// Number of successful commits.
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Whether [`SeriesSink::finalize`] was called.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

impl SeriesSink for MemorySink {
    fn open(&mut self) -> Result<(), SinkError> {
        if self.finalized {
            return Err(SinkError::Finalized);
        }
        self.state = StreamState::Open;
        Ok(())
    }

    fn append(&mut self, series: &TiltSeries) -> Result<(), SinkError> {
        if self.finalized {
            return Err(SinkError::Finalized);
        }
        if self.state != StreamState::Open {
            return Err(SinkError::NotOpen);
        }
        if series.stream_state() != StreamState::Closed {
            return Err(SinkError::SeriesOpen(series.ts_id.clone()));
        }
        if self.contains(&series.ts_id) {
            return Err(SinkError::DuplicateSeries(series.ts_id.clone()));
        }
        self.staged.push(series.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.state = StreamState::Closed;
        Ok(())
    }

    fn commit(&mut self, consumed: &[PathBuf]) -> Result<(), SinkError> {
        if self.finalized {
            return Err(SinkError::Finalized);
        }
        for series in self.staged.drain(..) {
            self.summary.push(summary_line(&series));
            self.committed.push(series);
        }
        for path in consumed {
            if !self.consumed.contains(path) {
                self.consumed.push(path.clone());
            }
        }
        self.commits += 1;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SinkError> {
        self.state = StreamState::Closed;
        self.finalized = true;
        Ok(())
    }

    fn stream_state(&self) -> StreamState {
        self.state
    }

    fn contains(&self, ts_id: &str) -> bool {
        self.staged
            .iter()
            .chain(&self.committed)
            .any(|s| s.ts_id == ts_id)
    }

    fn consumed(&self) -> Vec<PathBuf> {
        self.consumed.clone()
    }

    fn series_count(&self) -> usize {
        self.committed.len() + self.staged.len()
    }
}
