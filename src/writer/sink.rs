use std::path::PathBuf;

use crate::series::{StreamState, TiltSeries};

use super::SinkError;

/// The persisted, append-only collection of tilt series.
///
/// Call sequence per series: [`open`](Self::open), [`append`](Self::append),
/// [`close`](Self::close), then [`commit`](Self::commit) with the metadata
/// files whose outcome is now final. Nothing appended is durable, and no
/// file counts as consumed, until `commit` returns.
pub trait SeriesSink: Send {
    /// Mark the collection open for appends.
    fn open(&mut self) -> Result<(), SinkError>;

    /// Add a closed series.
    fn append(&mut self, series: &TiltSeries) -> Result<(), SinkError>;

    /// Mark the collection closed.
    fn close(&mut self) -> Result<(), SinkError>;

    /// Durably record everything appended so far together with `consumed`.
    fn commit(&mut self, consumed: &[PathBuf]) -> Result<(), SinkError>;

    /// Mark the output complete. No writes are accepted afterwards.
    fn finalize(&mut self) -> Result<(), SinkError>;

    /// Current collection state.
    fn stream_state(&self) -> StreamState;

    /// Whether a series with this identifier was appended.
    fn contains(&self, ts_id: &str) -> bool;

    /// Metadata files committed as consumed, in commit order.
    fn consumed(&self) -> Vec<PathBuf>;

    /// Number of series appended.
    fn series_count(&self) -> usize;
}

impl<S: SeriesSink + ?Sized> SeriesSink for Box<S> {
    fn open(&mut self) -> Result<(), SinkError> {
        (**self).open()
    }

    fn append(&mut self, series: &TiltSeries) -> Result<(), SinkError> {
        (**self).append(series)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        (**self).close()
    }

    fn commit(&mut self, consumed: &[PathBuf]) -> Result<(), SinkError> {
        (**self).commit(consumed)
    }

    fn finalize(&mut self) -> Result<(), SinkError> {
        (**self).finalize()
    }

    fn stream_state(&self) -> StreamState {
        (**self).stream_state()
    }

    fn contains(&self, ts_id: &str) -> bool {
        (**self).contains(ts_id)
    }

    fn consumed(&self) -> Vec<PathBuf> {
        (**self).consumed()
    }

    fn series_count(&self) -> usize {
        (**self).series_count()
    }
}

/// Summary line recorded for each composed series.
pub fn summary_line(series: &TiltSeries) -> String {
    format!(
        "Tilt series {} ({} tilts) composed from mdoc file: {}",
        series.ts_id,
        series.angles_count(),
        series.source_mdoc.display()
    )
}
