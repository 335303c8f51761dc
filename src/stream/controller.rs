use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use crate::clock::{elapsed_between, Clock, StopHandle, SystemClock};
use crate::discovery;
use crate::metadata::TiltMetadataSource;
use crate::micrographs::MicrographSource;
use crate::series::Composer;
use crate::writer::{PixelConverter, SeriesSink, SinkError};

use super::config::StreamConfig;
use super::error::{IngestError, StreamError};
use super::ingest::{Ingestor, PreparedSeries};
use super::pool::IngestPool;
use super::report::{FileStatus, RunReport, Termination};

/// Lifecycle of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    /// Discovering and dispatching files
    Streaming,
    /// Series timeout elapsed; finishing files already in flight
    Draining,
    /// Done; no further work
    Terminated,
}

/// Result of one controller cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// New files were handed to ingestion
    Dispatched(usize),
    /// Nothing new
    Idle,
    /// Waiting for in-flight files before terminating
    Draining {
        /// Files still in flight
        in_flight: usize,
    },
    /// The stream ended during this cycle
    Terminated(Termination),
    /// The stream had already ended
    Finished,
}

/// Mutable state of the controller loop.
#[derive(Debug, Clone)]
pub struct ControllerState {
    read: HashSet<PathBuf>,
    in_flight: HashSet<PathBuf>,
    last_activity: SystemTime,
    waiting_for_series: bool,
    phase: ControllerPhase,
}

impl ControllerState {
    fn new(now: SystemTime, read: HashSet<PathBuf>) -> Self {
        Self {
            read,
            in_flight: HashSet::new(),
            last_activity: now,
            waiting_for_series: false,
            phase: ControllerPhase::Streaming,
        }
    }

    /// Files whose outcome is committed.
    pub fn read(&self) -> &HashSet<PathBuf> {
        &self.read
    }

    /// Files dispatched but not yet committed.
    pub fn in_flight(&self) -> &HashSet<PathBuf> {
        &self.in_flight
    }

    /// When a new file was last discovered.
    pub fn last_activity(&self) -> SystemTime {
        self.last_activity
    }

    /// Whether the idle message has been logged since the last discovery.
    pub fn waiting_for_series(&self) -> bool {
        self.waiting_for_series
    }

    /// Current phase.
    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    fn seen(&self) -> HashSet<PathBuf> {
        self.read.union(&self.in_flight).cloned().collect()
    }
}

/// Drives discovery, ingestion, composition and termination.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use tomostream::prelude::*;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let sink = TiltSeriesSetWriter::create("out", WriterConfig::default())?;
/// let frames = FrameCopier::new(sink.frames_dir());
/// let mut controller = StreamController::new(
///     StreamConfig::new("mdoc"),
///     Arc::new(MdocReader::new()),
///     Arc::new(MicrographListFile::new("micrographs.csv")),
///     Arc::new(frames),
///     sink,
/// );
/// let report = controller.run()?;
/// println!("{}", report);
/// # Ok(())
/// # }
/// ```
pub struct StreamController<S: SeriesSink> {
    config: StreamConfig,
    metadata: Arc<dyn TiltMetadataSource>,
    micrographs: Arc<dyn MicrographSource>,
    converter: Arc<dyn PixelConverter>,
    sink: S,
    clock: Arc<dyn Clock>,
    stop: StopHandle,
    state: ControllerState,
    pool: Option<IngestPool>,
    single_pass_done: bool,
    report: RunReport,
}

impl<S: SeriesSink> StreamController<S> {
    /// Create a controller using the system clock.
    ///
    /// Files the sink already lists as consumed are never ingested again.
    pub fn new(
        config: StreamConfig,
        metadata: Arc<dyn TiltMetadataSource>,
        micrographs: Arc<dyn MicrographSource>,
        converter: Arc<dyn PixelConverter>,
        sink: S,
    ) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let now = clock.now();
        let read: HashSet<PathBuf> = sink.consumed().into_iter().collect();
        if !read.is_empty() {
            info!("{} metadata files already consumed", read.len());
        }

        Self {
            config,
            metadata,
            micrographs,
            converter,
            sink,
            clock,
            stop: StopHandle::new(),
            state: ControllerState::new(now, read),
            pool: None,
            single_pass_done: false,
            report: RunReport::new(DateTime::<Utc>::from(now)),
        }
    }

    /// Use `clock` for all waits and timeouts.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        self.state.last_activity = now;
        self.report.started = DateTime::<Utc>::from(now);
        self.clock = clock;
        self
    }

    /// Observe `stop` for cancellation.
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// Handle that cancels this controller.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Loop state.
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Report so far.
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Output sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the controller, returning the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    fn ingestor(&self) -> Ingestor {
        Ingestor::new(
            &self.config,
            self.metadata.clone(),
            self.micrographs.clone(),
            self.clock.clone(),
            self.stop.clone(),
        )
    }

    /// Run one controller cycle.
    ///
    /// Only sink failures are returned as errors; every per-file problem is
    /// recorded in the report.
    pub fn tick(&mut self) -> Result<TickOutcome, StreamError> {
        if self.state.phase == ControllerPhase::Terminated {
            return Ok(TickOutcome::Finished);
        }
        if self.stop.is_stopped() {
            return self.terminate(Termination::Cancelled);
        }

        self.collect_results()?;

        if !self.config.streaming_enabled {
            if !self.single_pass_done {
                self.single_pass_done = true;
                let dispatched = self.discover_and_dispatch()?;
                if dispatched > 0 {
                    return Ok(TickOutcome::Dispatched(dispatched));
                }
            }
            self.state.phase = ControllerPhase::Draining;
            return self.drain();
        }

        let delay = elapsed_between(self.state.last_activity, self.clock.now());
        if self.state.phase == ControllerPhase::Draining || delay > self.config.time_for_next_series {
            if self.state.phase == ControllerPhase::Streaming {
                info!(
                    "No new tilt series for {:?}; finishing {} in-flight files",
                    delay,
                    self.state.in_flight.len()
                );
                self.state.phase = ControllerPhase::Draining;
                self.state.waiting_for_series = false;
            }
            return self.drain();
        }

        let dispatched = self.discover_and_dispatch()?;
        if dispatched > 0 {
            self.state.waiting_for_series = false;
            Ok(TickOutcome::Dispatched(dispatched))
        } else {
            if !self.state.waiting_for_series {
                info!(
                    "Waiting for new tilt series in {}",
                    self.config.watch_directory.display()
                );
                self.state.waiting_for_series = true;
            }
            Ok(TickOutcome::Idle)
        }
    }

    /// Tick until the stream terminates, sleeping `poll_interval` between
    /// cycles.
    pub fn run(&mut self) -> Result<RunReport, StreamError> {
        loop {
            let outcome = self.tick()?;
            match outcome {
                TickOutcome::Terminated(_) | TickOutcome::Finished => break,
                TickOutcome::Dispatched(_) if !self.config.streaming_enabled => {}
                TickOutcome::Draining { .. } if self.pool.is_some() => {
                    let ready = self
                        .pool
                        .as_ref()
                        .and_then(|pool| pool.wait(self.config.poll_interval));
                    if let Some((path, result)) = ready {
                        self.finish_file(path, result)?;
                    }
                }
                _ => self.clock.sleep(self.config.poll_interval),
            }
        }
        Ok(self.report.clone())
    }

    fn drain(&mut self) -> Result<TickOutcome, StreamError> {
        if self.state.in_flight.is_empty() {
            self.terminate(Termination::Exhausted)
        } else {
            Ok(TickOutcome::Draining {
                in_flight: self.state.in_flight.len(),
            })
        }
    }

    fn discover_and_dispatch(&mut self) -> Result<usize, StreamError> {
        let current = match discovery::scan(&self.config.watch_directory, &self.config.mdoc_suffix) {
            Ok(current) => current,
            Err(e) => {
                warn!(
                    "Cannot list {}: {}",
                    self.config.watch_directory.display(),
                    e
                );
                return Ok(0);
            }
        };

        let new_files = discovery::delta(&current, &self.state.seen());
        if new_files.is_empty() {
            return Ok(0);
        }

        self.state.last_activity = self.clock.now();
        info!("Found {} new metadata files", new_files.len());

        let mut count = 0;
        for path in new_files {
            if self.stop.is_stopped() {
                debug!("Stop requested; leaving remaining files undispatched");
                break;
            }
            count += 1;
            self.state.in_flight.insert(path.clone());
            if self.config.workers > 1 {
                if self.pool.is_none() {
                    self.pool = Some(IngestPool::new(self.config.workers, self.ingestor())?);
                }
                if let Some(pool) = &self.pool {
                    pool.submit(path)?;
                }
            } else {
                let result = self.ingestor().prepare(&path);
                self.finish_file(path, result)?;
            }
        }
        Ok(count)
    }

    fn collect_results(&mut self) -> Result<(), StreamError> {
        let ready = match &self.pool {
            Some(pool) => pool.try_collect(),
            None => return Ok(()),
        };
        for (path, result) in ready {
            self.finish_file(path, result)?;
        }
        Ok(())
    }

    /// Compose (or reject) one file and commit its outcome.
    fn finish_file(
        &mut self,
        path: PathBuf,
        result: Result<PreparedSeries, IngestError>,
    ) -> Result<(), StreamError> {
        // Nothing is committed once a stop has been requested
        let result = if self.stop.is_stopped() {
            Err(IngestError::Cancelled { path: path.clone() })
        } else {
            result
        };
        let status = match result {
            Ok(prepared) => {
                let composer = Composer::new(self.converter.as_ref());
                match composer.compose(&prepared.metadata, &prepared.matched, &mut self.sink) {
                    Ok(composition) => {
                        let series = &composition.series;
                        if composition.is_partial() {
                            FileStatus::Partial {
                                ts_id: series.ts_id.clone(),
                                tilts: series.angles_count(),
                                expected: series.frames_expected,
                            }
                        } else {
                            FileStatus::Composed {
                                ts_id: series.ts_id.clone(),
                                tilts: series.angles_count(),
                            }
                        }
                    }
                    Err(SinkError::DuplicateSeries(ts_id)) => {
                        warn!(
                            "{}: tilt series {} already composed",
                            path.display(),
                            ts_id
                        );
                        FileStatus::Rejected(format!("duplicate tilt series {}", ts_id))
                    }
                    Err(e) => {
                        error!("{}: cannot persist tilt series: {}", path.display(), e);
                        return Err(e.into());
                    }
                }
            }
            Err(e) if e.is_cancelled() => {
                info!("{}", e);
                self.state.in_flight.remove(&path);
                self.report.record(path, FileStatus::Cancelled);
                return Ok(());
            }
            Err(e) => {
                warn!("Rejected {}", e);
                FileStatus::Rejected(e.to_string())
            }
        };

        self.sink.commit(std::slice::from_ref(&path))?;
        self.state.in_flight.remove(&path);
        self.state.read.insert(path.clone());
        self.report.record(path, status);
        Ok(())
    }

    fn terminate(&mut self, termination: Termination) -> Result<TickOutcome, StreamError> {
        self.state.phase = ControllerPhase::Terminated;
        match self.pool.take() {
            Some(pool) if termination == Termination::Exhausted => pool.join(),
            // Workers exit after their current wait observes the stop
            Some(pool) => drop(pool),
            None => {}
        }

        if termination == Termination::Exhausted {
            self.sink.finalize()?;
        }
        for path in self.state.in_flight.drain() {
            self.report.record(path, FileStatus::Cancelled);
        }

        self.report.termination = Some(termination);
        self.report.finished = Some(DateTime::<Utc>::from(self.clock.now()));
        info!(
            "Stream {}: {} series composed, {} files rejected",
            termination,
            self.report.composed_count() + self.report.partial_count(),
            self.report.rejected_count()
        );
        Ok(TickOutcome::Terminated(termination))
    }
}
