//! Worker threads running [`Ingestor::prepare`] for the controller.
//!
//! ```text
//! ┌────────────┐  bounded channel   ┌──────────────────┐
//! │ Controller │ ──── PathBuf ────▶ │ tomostream-ingest│ ×N
//! │            │ ◀── result ─────── │ (wait + match)   │
//! └────────────┘ unbounded channel  └──────────────────┘
//! ```
//!
//! Only the controller composes and commits; workers never touch the sink.
//! The result channel is unbounded so a worker never blocks on a controller
//! that is itself blocked handing out work.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};

use super::error::{IngestError, StreamError};
use super::ingest::{Ingestor, PreparedSeries};

/// Result of processing one file on a worker.
pub(crate) type PoolResult = (PathBuf, Result<PreparedSeries, IngestError>);

pub(crate) struct IngestPool {
    sender: Option<Sender<PathBuf>>,
    results: Receiver<PoolResult>,
    handles: Vec<JoinHandle<()>>,
}

impl IngestPool {
    /// Spawn `workers` named threads sharing `ingestor`.
    pub(crate) fn new(workers: usize, ingestor: Ingestor) -> Result<Self, StreamError> {
        let workers = workers.max(1);
        let (sender, receiver) = bounded::<PathBuf>(workers * 2);
        let (result_sender, results) = unbounded::<PoolResult>();

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let receiver = receiver.clone();
            let result_sender = result_sender.clone();
            let ingestor = ingestor.clone();

            let handle = thread::Builder::new()
                .name(format!("tomostream-ingest-{}", id))
                .spawn(move || {
                    for path in receiver {
                        let result = catch_unwind(AssertUnwindSafe(|| ingestor.prepare(&path)))
                            .unwrap_or_else(|_| {
                                Err(IngestError::WorkerPanicked { path: path.clone() })
                            });
                        if result_sender.send((path, result)).is_err() {
                            break;
                        }
                    }
                })
                .map_err(StreamError::WorkerSpawn)?;
            handles.push(handle);
        }
        debug!("Started {} ingestion workers", workers);

        Ok(Self {
            sender: Some(sender),
            results,
            handles,
        })
    }

    /// Queue a file. Blocks while every worker is busy and the queue is full.
    pub(crate) fn submit(&self, path: PathBuf) -> Result<(), StreamError> {
        let sender = self.sender.as_ref().ok_or(StreamError::WorkersGone)?;
        sender.send(path).map_err(|_| StreamError::WorkersGone)
    }

    /// Results that are ready now.
    pub(crate) fn try_collect(&self) -> Vec<PoolResult> {
        self.results.try_iter().collect()
    }

    /// Wait up to `timeout` for one result.
    pub(crate) fn wait(&self, timeout: Duration) -> Option<PoolResult> {
        match self.results.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Stop accepting work and wait for the workers to exit.
    pub(crate) fn join(mut self) {
        self.sender.take();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("Ingestion worker panicked during shutdown");
            }
        }
    }
}

impl Drop for IngestPool {
    fn drop(&mut self) {
        // Workers notice the closed queue after their current file; they are
        // not joined here because that file may still be waiting on a timeout.
        self.sender.take();
    }
}
