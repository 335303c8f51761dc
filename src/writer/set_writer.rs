//! Directory-backed output set.
//!
//! ```text
//! <root>/
//! ├── manifest.json
//! ├── series/<ts_id>.parquet
//! ├── frames/<ts_id>/<ts_id>_<NN>.<ext>
//! └── summary.txt
//! ```

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, info};

use crate::schema::TILT_SERIES_EXTENSION;
use crate::series::{StreamState, TiltSeries};

use super::manifest::{SeriesEntry, SetManifest};
use super::sink::{summary_line, SeriesSink};
use super::table::TiltImageTableWriter;
use super::{SinkError, WriterConfig};

/// Directory holding series tables
pub const SERIES_DIR: &str = "series";
/// Directory holding converted frames
pub const FRAMES_DIR: &str = "frames";
/// Run summary file
pub const SUMMARY_FILE: &str = "summary.txt";

/// [`SeriesSink`] persisting to an output directory.
#[derive(Debug)]
pub struct TiltSeriesSetWriter {
    root: PathBuf,
    config: WriterConfig,
    manifest: SetManifest,
    consumed: HashSet<PathBuf>,
    pending_summary: Vec<String>,
}

impl TiltSeriesSetWriter {
    /// Open the set at `root`, creating it if needed.
    ///
    /// An existing manifest is loaded so a restarted run continues the set.
    pub fn create<P: AsRef<Path>>(root: P, config: WriterConfig) -> Result<Self, SinkError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(SERIES_DIR))?;
        fs::create_dir_all(root.join(FRAMES_DIR))?;

        let manifest = match SetManifest::load(&root)? {
            Some(mut manifest) => {
                if manifest.finalized {
                    info!("Reopening finalized output set {}", root.display());
                    manifest.finalized = false;
                }
                info!(
                    "Resuming output set {} ({} series, {} consumed files)",
                    root.display(),
                    manifest.series.len(),
                    manifest.consumed_files.len()
                );
                manifest
            }
            None => {
                let manifest = SetManifest::new();
                manifest.save(&root)?;
                manifest
            }
        };
        let consumed = manifest.consumed_files.iter().cloned().collect();

        Ok(Self {
            root,
            config,
            manifest,
            consumed,
            pending_summary: Vec::new(),
        })
    }

    /// Set root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Frame store directory.
    pub fn frames_dir(&self) -> PathBuf {
        self.root.join(FRAMES_DIR)
    }

    /// In-memory view of the manifest.
    pub fn manifest(&self) -> &SetManifest {
        &self.manifest
    }

    /// Table path of a series, relative to the root.
    pub fn table_path(ts_id: &str) -> PathBuf {
        Path::new(SERIES_DIR).join(format!("{}{}", ts_id, TILT_SERIES_EXTENSION))
    }

    fn ensure_writable(&self) -> Result<(), SinkError> {
        if self.manifest.finalized {
            return Err(SinkError::Finalized);
        }
        Ok(())
    }
}

impl SeriesSink for TiltSeriesSetWriter {
    fn open(&mut self) -> Result<(), SinkError> {
        self.ensure_writable()?;
        self.manifest.state = StreamState::Open;
        Ok(())
    }

    fn append(&mut self, series: &TiltSeries) -> Result<(), SinkError> {
        self.ensure_writable()?;
        if self.manifest.state != StreamState::Open {
            return Err(SinkError::NotOpen);
        }
        if series.stream_state() != StreamState::Closed {
            return Err(SinkError::SeriesOpen(series.ts_id.clone()));
        }
        if self.contains(&series.ts_id) {
            return Err(SinkError::DuplicateSeries(series.ts_id.clone()));
        }

        let relative = Self::table_path(&series.ts_id);
        let mut writer =
            TiltImageTableWriter::new_file(self.root.join(&relative), series, &self.config)?;
        writer.write_images(series.images())?;
        let stats = writer.finish()?;
        debug!("{}: {}", series.ts_id, stats);

        self.manifest.series.push(SeriesEntry::new(series, relative));
        self.pending_summary.push(summary_line(series));
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.manifest.state = StreamState::Closed;
        Ok(())
    }

    fn commit(&mut self, consumed: &[PathBuf]) -> Result<(), SinkError> {
        self.ensure_writable()?;
        for path in consumed {
            if self.consumed.insert(path.clone()) {
                self.manifest.consumed_files.push(path.clone());
            }
        }
        self.manifest.updated = Utc::now();
        self.manifest.save(&self.root)?;

        if !self.pending_summary.is_empty() {
            let mut summary = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.root.join(SUMMARY_FILE))?;
            for line in self.pending_summary.drain(..) {
                writeln!(summary, "{}", line)?;
            }
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SinkError> {
        if self.manifest.finalized {
            return Ok(());
        }
        self.manifest.state = StreamState::Closed;
        self.manifest.finalized = true;
        self.manifest.updated = Utc::now();
        self.manifest.save(&self.root)?;
        info!(
            "Finalized output set {} with {} series",
            self.root.display(),
            self.manifest.series.len()
        );
        Ok(())
    }

    fn stream_state(&self) -> StreamState {
        self.manifest.state
    }

    fn contains(&self, ts_id: &str) -> bool {
        self.manifest.entry(ts_id).is_some()
    }

    fn consumed(&self) -> Vec<PathBuf> {
        self.manifest.consumed_files.clone()
    }

    fn series_count(&self) -> usize {
        self.manifest.series.len()
    }
}
