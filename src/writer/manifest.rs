//! `manifest.json`: the durable state of an output set.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metadata::AcquisitionInfo;
use crate::schema::TILT_SERIES_FORMAT_VERSION;
use crate::series::{StreamState, TiltSeries};

use super::SinkError;

/// Manifest file name within an output set
pub const MANIFEST_FILE: &str = "manifest.json";

/// One committed series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesEntry {
    /// Series identifier
    pub ts_id: String,
    /// Table path relative to the set root
    pub table: PathBuf,
    /// Images in the table
    pub angles_count: usize,
    /// Tilts described by the metadata file
    pub frames_expected: usize,
    /// Series sampling rate in Å/px
    pub sampling_rate: f64,
    /// Acquisition attributes
    pub acquisition: AcquisitionInfo,
    /// Metadata file the series was composed from
    pub source_mdoc: PathBuf,
    /// When the series was appended
    pub composed_at: DateTime<Utc>,
}

impl SeriesEntry {
    /// Describe `series`, stored at `table`.
    pub fn new(series: &TiltSeries, table: PathBuf) -> Self {
        Self {
            ts_id: series.ts_id.clone(),
            table,
            angles_count: series.angles_count(),
            frames_expected: series.frames_expected,
            sampling_rate: series.sampling_rate,
            acquisition: series.acquisition,
            source_mdoc: series.source_mdoc.clone(),
            composed_at: Utc::now(),
        }
    }

    /// Whether some described tilts are missing from the table.
    pub fn is_partial(&self) -> bool {
        self.angles_count < self.frames_expected
    }
}

/// Durable state of an output set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetManifest {
    /// Table format version
    pub format_version: String,
    /// Identifier of the run that created the set
    pub run_id: Uuid,
    /// Creation time
    pub created: DateTime<Utc>,
    /// Last commit time
    pub updated: DateTime<Utc>,
    /// Collection state at the last commit
    pub state: StreamState,
    /// Set once the stream terminated
    pub finalized: bool,
    /// Committed series, in commit order
    pub series: Vec<SeriesEntry>,
    /// Metadata files whose outcome is final, in commit order
    pub consumed_files: Vec<PathBuf>,
}

impl Default for SetManifest {
    fn default() -> Self {
        Self::new()
    }
}

impl SetManifest {
    /// Empty manifest for a new run.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            format_version: TILT_SERIES_FORMAT_VERSION.to_string(),
            run_id: Uuid::new_v4(),
            created: now,
            updated: now,
            state: StreamState::Closed,
            finalized: false,
            series: Vec::new(),
            consumed_files: Vec::new(),
        }
    }

    /// Load the manifest of the set at `root`, if there is one.
    pub fn load(root: &Path) -> Result<Option<Self>, SinkError> {
        match fs::read_to_string(root.join(MANIFEST_FILE)) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the manifest of the set at `root`.
    ///
    /// Readers see either the previous or the new manifest, never a mix.
    pub fn save(&self, root: &Path) -> Result<(), SinkError> {
        let mut staged = tempfile::NamedTempFile::new_in(root)?;
        serde_json::to_writer_pretty(&mut staged, self)?;
        staged.write_all(b"\n")?;
        staged.as_file().sync_all()?;
        staged.persist(root.join(MANIFEST_FILE))?;
        Ok(())
    }

    /// Look up a committed series.
    pub fn entry(&self, ts_id: &str) -> Option<&SeriesEntry> {
        self.series.iter().find(|e| e.ts_id == ts_id)
    }
}
