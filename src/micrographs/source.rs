use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::debug;

use super::record::MicrographRecord;
use super::snapshot::MicrographSnapshot;
use super::RegistryError;

/// Image extensions picked up by [`MicrographDirectory`]
pub const MICROGRAPH_EXTENSIONS: &[&str] = &["mrc", "mrcs", "tif", "tiff"];

/// A growing collection of processed micrographs.
pub trait MicrographSource: Send + Sync {
    /// Take an owned copy of the current contents.
    fn snapshot(&self) -> Result<MicrographSnapshot, RegistryError>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

impl<T: MicrographSource + ?Sized> MicrographSource for Arc<T> {
    fn snapshot(&self) -> Result<MicrographSnapshot, RegistryError> {
        (**self).snapshot()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Micrographs listed in a CSV or TSV file that an upstream stage keeps
/// appending to.
///
/// Required columns: `name`, `location` (or `path`) and `sampling_rate`.
/// Relative locations are resolved against the listing's directory.
#[derive(Debug, Clone)]
pub struct MicrographListFile {
    path: PathBuf,
}

impl MicrographListFile {
    /// Watch the listing at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Listing path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn delimiter(&self) -> u8 {
        match self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("tsv") | Some("txt") => b'\t',
            _ => b',',
        }
    }

    /// Parse a listing from any reader.
    pub fn parse_listing<R: Read>(
        reader: R,
        delimiter: u8,
        base_dir: &Path,
    ) -> Result<Vec<MicrographRecord>, RegistryError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|s| s.trim().to_lowercase())
            .collect();

        let column = |names: &[&str]| headers.iter().position(|h| names.contains(&h.as_str()));
        let name_col =
            column(&["name", "micrograph"]).ok_or_else(|| RegistryError::MissingColumn("name".into()))?;
        let location_col = column(&["location", "path", "file"])
            .ok_or_else(|| RegistryError::MissingColumn("location".into()))?;
        let rate_col = column(&["sampling_rate", "samplingrate", "pixel_size"])
            .ok_or_else(|| RegistryError::MissingColumn("sampling_rate".into()))?;

        let mut records = Vec::new();
        let mut rows = csv_reader.records().enumerate().peekable();
        while let Some((row, record)) = rows.next() {
            let record = record?;
            // The producer may still be writing the last line
            let last = rows.peek().is_none();
            if last && record.len() < headers.len() {
                debug!("Skipping incomplete trailing row {}", row + 1);
                continue;
            }

            let name = record.get(name_col).unwrap_or("");
            if name.is_empty() {
                continue;
            }

            let location = record.get(location_col).unwrap_or("");
            let location = if location.is_empty() {
                base_dir.join(name)
            } else {
                let location = PathBuf::from(location);
                if location.is_absolute() {
                    location
                } else {
                    base_dir.join(location)
                }
            };

            let raw_rate = record.get(rate_col).unwrap_or("");
            let sampling_rate = match raw_rate.parse::<f64>() {
                Ok(rate) => rate,
                Err(_) if last => {
                    debug!("Skipping incomplete trailing row {}", row + 1);
                    continue;
                }
                Err(_) => {
                    return Err(RegistryError::InvalidValue {
                        row: row + 1,
                        message: format!("sampling_rate '{}' is not a number", raw_rate),
                    })
                }
            };

            records.push(MicrographRecord::new(name, location, sampling_rate));
        }

        Ok(records)
    }
}

impl MicrographSource for MicrographListFile {
    fn snapshot(&self) -> Result<MicrographSnapshot, RegistryError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Micrograph listing {} not present yet", self.path.display());
                return Ok(MicrographSnapshot::default());
            }
            Err(e) => return Err(e.into()),
        };

        let base_dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let records = Self::parse_listing(BufReader::new(file), self.delimiter(), base_dir)?;
        Ok(MicrographSnapshot::new(records))
    }

    fn describe(&self) -> String {
        format!("micrograph listing {}", self.path.display())
    }
}

/// Micrograph images found directly inside a directory.
///
/// The directory carries no per-image sampling rate, so one rate applies to
/// every image.
#[derive(Debug, Clone)]
pub struct MicrographDirectory {
    directory: PathBuf,
    sampling_rate: f64,
}

impl MicrographDirectory {
    /// Watch `directory`, assigning `sampling_rate` to every image.
    pub fn new(directory: impl Into<PathBuf>, sampling_rate: f64) -> Self {
        Self {
            directory: directory.into(),
            sampling_rate,
        }
    }
}

impl MicrographSource for MicrographDirectory {
    fn snapshot(&self) -> Result<MicrographSnapshot, RegistryError> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(MicrographSnapshot::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| MICROGRAPH_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if !is_image {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                records.push(MicrographRecord::new(name, path.clone(), self.sampling_rate));
            }
        }
        // read_dir order is platform-defined
        records.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(MicrographSnapshot::new(records))
    }

    fn describe(&self) -> String {
        format!("micrograph directory {}", self.directory.display())
    }
}

/// Micrographs pushed programmatically by the embedding application.
#[derive(Debug, Clone, Default)]
pub struct SharedMicrographs {
    records: Arc<Mutex<Vec<MicrographRecord>>>,
}

impl SharedMicrographs {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record; visible to the next snapshot.
    pub fn push(&self, record: MicrographRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }

    /// Append several records.
    pub fn extend(&self, records: impl IntoIterator<Item = MicrographRecord>) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(records);
    }
}

impl MicrographSource for SharedMicrographs {
    fn snapshot(&self) -> Result<MicrographSnapshot, RegistryError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner()).clone();
        Ok(MicrographSnapshot::new(records))
    }

    fn describe(&self) -> String {
        "in-memory micrographs".to_string()
    }
}
