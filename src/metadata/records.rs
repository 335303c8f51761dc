use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::MetadataError;

/// One frame of a tilt series as described by its metadata file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiltRecord {
    /// Movie file name (directory components already stripped)
    pub movie_filename: String,

    /// Position in the acquisition sequence (1-based, dense)
    pub acquisition_order: u32,

    /// Stage tilt angle in degrees
    pub tilt_angle: f64,

    /// Dose accumulated by the specimen up to and including this frame (e/Å²)
    pub accumulated_dose: f64,

    /// Dose delivered by this frame alone (e/Å²)
    pub incoming_dose: f64,
}

impl TiltRecord {
    /// Create a record with zero dose.
    pub fn new(movie_filename: impl Into<String>, acquisition_order: u32, tilt_angle: f64) -> Self {
        Self {
            movie_filename: movie_filename.into(),
            acquisition_order,
            tilt_angle,
            accumulated_dose: 0.0,
            incoming_dose: 0.0,
        }
    }

    /// Set both dose fields.
    pub fn with_dose(mut self, accumulated_dose: f64, incoming_dose: f64) -> Self {
        self.accumulated_dose = accumulated_dose;
        self.incoming_dose = incoming_dose;
        self
    }
}

/// Series-level acquisition attributes shared by every frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AcquisitionInfo {
    /// Accelerating voltage in kV
    pub voltage: f64,

    /// Nominal magnification
    pub magnification: f64,

    /// In-plane angle of the tilt axis in degrees
    pub tilt_axis_angle: f64,
}

/// A fully read metadata file: the acquisition attributes plus its tilt
/// records in the order they were written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMetadata {
    /// Tilt-series identifier, derived from the metadata file name
    pub series_id: String,

    /// Acquisition attributes
    pub acquisition: AcquisitionInfo,

    /// Pixel spacing in Å/px, when the file declares one
    pub pixel_spacing: Option<f64>,

    /// Tilt records in file order
    pub tilts: Vec<TiltRecord>,

    /// Path the metadata was read from
    pub source_path: PathBuf,

    /// Modification time of the source file when it was read
    pub source_modified: SystemTime,
}

impl SeriesMetadata {
    /// Number of tilt records.
    pub fn tilt_count(&self) -> usize {
        self.tilts.len()
    }

    /// Accumulated doses in file order, addressable by `acquisition_order - 1`.
    pub fn accumulated_doses(&self) -> Vec<f64> {
        self.tilts.iter().map(|t| t.accumulated_dose).collect()
    }

    /// Incoming doses in file order, addressable by `acquisition_order - 1`.
    pub fn incoming_doses(&self) -> Vec<f64> {
        self.tilts.iter().map(|t| t.incoming_dose).collect()
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, MetadataError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        Ok(serde_json::from_str(json)?)
    }
}
