use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::metadata::AcquisitionInfo;

use super::ComposeError;

/// Whether a tilt series (or the output collection) accepts more images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    /// Images may still be appended
    #[default]
    Open,
    /// Finished; no further appends
    Closed,
}

/// Where the pixel data of one tilt image lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelLocation {
    /// File holding the image
    pub path: PathBuf,
    /// Image index within `path`; 0 for single-image files
    pub index: u32,
}

impl PixelLocation {
    /// A single-image file.
    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            index: 0,
        }
    }
}

/// One image of a composed tilt series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiltImage {
    /// Owning series
    pub ts_id: String,
    /// 0-based position in the angle-ordered series
    pub index: u32,
    /// 1-based position in the acquisition sequence
    pub acquisition_order: u32,
    /// Stage tilt angle in degrees
    pub tilt_angle: f64,
    /// Sampling rate in Å/px
    pub sampling_rate: f64,
    /// Dose delivered by this image (e/Å²)
    pub dose_per_frame: f64,
    /// Dose accumulated up to and including this image (e/Å²)
    pub accumulated_dose: f64,
    /// Converted pixel data
    pub location: PixelLocation,
}

/// A tilt series, built image by image and then closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiltSeries {
    /// Series identifier
    pub ts_id: String,
    /// Acquisition attributes from the metadata file
    pub acquisition: AcquisitionInfo,
    /// Series sampling rate in Å/px
    pub sampling_rate: f64,
    /// Metadata file the series was composed from
    pub source_mdoc: PathBuf,
    /// Number of tilts the metadata file describes
    pub frames_expected: usize,
    angles_count: usize,
    stream_state: StreamState,
    images: Vec<TiltImage>,
}

impl TiltSeries {
    /// Start an open, empty series.
    pub fn new(
        ts_id: impl Into<String>,
        acquisition: AcquisitionInfo,
        source_mdoc: impl Into<PathBuf>,
        frames_expected: usize,
    ) -> Self {
        Self {
            ts_id: ts_id.into(),
            acquisition,
            sampling_rate: 0.0,
            source_mdoc: source_mdoc.into(),
            frames_expected,
            angles_count: 0,
            stream_state: StreamState::Open,
            images: Vec::with_capacity(frames_expected),
        }
    }

    /// Append an image. Fails once the series is closed.
    pub fn append(&mut self, image: TiltImage) -> Result<(), ComposeError> {
        if self.stream_state == StreamState::Closed {
            return Err(ComposeError::SeriesClosed(self.ts_id.clone()));
        }
        self.images.push(image);
        Ok(())
    }

    /// Close the series, fixing its angle count. Closing twice is an error.
    pub fn close(&mut self) -> Result<(), ComposeError> {
        if self.stream_state == StreamState::Closed {
            return Err(ComposeError::SeriesClosed(self.ts_id.clone()));
        }
        self.angles_count = self.images.len();
        self.stream_state = StreamState::Closed;
        Ok(())
    }

    /// Number of images; fixed when the series is closed.
    pub fn angles_count(&self) -> usize {
        match self.stream_state {
            StreamState::Open => self.images.len(),
            StreamState::Closed => self.angles_count,
        }
    }

    /// Current state.
    pub fn stream_state(&self) -> StreamState {
        self.stream_state
    }

    /// Images in series order.
    pub fn images(&self) -> &[TiltImage] {
        &self.images
    }

    /// Whether some described tilts did not make it into the series.
    pub fn is_partial(&self) -> bool {
        self.angles_count() < self.frames_expected
    }
}
