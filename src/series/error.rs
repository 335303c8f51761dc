use crate::writer::ConvertError;

/// Errors affecting a single image (or the series state) during composition.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// No matched micrograph corresponds to the movie
    #[error("No micrograph found for movie {0}")]
    NoMicrograph(String),

    /// The acquisition order does not address a dose entry
    #[error("Acquisition order {order} outside dose list of length {available}")]
    DoseIndexOutOfRange {
        /// 1-based acquisition order of the record
        order: u32,
        /// Length of the dose lists
        available: usize,
    },

    /// Pixel conversion failed
    #[error("Pixel conversion failed: {0}")]
    Conversion(#[from] ConvertError),

    /// The series was already closed
    #[error("Tilt series {0} is closed")]
    SeriesClosed(String),
}
