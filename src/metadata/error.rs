/// Errors that can occur while reading tilt-series metadata.
///
/// A file that is merely still being written is not an error; it is reported
/// as [`ParseOutcome::Incomplete`](super::ParseOutcome::Incomplete).
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// I/O error reading the metadata file or its attributes
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The path does not name a usable metadata file
    #[error("Invalid metadata path: {0}")]
    InvalidPath(String),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}
