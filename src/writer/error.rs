/// Errors that can occur while persisting tilt series
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from the Arrow library during array operations
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Error from the Parquet library during file writing
    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    /// Manifest serialization error
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Atomic replacement of the manifest failed
    #[error("Failed to replace manifest: {0}")]
    PersistError(#[from] tempfile::PersistError),

    /// A table on disk does not have the tilt-image layout
    #[error("Invalid tilt-series table: {0}")]
    SchemaError(#[from] crate::schema::SchemaValidationError),

    /// A table on disk could not be decoded
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A series with this identifier was already appended
    #[error("Tilt series {0} already exists in the output")]
    DuplicateSeries(String),

    /// Append attempted while the collection is closed
    #[error("Output collection is not open")]
    NotOpen,

    /// Append of a series that is still open
    #[error("Tilt series {0} is still open")]
    SeriesOpen(String),

    /// Write attempted after the output was finalized
    #[error("Output has been finalized")]
    Finalized,
}
