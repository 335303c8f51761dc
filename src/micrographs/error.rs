/// Errors that can occur while snapshotting a micrograph source.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// I/O error reading the listing or directory
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV/TSV parsing error
    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    /// Required column missing from a listing
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// A cell could not be interpreted
    #[error("Invalid value in row {row}: {message}")]
    InvalidValue {
        /// 1-based data row
        row: usize,
        /// What was wrong with it
        message: String,
    },
}
