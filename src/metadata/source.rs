use std::path::Path;
use std::sync::Arc;

use super::records::SeriesMetadata;
use super::MetadataError;

/// Result of reading a metadata file that may still be growing.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// The file parsed and validated
    Complete(SeriesMetadata),

    /// The file is not (yet) a valid description of a series; the reason is
    /// kept for diagnostics
    Incomplete(String),
}

impl ParseOutcome {
    /// Whether the file parsed successfully.
    pub fn is_complete(&self) -> bool {
        matches!(self, ParseOutcome::Complete(_))
    }

    /// Number of tilt records seen so far (zero when incomplete).
    pub fn tilt_count(&self) -> usize {
        match self {
            ParseOutcome::Complete(metadata) => metadata.tilt_count(),
            ParseOutcome::Incomplete(_) => 0,
        }
    }
}

/// Adapter that turns a metadata file path into tilt records.
///
/// Implementations must be callable repeatedly on the same path while the
/// file grows.
pub trait TiltMetadataSource: Send + Sync {
    /// Read and validate the file at `path`.
    fn parse(&self, path: &Path) -> Result<ParseOutcome, MetadataError>;
}

impl<T: TiltMetadataSource + ?Sized> TiltMetadataSource for Arc<T> {
    fn parse(&self, path: &Path) -> Result<ParseOutcome, MetadataError> {
        (**self).parse(path)
    }
}
