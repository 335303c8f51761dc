use std::fmt;

/// Statistics from a completed table write
#[derive(Debug, Clone)]
pub struct TableWriterStats {
    /// Number of tilt images written
    pub images_written: usize,
    /// Number of Parquet row groups written
    pub row_groups_written: usize,
    /// Total uncompressed row-group size in bytes
    pub file_size_bytes: u64,
}

impl fmt::Display for TableWriterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wrote {} tilt images in {} row groups",
            self.images_written, self.row_groups_written
        )
    }
}
