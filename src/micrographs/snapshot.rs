use super::record::MicrographRecord;

/// Point-in-time copy of a micrograph source.
///
/// Owns its records; later growth of the source is only observed by taking a
/// new snapshot.
#[derive(Debug, Clone, Default)]
pub struct MicrographSnapshot {
    records: Vec<MicrographRecord>,
}

impl MicrographSnapshot {
    /// Build a snapshot, preserving record order.
    pub fn new(records: Vec<MicrographRecord>) -> Self {
        Self { records }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in source order.
    pub fn records(&self) -> &[MicrographRecord] {
        &self.records
    }

    /// Iterate records in source order.
    pub fn iter(&self) -> std::slice::Iter<'_, MicrographRecord> {
        self.records.iter()
    }

    /// Consume the snapshot into its records.
    pub fn into_records(self) -> Vec<MicrographRecord> {
        self.records
    }
}

impl From<Vec<MicrographRecord>> for MicrographSnapshot {
    fn from(records: Vec<MicrographRecord>) -> Self {
        Self::new(records)
    }
}

impl<'a> IntoIterator for &'a MicrographSnapshot {
    type Item = &'a MicrographRecord;
    type IntoIter = std::slice::Iter<'a, MicrographRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
