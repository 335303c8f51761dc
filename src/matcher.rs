//! Reconciliation of tilt records with the micrographs that exist for them.
//!
//! Movie names recorded by the acquisition software rarely equal the names
//! of the processed micrographs. A record is paired with a micrograph in
//! three passes, each only considering micrographs not yet taken:
//!
//! 1. exact name equality
//! 2. equal file stems (`TS_01_000.tif` ~ `TS_01_000.mrc`)
//! 3. the first micrograph, in snapshot order, whose name contains the movie
//!    name (`TS_01_000.tif` ~ `job12_TS_01_000.tif_aligned.mrc`)

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use crate::clock::{Clock, StopHandle};
use crate::metadata::{movie_basename, TiltRecord};
use crate::micrographs::{file_stem, MicrographRecord, MicrographSource, RegistryError};

/// Which rule paired a movie with a micrograph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchTier {
    /// Names are identical
    Exact,
    /// Names are identical once extensions are removed
    Stem,
    /// The micrograph name contains the movie name
    Substring,
}

const TIERS: [MatchTier; 3] = [MatchTier::Exact, MatchTier::Stem, MatchTier::Substring];

impl MatchTier {
    fn accepts(self, movie: &str, micrograph: &MicrographRecord) -> bool {
        match self {
            MatchTier::Exact => micrograph.name == movie,
            MatchTier::Stem => micrograph.stem() == file_stem(movie),
            MatchTier::Substring => micrograph.name.contains(movie),
        }
    }
}

/// Errors that end matching for one series.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// The micrograph source stopped growing before every tilt was covered
    #[error("Micrograph source stalled: expected {expected}, observed {observed}")]
    Stalled {
        /// Number of tilt records
        expected: usize,
        /// Micrographs available when growth stopped
        observed: usize,
    },

    /// Enough micrographs exist but some tilts have no counterpart
    #[error("Matched {matched} of {expected} tilts; unmatched movies: {}", .unmatched.join(", "))]
    NameMismatch {
        /// Number of tilt records
        expected: usize,
        /// Number of tilts paired with a micrograph
        matched: usize,
        /// Movie names left without a micrograph
        unmatched: Vec<String>,
    },

    /// The micrograph source could not be read
    #[error("Micrograph source error: {0}")]
    Registry(#[from] RegistryError),

    /// A stop was requested while waiting
    #[error("Matching cancelled")]
    Cancelled,
}

/// Find the micrograph for one movie among all of `micrographs`.
pub fn locate(movie: &str, micrographs: &[MicrographRecord]) -> Option<(usize, MatchTier)> {
    let movie = movie_basename(movie);
    TIERS.iter().find_map(|&tier| {
        micrographs
            .iter()
            .position(|m| tier.accepts(movie, m))
            .map(|i| (i, tier))
    })
}

/// Pair each record with a distinct micrograph.
///
/// Returns, for each record in input order, the index of its micrograph.
/// Stronger tiers are resolved for all records before weaker ones, so a loose
/// substring hit never steals a micrograph another record names exactly.
pub fn assign(records: &[TiltRecord], micrographs: &[MicrographRecord]) -> Vec<Option<usize>> {
    let mut assignment = vec![None; records.len()];
    let mut taken = vec![false; micrographs.len()];

    for tier in TIERS {
        for (slot, record) in assignment.iter_mut().zip(records) {
            if slot.is_some() {
                continue;
            }
            let movie = movie_basename(&record.movie_filename);
            let hit = micrographs
                .iter()
                .enumerate()
                .position(|(i, m)| !taken[i] && tier.accepts(movie, m));
            if let Some(i) = hit {
                taken[i] = true;
                *slot = Some(i);
            }
        }
    }

    assignment
}

/// The micrographs paired with a series, and which record each belongs to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchedMicrographs {
    micrographs: Vec<MicrographRecord>,
    assignment: Vec<Option<usize>>,
}

impl MatchedMicrographs {
    /// Pair `records`, in file order, against `micrographs`.
    ///
    /// Only paired micrographs are kept, in their original order.
    pub fn pair(records: &[TiltRecord], micrographs: Vec<MicrographRecord>) -> Self {
        let assignment = assign(records, &micrographs);

        let mut used = vec![false; micrographs.len()];
        for &i in assignment.iter().flatten() {
            used[i] = true;
        }
        let mut kept = Vec::with_capacity(records.len());
        let mut position = vec![None; micrographs.len()];
        for (i, micrograph) in micrographs.into_iter().enumerate() {
            if used[i] {
                position[i] = Some(kept.len());
                kept.push(micrograph);
            }
        }

        Self {
            assignment: assignment.into_iter().map(|slot| slot.and_then(|i| position[i])).collect(),
            micrographs: kept,
        }
    }

    /// Paired micrographs in snapshot order.
    pub fn micrographs(&self) -> &[MicrographRecord] {
        &self.micrographs
    }

    /// Number of paired micrographs.
    pub fn len(&self) -> usize {
        self.micrographs.len()
    }

    /// True when nothing was paired.
    pub fn is_empty(&self) -> bool {
        self.micrographs.is_empty()
    }

    /// The micrograph paired with the record at `position` in file order.
    pub fn for_record(&self, position: usize) -> Option<&MicrographRecord> {
        self.assignment
            .get(position)
            .copied()
            .flatten()
            .map(|i| &self.micrographs[i])
    }
}

/// Waits for a micrograph source to cover a series, then pairs them.
#[derive(Clone)]
pub struct Matcher {
    clock: Arc<dyn Clock>,
    stop: StopHandle,
    wait: Duration,
    streaming: bool,
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("wait", &self.wait)
            .field("streaming", &self.streaming)
            .finish()
    }
}

impl Matcher {
    /// Create a matcher that sleeps `wait` between snapshots.
    ///
    /// With `streaming` disabled a shortfall fails at once.
    pub fn new(clock: Arc<dyn Clock>, stop: StopHandle, wait: Duration, streaming: bool) -> Self {
        Self {
            clock,
            stop,
            wait,
            streaming,
        }
    }

    /// Wait until `source` holds at least as many micrographs as `records`,
    /// then pair them with the records in file order.
    pub fn match_micrographs(
        &self,
        records: &[TiltRecord],
        source: &dyn MicrographSource,
    ) -> Result<MatchedMicrographs, MatchError> {
        let expected = records.len();
        let mut snapshot = source.snapshot()?;

        while expected > snapshot.len() {
            info!(
                "Waiting for micrographs from {}: {} available, {} expected",
                source.describe(),
                snapshot.len(),
                expected
            );
            if self.stop.is_stopped() {
                return Err(MatchError::Cancelled);
            }
            if !self.streaming {
                return Err(MatchError::Stalled {
                    expected,
                    observed: snapshot.len(),
                });
            }

            self.clock.sleep(self.wait);
            let next = source.snapshot()?;
            if next.len() == snapshot.len() {
                return Err(MatchError::Stalled {
                    expected,
                    observed: next.len(),
                });
            }
            snapshot = next;
        }

        let matched = MatchedMicrographs::pair(records, snapshot.into_records());

        let unmatched: Vec<String> = records
            .iter()
            .enumerate()
            .filter(|(position, _)| matched.for_record(*position).is_none())
            .map(|(_, record)| record.movie_filename.clone())
            .collect();
        if !unmatched.is_empty() {
            return Err(MatchError::NameMismatch {
                expected,
                matched: expected - unmatched.len(),
                unmatched,
            });
        }

        debug!("Matched {} tilts against {}", matched.len(), source.describe());
        Ok(matched)
    }
}
