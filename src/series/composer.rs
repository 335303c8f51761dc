use log::{debug, info, warn};

use crate::matcher::MatchedMicrographs;
use crate::metadata::{SeriesMetadata, TiltRecord};
use crate::micrographs::MicrographRecord;
use crate::writer::{PixelConverter, SeriesSink, SinkError};

use super::types::{TiltImage, TiltSeries};
use super::ComposeError;

/// A tilt that could not be added to its series.
#[derive(Debug)]
pub struct FrameFailure {
    /// Movie named by the tilt record
    pub movie_filename: String,
    /// 1-based acquisition order of the tilt record
    pub acquisition_order: u32,
    /// What went wrong
    pub error: ComposeError,
}

/// Outcome of composing one series.
#[derive(Debug)]
pub struct Composition {
    /// The closed series as appended to the sink
    pub series: TiltSeries,
    /// Number of tilts attempted
    pub attempted: usize,
    /// Tilts that were skipped
    pub failures: Vec<FrameFailure>,
}

impl Composition {
    /// Number of images that made it into the series.
    pub fn succeeded(&self) -> usize {
        self.series.angles_count()
    }

    /// Whether any tilt was skipped.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Turns matched metadata and micrographs into an angle-ordered series.
pub struct Composer<'a> {
    converter: &'a dyn PixelConverter,
}

impl<'a> Composer<'a> {
    /// Create a composer writing pixel data through `converter`.
    pub fn new(converter: &'a dyn PixelConverter) -> Self {
        Self { converter }
    }

    /// Compose the series and append it to `sink`.
    ///
    /// Images follow `matched` as it was paired in file order; sorting by
    /// angle only reorders them. Per-image failures are recorded in the
    /// returned [`Composition`] and the image skipped; only sink errors are
    /// returned as `Err`. The caller commits.
    pub fn compose<S: SeriesSink + ?Sized>(
        &self,
        metadata: &SeriesMetadata,
        matched: &MatchedMicrographs,
        sink: &mut S,
    ) -> Result<Composition, SinkError> {
        if sink.contains(&metadata.series_id) {
            return Err(SinkError::DuplicateSeries(metadata.series_id.clone()));
        }
        sink.open()?;

        let mut sorted: Vec<usize> = (0..metadata.tilts.len()).collect();
        sorted.sort_by(|&a, &b| {
            metadata.tilts[a]
                .tilt_angle
                .total_cmp(&metadata.tilts[b].tilt_angle)
        });

        let accumulated = metadata.accumulated_doses();
        let incoming = metadata.incoming_doses();

        let mut series = TiltSeries::new(
            &metadata.series_id,
            metadata.acquisition,
            &metadata.source_path,
            metadata.tilt_count(),
        );
        series.sampling_rate = matched
            .micrographs()
            .first()
            .map(|m| m.sampling_rate)
            .or(metadata.pixel_spacing)
            .unwrap_or(0.0);

        let mut failures = Vec::new();
        for &position in &sorted {
            let record = &metadata.tilts[position];
            let index = series.angles_count() as u32;
            let built = matched
                .for_record(position)
                .ok_or_else(|| ComposeError::NoMicrograph(record.movie_filename.clone()))
                .and_then(|micrograph| {
                    self.build_image(&metadata.series_id, index, record, micrograph, &accumulated, &incoming)
                })
                .and_then(|image| series.append(image));

            if let Err(error) = built {
                warn!(
                    "{}: skipping tilt {} ({}): {}",
                    metadata.series_id, record.acquisition_order, record.movie_filename, error
                );
                failures.push(FrameFailure {
                    movie_filename: record.movie_filename.clone(),
                    acquisition_order: record.acquisition_order,
                    error,
                });
            }
        }

        // Cannot fail: the series was created open above
        if let Err(e) = series.close() {
            debug!("{}", e);
        }
        sink.append(&series)?;
        sink.close()?;

        if failures.is_empty() {
            info!(
                "Composed tilt series {} ({} tilts)",
                series.ts_id,
                series.angles_count()
            );
        } else {
            warn!(
                "Composed partial tilt series {}: {} of {} tilts",
                series.ts_id,
                series.angles_count(),
                sorted.len()
            );
        }

        Ok(Composition {
            series,
            attempted: sorted.len(),
            failures,
        })
    }

    fn build_image(
        &self,
        ts_id: &str,
        index: u32,
        record: &TiltRecord,
        micrograph: &MicrographRecord,
        accumulated: &[f64],
        incoming: &[f64],
    ) -> Result<TiltImage, ComposeError> {
        let dose_index = (record.acquisition_order as usize).wrapping_sub(1);
        let (accumulated_dose, dose_per_frame) =
            match (accumulated.get(dose_index), incoming.get(dose_index)) {
                (Some(&acc), Some(&inc)) => (acc, inc),
                _ => {
                    return Err(ComposeError::DoseIndexOutOfRange {
                        order: record.acquisition_order,
                        available: accumulated.len(),
                    })
                }
            };

        let location = self
            .converter
            .destination_for(ts_id, index, &micrograph.location);
        self.converter.convert(&micrograph.location, &location)?;

        Ok(TiltImage {
            ts_id: ts_id.to_string(),
            index,
            acquisition_order: record.acquisition_order,
            tilt_angle: record.tilt_angle,
            sampling_rate: micrograph.sampling_rate,
            dose_per_frame,
            accumulated_dose,
            location,
        })
    }
}
