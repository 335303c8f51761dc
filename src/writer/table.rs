//! Parquet table holding one tilt series.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, Float64Array, Float64Builder, Int32Array, Int32Builder, StringArray,
    StringBuilder,
};
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use crate::schema::{
    columns, create_tilt_image_schema_arc, validate_schema, KEY_CONVERTER_INFO,
    KEY_CREATION_TIMESTAMP, KEY_FORMAT_VERSION, KEY_FRAMES_EXPECTED, KEY_MAGNIFICATION,
    KEY_SOURCE_MDOC, KEY_TILT_AXIS_ANGLE, KEY_TS_ID, KEY_VOLTAGE, TILT_SERIES_FORMAT_VERSION,
};
use crate::series::{PixelLocation, TiltImage, TiltSeries};

use super::{SinkError, TableWriterStats, WriterConfig};

/// Footer key/value metadata describing a series.
pub fn series_footer_metadata(series: &TiltSeries) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert(
        KEY_FORMAT_VERSION.to_string(),
        TILT_SERIES_FORMAT_VERSION.to_string(),
    );
    metadata.insert(
        KEY_CREATION_TIMESTAMP.to_string(),
        chrono::Utc::now().to_rfc3339(),
    );
    metadata.insert(
        KEY_CONVERTER_INFO.to_string(),
        format!("tomostream v{}", env!("CARGO_PKG_VERSION")),
    );
    metadata.insert(KEY_TS_ID.to_string(), series.ts_id.clone());
    metadata.insert(KEY_VOLTAGE.to_string(), series.acquisition.voltage.to_string());
    metadata.insert(
        KEY_MAGNIFICATION.to_string(),
        series.acquisition.magnification.to_string(),
    );
    metadata.insert(
        KEY_TILT_AXIS_ANGLE.to_string(),
        series.acquisition.tilt_axis_angle.to_string(),
    );
    metadata.insert(
        KEY_SOURCE_MDOC.to_string(),
        series.source_mdoc.display().to_string(),
    );
    metadata.insert(
        KEY_FRAMES_EXPECTED.to_string(),
        series.frames_expected.to_string(),
    );
    metadata
}

/// Writer for a tilt-series table
pub struct TiltImageTableWriter<W: Write + Send> {
    writer: ArrowWriter<W>,
    schema: Arc<Schema>,
    images_written: usize,
}

impl TiltImageTableWriter<File> {
    /// Create a new writer to a file path
    pub fn new_file<P: AsRef<Path>>(
        path: P,
        series: &TiltSeries,
        config: &WriterConfig,
    ) -> Result<Self, SinkError> {
        let file = File::create(path)?;
        Self::new(file, series, config)
    }
}

impl<W: Write + Send> TiltImageTableWriter<W> {
    /// Create a new writer to any Write implementation
    pub fn new(writer: W, series: &TiltSeries, config: &WriterConfig) -> Result<Self, SinkError> {
        let schema = create_tilt_image_schema_arc();
        let props = config.to_writer_properties(&series_footer_metadata(series));
        let arrow_writer = ArrowWriter::try_new(writer, schema.clone(), Some(props))?;

        Ok(Self {
            writer: arrow_writer,
            schema,
            images_written: 0,
        })
    }

    /// Write a batch of images
    pub fn write_images(&mut self, images: &[TiltImage]) -> Result<(), SinkError> {
        if images.is_empty() {
            return Ok(());
        }

        let n = images.len();
        let mut ts_id = StringBuilder::with_capacity(n, n * 8);
        let mut index = Int32Builder::with_capacity(n);
        let mut acquisition_order = Int32Builder::with_capacity(n);
        let mut tilt_angle = Float64Builder::with_capacity(n);
        let mut sampling_rate = Float64Builder::with_capacity(n);
        let mut dose_per_frame = Float64Builder::with_capacity(n);
        let mut accumulated_dose = Float64Builder::with_capacity(n);
        let mut location = StringBuilder::with_capacity(n, n * 64);
        let mut location_index = Int32Builder::with_capacity(n);

        for image in images {
            ts_id.append_value(&image.ts_id);
            index.append_value(image.index as i32);
            acquisition_order.append_value(image.acquisition_order as i32);
            tilt_angle.append_value(image.tilt_angle);
            sampling_rate.append_value(image.sampling_rate);
            dose_per_frame.append_value(image.dose_per_frame);
            accumulated_dose.append_value(image.accumulated_dose);
            location.append_value(image.location.path.to_string_lossy());
            location_index.append_value(image.location.index as i32);
        }

        let arrays: Vec<ArrayRef> = vec![
            Arc::new(ts_id.finish()),
            Arc::new(index.finish()),
            Arc::new(acquisition_order.finish()),
            Arc::new(tilt_angle.finish()),
            Arc::new(sampling_rate.finish()),
            Arc::new(dose_per_frame.finish()),
            Arc::new(accumulated_dose.finish()),
            Arc::new(location.finish()),
            Arc::new(location_index.finish()),
        ];

        let batch = RecordBatch::try_new(self.schema.clone(), arrays)?;
        self.writer.write(&batch)?;
        self.images_written += n;

        Ok(())
    }

    /// Flush any buffered data and finalize the file
    pub fn finish(self) -> Result<TableWriterStats, SinkError> {
        let file_metadata = self.writer.close()?;

        Ok(TableWriterStats {
            images_written: self.images_written,
            row_groups_written: file_metadata.row_groups.len(),
            file_size_bytes: file_metadata
                .row_groups
                .iter()
                .map(|rg| rg.total_byte_size as u64)
                .sum(),
        })
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, SinkError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| SinkError::InvalidData(format!("missing column {}", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| SinkError::InvalidData(format!("{} is not Utf8", name)))
}

fn int32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int32Array, SinkError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| SinkError::InvalidData(format!("missing column {}", name)))?
        .as_any()
        .downcast_ref::<Int32Array>()
        .ok_or_else(|| SinkError::InvalidData(format!("{} is not Int32", name)))
}

fn float64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array, SinkError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| SinkError::InvalidData(format!("missing column {}", name)))?
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| SinkError::InvalidData(format!("{} is not Float64", name)))
}

/// Read the images of a tilt-series table back, in stored order.
pub fn read_tilt_images<P: AsRef<Path>>(path: P) -> Result<Vec<TiltImage>, SinkError> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    validate_schema(builder.schema())?;

    let mut images = Vec::new();
    for batch in builder.build()? {
        let batch = batch?;
        let ts_id = string_column(&batch, columns::TS_ID)?;
        let index = int32_column(&batch, columns::INDEX)?;
        let order = int32_column(&batch, columns::ACQUISITION_ORDER)?;
        let angle = float64_column(&batch, columns::TILT_ANGLE)?;
        let rate = float64_column(&batch, columns::SAMPLING_RATE)?;
        let dose = float64_column(&batch, columns::DOSE_PER_FRAME)?;
        let accumulated = float64_column(&batch, columns::ACCUMULATED_DOSE)?;
        let location = string_column(&batch, columns::LOCATION)?;
        let location_index = int32_column(&batch, columns::LOCATION_INDEX)?;

        for row in 0..batch.num_rows() {
            if ts_id.is_null(row) || location.is_null(row) {
                return Err(SinkError::InvalidData(format!("null value in row {}", row)));
            }
            images.push(TiltImage {
                ts_id: ts_id.value(row).to_string(),
                index: index.value(row) as u32,
                acquisition_order: order.value(row) as u32,
                tilt_angle: angle.value(row),
                sampling_rate: rate.value(row),
                dose_per_frame: dose.value(row),
                accumulated_dose: accumulated.value(row),
                location: PixelLocation {
                    path: PathBuf::from(location.value(row)),
                    index: location_index.value(row) as u32,
                },
            });
        }
    }

    Ok(images)
}
