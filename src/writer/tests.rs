use std::path::{Path, PathBuf};

use tempfile::tempdir;

use super::*;
use crate::metadata::AcquisitionInfo;
use crate::series::{PixelLocation, StreamState, TiltImage, TiltSeries};

fn sample_series(ts_id: &str, angles: &[f64]) -> TiltSeries {
    let acquisition = AcquisitionInfo {
        voltage: 300.0,
        magnification: 64000.0,
        tilt_axis_angle: 85.3,
    };
    let mut series = TiltSeries::new(ts_id, acquisition, format!("/mdoc/{}.mdoc", ts_id), angles.len());
    series.sampling_rate = 1.35;
    for (i, &angle) in angles.iter().enumerate() {
        series
            .append(TiltImage {
                ts_id: ts_id.to_string(),
                index: i as u32,
                acquisition_order: i as u32 + 1,
                tilt_angle: angle,
                sampling_rate: 1.35,
                dose_per_frame: 3.0,
                accumulated_dose: 3.0 * (i + 1) as f64,
                location: PixelLocation::single(format!("/frames/{}_{:02}.mrc", ts_id, i)),
            })
            .unwrap();
    }
    series.close().unwrap();
    series
}

#[test]
fn test_table_roundtrip() -> Result<(), SinkError> {
    let dir = tempdir()?;
    let path = dir.path().join("TS_01.parquet");
    let series = sample_series("TS_01", &[-3.0, 0.0, 3.0]);

    let mut writer = TiltImageTableWriter::new_file(&path, &series, &WriterConfig::default())?;
    writer.write_images(series.images())?;
    let stats = writer.finish()?;
    assert_eq!(stats.images_written, 3);
    assert_eq!(stats.row_groups_written, 1);

    let images = read_tilt_images(&path)?;
    assert_eq!(images, series.images());
    Ok(())
}

#[test]
fn test_table_compression_options() -> Result<(), SinkError> {
    let dir = tempdir()?;
    let series = sample_series("TS_03", &[-6.0, -3.0, 0.0, 3.0]);

    for (name, compression) in [
        ("snappy", CompressionType::Snappy),
        ("none", CompressionType::Uncompressed),
        ("zstd", CompressionType::Zstd(9)),
    ] {
        let config = WriterConfig {
            compression,
            row_group_size: 2,
            ..WriterConfig::default()
        };
        let path = dir.path().join(format!("{}.parquet", name));
        let mut writer = TiltImageTableWriter::new_file(&path, &series, &config)?;
        writer.write_images(series.images())?;
        writer.finish()?;

        assert_eq!(read_tilt_images(&path)?, series.images());
    }
    Ok(())
}

#[test]
fn test_footer_metadata() {
    let series = sample_series("TS_02", &[0.0]);
    let metadata = series_footer_metadata(&series);
    assert_eq!(metadata.get(crate::schema::KEY_VOLTAGE), Some(&"300".to_string()));
    assert_eq!(
        metadata.get(crate::schema::KEY_SOURCE_MDOC),
        Some(&"/mdoc/TS_02.mdoc".to_string())
    );
    assert!(metadata.contains_key(crate::schema::KEY_CREATION_TIMESTAMP));
}

#[test]
fn test_set_writer_commit_and_resume() -> Result<(), SinkError> {
    let dir = tempdir()?;
    let mdoc = PathBuf::from("/mdoc/TS_01.mdoc");

    {
        let mut writer = TiltSeriesSetWriter::create(dir.path(), WriterConfig::default())?;
        writer.open()?;
        writer.append(&sample_series("TS_01", &[-3.0, 0.0, 3.0]))?;
        writer.close()?;
        writer.commit(&[mdoc.clone()])?;
        assert_eq!(writer.stream_state(), StreamState::Closed);
    }

    let manifest = SetManifest::load(dir.path())?.expect("manifest written");
    assert_eq!(manifest.series.len(), 1);
    assert_eq!(manifest.series[0].table, Path::new("series/TS_01.parquet"));
    assert_eq!(manifest.consumed_files, vec![mdoc.clone()]);
    assert!(!manifest.finalized);

    let summary = std::fs::read_to_string(dir.path().join(SUMMARY_FILE))?;
    assert_eq!(
        summary,
        "Tilt series TS_01 (3 tilts) composed from mdoc file: /mdoc/TS_01.mdoc\n"
    );

    let resumed = TiltSeriesSetWriter::create(dir.path(), WriterConfig::default())?;
    assert_eq!(resumed.consumed(), vec![mdoc]);
    assert!(resumed.contains("TS_01"));
    assert_eq!(resumed.manifest().run_id, manifest.run_id);
    Ok(())
}

#[test]
fn test_set_writer_uncommitted_append_is_not_durable() -> Result<(), SinkError> {
    let dir = tempdir()?;
    let mut writer = TiltSeriesSetWriter::create(dir.path(), WriterConfig::default())?;
    writer.open()?;
    writer.append(&sample_series("TS_01", &[0.0]))?;

    let on_disk = SetManifest::load(dir.path())?.expect("manifest written");
    assert!(on_disk.series.is_empty());
    assert!(!dir.path().join(SUMMARY_FILE).exists());
    Ok(())
}

#[test]
fn test_set_writer_rejects_invalid_appends() -> Result<(), SinkError> {
    let dir = tempdir()?;
    let mut writer = TiltSeriesSetWriter::create(dir.path(), WriterConfig::default())?;
    let series = sample_series("TS_01", &[0.0]);

    assert!(matches!(writer.append(&series), Err(SinkError::NotOpen)));

    writer.open()?;
    let open = TiltSeries::new("TS_09", AcquisitionInfo::default(), "x.mdoc", 3);
    assert!(matches!(writer.append(&open), Err(SinkError::SeriesOpen(_))));

    writer.append(&series)?;
    assert!(matches!(
        writer.append(&series),
        Err(SinkError::DuplicateSeries(id)) if id == "TS_01"
    ));
    writer.close()?;
    writer.commit(&[])?;

    writer.finalize()?;
    assert!(writer.manifest().finalized);
    assert!(matches!(writer.open(), Err(SinkError::Finalized)));
    // Finalizing twice is harmless
    writer.finalize()?;
    Ok(())
}

#[test]
fn test_memory_sink_commit_visibility() -> Result<(), SinkError> {
    let mut sink = MemorySink::new();
    sink.open()?;
    sink.append(&sample_series("TS_01", &[0.0, 1.0]))?;
    assert!(sink.series().is_empty());
    assert!(sink.contains("TS_01"));

    sink.close()?;
    sink.commit(&[PathBuf::from("a.mdoc"), PathBuf::from("a.mdoc")])?;
    assert_eq!(sink.series().len(), 1);
    assert_eq!(sink.consumed(), vec![PathBuf::from("a.mdoc")]);
    assert_eq!(sink.summary().len(), 1);
    Ok(())
}

#[test]
fn test_frame_copier() -> Result<(), ConvertError> {
    let dir = tempdir()?;
    let source = dir.path().join("mic_000.mrc");
    std::fs::write(&source, b"pixels")?;

    let copier = FrameCopier::new(dir.path().join("frames"));
    let destination = copier.destination_for("TS_01", 4, &source);
    assert_eq!(
        destination.path,
        dir.path().join("frames").join("TS_01").join("TS_01_04.mrc")
    );
    copier.convert(&source, &destination)?;
    assert_eq!(std::fs::read(&destination.path)?, b"pixels");

    let missing = dir.path().join("absent.mrc");
    assert!(matches!(
        copier.convert(&missing, &destination),
        Err(ConvertError::MissingSource(_))
    ));
    Ok(())
}
