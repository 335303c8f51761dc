//! Integration tests for tomostream
//!
//! These tests run whole streams against an on-disk output set.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parquet::file::reader::{FileReader, SerializedFileReader};
use tempfile::{tempdir, TempDir};

use tomostream::prelude::*;
use tomostream::schema::{KEY_FRAMES_EXPECTED, KEY_TS_ID, KEY_VOLTAGE};
use tomostream::stream::FileStatus;
use tomostream::writer::{SetManifest, SUMMARY_FILE};

/// Dose-symmetric acquisition: 0, -3, +3, -6, +6, ...
fn angle_for(order: usize) -> f64 {
    let step = (order / 2 + order % 2) as f64 * 3.0;
    if order % 2 == 1 {
        -step
    } else {
        step
    }
}

struct Session {
    _root: TempDir,
    mdoc_dir: PathBuf,
    mic_dir: PathBuf,
    listing: PathBuf,
    output: PathBuf,
}

impl Session {
    fn new() -> Self {
        let root = tempdir().unwrap();
        let mdoc_dir = root.path().join("frames");
        let mic_dir = root.path().join("motioncorr");
        fs::create_dir_all(&mdoc_dir).unwrap();
        fs::create_dir_all(&mic_dir).unwrap();
        let listing = mic_dir.join("micrographs.csv");
        fs::write(&listing, "name,location,sampling_rate\n").unwrap();

        Self {
            mdoc_dir,
            mic_dir,
            listing,
            output: root.path().join("session.tomo"),
            _root: root,
        }
    }

    /// Write an mdoc describing `tilts` exposures, last modified an hour ago.
    fn write_mdoc(&self, file_name: &str, stem: &str, tilts: usize) -> PathBuf {
        let path = self.mdoc_dir.join(file_name);
        let mut file = File::create(&path).unwrap();
        writeln!(file, "PixelSpacing = 1.35\nVoltage = 300\nImageFile = {stem}.mrc\n").unwrap();
        writeln!(file, "[T = SerialEM: Titan Krios   Tilt axis angle = 85.3, binning = 1]\n").unwrap();
        for i in 0..tilts {
            writeln!(
                file,
                "[ZValue = {i}]\nTiltAngle = {}\nMagnification = 64000\nExposureDose = 3.0\n\
                 SubFramePath = X:\\frames\\{stem}_{i:03}.tif\n",
                angle_for(i)
            )
            .unwrap();
        }
        file.set_modified(SystemTime::now() - Duration::from_secs(3600))
            .unwrap();
        path
    }

    /// Produce micrographs for `indices` and list them.
    fn add_micrographs(&self, stem: &str, indices: impl IntoIterator<Item = usize>) {
        let mut listing = fs::OpenOptions::new()
            .append(true)
            .open(&self.listing)
            .unwrap();
        for i in indices {
            let name = format!("{stem}_{i:03}.mrc");
            fs::write(self.mic_dir.join(&name), format!("pixels of {name}")).unwrap();
            writeln!(listing, "{name},{name},1.35").unwrap();
        }
    }

    fn controller(&self, config: StreamConfig) -> StreamController<TiltSeriesSetWriter> {
        let sink = TiltSeriesSetWriter::create(&self.output, WriterConfig::default()).unwrap();
        let frames = FrameCopier::new(sink.frames_dir());
        StreamController::new(
            config,
            Arc::new(MdocReader::new()),
            Arc::new(MicrographListFile::new(&self.listing)),
            Arc::new(frames),
            sink,
        )
    }

    fn manifest(&self) -> SetManifest {
        SetManifest::load(&self.output).unwrap().unwrap()
    }

    fn table(&self, ts_id: &str) -> PathBuf {
        self.output.join(TiltSeriesSetWriter::table_path(ts_id))
    }

    fn summary(&self) -> Vec<String> {
        fs::read_to_string(self.output.join(SUMMARY_FILE))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn footer_value(path: &Path, key: &str) -> Option<String> {
    let reader = SerializedFileReader::new(File::open(path).unwrap()).unwrap();
    reader
        .metadata()
        .file_metadata()
        .key_value_metadata()?
        .iter()
        .find(|kv| kv.key == key)
        .and_then(|kv| kv.value.clone())
}

/// Test the complete compose-read cycle
#[test]
fn test_one_shot_compose_and_read_back() {
    let session = Session::new();
    let mdoc = session.write_mdoc("TS_01.mrc.mdoc", "TS_01", 5);
    session.add_micrographs("TS_01", 0..5);

    let mut controller = session.controller(StreamConfig::one_shot(&session.mdoc_dir));
    let report = controller.run().unwrap();

    assert_eq!(report.termination, Some(Termination::Exhausted));
    assert_eq!(report.composed_count(), 1);

    let images = read_tilt_images(session.table("TS_01")).unwrap();
    let angles: Vec<f64> = images.iter().map(|i| i.tilt_angle).collect();
    assert_eq!(angles, vec![-6.0, -3.0, 0.0, 3.0, 6.0]);

    let orders: Vec<u32> = images.iter().map(|i| i.acquisition_order).collect();
    assert_eq!(orders, vec![4, 2, 1, 3, 5]);

    for (position, image) in images.iter().enumerate() {
        assert_eq!(image.ts_id, "TS_01");
        assert_eq!(image.index, position as u32);
        assert_eq!(image.sampling_rate, 1.35);
        assert_eq!(image.dose_per_frame, 3.0);
        assert_eq!(image.accumulated_dose, 3.0 * image.acquisition_order as f64);
        assert!(image.location.path.starts_with(session.output.join("frames")));
        assert!(image.location.path.is_file());
    }

    let table = session.table("TS_01");
    assert_eq!(footer_value(&table, KEY_TS_ID).as_deref(), Some("TS_01"));
    assert_eq!(footer_value(&table, KEY_FRAMES_EXPECTED).as_deref(), Some("5"));
    assert!(footer_value(&table, KEY_VOLTAGE).is_some());

    let manifest = session.manifest();
    assert!(manifest.finalized);
    assert_eq!(manifest.series.len(), 1);
    assert_eq!(manifest.series[0].acquisition.tilt_axis_angle, 85.3);
    assert_eq!(manifest.consumed_files, vec![mdoc.clone()]);

    assert_eq!(
        session.summary(),
        vec![format!(
            "Tilt series TS_01 (5 tilts) composed from mdoc file: {}",
            mdoc.display()
        )]
    );
}

#[test]
fn test_restart_resumes_output_set() {
    let session = Session::new();
    session.write_mdoc("TS_01.mrc.mdoc", "TS_01", 3);
    session.add_micrographs("TS_01", 0..3);
    session
        .controller(StreamConfig::one_shot(&session.mdoc_dir))
        .run()
        .unwrap();
    let first_run = session.manifest().run_id;

    session.write_mdoc("TS_02.mrc.mdoc", "TS_02", 4);
    session.add_micrographs("TS_02", 0..4);
    let report = session
        .controller(StreamConfig::one_shot(&session.mdoc_dir))
        .run()
        .unwrap();

    assert_eq!(report.outcomes.len(), 1);
    assert!(report.outcomes[0].path.ends_with("TS_02.mrc.mdoc"));

    let manifest = session.manifest();
    assert_eq!(manifest.run_id, first_run);
    assert!(manifest.finalized);
    let ids: Vec<&str> = manifest.series.iter().map(|s| s.ts_id.as_str()).collect();
    assert_eq!(ids, vec!["TS_01", "TS_02"]);
    assert_eq!(manifest.consumed_files.len(), 2);
    assert_eq!(session.summary().len(), 2);
}

#[test]
fn test_missing_frame_yields_partial_series() {
    let session = Session::new();
    session.write_mdoc("TS_03.mdoc", "TS_03", 4);
    session.add_micrographs("TS_03", 0..4);
    fs::remove_file(session.mic_dir.join("TS_03_002.mrc")).unwrap();

    let report = session
        .controller(StreamConfig::one_shot(&session.mdoc_dir))
        .run()
        .unwrap();

    assert_eq!(report.partial_count(), 1);
    assert!(matches!(
        report.outcomes[0].status,
        FileStatus::Partial { tilts: 3, expected: 4, .. }
    ));

    let manifest = session.manifest();
    assert!(manifest.series[0].is_partial());
    assert_eq!(read_tilt_images(session.table("TS_03")).unwrap().len(), 3);
}

#[test]
fn test_duplicate_series_id_is_rejected() {
    let session = Session::new();
    session.write_mdoc("TS_04.mrc.mdoc", "TS_04", 3);
    session.write_mdoc("TS_04.mdoc", "TS_04", 3);
    session.add_micrographs("TS_04", 0..3);

    let report = session
        .controller(StreamConfig::one_shot(&session.mdoc_dir))
        .run()
        .unwrap();

    assert_eq!(report.composed_count(), 1);
    assert_eq!(report.rejected_count(), 1);

    let manifest = session.manifest();
    assert_eq!(manifest.series.len(), 1);
    assert_eq!(manifest.consumed_files.len(), 2);
}

#[test]
fn test_streaming_run_ends_after_series_timeout() {
    let session = Session::new();
    session.write_mdoc("TS_05.mrc.mdoc", "TS_05", 3);
    session.add_micrographs("TS_05", 0..3);

    let clock = Arc::new(ManualClock::starting_now());
    let config = StreamConfig {
        time_for_next_series: Duration::from_secs(60),
        poll_interval: Duration::from_secs(5),
        ..StreamConfig::new(&session.mdoc_dir)
    };
    let mut controller = session.controller(config).with_clock(clock.clone());
    let report = controller.run().unwrap();

    assert_eq!(report.termination, Some(Termination::Exhausted));
    assert_eq!(report.composed_count(), 1);
    assert!(controller.sink().manifest().finalized);

    let slept: Duration = clock.sleeps().iter().sum();
    assert!(slept >= Duration::from_secs(60));
    assert!(clock
        .sleeps()
        .iter()
        .all(|d| *d == Duration::from_secs(5)));
}

#[test]
fn test_stop_before_run_leaves_set_resumable() {
    let session = Session::new();
    session.write_mdoc("TS_06.mrc.mdoc", "TS_06", 3);
    session.add_micrographs("TS_06", 0..3);

    let stop = StopHandle::new();
    stop.stop();
    let mut controller = session
        .controller(StreamConfig::new(&session.mdoc_dir))
        .with_stop_handle(stop);
    let report = controller.run().unwrap();

    assert_eq!(report.termination, Some(Termination::Cancelled));
    let manifest = session.manifest();
    assert!(!manifest.finalized);
    assert!(manifest.consumed_files.is_empty());
}
