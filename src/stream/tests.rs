use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tempfile::tempdir;

use super::*;
use crate::clock::{Clock, ManualClock, StopHandle};
use crate::matcher::MatchError;
use crate::metadata::{MdocReader, MetadataError, ParseOutcome, TiltMetadataSource};
use crate::micrographs::{MicrographRecord, SharedMicrographs};
use crate::writer::{InPlace, MemorySink, SeriesSink};

const HOUR: Duration = Duration::from_secs(3600);

fn write_mdoc(dir: &Path, stem: &str, tilts: usize, modified: SystemTime) -> PathBuf {
    let path = dir.join(format!("{}.mrc.mdoc", stem));
    let mut file = File::create(&path).unwrap();
    writeln!(file, "PixelSpacing = 1.35\nVoltage = 300\n").unwrap();
    writeln!(file, "[T = SerialEM: Krios   Tilt axis angle = 85.0, binning = 1]\n").unwrap();
    for i in 0..tilts {
        let angle = if i % 2 == 0 { i as f64 * 1.5 } else { -(i as f64) * 1.5 };
        writeln!(
            file,
            "[ZValue = {i}]\nTiltAngle = {angle}\nMagnification = 64000\nExposureDose = 3.0\n\
             SubFramePath = D:\\frames\\{stem}_{i:03}.tif\n"
        )
        .unwrap();
    }
    file.set_modified(modified).unwrap();
    path
}

fn micrographs_for(shared: &SharedMicrographs, stem: &str, count: usize) {
    shared.extend((0..count).map(|i| {
        MicrographRecord::new(format!("{}_{:03}.mrc", stem, i), format!("/mic/{}_{:03}.mrc", stem, i), 1.35)
    }));
}

/// Requests a stop the first time it reads a file.
struct StopOnParse {
    reader: MdocReader,
    stop: StopHandle,
}

impl TiltMetadataSource for StopOnParse {
    fn parse(&self, path: &Path) -> Result<ParseOutcome, MetadataError> {
        self.stop.stop();
        self.reader.parse(path)
    }
}

struct Fixture {
    dir: tempfile::TempDir,
    clock: Arc<ManualClock>,
    micrographs: SharedMicrographs,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempdir().unwrap(),
            clock: Arc::new(ManualClock::starting_now()),
            micrographs: SharedMicrographs::new(),
        }
    }

    fn old(&self) -> SystemTime {
        self.clock.now() - HOUR
    }

    fn config(&self) -> StreamConfig {
        StreamConfig::new(self.dir.path())
    }

    fn ingestor(&self, config: &StreamConfig, stop: StopHandle) -> Ingestor {
        Ingestor::new(
            config,
            Arc::new(MdocReader::new()),
            Arc::new(self.micrographs.clone()),
            self.clock.clone(),
            stop,
        )
    }

    fn controller(&self, config: StreamConfig, sink: MemorySink) -> StreamController<MemorySink> {
        StreamController::new(
            config,
            Arc::new(MdocReader::new()),
            Arc::new(self.micrographs.clone()),
            Arc::new(InPlace),
            sink,
        )
        .with_clock(self.clock.clone())
    }
}

#[test]
fn test_ingest_waits_until_file_is_quiet() {
    let fx = Fixture::new();
    let path = write_mdoc(fx.dir.path(), "TS_01", 3, fx.clock.now());

    let metadata = fx
        .ingestor(&fx.config(), StopHandle::new())
        .ingest(&path)
        .unwrap();

    assert_eq!(metadata.tilt_count(), 3);
    assert_eq!(fx.clock.sleeps(), vec![Duration::from_secs(90); 2]);
}

#[test]
fn test_ingest_without_streaming_does_not_wait() {
    let fx = Fixture::new();
    let path = write_mdoc(fx.dir.path(), "TS_01", 3, fx.clock.now());
    let config = StreamConfig::one_shot(fx.dir.path());

    assert!(fx.ingestor(&config, StopHandle::new()).ingest(&path).is_ok());
    assert!(fx.clock.sleeps().is_empty());
}

#[test]
fn test_ingest_cancelled_while_waiting() {
    let fx = Fixture::new();
    let path = write_mdoc(fx.dir.path(), "TS_01", 3, fx.clock.now());
    let stop = StopHandle::new();
    stop.stop();

    let result = fx.ingestor(&fx.config(), stop).ingest(&path);
    assert!(matches!(result, Err(ref e) if e.is_cancelled()));
}

#[test]
fn test_ingest_of_quiet_file_observes_stop() {
    let fx = Fixture::new();
    let path = write_mdoc(fx.dir.path(), "TS_01", 3, fx.old());
    let stop = StopHandle::new();
    stop.stop();

    let result = fx.ingestor(&fx.config(), stop.clone()).ingest(&path);
    assert!(matches!(result, Err(IngestError::Cancelled { .. })));

    let one_shot = StreamConfig::one_shot(fx.dir.path());
    assert!(fx.ingestor(&one_shot, stop).ingest(&path).is_err());
    assert!(fx.clock.sleeps().is_empty());
}

#[test]
fn test_ingest_rejects_short_and_incomplete_files() {
    let fx = Fixture::new();
    let ingestor = fx.ingestor(&fx.config(), StopHandle::new());

    let short = write_mdoc(fx.dir.path(), "TS_short", 2, fx.old());
    assert!(matches!(
        ingestor.ingest(&short),
        Err(IngestError::TooFewTilts { found: 2, minimum: 3, .. })
    ));

    let broken = fx.dir.path().join("TS_broken.mdoc");
    std::fs::write(&broken, "Voltage = 300\n[ZValue = 0]\nTiltAngle = 1.0\n").unwrap();
    File::options()
        .write(true)
        .open(&broken)
        .unwrap()
        .set_modified(fx.old())
        .unwrap();
    assert!(matches!(
        ingestor.ingest(&broken),
        Err(IngestError::Incomplete { .. })
    ));

    let missing = ingestor.ingest(&fx.dir.path().join("absent.mdoc"));
    assert!(matches!(missing, Err(IngestError::Metadata { .. })));
}

#[test]
fn test_controller_composes_series() {
    let fx = Fixture::new();
    let path = write_mdoc(fx.dir.path(), "TS_01", 5, fx.old());
    micrographs_for(&fx.micrographs, "TS_01", 5);

    let mut controller = fx.controller(fx.config(), MemorySink::new());
    assert_eq!(controller.tick().unwrap(), TickOutcome::Dispatched(1));
    assert_eq!(controller.tick().unwrap(), TickOutcome::Idle);
    assert!(controller.state().waiting_for_series());

    let sink = controller.sink();
    assert_eq!(sink.series().len(), 1);
    assert_eq!(sink.consumed(), vec![path.clone()]);
    assert_eq!(
        sink.summary()[0],
        format!("Tilt series TS_01 (5 tilts) composed from mdoc file: {}", path.display())
    );

    let angles: Vec<f64> = sink.series()[0].images().iter().map(|i| i.tilt_angle).collect();
    assert!(angles.windows(2).all(|w| w[0] <= w[1]));
    assert!(controller.state().read().contains(&path));
    assert!(controller.state().in_flight().is_empty());
}

#[test]
fn test_short_series_is_rejected_and_consumed() {
    let fx = Fixture::new();
    let path = write_mdoc(fx.dir.path(), "TS_02", 2, fx.old());
    micrographs_for(&fx.micrographs, "TS_02", 2);

    let mut controller = fx.controller(fx.config(), MemorySink::new());
    controller.tick().unwrap();

    assert!(controller.sink().series().is_empty());
    assert_eq!(controller.sink().consumed(), vec![path]);
    assert_eq!(controller.report().rejected_count(), 1);
}

#[test]
fn test_micrograph_stall_rejects_file() {
    let fx = Fixture::new();
    write_mdoc(fx.dir.path(), "TS_03", 4, fx.old());
    micrographs_for(&fx.micrographs, "TS_03", 2);

    let mut controller = fx.controller(fx.config(), MemorySink::new());
    controller.tick().unwrap();

    assert!(controller.sink().series().is_empty());
    assert_eq!(fx.clock.sleeps(), vec![Duration::from_secs(12)]);
    match &controller.report().outcomes[0].status {
        FileStatus::Rejected(reason) => assert!(reason.contains("stalled")),
        other => panic!("unexpected status {:?}", other),
    }
}

#[test]
fn test_series_timeout_terminates_exactly_once() {
    let fx = Fixture::new();
    let config = StreamConfig {
        time_for_next_series: Duration::from_secs(1),
        ..fx.config()
    };
    let mut controller = fx.controller(config, MemorySink::new());

    assert_eq!(controller.tick().unwrap(), TickOutcome::Idle);
    fx.clock.advance(Duration::from_secs(2));
    assert_eq!(
        controller.tick().unwrap(),
        TickOutcome::Terminated(Termination::Exhausted)
    );
    assert!(controller.sink().is_finalized());
    assert_eq!(controller.state().phase(), ControllerPhase::Terminated);

    // A file arriving after termination is never read
    write_mdoc(fx.dir.path(), "TS_late", 3, fx.old());
    micrographs_for(&fx.micrographs, "TS_late", 3);
    assert_eq!(controller.tick().unwrap(), TickOutcome::Finished);
    assert_eq!(controller.tick().unwrap(), TickOutcome::Finished);
    assert!(controller.sink().consumed().is_empty());
    assert_eq!(controller.report().termination, Some(Termination::Exhausted));
}

#[test]
fn test_new_file_resets_series_timeout() {
    let fx = Fixture::new();
    let config = StreamConfig {
        time_for_next_series: Duration::from_secs(10),
        ..fx.config()
    };
    let mut controller = fx.controller(config, MemorySink::new());

    fx.clock.advance(Duration::from_secs(8));
    write_mdoc(fx.dir.path(), "TS_01", 3, fx.old());
    micrographs_for(&fx.micrographs, "TS_01", 3);
    assert_eq!(controller.tick().unwrap(), TickOutcome::Dispatched(1));

    fx.clock.advance(Duration::from_secs(8));
    assert_eq!(controller.tick().unwrap(), TickOutcome::Idle);
    fx.clock.advance(Duration::from_secs(3));
    assert_eq!(
        controller.tick().unwrap(),
        TickOutcome::Terminated(Termination::Exhausted)
    );
}

#[test]
fn test_stop_cancels_without_finalizing() {
    let fx = Fixture::new();
    let mut controller = fx.controller(fx.config(), MemorySink::new());
    controller.stop_handle().stop();

    assert_eq!(
        controller.tick().unwrap(),
        TickOutcome::Terminated(Termination::Cancelled)
    );
    assert!(!controller.sink().is_finalized());
    assert_eq!(controller.tick().unwrap(), TickOutcome::Finished);
}

#[test]
fn test_stop_during_dispatch_commits_nothing() {
    let fx = Fixture::new();
    let paths: Vec<PathBuf> = ["TS_01", "TS_02", "TS_03"]
        .iter()
        .map(|stem| {
            micrographs_for(&fx.micrographs, stem, 3);
            write_mdoc(fx.dir.path(), stem, 3, fx.old())
        })
        .collect();

    let stop = StopHandle::new();
    let metadata = StopOnParse {
        reader: MdocReader::new(),
        stop: stop.clone(),
    };
    let mut controller = StreamController::new(
        fx.config(),
        Arc::new(metadata),
        Arc::new(fx.micrographs.clone()),
        Arc::new(InPlace),
        MemorySink::new(),
    )
    .with_clock(fx.clock.clone())
    .with_stop_handle(stop);

    assert_eq!(controller.tick().unwrap(), TickOutcome::Dispatched(1));
    assert!(controller.sink().series().is_empty());
    assert!(controller.sink().consumed().is_empty());
    assert!(controller.state().read().is_empty());
    assert_eq!(controller.report().outcomes.len(), 1);
    assert_eq!(controller.report().outcomes[0].path, paths[0]);
    assert_eq!(controller.report().outcomes[0].status, FileStatus::Cancelled);

    assert_eq!(
        controller.tick().unwrap(),
        TickOutcome::Terminated(Termination::Cancelled)
    );
    assert!(!controller.sink().is_finalized());
}

#[test]
fn test_resume_skips_consumed_files() {
    let fx = Fixture::new();
    let done = write_mdoc(fx.dir.path(), "TS_01", 3, fx.old());
    write_mdoc(fx.dir.path(), "TS_02", 3, fx.old());
    micrographs_for(&fx.micrographs, "TS_01", 3);
    micrographs_for(&fx.micrographs, "TS_02", 3);

    let mut sink = MemorySink::new();
    sink.commit(&[done.clone()]).unwrap();

    let mut controller = fx.controller(fx.config(), sink);
    assert_eq!(controller.tick().unwrap(), TickOutcome::Dispatched(1));
    let ids: Vec<&str> = controller
        .sink()
        .series()
        .iter()
        .map(|s| s.ts_id.as_str())
        .collect();
    assert_eq!(ids, vec!["TS_02"]);
}

#[test]
fn test_one_shot_run_processes_everything_once() {
    let fx = Fixture::new();
    write_mdoc(fx.dir.path(), "TS_01", 3, fx.clock.now());
    write_mdoc(fx.dir.path(), "TS_02", 4, fx.clock.now());
    micrographs_for(&fx.micrographs, "TS_01", 3);
    micrographs_for(&fx.micrographs, "TS_02", 1);

    let mut controller = fx.controller(StreamConfig::one_shot(fx.dir.path()), MemorySink::new());
    let report = controller.run().unwrap();

    assert_eq!(report.termination, Some(Termination::Exhausted));
    assert_eq!(report.composed_count(), 1);
    assert_eq!(report.rejected_count(), 1);
    assert!(fx.clock.sleeps().is_empty());
    assert!(controller.sink().is_finalized());
}

#[test]
fn test_worker_pool_composes_all_files() {
    let fx = Fixture::new();
    for (i, stem) in ["TS_01", "TS_02", "TS_03"].iter().enumerate() {
        write_mdoc(fx.dir.path(), stem, 3 + i, fx.old());
        micrographs_for(&fx.micrographs, stem, 3 + i);
    }
    let config = StreamConfig {
        workers: 2,
        time_for_next_series: Duration::from_secs(30),
        poll_interval: Duration::from_millis(200),
        ..fx.config()
    };

    let mut controller = fx.controller(config, MemorySink::new());
    let report = controller.run().unwrap();

    assert_eq!(report.termination, Some(Termination::Exhausted));
    assert_eq!(report.composed_count(), 3);
    assert_eq!(controller.sink().series().len(), 3);
    assert_eq!(controller.sink().consumed().len(), 3);
}

#[test]
fn test_ingest_error_reports_match_cancellation() {
    let error = IngestError::Match {
        path: PathBuf::from("a.mdoc"),
        source: MatchError::Cancelled,
    };
    assert!(error.is_cancelled());
    assert_eq!(error.path(), Path::new("a.mdoc"));
}

#[test]
fn test_report_display() {
    let mut report = RunReport::new(chrono::Utc::now());
    report.record(
        PathBuf::from("a.mdoc"),
        FileStatus::Partial {
            ts_id: "a".into(),
            tilts: 2,
            expected: 3,
        },
    );
    report.termination = Some(Termination::Exhausted);
    let text = report.to_string();
    assert!(text.contains("Termination: exhausted"));
    assert!(text.contains("a (2 of 3 tilts)"));
    assert!(text.contains("0 composed, 1 partial, 0 rejected, 0 cancelled"));
}
