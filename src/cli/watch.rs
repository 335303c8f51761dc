use anyhow::{bail, Context, Result};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tomostream::metadata::MdocReader;
use tomostream::micrographs::{MicrographDirectory, MicrographListFile, MicrographSource};
use tomostream::stream::{StreamConfig, StreamController, Termination};
use tomostream::writer::{
    CompressionType, FrameCopier, InPlace, PixelConverter, TiltSeriesSetWriter, WriterConfig,
};

use super::config::Config;
use super::RunArgs;

/// Fully resolved settings of one run.
#[derive(Debug)]
struct RunSettings {
    stream: StreamConfig,
    micrographs: PathBuf,
    sampling_rate: Option<f64>,
    output: PathBuf,
    writer: WriterConfig,
    copy_frames: bool,
}

/// Merge flags over file values over defaults.
fn resolve(mdoc_dir: PathBuf, args: RunArgs, config: Config, streaming: bool) -> Result<RunSettings> {
    let mut stream = if streaming {
        StreamConfig::new(mdoc_dir)
    } else {
        StreamConfig::one_shot(mdoc_dir)
    };

    let secs = |flag: Option<u64>, file: Option<u64>| flag.or(file).map(Duration::from_secs);
    if let Some(d) = secs(args.time_for_next_tilt, config.stream.time_for_next_tilt) {
        stream.time_for_next_tilt = d;
    }
    if let Some(d) = secs(
        args.time_for_next_micrograph,
        config.stream.time_for_next_micrograph,
    ) {
        stream.time_for_next_micrograph = d;
    }
    if let Some(d) = secs(args.time_for_next_series, config.stream.time_for_next_series) {
        stream.time_for_next_series = d;
    }
    if let Some(d) = secs(args.poll_interval, config.stream.poll_interval) {
        stream.poll_interval = d;
    }
    if let Some(workers) = args.workers.or(config.stream.workers) {
        if workers == 0 {
            bail!("--workers must be at least 1");
        }
        stream.workers = workers;
    }
    if let Some(suffix) = config.stream.mdoc_suffix {
        stream.mdoc_suffix = suffix;
    }

    let Some(micrographs) = args.micrographs.or(config.micrographs.source) else {
        bail!("No micrograph source given (use --micrographs or [micrographs] source)");
    };
    let Some(output) = args.output.or(config.output.directory) else {
        bail!("No output directory given (use --output or [output] directory)");
    };

    let mut writer = WriterConfig::default();
    if let Some(level) = args.compression_level.or(config.output.compression_level) {
        writer.compression = CompressionType::Zstd(level);
    }

    let copy_frames = !args.no_copy && config.output.copy_frames.unwrap_or(true);

    Ok(RunSettings {
        stream,
        micrographs,
        sampling_rate: args.sampling_rate.or(config.micrographs.sampling_rate),
        output,
        writer,
        copy_frames,
    })
}

fn micrograph_source(settings: &RunSettings) -> Result<Arc<dyn MicrographSource>> {
    if settings.micrographs.is_dir() {
        let Some(rate) = settings.sampling_rate else {
            bail!(
                "Micrograph directory {} needs --sampling-rate",
                settings.micrographs.display()
            );
        };
        Ok(Arc::new(MicrographDirectory::new(&settings.micrographs, rate)))
    } else {
        Ok(Arc::new(MicrographListFile::new(&settings.micrographs)))
    }
}

/// Run the stream over `mdoc_dir`, waiting for new data when `streaming`.
pub fn run(mdoc_dir: PathBuf, args: RunArgs, streaming: bool) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let settings = resolve(mdoc_dir, args, config, streaming)?;

    if !settings.stream.watch_directory.is_dir() {
        bail!(
            "mdoc directory does not exist: {}",
            settings.stream.watch_directory.display()
        );
    }

    let micrographs = micrograph_source(&settings)?;
    let sink = TiltSeriesSetWriter::create(&settings.output, settings.writer.clone())
        .with_context(|| format!("Failed to open output set {}", settings.output.display()))?;
    let converter: Arc<dyn PixelConverter> = if settings.copy_frames {
        Arc::new(FrameCopier::new(sink.frames_dir()))
    } else {
        Arc::new(InPlace)
    };

    info!(
        "Watching {} (micrographs: {}, output: {}, streaming: {})",
        settings.stream.watch_directory.display(),
        micrographs.describe(),
        settings.output.display(),
        settings.stream.streaming_enabled
    );

    let mut controller = StreamController::new(
        settings.stream,
        Arc::new(MdocReader::new()),
        micrographs,
        converter,
        sink,
    );
    let report = controller.run().context("Stream failed")?;

    println!("{}", report.format_colored());
    println!("Output: {}", settings.output.display());

    if report.termination == Some(Termination::Cancelled) {
        bail!("Stream was cancelled before completion");
    }
    Ok(())
}
