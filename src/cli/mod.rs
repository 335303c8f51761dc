use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod info;
mod watch;

/// tomostream - Streaming tilt-series composer for cryo-ET
#[derive(Parser)]
#[command(name = "tomostream")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch an mdoc directory and compose tilt series as acquisition proceeds
    ///
    /// Runs until no new mdoc file has appeared for the series timeout.
    /// Restarting with the same output directory resumes the set.
    ///
    /// Examples:
    ///   tomostream watch frames/ --micrographs motioncorr/ --sampling-rate 1.35 --output session.tomo
    ///   tomostream watch frames/ --micrographs micrographs.csv --output session.tomo -v
    Watch {
        /// Directory where mdoc files are written
        #[arg(value_name = "MDOC_DIR")]
        mdoc_dir: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Compose every complete series already present, then exit
    ///
    /// Files and micrographs are read once; nothing is waited for.
    Compose {
        /// Directory holding mdoc files
        #[arg(value_name = "MDOC_DIR")]
        mdoc_dir: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Display the manifest of an output set
    Info {
        /// Output set directory
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
}

/// Options shared by `watch` and `compose`.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Micrograph collection: a directory of images or a CSV/TSV listing
    #[arg(short, long, value_name = "LIST|DIR")]
    micrographs: Option<PathBuf>,

    /// Output set directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Load settings from a TOML config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Sampling rate in Å/px for micrographs found in a directory
    #[arg(long, value_name = "ANGSTROM")]
    sampling_rate: Option<f64>,

    /// Seconds an mdoc file must stay unmodified before it is read as final
    #[arg(long, value_name = "SECS")]
    time_for_next_tilt: Option<u64>,

    /// Seconds between micrograph snapshots while a series is short
    #[arg(long, value_name = "SECS")]
    time_for_next_micrograph: Option<u64>,

    /// Seconds without a new mdoc file before the stream ends
    #[arg(long, value_name = "SECS")]
    time_for_next_series: Option<u64>,

    /// Number of mdoc files ingested concurrently
    #[arg(short, long, value_name = "N")]
    workers: Option<usize>,

    /// Reference micrographs in place instead of copying them into the set
    #[arg(long)]
    no_copy: bool,

    // === Advanced tuning flags (hidden from --help) ===
    #[arg(long, hide = true)]
    poll_interval: Option<u64>,

    #[arg(short = 'c', long, hide = true)]
    compression_level: Option<i32>,
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Watch { mdoc_dir, run } => watch::run(mdoc_dir, run, true),
        Commands::Compose { mdoc_dir, run } => watch::run(mdoc_dir, run, false),
        Commands::Info { output } => info::run(output),
    }
}
