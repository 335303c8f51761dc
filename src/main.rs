//! # tomostream
//!
//! Command-line front end for streaming tilt-series composition.
//!
//! ## Usage
//!
//! ```bash
//! # Follow an ongoing acquisition
//! tomostream watch frames/ --micrographs motioncorr/ --sampling-rate 1.35 --output session.tomo
//!
//! # Compose whatever is already on disk
//! tomostream compose frames/ --micrographs micrographs.csv --output session.tomo
//!
//! # Inspect an output set
//! tomostream info session.tomo
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
