//! # tomostream - Streaming Tilt-Series Composition for Cryo-ET
//!
//! `tomostream` watches the directory where acquisition software writes its
//! `.mdoc` tilt-series descriptions, waits for each description to stop
//! growing, pairs every tilt with a motion-corrected micrograph from a growing
//! collection, and persists the resulting angle-ordered tilt series as soon as
//! they are complete.
//!
//! ## Key Features
//!
//! - **Streaming or one-shot**: the same pipeline either waits for files and
//!   micrographs to appear, bounded by three timeouts, or processes what is
//!   present once.
//!
//! - **Resumable output sets**: each series is one Parquet table with the
//!   acquisition attributes in its footer; a JSON manifest records committed
//!   series and consumed metadata files so a restarted run skips them.
//!
//! - **Injectable time**: every wait goes through [`clock::Clock`], so a
//!   whole run can be driven deterministically with [`clock::ManualClock`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tomostream::prelude::*;
//!
//! let sink = TiltSeriesSetWriter::create("session.tomo", WriterConfig::default())?;
//! let frames = FrameCopier::new(sink.frames_dir());
//!
//! let mut controller = StreamController::new(
//!     StreamConfig::one_shot("frames/mdoc"),
//!     Arc::new(MdocReader::new()),
//!     Arc::new(MicrographDirectory::new("motioncorr", 1.35)),
//!     Arc::new(frames),
//!     sink,
//! );
//!
//! let report = controller.run()?;
//! println!("{} series composed", report.composed_count());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! This creates a directory structure:
//! ```text
//! session.tomo/
//! ├── manifest.json             # Committed series and consumed files
//! ├── series/TS_01.parquet      # One row per tilt image
//! ├── frames/TS_01/TS_01_01.mrc # Converted pixel data
//! └── summary.txt               # One line per composed series
//! ```
//!
//! ## Modules
//!
//! - [`metadata`]: mdoc parsing into tilt records
//! - [`micrographs`]: snapshots of the micrograph collection
//! - [`discovery`]: metadata file scanning
//! - [`matcher`]: pairing tilt records with micrographs
//! - [`series`]: tilt-series model and composition
//! - [`schema`]: Arrow schema of series tables
//! - [`writer`]: output sinks and frame conversion
//! - [`stream`]: the stream controller
//! - [`clock`]: time source and cancellation

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![allow(clippy::too_many_arguments)]

pub mod clock;
pub mod discovery;
pub mod matcher;
pub mod metadata;
pub mod micrographs;
pub mod schema;
pub mod series;
pub mod stream;
pub mod writer;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, StopHandle, SystemClock};
    pub use crate::metadata::{
        AcquisitionInfo, MdocReader, SeriesMetadata, TiltMetadataSource, TiltRecord,
    };
    pub use crate::micrographs::{
        MicrographDirectory, MicrographListFile, MicrographRecord, MicrographSource,
        SharedMicrographs,
    };
    pub use crate::schema::{create_tilt_image_schema, columns, TILT_SERIES_FORMAT_VERSION};
    pub use crate::series::{Composer, Composition, TiltImage, TiltSeries};
    pub use crate::stream::{
        RunReport, StreamConfig, StreamController, StreamError, Termination, TickOutcome,
    };
    pub use crate::writer::{
        read_tilt_images, FrameCopier, InPlace, MemorySink, PixelConverter, SeriesSink,
        TiltSeriesSetWriter, WriterConfig,
    };
}
