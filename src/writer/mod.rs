//! # Output sink
//!
//! Persistence of composed tilt series.
//!
//! The [`SeriesSink`] trait is the only way the stream touches its output.
//! [`TiltSeriesSetWriter`] stores a set as a directory: one Parquet table per
//! series (see [`crate::schema`]) plus a `manifest.json` that is atomically
//! replaced on every commit, so a crash leaves either the previous or the new
//! state. The manifest also records which metadata files have been consumed,
//! which is what lets a restarted run pick up where it stopped.
//!
//! Pixel data reaches the set through a [`PixelConverter`].

mod config;
mod convert;
mod error;
mod manifest;
mod memory;
mod set_writer;
mod sink;
mod stats;
mod table;

#[cfg(test)]
mod tests;

pub use config::{CompressionType, WriterConfig};
pub use convert::{ConvertError, FrameCopier, InPlace, PixelConverter};
pub use error::SinkError;
pub use manifest::{SeriesEntry, SetManifest, MANIFEST_FILE};
pub use memory::MemorySink;
pub use set_writer::{TiltSeriesSetWriter, FRAMES_DIR, SERIES_DIR, SUMMARY_FILE};
pub use sink::{summary_line, SeriesSink};
pub use stats::TableWriterStats;
pub use table::{read_tilt_images, series_footer_metadata, TiltImageTableWriter};
