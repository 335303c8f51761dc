//! # Tilt-series metadata
//!
//! Reading of the per-series description files written by the acquisition
//! software. A description file grows while the series is being acquired, so
//! reading it yields either a complete [`SeriesMetadata`] or an
//! [`ParseOutcome::Incomplete`] marker that the ingestion loop waits on.
//!
//! [`MdocReader`] is the default [`TiltMetadataSource`] and understands
//! SerialEM `.mdoc` files.

mod error;
mod mdoc;
mod records;
mod source;


pub use error::MetadataError;
pub use mdoc::{MdocReader, MDOC_EXTENSION};
pub(crate) use mdoc::movie_basename;
pub use records::{AcquisitionInfo, SeriesMetadata, TiltRecord};
pub use source::{ParseOutcome, TiltMetadataSource};
