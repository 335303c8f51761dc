//! # Tilt series
//!
//! The composed output model and the [`Composer`] that builds it.
//!
//! Images are ordered by ascending tilt angle (stable for equal angles) and
//! indexed by append position. Dose values are looked up by acquisition
//! order, since the metadata file lists tilts in the order they were shot.

mod composer;
mod error;
mod types;


pub use composer::{Composer, Composition, FrameFailure};
pub use error::ComposeError;
pub use types::{PixelLocation, StreamState, TiltImage, TiltSeries};
