//! # Tilt-series table schema
//!
//! Each composed tilt series is persisted as one Parquet table in "long"
//! form: one row per tilt image, sorted by tilt angle.
//!
//! | Column | Type | Description |
//! |--------|------|-------------|
//! | ts_id | Utf8 | Tilt-series identifier |
//! | index | Int32 | 0-based position in the angle-ordered series |
//! | acquisition_order | Int32 | 1-based position in the acquisition sequence |
//! | tilt_angle | Float64 | Stage tilt in degrees |
//! | sampling_rate | Float64 | Å/px |
//! | dose_per_frame | Float64 | e/Å² delivered by this image |
//! | accumulated_dose | Float64 | e/Å² up to and including this image |
//! | location | Utf8 | Converted pixel data path |
//! | location_index | Int32 | Image index within `location` |
//!
//! Acquisition attributes shared by the whole series (voltage,
//! magnification, tilt-axis angle, source mdoc) live in the Parquet footer
//! key/value metadata.

mod builders;
/// Tilt image column name constants.
pub mod columns;
mod constants;
mod validation;


pub use builders::{create_tilt_image_schema, create_tilt_image_schema_arc};
pub use columns::*;
pub use constants::*;
pub use validation::{validate_schema, SchemaValidationError};
