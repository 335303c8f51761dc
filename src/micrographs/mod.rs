//! # Micrograph registry
//!
//! Processed micrographs arrive independently of the tilt metadata. A
//! [`MicrographSource`] exposes the collection as it stands right now; the
//! matcher takes repeated [`MicrographSnapshot`]s while it waits for the
//! collection to catch up with a series.

mod error;
mod record;
mod snapshot;
mod source;


pub use error::RegistryError;
pub(crate) use record::file_stem;
pub use record::MicrographRecord;
pub use snapshot::MicrographSnapshot;
pub use source::{
    MicrographDirectory, MicrographListFile, MicrographSource, SharedMicrographs,
    MICROGRAPH_EXTENSIONS,
};
