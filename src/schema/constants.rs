/// Tilt-series table format version - follows semantic versioning
pub const TILT_SERIES_FORMAT_VERSION: &str = "1.0.0";

/// File extension for per-series tables
pub const TILT_SERIES_EXTENSION: &str = ".parquet";

/// Metadata key for format version in Parquet footer
pub const KEY_FORMAT_VERSION: &str = "tomostream:format_version";

/// Metadata key for the table creation timestamp (RFC 3339)
pub const KEY_CREATION_TIMESTAMP: &str = "tomostream:creation_timestamp";

/// Metadata key for converter software info
pub const KEY_CONVERTER_INFO: &str = "tomostream:converter_info";

/// Metadata key for the tilt-series identifier
pub const KEY_TS_ID: &str = "tomostream:ts_id";

/// Metadata key for the accelerating voltage (kV)
pub const KEY_VOLTAGE: &str = "tomostream:voltage";

/// Metadata key for the nominal magnification
pub const KEY_MAGNIFICATION: &str = "tomostream:magnification";

/// Metadata key for the tilt-axis angle (degrees)
pub const KEY_TILT_AXIS_ANGLE: &str = "tomostream:tilt_axis_angle";

/// Metadata key for the mdoc file the series was composed from
pub const KEY_SOURCE_MDOC: &str = "tomostream:source_mdoc";

/// Metadata key for the number of frames described by the mdoc file
pub const KEY_FRAMES_EXPECTED: &str = "tomostream:frames_expected";

/// Field metadata key carrying the physical unit of a column
pub const FIELD_UNIT: &str = "unit";
