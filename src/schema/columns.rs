/// Column names as constants for type safety
/// Tilt-series identifier
pub const TS_ID: &str = "ts_id";
/// 0-based position of the image in the angle-ordered series
pub const INDEX: &str = "index";
/// 1-based position in the acquisition sequence
pub const ACQUISITION_ORDER: &str = "acquisition_order";
/// Stage tilt angle in degrees
pub const TILT_ANGLE: &str = "tilt_angle";
/// Sampling rate in Å/px
pub const SAMPLING_RATE: &str = "sampling_rate";
/// Dose delivered by this image alone (e/Å²)
pub const DOSE_PER_FRAME: &str = "dose_per_frame";
/// Dose accumulated up to and including this image (e/Å²)
pub const ACCUMULATED_DOSE: &str = "accumulated_dose";
/// Path of the converted pixel data
pub const LOCATION: &str = "location";
/// Image index within `location` (stacks hold several)
pub const LOCATION_INDEX: &str = "location_index";
