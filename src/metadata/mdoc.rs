//! Reader for SerialEM `.mdoc` tilt-series descriptions.
//!
//! An mdoc file is line-oriented `key = value` text. Keys before the first
//! `[ZValue = n]` header describe the whole series; each `[ZValue = n]` opens
//! the description of one tilt, in acquisition order. SerialEM appends a new
//! section after every exposure, so a file read mid-acquisition is simply a
//! shorter, still valid document, and a file read mid-write may end inside a
//! section that lacks required keys.
//!
//! ```text
//! PixelSpacing = 1.35
//! Voltage = 300
//! ImageFile = TS_01.mrc
//!
//! [T = SerialEM: Titan Krios   Tilt axis angle = 85.3, binning = 1]
//!
//! [ZValue = 0]
//! TiltAngle = 0.0012
//! Magnification = 64000
//! ExposureDose = 3.05
//! SubFramePath = X:\frames\TS_01_000_0.0.tif
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use log::debug;

use super::records::{AcquisitionInfo, SeriesMetadata, TiltRecord};
use super::source::{ParseOutcome, TiltMetadataSource};
use super::MetadataError;

/// File extension of SerialEM metadata files
pub const MDOC_EXTENSION: &str = "mdoc";

/// Image extensions SerialEM places before `.mdoc` (`TS_01.mrc.mdoc`)
const IMAGE_EXTENSIONS: &[&str] = &["mrc", "mrcs", "st", "tif", "tiff", "eer"];

const KEY_Z_VALUE: &str = "ZValue";
const KEY_TITLE: &str = "T";
const KEY_VOLTAGE: &str = "Voltage";
const KEY_MAGNIFICATION: &str = "Magnification";
const KEY_PIXEL_SPACING: &str = "PixelSpacing";
const KEY_TILT_AXIS_ANGLE: &str = "TiltAxisAngle";
const KEY_ROTATION_ANGLE: &str = "RotationAngle";
const KEY_TILT_ANGLE: &str = "TiltAngle";
const KEY_SUB_FRAME_PATH: &str = "SubFramePath";
const KEY_EXPOSURE_DOSE: &str = "ExposureDose";
const KEY_DOSE_RATE: &str = "DoseRate";
const KEY_EXPOSURE_TIME: &str = "ExposureTime";

/// Raw key/value content of an mdoc file, before validation.
#[derive(Debug, Default)]
struct MdocDocument {
    header: HashMap<String, String>,
    titles: Vec<String>,
    sections: Vec<HashMap<String, String>>,
}

/// [`TiltMetadataSource`] for SerialEM mdoc files.
#[derive(Debug, Clone, Copy, Default)]
pub struct MdocReader;

impl MdocReader {
    /// Create a reader.
    pub fn new() -> Self {
        Self
    }

    /// Derive the tilt-series identifier from an mdoc path.
    ///
    /// `TS_01.mrc.mdoc` and `TS_01.mdoc` both yield `TS_01`.
    pub fn series_id_for(path: &Path) -> String {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let stem = strip_suffix_ignore_case(&name, &format!(".{}", MDOC_EXTENSION))
            .unwrap_or(&name);

        match stem.rsplit_once('.') {
            Some((base, ext))
                if !base.is_empty()
                    && IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) =>
            {
                base.to_string()
            }
            _ => stem.to_string(),
        }
    }

    /// Validate mdoc text and build the series description.
    ///
    /// Never fails: anything that does not describe a usable series yet is
    /// reported as [`ParseOutcome::Incomplete`].
    pub fn parse_content(
        &self,
        content: &str,
        series_id: &str,
        source_path: &Path,
        source_modified: SystemTime,
    ) -> ParseOutcome {
        let document = tokenize(content);
        match build_series(&document, series_id) {
            Ok((acquisition, pixel_spacing, tilts)) => ParseOutcome::Complete(SeriesMetadata {
                series_id: series_id.to_string(),
                acquisition,
                pixel_spacing,
                tilts,
                source_path: source_path.to_path_buf(),
                source_modified,
            }),
            Err(reason) => ParseOutcome::Incomplete(reason),
        }
    }
}

impl TiltMetadataSource for MdocReader {
    fn parse(&self, path: &Path) -> Result<ParseOutcome, MetadataError> {
        let attributes = fs::metadata(path)?;
        if !attributes.is_file() {
            return Err(MetadataError::InvalidPath(format!(
                "Not a regular file: {}",
                path.display()
            )));
        }
        let modified = attributes.modified()?;

        // Acquisition software may be mid-write; tolerate a torn UTF-8 tail.
        let bytes = fs::read(path)?;
        let content = String::from_utf8_lossy(&bytes);

        Ok(self.parse_content(&content, &Self::series_id_for(path), path, modified))
    }
}

fn strip_suffix_ignore_case<'a>(value: &'a str, suffix: &str) -> Option<&'a str> {
    if value.len() < suffix.len() || !value.is_char_boundary(value.len() - suffix.len()) {
        return None;
    }
    let (head, tail) = value.split_at(value.len() - suffix.len());
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}

fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

fn tokenize(content: &str) -> MdocDocument {
    let mut document = MdocDocument::default();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(inner) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            if let Some((key, value)) = split_key_value(inner) {
                match key {
                    KEY_Z_VALUE => document.sections.push(HashMap::new()),
                    KEY_TITLE => document.titles.push(value.to_string()),
                    _ => {}
                }
            }
            continue;
        }

        if let Some((key, value)) = split_key_value(line) {
            let target = match document.sections.last_mut() {
                Some(section) => section,
                None => &mut document.header,
            };
            target.insert(key.to_string(), value.to_string());
        }
    }

    document
}

/// First whitespace-separated token of `key`, parsed as a number.
fn number(values: &HashMap<String, String>, key: &str) -> Result<Option<f64>, String> {
    match values.get(key) {
        None => Ok(None),
        Some(raw) => raw
            .split_whitespace()
            .next()
            .and_then(|token| token.parse::<f64>().ok())
            .filter(|value| value.is_finite())
            .map(Some)
            .ok_or_else(|| format!("invalid value for {}: '{}'", key, raw)),
    }
}

/// Header value, falling back to the first section that declares it.
fn series_number(document: &MdocDocument, key: &str) -> Result<Option<f64>, String> {
    if let Some(value) = number(&document.header, key)? {
        return Ok(Some(value));
    }
    for section in &document.sections {
        if let Some(value) = number(section, key)? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

fn tilt_axis_from_title(title: &str) -> Option<f64> {
    const MARKER: &str = "tilt axis angle";
    let start = title.to_ascii_lowercase().find(MARKER)?;
    let rest = title[start + MARKER.len()..].trim_start().strip_prefix('=')?;
    let token: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        .collect();
    token.parse().ok()
}

/// Last path component, accepting both Windows and Unix separators.
pub(crate) fn movie_basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn build_series(
    document: &MdocDocument,
    series_id: &str,
) -> Result<(AcquisitionInfo, Option<f64>, Vec<TiltRecord>), String> {
    if document.sections.is_empty() {
        return Err("no tilt sections found".to_string());
    }

    let voltage = series_number(document, KEY_VOLTAGE)?
        .ok_or_else(|| format!("no {} declared", KEY_VOLTAGE))?;
    let magnification = series_number(document, KEY_MAGNIFICATION)?
        .ok_or_else(|| format!("no {} declared", KEY_MAGNIFICATION))?;
    let pixel_spacing = series_number(document, KEY_PIXEL_SPACING)?;

    let tilt_axis_angle = match document.titles.iter().find_map(|t| tilt_axis_from_title(t)) {
        Some(angle) => angle,
        None => match number(&document.header, KEY_TILT_AXIS_ANGLE)? {
            Some(angle) => angle,
            None => match series_number(document, KEY_ROTATION_ANGLE)? {
                Some(angle) => angle,
                None => {
                    debug!("{}: no tilt axis angle declared, using 0", series_id);
                    0.0
                }
            },
        },
    };

    let mut tilts = Vec::with_capacity(document.sections.len());
    let mut accumulated_dose = 0.0;

    for (position, section) in document.sections.iter().enumerate() {
        let tilt_angle = number(section, KEY_TILT_ANGLE)?
            .ok_or_else(|| format!("tilt {} has no {}", position, KEY_TILT_ANGLE))?;

        let movie = section
            .get(KEY_SUB_FRAME_PATH)
            .map(|p| movie_basename(p.trim()))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| format!("tilt {} has no {}", position, KEY_SUB_FRAME_PATH))?;

        let incoming_dose = match number(section, KEY_EXPOSURE_DOSE)? {
            Some(dose) => dose,
            None => match (
                number(section, KEY_DOSE_RATE)?,
                number(section, KEY_EXPOSURE_TIME)?,
            ) {
                (Some(rate), Some(time)) => rate * time,
                _ => 0.0,
            },
        };
        accumulated_dose += incoming_dose;

        tilts.push(
            TiltRecord::new(movie, position as u32 + 1, tilt_angle)
                .with_dose(accumulated_dose, incoming_dose),
        );
    }

    Ok((
        AcquisitionInfo {
            voltage,
            magnification,
            tilt_axis_angle,
        },
        pixel_spacing,
        tilts,
    ))
}
