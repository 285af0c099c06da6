//! EXIF metadata extraction for selected photos.
//!
//! Location tags are only reliable on the original image. Edited or
//! re-encoded copies usually lose them, so the original is always tried
//! first and the processed copy is read only when the original cannot be
//! opened or parsed.

use exif::{Exif, In, Reader, Tag, Value};
use std::{fs::File, io::BufReader, path::Path};

/// Metadata pulled from a photo; every field is optional.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExifData {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// `DateTimeOriginal`, or `DateTime` when the former is absent.
    pub date_time: Option<String>,
}

impl ExifData {
    /// Coordinates when both parts are present.
    pub fn location(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

/// Read metadata from `original`, falling back to `processed` when the
/// original is not accessible. Missing metadata is not an error.
pub fn extract_exif_data(original: &Path, processed: Option<&Path>) -> ExifData {
    let exif = match read_exif(original) {
        Ok(e) => Some(e),
        Err(e) => {
            tracing::debug!("exif read failed for {}: {e}", original.display());
            processed.and_then(|p| read_exif(p).ok())
        }
    };
    exif.map(|e| data_from_exif(&e)).unwrap_or_default()
}

fn read_exif(path: &Path) -> Result<Exif, exif::Error> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    Reader::new().read_from_container(&mut reader)
}

fn data_from_exif(exif: &Exif) -> ExifData {
    let latitude = coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, b'S');
    let longitude = coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, b'W');
    let date_time = ascii(exif, Tag::DateTimeOriginal).or_else(|| ascii(exif, Tag::DateTime));
    ExifData {
        latitude,
        longitude,
        date_time,
    }
}

/// Degrees/minutes/seconds rationals to signed decimal degrees.
fn coordinate(exif: &Exif, tag: Tag, ref_tag: Tag, negative_ref: u8) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let Value::Rational(ref parts) = field.value else {
        return None;
    };
    if parts.is_empty() {
        return None;
    }
    let mut degrees = 0.0;
    for (i, r) in parts.iter().take(3).enumerate() {
        if r.denom == 0 {
            return None;
        }
        degrees += r.to_f64() / 60f64.powi(i as i32);
    }

    let negative = exif
        .get_field(ref_tag, In::PRIMARY)
        .and_then(|f| match &f.value {
            Value::Ascii(v) => v.first().and_then(|s| s.first().copied()),
            _ => None,
        })
        .is_some_and(|c| c.eq_ignore_ascii_case(&negative_ref));
    Some(if negative { -degrees } else { degrees })
}

fn ascii(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(v) => v
            .first()
            .map(|s| String::from_utf8_lossy(s).trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}
