//! EXIF extraction and display formatting.
//!
//! Raw tag extraction (via `kamadak-exif`) is kept separate from the
//! formatting policy, so the numeric edge cases — APEX conversion, shutter
//! snapping, DMS normalization — are unit-testable without EXIF-bearing
//! image fixtures.
//!
//! Every formatter returns `Option<String>`: a missing tag is not an error,
//! it simply yields no value, and joining code skips absent fields.
//!
//! ## Shutter speeds
//!
//! `ShutterSpeedValue` is an APEX exponent: the exposure time is
//! `2^(-apex)` seconds. Fast exposures are displayed as a fraction
//! `1/<N>s`, where `<N>` is snapped onto the nearest conventional
//! photographic denominator when it is close enough; there is no simple
//! rule generating those denominators, so they are hard coded.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use exif::{In, Reader, Tag, Value};
use log::warn;
use serde::{Deserialize, Serialize};

/// Conventional shutter denominators, ascending.
#[rustfmt::skip]
const COMMON_SHUTTER_DIVIDENDS: &[f64] = &[
    2.0, 4.0, 5.0, 6.0, 8.0, 10.0, 13.0, 15.0, 20.0, 25.0, 30.0, 40.0, 50.0,
    60.0, 80.0, 100.0, 125.0, 160.0, 200.0, 250.0, 320.0, 400.0, 500.0,
    640.0, 800.0, 1000.0, 1250.0, 1600.0, 2000.0, 2500.0,
];

/// Relative deviation allowed before snapping onto a common denominator.
const SHUTTER_SNAP_TOLERANCE: f64 = 0.08;

/// Exposure times below this many seconds display as fractions.
const FRACTION_DISPLAY_THRESHOLD: f64 = 0.55;

/// APEX aperture values above this are closed/pinhole artifacts.
const APERTURE_INF_THRESHOLD: f64 = 1e8;

const INF_APERTURE_REPRESENTATION: &str = "inf";

/// Display mode for GPS coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateFormat {
    /// `48°7'23.5"N` — whole degrees and minutes, fractional seconds.
    #[default]
    Dms,
    /// `48°7.392'N` — minutes absorb the seconds as a fraction of 60.
    DecimalMinutes,
}

/// Raw GPS position: degree/minute/second triples plus hemisphere refs.
///
/// Any component of a triple may carry a fractional remainder; display code
/// normalizes by cascading remainders downward.
#[derive(Debug, Clone, PartialEq)]
pub struct GpsPosition {
    pub latitude: [f64; 3],
    pub latitude_ref: char,
    pub longitude: [f64; 3],
    pub longitude_ref: char,
}

/// Raw EXIF values for one image, read once at decoration time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifRecord {
    pub focal_length_mm: Option<f64>,
    pub aperture_apex: Option<f64>,
    pub shutter_apex: Option<f64>,
    pub iso: Option<u32>,
    pub description: Option<String>,
    pub gps: Option<GpsPosition>,
    pub altitude_m: Option<f64>,
}

impl ExifRecord {
    /// Read the EXIF container of `path`.
    ///
    /// An image without readable EXIF yields an all-absent record; every
    /// formatter then reports no value.
    pub fn from_file(path: &Path) -> ExifRecord {
        let exif = File::open(path)
            .map_err(|err| err.to_string())
            .and_then(|file| {
                Reader::new()
                    .read_from_container(&mut BufReader::new(file))
                    .map_err(|err| err.to_string())
            });
        match exif {
            Ok(exif) => Self::from_exif(&exif),
            Err(err) => {
                warn!("no EXIF data for {}: {err}", path.display());
                ExifRecord::default()
            }
        }
    }

    fn from_exif(exif: &exif::Exif) -> ExifRecord {
        let gps = match (
            rational_triple(exif, Tag::GPSLatitude),
            ref_char(exif, Tag::GPSLatitudeRef),
            rational_triple(exif, Tag::GPSLongitude),
            ref_char(exif, Tag::GPSLongitudeRef),
        ) {
            (Some(latitude), Some(latitude_ref), Some(longitude), Some(longitude_ref)) => {
                Some(GpsPosition { latitude, latitude_ref, longitude, longitude_ref })
            }
            _ => None,
        };

        ExifRecord {
            focal_length_mm: rational_value(exif, Tag::FocalLength),
            aperture_apex: rational_value(exif, Tag::ApertureValue),
            shutter_apex: rational_value(exif, Tag::ShutterSpeedValue),
            iso: uint_value(exif, Tag::PhotographicSensitivity),
            description: ascii_value(exif, Tag::ImageDescription),
            gps,
            altitude_m: rational_value(exif, Tag::GPSAltitude),
        }
    }

    /// `"50mm"` — rounded to the nearest whole millimeter.
    pub fn format_focal_length(&self) -> Option<String> {
        self.focal_length_mm.map(|mm| format!("{mm:.0}mm"))
    }

    /// `"f/4.0"`, or `"inf"` for closed/pinhole artifacts.
    pub fn format_aperture(&self) -> Option<String> {
        self.aperture_apex.map(|value| {
            if value > APERTURE_INF_THRESHOLD {
                INF_APERTURE_REPRESENTATION.to_string()
            } else {
                format!("f/{value:.1}")
            }
        })
    }

    /// `"1/250s"` for fast exposures, `"1.3s"` for slow ones.
    ///
    /// With `use_nominal_value` the fraction denominator snaps onto the
    /// nearest conventional value when within tolerance; without it the raw
    /// rounded denominator is shown.
    pub fn format_shutter_speed(&self, use_nominal_value: bool) -> Option<String> {
        self.shutter_apex.map(|apex| {
            let exposure_time = 2f64.powf(-apex);
            if exposure_time < FRACTION_DISPLAY_THRESHOLD {
                let mut dividend = 2f64.powf(apex);
                if use_nominal_value {
                    dividend = snap_to_common_dividend(dividend);
                }
                format!("1/{}s", dividend.round() as i64)
            } else {
                format!("{exposure_time:.1}s")
            }
        })
    }

    /// `"ISO 400"`.
    pub fn format_iso(&self) -> Option<String> {
        self.iso.map(|iso| format!("ISO {iso}"))
    }

    /// The embedded image description, if any.
    pub fn format_description(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    }

    /// Latitude and longitude joined with `", "`, optionally suffixed with
    /// the altitude in meters.
    pub fn format_gps(&self, format: CoordinateFormat, include_altitude: bool) -> Option<String> {
        let gps = self.gps.as_ref()?;
        let mut out = format!(
            "{}, {}",
            format_coordinate(gps.latitude, gps.latitude_ref, format),
            format_coordinate(gps.longitude, gps.longitude_ref, format),
        );
        if include_altitude {
            if let Some(altitude) = self.altitude_m {
                out.push_str(&format!(", {altitude:.0}m"));
            }
        }
        Some(out)
    }

    /// Signed decimal degrees, for the geocoding lookup.
    pub fn gps_decimal(&self) -> Option<(f64, f64)> {
        let gps = self.gps.as_ref()?;
        let lat = decimal_degrees(gps.latitude, gps.latitude_ref == 'S');
        let lon = decimal_degrees(gps.longitude, gps.longitude_ref == 'W');
        Some((lat, lon))
    }
}

/// Snap a raw shutter denominator onto the closest conventional value if
/// the relative deviation is within tolerance; otherwise keep the raw value.
fn snap_to_common_dividend(dividend: f64) -> f64 {
    let closest = COMMON_SHUTTER_DIVIDENDS
        .iter()
        .copied()
        .min_by(|a, b| {
            (a - dividend)
                .abs()
                .total_cmp(&(b - dividend).abs())
        })
        .unwrap_or(dividend);
    let deviation = (dividend - closest).abs() / dividend;
    if deviation > SHUTTER_SNAP_TOLERANCE {
        dividend
    } else {
        closest
    }
}

/// Cascade fractional remainders downward: fractional degrees become extra
/// minutes, fractional minutes become extra seconds.
fn normalize_dms(raw: [f64; 3]) -> (f64, f64, f64) {
    let degrees = raw[0].trunc();
    let minutes_total = (raw[0] - degrees) * 60.0 + raw[1];
    let minutes = minutes_total.trunc();
    let seconds = (minutes_total - minutes) * 60.0 + raw[2];
    (degrees, minutes, seconds)
}

fn format_coordinate(raw: [f64; 3], hemisphere: char, format: CoordinateFormat) -> String {
    let (degrees, minutes, seconds) = normalize_dms(raw);
    match format {
        CoordinateFormat::Dms => {
            format!("{}\u{b0}{}'{seconds:.1}\"{hemisphere}", degrees as i64, minutes as i64)
        }
        CoordinateFormat::DecimalMinutes => {
            let decimal_minutes = minutes + seconds / 60.0;
            format!("{}\u{b0}{decimal_minutes:.3}'{hemisphere}", degrees as i64)
        }
    }
}

fn decimal_degrees(raw: [f64; 3], negative: bool) -> f64 {
    let value = raw[0] + raw[1] / 60.0 + raw[2] / 3600.0;
    if negative { -value } else { value }
}

fn rational_value(exif: &exif::Exif, tag: Tag) -> Option<f64> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(values) => values.first().map(|r| r.to_f64()),
        Value::SRational(values) => values.first().map(|r| r.to_f64()),
        _ => None,
    }
}

fn rational_triple(exif: &exif::Exif, tag: Tag) -> Option<[f64; 3]> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(values) if values.len() >= 3 => {
            Some([values[0].to_f64(), values[1].to_f64(), values[2].to_f64()])
        }
        _ => None,
    }
}

fn uint_value(exif: &exif::Exif, tag: Tag) -> Option<u32> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Short(values) => values.first().map(|&v| u32::from(v)),
        Value::Long(values) => values.first().copied(),
        _ => None,
    }
}

fn ascii_value(exif: &exif::Exif, tag: Tag) -> Option<String> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Ascii(values) => values
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn ref_char(exif: &exif::Exif, tag: Tag) -> Option<char> {
    ascii_value(exif, tag).and_then(|s| s.chars().next())
}
