//! Decoration configuration.
//!
//! A decoration config describes what gets written into the border of each
//! composed image: for each of the four corners, an ordered list of
//! EXIF-derived fields with per-field display parameters, plus the
//! separator used to join them.
//!
//! ## Config File
//!
//! The on-disk format is JSON with the four corner keys at the top level.
//! Within a corner, fields render in the order they appear; the parameter
//! object may be `null` or `{}` to take the defaults:
//!
//! ```json
//! {
//!   "item_separator": " | ",
//!   "font": "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
//!   "top_left": { "description": null },
//!   "top_right": { "geocode": { "zoom": 12 } },
//!   "bottom_left": {
//!     "focal_length": {},
//!     "aperture": {},
//!     "shutter_speed": { "use_nominal_value": true },
//!     "iso": {}
//!   },
//!   "bottom_right": { "gps_coordinates": { "format": "dms" } }
//! }
//! ```
//!
//! Field names and their parameters are validated entirely at load time:
//! a config referencing an unknown field or corner fails with a typed
//! error before any image is touched, never midway through a render.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::exif::{CoordinateFormat, ExifRecord};
use crate::geocode::ReverseGeocoder;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown decoration field: {0:?}")]
    UnknownField(String),
    #[error("invalid parameters for {field:?}: {source}")]
    BadParams {
        field: String,
        source: serde_json::Error,
    },
}

/// The four border corners a text block can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// Text at right corners is right-aligned against the image edge.
    pub fn is_right(self) -> bool {
        matches!(self, Corner::TopRight | Corner::BottomRight)
    }
}

/// Parameters for the shutter-speed field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShutterParams {
    /// Snap the fraction denominator onto conventional photographic values.
    pub use_nominal_value: bool,
}

impl Default for ShutterParams {
    fn default() -> Self {
        Self { use_nominal_value: true }
    }
}

/// Parameters for the GPS-coordinates field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpsParams {
    pub format: CoordinateFormat,
    pub include_altitude: bool,
}

/// Parameters for the reverse-geocoded location field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeocodeParams {
    /// Nominatim zoom level; 12 resolves to town/borough granularity.
    pub zoom: u8,
}

impl Default for GeocodeParams {
    fn default() -> Self {
        Self { zoom: 12 }
    }
}

/// One configured decoration item: a field plus its display parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum DecorationItem {
    FocalLength,
    Aperture,
    ShutterSpeed(ShutterParams),
    Iso,
    GpsCoordinates(GpsParams),
    Geocode(GeocodeParams),
    Description,
}

impl DecorationItem {
    fn name(&self) -> &'static str {
        match self {
            DecorationItem::FocalLength => "focal_length",
            DecorationItem::Aperture => "aperture",
            DecorationItem::ShutterSpeed(_) => "shutter_speed",
            DecorationItem::Iso => "iso",
            DecorationItem::GpsCoordinates(_) => "gps_coordinates",
            DecorationItem::Geocode(_) => "geocode",
            DecorationItem::Description => "description",
        }
    }

    fn params_value(&self) -> Value {
        match self {
            DecorationItem::ShutterSpeed(params) => to_value(params),
            DecorationItem::GpsCoordinates(params) => to_value(params),
            DecorationItem::Geocode(params) => to_value(params),
            _ => Value::Null,
        }
    }
}

fn to_value<T: Serialize>(params: &T) -> Value {
    serde_json::to_value(params).unwrap_or(Value::Null)
}

const DEFAULT_ITEM_SEPARATOR: &str = " | ";

/// Validated decoration configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DecorationConfig {
    pub item_separator: String,
    /// TrueType font for border text; falls back to a system font probe.
    pub font: Option<PathBuf>,
    pub top_left: Vec<DecorationItem>,
    pub top_right: Vec<DecorationItem>,
    pub bottom_left: Vec<DecorationItem>,
    pub bottom_right: Vec<DecorationItem>,
}

impl Default for DecorationConfig {
    /// The stock configuration: exposure data bottom left, coordinates
    /// bottom right, description top left, geocoded location top right.
    fn default() -> Self {
        Self {
            item_separator: DEFAULT_ITEM_SEPARATOR.to_string(),
            font: None,
            top_left: vec![DecorationItem::Description],
            top_right: vec![DecorationItem::Geocode(GeocodeParams::default())],
            bottom_left: vec![
                DecorationItem::FocalLength,
                DecorationItem::Aperture,
                DecorationItem::ShutterSpeed(ShutterParams::default()),
                DecorationItem::Iso,
            ],
            bottom_right: vec![DecorationItem::GpsCoordinates(GpsParams::default())],
        }
    }
}

/// On-disk shape; corner maps preserve their key order.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    item_separator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    font: Option<PathBuf>,
    top_left: Map<String, Value>,
    top_right: Map<String, Value>,
    bottom_left: Map<String, Value>,
    bottom_right: Map<String, Value>,
}

impl DecorationConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate a JSON config document.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(content)?;
        Ok(Self {
            item_separator: raw
                .item_separator
                .unwrap_or_else(|| DEFAULT_ITEM_SEPARATOR.to_string()),
            font: raw.font,
            top_left: parse_corner(&raw.top_left)?,
            top_right: parse_corner(&raw.top_right)?,
            bottom_left: parse_corner(&raw.bottom_left)?,
            bottom_right: parse_corner(&raw.bottom_right)?,
        })
    }

    /// Serialize to the on-disk JSON shape.
    pub fn to_json(&self) -> String {
        let raw = RawConfig {
            item_separator: Some(self.item_separator.clone()),
            font: self.font.clone(),
            top_left: corner_map(&self.top_left),
            top_right: corner_map(&self.top_right),
            bottom_left: corner_map(&self.bottom_left),
            bottom_right: corner_map(&self.bottom_right),
        };
        // RawConfig serialization cannot fail: it is maps and strings.
        serde_json::to_string_pretty(&raw).unwrap_or_default()
    }

    /// Write the config to `path` as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, self.to_json() + "\n")?;
        Ok(())
    }

    pub fn items_at(&self, corner: Corner) -> &[DecorationItem] {
        match corner {
            Corner::TopLeft => &self.top_left,
            Corner::TopRight => &self.top_right,
            Corner::BottomLeft => &self.bottom_left,
            Corner::BottomRight => &self.bottom_right,
        }
    }

    /// Whether any corner has fields configured.
    pub fn has_items(&self) -> bool {
        Corner::ALL.iter().any(|&c| !self.items_at(c).is_empty())
    }

    /// Build the text block for one corner.
    ///
    /// Fields whose EXIF source is absent are skipped entirely — no empty
    /// fragments, no doubled separators. An empty result means nothing is
    /// drawn at that corner.
    pub fn render_corner(
        &self,
        corner: Corner,
        exif: &ExifRecord,
        geocoder: &mut dyn ReverseGeocoder,
    ) -> String {
        let parts: Vec<String> = self
            .items_at(corner)
            .iter()
            .filter_map(|item| render_item(item, exif, geocoder))
            .collect();
        parts.join(&self.item_separator)
    }
}

fn render_item(
    item: &DecorationItem,
    exif: &ExifRecord,
    geocoder: &mut dyn ReverseGeocoder,
) -> Option<String> {
    match item {
        DecorationItem::FocalLength => exif.format_focal_length(),
        DecorationItem::Aperture => exif.format_aperture(),
        DecorationItem::ShutterSpeed(params) => {
            exif.format_shutter_speed(params.use_nominal_value)
        }
        DecorationItem::Iso => exif.format_iso(),
        DecorationItem::GpsCoordinates(params) => {
            exif.format_gps(params.format, params.include_altitude)
        }
        DecorationItem::Geocode(params) => {
            let (lat, lon) = exif.gps_decimal()?;
            geocoder.locate(lat, lon, params.zoom)
        }
        DecorationItem::Description => exif.format_description(),
    }
}

fn parse_corner(entries: &Map<String, Value>) -> Result<Vec<DecorationItem>, ConfigError> {
    entries
        .iter()
        .map(|(name, params)| parse_item(name, params))
        .collect()
}

fn parse_item(name: &str, params: &Value) -> Result<DecorationItem, ConfigError> {
    match name {
        "focal_length" => paramless(name, params, DecorationItem::FocalLength),
        "aperture" => paramless(name, params, DecorationItem::Aperture),
        "shutter_speed" => Ok(DecorationItem::ShutterSpeed(parse_params(name, params)?)),
        "iso" => paramless(name, params, DecorationItem::Iso),
        "gps_coordinates" => Ok(DecorationItem::GpsCoordinates(parse_params(name, params)?)),
        "geocode" => Ok(DecorationItem::Geocode(parse_params(name, params)?)),
        "description" => paramless(name, params, DecorationItem::Description),
        _ => Err(ConfigError::UnknownField(name.to_string())),
    }
}

/// A field that takes no parameters accepts only `null` or `{}`.
fn paramless(name: &str, params: &Value, item: DecorationItem) -> Result<DecorationItem, ConfigError> {
    match params {
        Value::Null => Ok(item),
        Value::Object(map) if map.is_empty() => Ok(item),
        _ => Err(ConfigError::BadParams {
            field: name.to_string(),
            source: serde::de::Error::custom("field takes no parameters"),
        }),
    }
}

fn parse_params<T: DeserializeOwned + Default>(name: &str, params: &Value) -> Result<T, ConfigError> {
    if params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(params.clone()).map_err(|source| ConfigError::BadParams {
        field: name.to_string(),
        source,
    })
}

fn corner_map(items: &[DecorationItem]) -> Map<String, Value> {
    items
        .iter()
        .map(|item| (item.name().to_string(), item.params_value()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::tests::ScriptedGeocoder;

    #[test]
    fn stock_config_matches_the_documented_layout() {
        let config = DecorationConfig::default();
        assert_eq!(config.item_separator, " | ");
        assert_eq!(config.top_left, vec![DecorationItem::Description]);
        assert_eq!(config.bottom_left.len(), 4);
        assert_eq!(config.bottom_right.len(), 1);
        assert!(config.has_items());
    }

    #[test]
    fn stock_config_round_trips_through_json() {
        let config = DecorationConfig::default();
        let reloaded = DecorationConfig::from_json(&config.to_json()).unwrap();
        assert_eq!(config, reloaded);
    }

    #[test]
    fn corner_field_order_survives_a_round_trip() {
        let json = r#"{
            "bottom_left": { "iso": {}, "aperture": null, "focal_length": {} }
        }"#;
        let config = DecorationConfig::from_json(json).unwrap();
        assert_eq!(
            config.bottom_left,
            vec![
                DecorationItem::Iso,
                DecorationItem::Aperture,
                DecorationItem::FocalLength,
            ]
        );
    }

    #[test]
    fn missing_keys_take_defaults() {
        let config = DecorationConfig::from_json("{}").unwrap();
        assert_eq!(config.item_separator, " | ");
        assert!(!config.has_items());
    }

    #[test]
    fn unknown_field_name_is_rejected_at_load() {
        let json = r#"{ "top_left": { "film_stock": {} } }"#;
        let err = DecorationConfig::from_json(json).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownField(name) if name == "film_stock"));
    }

    #[test]
    fn unknown_corner_key_is_rejected_at_load() {
        let json = r#"{ "bottom_middle": { "iso": {} } }"#;
        assert!(matches!(
            DecorationConfig::from_json(json).unwrap_err(),
            ConfigError::Json(_)
        ));
    }

    #[test]
    fn bad_field_params_are_rejected_at_load() {
        let json = r#"{ "top_right": { "geocode": { "zoom": "close" } } }"#;
        let err = DecorationConfig::from_json(json).unwrap_err();
        assert!(matches!(err, ConfigError::BadParams { field, .. } if field == "geocode"));

        let json = r#"{ "bottom_left": { "iso": { "anything": 1 } } }"#;
        let err = DecorationConfig::from_json(json).unwrap_err();
        assert!(matches!(err, ConfigError::BadParams { field, .. } if field == "iso"));
    }

    #[test]
    fn shutter_params_parse_with_defaults() {
        let json = r#"{ "bottom_left": { "shutter_speed": null } }"#;
        let config = DecorationConfig::from_json(json).unwrap();
        assert_eq!(
            config.bottom_left,
            vec![DecorationItem::ShutterSpeed(ShutterParams { use_nominal_value: true })]
        );

        let json = r#"{ "bottom_left": { "shutter_speed": { "use_nominal_value": false } } }"#;
        let config = DecorationConfig::from_json(json).unwrap();
        assert_eq!(
            config.bottom_left,
            vec![DecorationItem::ShutterSpeed(ShutterParams { use_nominal_value: false })]
        );
    }

    #[test]
    fn write_creates_a_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decoration.json");
        DecorationConfig::default().write(&path).unwrap();
        let loaded = DecorationConfig::load(&path).unwrap();
        assert_eq!(loaded, DecorationConfig::default());
    }

    #[test]
    fn render_skips_absent_fields_without_stray_separators() {
        let config = DecorationConfig::default();
        let mut geocoder = ScriptedGeocoder::default();

        // Only aperture and ISO present: focal length and shutter speed are
        // skipped, and the separator appears exactly once.
        let exif = ExifRecord {
            aperture_apex: Some(2.8),
            iso: Some(200),
            ..ExifRecord::default()
        };
        assert_eq!(
            config.render_corner(Corner::BottomLeft, &exif, &mut geocoder),
            "f/2.8 | ISO 200"
        );
    }

    #[test]
    fn render_of_fully_absent_corner_is_empty() {
        let config = DecorationConfig::default();
        let mut geocoder = ScriptedGeocoder::default();
        let exif = ExifRecord::default();
        for corner in Corner::ALL {
            assert_eq!(config.render_corner(corner, &exif, &mut geocoder), "");
        }
    }

    #[test]
    fn render_respects_a_custom_separator() {
        let config = DecorationConfig {
            item_separator: " \u{2022} ".to_string(),
            ..DecorationConfig::default()
        };
        let mut geocoder = ScriptedGeocoder::default();
        let exif = ExifRecord {
            focal_length_mm: Some(50.0),
            iso: Some(100),
            ..ExifRecord::default()
        };
        assert_eq!(
            config.render_corner(Corner::BottomLeft, &exif, &mut geocoder),
            "50mm \u{2022} ISO 100"
        );
    }

    #[test]
    fn geocode_item_passes_position_and_zoom_to_the_geocoder() {
        use crate::exif::GpsPosition;

        let config = DecorationConfig::default();
        let mut geocoder = ScriptedGeocoder::returning("Haidhausen, Munich");
        let exif = ExifRecord {
            gps: Some(GpsPosition {
                latitude: [48.0, 8.0, 0.0],
                latitude_ref: 'N',
                longitude: [11.0, 34.0, 0.0],
                longitude_ref: 'E',
            }),
            ..ExifRecord::default()
        };

        assert_eq!(
            config.render_corner(Corner::TopRight, &exif, &mut geocoder),
            "Haidhausen, Munich"
        );
        let calls = geocoder.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].2, 12);
        assert!((calls[0].0 - (48.0 + 8.0 / 60.0)).abs() < 1e-9);
    }

    #[test]
    fn geocode_item_without_gps_is_skipped_and_makes_no_lookup() {
        let config = DecorationConfig::default();
        let mut geocoder = ScriptedGeocoder::returning("Nowhere");
        let exif = ExifRecord::default();
        assert_eq!(config.render_corner(Corner::TopRight, &exif, &mut geocoder), "");
        assert!(geocoder.calls().is_empty());
    }
}
