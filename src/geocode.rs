//! Reverse geocoding of GPS positions into location names.
//!
//! The lookup is a seam: decoration code talks to a [`ReverseGeocoder`]
//! trait, and the production implementation resolves positions against the
//! Nominatim reverse API. Nominatim's usage policy demands at most one
//! request per second, so the client enforces a minimum delay between
//! calls, retries a bounded number of times on transport errors, and caches
//! results keyed by rounded coordinate and zoom — images taken at the same
//! spot resolve with a single network call per run.
//!
//! Which address parts make a good location name is subjective; road, city,
//! county, state, and country tend to match the names people actually use,
//! while finer-grained parts (neighbourhood, suburb) often do not.

use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use thiserror::Error;

const USER_AGENT: &str = concat!("printpack/", env!("CARGO_PKG_VERSION"));
const ENDPOINT: &str = "https://nominatim.openstreetmap.org/reverse";

/// Minimum spacing between network calls (Nominatim allows 1 req/s).
const MIN_DELAY: Duration = Duration::from_millis(1050);
const RETRY_WAIT: Duration = Duration::from_secs(2);
const MAX_ATTEMPTS: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Address parts joined into a location name, in display order.
const NAME_PARTS: &[&str] = &["road", "city", "county", "state", "country"];

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("response carries no address object")]
    MissingAddress,
}

/// External lookup of a human-readable name for a position.
pub trait ReverseGeocoder {
    /// Resolve a name for the position, or `None` when the lookup fails or
    /// resolves to nothing; failures degrade to an absent border field.
    fn locate(&mut self, lat: f64, lon: f64, zoom: u8) -> Option<String>;
}

/// Cache key: coordinates rounded to ~10 m so near-identical positions from
/// a burst of shots share one lookup.
fn cache_key(lat: f64, lon: f64, zoom: u8) -> (i64, i64, u8) {
    ((lat * 1e4).round() as i64, (lon * 1e4).round() as i64, zoom)
}

/// Nominatim-backed geocoder with per-run cache and rate limiting.
pub struct NominatimGeocoder {
    client: reqwest::blocking::Client,
    cache: HashMap<(i64, i64, u8), Option<String>>,
    last_call: Option<Instant>,
}

impl NominatimGeocoder {
    pub fn new() -> Result<Self, GeocodeError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            cache: HashMap::new(),
            last_call: None,
        })
    }

    fn throttle(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < MIN_DELAY {
                thread::sleep(MIN_DELAY - elapsed);
            }
        }
        self.last_call = Some(Instant::now());
    }

    fn lookup(&self, lat: f64, lon: f64, zoom: u8) -> Result<String, GeocodeError> {
        let response: serde_json::Value = self
            .client
            .get(ENDPOINT)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("zoom", zoom.to_string()),
                ("addressdetails", "1".to_string()),
            ])
            .send()?
            .error_for_status()?
            .json()?;

        let address = response
            .get("address")
            .and_then(|v| v.as_object())
            .ok_or(GeocodeError::MissingAddress)?;
        Ok(format_location(address))
    }
}

impl ReverseGeocoder for NominatimGeocoder {
    fn locate(&mut self, lat: f64, lon: f64, zoom: u8) -> Option<String> {
        let key = cache_key(lat, lon, zoom);
        if let Some(hit) = self.cache.get(&key) {
            debug!("geocode cache hit for {key:?}");
            return hit.clone();
        }

        let mut result = None;
        for attempt in 1..=MAX_ATTEMPTS {
            self.throttle();
            match self.lookup(lat, lon, zoom) {
                Ok(name) => {
                    result = Some(name).filter(|n| !n.is_empty());
                    break;
                }
                Err(err) => {
                    warn!("reverse geocode attempt {attempt}/{MAX_ATTEMPTS} for ({lat:.4}, {lon:.4}) failed: {err}");
                    if attempt < MAX_ATTEMPTS {
                        thread::sleep(RETRY_WAIT);
                    }
                }
            }
        }

        self.cache.insert(key, result.clone());
        result
    }
}

/// Join the interesting address parts, skipping absent ones.
fn format_location(address: &serde_json::Map<String, serde_json::Value>) -> String {
    let parts: Vec<&str> = NAME_PARTS
        .iter()
        .filter_map(|&part| address.get(part).and_then(|v| v.as_str()))
        .filter(|s| !s.is_empty())
        .collect();
    parts.join(", ")
}
