//! Domain types shared across metar-watch.

use serde::{Deserialize, Serialize};

/// Observer position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// HTTP proxy parameters for the METAR transport.
///
/// Empty host means "no proxy". `auth` is `user:password` or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub auth: String,
}

impl ProxyConfig {
    pub fn is_configured(&self) -> bool {
        !self.host.is_empty()
    }
}

/// A fully self-contained fetch request.
///
/// Proxy parameters are snapshotted at creation time and never re-read, so a
/// queued request stays consistent even if the live config changes. A request
/// with an empty station id is the shutdown sentinel for the fetch worker; it
/// is produced only by the pipeline's teardown path (real station ids are
/// never empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub station_id: String,
    pub proxy: ProxyConfig,
}

impl FetchRequest {
    pub fn new(station_id: impl Into<String>, proxy: ProxyConfig) -> Self {
        Self {
            station_id: station_id.into(),
            proxy,
        }
    }

    /// The worker-shutdown sentinel.
    pub fn sentinel() -> Self {
        Self {
            station_id: String::new(),
            proxy: ProxyConfig::default(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.station_id.is_empty()
    }
}

/// A validated, normalized METAR observation.
///
/// `raw` has embedded line breaks collapsed to spaces and surrounding
/// whitespace trimmed. `age_min` is the payload's self-reported age, derived
/// from the observation timestamp inside the record rather than wall-clock
/// receipt time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetarRecord {
    pub station_id: String,
    pub raw: String,
    pub age_min: i64,
}
