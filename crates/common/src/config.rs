//! Configuration types for metar-watch.

use serde::{Deserialize, Serialize};

use crate::types::ProxyConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Whether the controller starts enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Observer position.
    #[serde(default)]
    pub position: PositionConfig,

    /// Proxy parameters snapshotted into every fetch request.
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Refresh and throttle parameters.
    #[serde(default)]
    pub metar: MetarConfig,

    /// Known METAR stations for nearest-station resolution.
    #[serde(default = "default_stations")]
    pub stations: Vec<StationConfig>,
}

/// Observer position (degrees).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionConfig {
    #[serde(default = "default_lat")]
    pub lat: f64,
    #[serde(default = "default_lon")]
    pub lon: f64,
}

/// A known METAR station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    /// ICAO identifier (e.g. "KJFK").
    pub id: String,
    pub lat: f64,
    pub lon: f64,
}

/// Refresh, staleness, and throttle parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetarConfig {
    /// Which transport backend to use. Currently only "noaa".
    #[serde(default = "default_data_source")]
    pub data_source: String,

    /// Max intrinsic record age in minutes; 0 disables the check.
    #[serde(default)]
    pub max_age_min: i64,

    /// How long a cached record is trusted regardless of position (seconds).
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: f64,

    /// How often the nearest station is re-resolved (seconds).
    #[serde(default = "default_position_secs")]
    pub position_secs: f64,

    /// Minimum interval between outbound fetch requests (seconds).
    #[serde(default = "default_min_request_interval_secs")]
    pub min_request_interval_secs: f64,

    /// Max outstanding background fetch requests before new ones are dropped.
    #[serde(default = "default_request_queue_limit")]
    pub request_queue_limit: usize,

    /// Nearest-station search radius (nautical miles).
    #[serde(default = "default_search_radius_nm")]
    pub search_radius_nm: f64,

    /// Host tick interval (seconds).
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: f64,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_lat() -> f64 {
    40.6413
}
fn default_lon() -> f64 {
    -73.7781
}

fn default_data_source() -> String {
    "noaa".into()
}
fn default_refresh_secs() -> f64 {
    900.0
}
fn default_position_secs() -> f64 {
    60.0
}
fn default_min_request_interval_secs() -> f64 {
    10.0
}
fn default_request_queue_limit() -> usize {
    10
}
fn default_search_radius_nm() -> f64 {
    10000.0
}
fn default_tick_interval_secs() -> f64 {
    1.0
}

fn default_stations() -> Vec<StationConfig> {
    vec![
        StationConfig {
            id: "KJFK".into(),
            lat: 40.6413,
            lon: -73.7781,
        },
        StationConfig {
            id: "KORD".into(),
            lat: 41.9742,
            lon: -87.9073,
        },
        StationConfig {
            id: "KSEA".into(),
            lat: 47.4502,
            lon: -122.3088,
        },
        StationConfig {
            id: "KDFW".into(),
            lat: 32.8998,
            lon: -97.0403,
        },
        StationConfig {
            id: "EGLL".into(),
            lat: 51.4700,
            lon: -0.4543,
        },
        StationConfig {
            id: "EDDF".into(),
            lat: 50.0379,
            lon: 8.5622,
        },
        StationConfig {
            id: "RJTT".into(),
            lat: 35.5494,
            lon: 139.7798,
        },
    ]
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            lat: default_lat(),
            lon: default_lon(),
        }
    }
}

impl Default for MetarConfig {
    fn default() -> Self {
        Self {
            data_source: default_data_source(),
            max_age_min: 0,
            refresh_secs: default_refresh_secs(),
            position_secs: default_position_secs(),
            min_request_interval_secs: default_min_request_interval_secs(),
            request_queue_limit: default_request_queue_limit(),
            search_radius_nm: default_search_radius_nm(),
            tick_interval_secs: default_tick_interval_secs(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            position: PositionConfig::default(),
            proxy: ProxyConfig::default(),
            metar: MetarConfig::default(),
            stations: default_stations(),
        }
    }
}
