//! Configuration loader — merges env vars, .env file, and config.toml.

use common::config::WatchConfig;
use common::Error;
use std::path::Path;

fn parse_positive_f64(raw: &str, env_name: &str) -> Result<f64, Error> {
    let parsed = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::Config(format!("{env_name} must be a number > 0")))?;
    if parsed <= 0.0 {
        return Err(Error::Config(format!("{env_name} must be a number > 0")));
    }
    Ok(parsed)
}

fn parse_f64(raw: &str, env_name: &str) -> Result<f64, Error> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| Error::Config(format!("{env_name} must be a number")))
}

fn parse_bool(raw: &str) -> bool {
    let lowered = raw.trim().to_ascii_lowercase();
    lowered != "0" && lowered != "false" && lowered != "no" && lowered != "off"
}

fn validate_config(config: &WatchConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.metar.refresh_secs <= 0.0 {
        issues.push("metar.refresh_secs must be > 0".into());
    }
    if config.metar.position_secs <= 0.0 {
        issues.push("metar.position_secs must be > 0".into());
    }
    if config.metar.min_request_interval_secs < 0.0 {
        issues.push("metar.min_request_interval_secs must be >= 0".into());
    }
    if config.metar.request_queue_limit == 0 {
        issues.push("metar.request_queue_limit must be > 0".into());
    }
    if config.metar.search_radius_nm <= 0.0 {
        issues.push("metar.search_radius_nm must be > 0".into());
    }
    if config.metar.tick_interval_secs <= 0.0 {
        issues.push("metar.tick_interval_secs must be > 0".into());
    }
    if config.metar.max_age_min < 0 {
        issues.push("metar.max_age_min must be >= 0".into());
    }

    if config.stations.is_empty() {
        issues.push("stations must contain at least one station".into());
    }
    for station in &config.stations {
        // An empty id is reserved for the worker-shutdown sentinel.
        if station.id.trim().is_empty() {
            issues.push("stations[].id must not be empty".into());
        }
        if !(-90.0..=90.0).contains(&station.lat) {
            issues.push(format!("station {}: lat must be in [-90, 90]", station.id));
        }
        if !(-180.0..=180.0).contains(&station.lon) {
            issues.push(format!("station {}: lon must be in [-180, 180]", station.id));
        }
    }

    if !(-90.0..=90.0).contains(&config.position.lat) {
        issues.push("position.lat must be in [-90, 90]".into());
    }
    if !(-180.0..=180.0).contains(&config.position.lon) {
        issues.push("position.lon must be in [-180, 180]".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load configuration from environment and optional config file.
pub fn load_config() -> Result<WatchConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = WatchConfig::default();

    // 3. Try loading config.toml if it exists.
    let config_path = Path::new("config.toml");
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read config.toml: {}", e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config.toml: {}", e)))?;
    }

    // 4. Override with environment variables (highest priority).
    if let Ok(raw) = std::env::var("METAR_ENABLED") {
        config.enabled = parse_bool(&raw);
    }
    if let Ok(raw) = std::env::var("METAR_DATA_SOURCE") {
        config.metar.data_source = raw;
    }
    if let Ok(raw) = std::env::var("METAR_MAX_AGE_MIN") {
        let parsed = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::Config("METAR_MAX_AGE_MIN must be an integer >= 0".into()))?;
        if parsed < 0 {
            return Err(Error::Config(
                "METAR_MAX_AGE_MIN must be an integer >= 0".into(),
            ));
        }
        config.metar.max_age_min = parsed;
    }
    if let Ok(raw) = std::env::var("METAR_REFRESH_SECS") {
        config.metar.refresh_secs = parse_positive_f64(&raw, "METAR_REFRESH_SECS")?;
    }
    if let Ok(raw) = std::env::var("POSITION_LAT") {
        config.position.lat = parse_f64(&raw, "POSITION_LAT")?;
    }
    if let Ok(raw) = std::env::var("POSITION_LON") {
        config.position.lon = parse_f64(&raw, "POSITION_LON")?;
    }
    if let Ok(raw) = std::env::var("PROXY_HOST") {
        config.proxy.host = raw;
    }
    if let Ok(raw) = std::env::var("PROXY_PORT") {
        config.proxy.port = raw;
    }
    if let Ok(raw) = std::env::var("PROXY_AUTH") {
        config.proxy.auth = raw;
    }

    // 5. Validate.
    validate_config(&config)?;

    Ok(config)
}
