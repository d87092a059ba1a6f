//! METAR transport backends.
//!
//! Defines the `MetarSource` capability trait, the NOAA implementation, and
//! the factory that selects a backend by name.

pub mod noaa;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Error, FetchRequest};

pub use noaa::NoaaMetarSource;

/// A raw METAR observation as returned by a transport.
///
/// `raw` is the unnormalized record text; `observed_at` is the observation
/// timestamp reported by the source itself, so the intrinsic age of the
/// record is independent of when we happened to fetch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMetar {
    pub station_id: String,
    pub raw: String,
    pub observed_at: DateTime<Utc>,
}

impl FetchedMetar {
    /// Intrinsic age of the observation in minutes (clamped to zero).
    pub fn age_min(&self) -> i64 {
        (Utc::now() - self.observed_at).num_minutes().max(0)
    }
}

/// A blocking-fetch METAR backend.
#[async_trait]
pub trait MetarSource: Send + Sync + std::fmt::Debug {
    /// Fetch the current METAR for the request's station, using the proxy
    /// parameters snapshotted into the request.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedMetar, Error>;
}

/// Select a transport backend by name.
///
/// "noaa" (or empty) is the only backend today; the match below is the single
/// place a second one would plug in.
pub fn create_source(kind: &str) -> Result<Arc<dyn MetarSource>, Error> {
    match kind.trim().to_ascii_lowercase().as_str() {
        "" | "noaa" => Ok(Arc::new(NoaaMetarSource::new())),
        other => Err(Error::Config(format!(
            "unknown METAR data source {:?} (supported: noaa)",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_selects_noaa() {
        assert!(create_source("noaa").is_ok());
        assert!(create_source("NOAA").is_ok());
        assert!(create_source("").is_ok());
    }

    #[test]
    fn test_factory_rejects_unknown_kind() {
        let err = create_source("nwx").unwrap_err();
        assert!(matches!(err, Error::Config(_)), "unexpected error: {err}");
    }

    #[test]
    fn test_age_min_clamps_future_timestamps() {
        let metar = FetchedMetar {
            station_id: "KJFK".into(),
            raw: "KJFK 291251Z 18010KT 10SM FEW250 28/18 A3012".into(),
            observed_at: Utc::now() + chrono::Duration::minutes(5),
        };
        assert_eq!(metar.age_min(), 0);
    }
}
