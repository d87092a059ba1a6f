//! Unified error type for metar-watch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("empty METAR payload for {0}")]
    EmptyRecord(String),

    #[error("stale METAR: {age_min} min old, max allowed {max_age_min} min")]
    StaleRecord { age_min: i64, max_age_min: i64 },

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
