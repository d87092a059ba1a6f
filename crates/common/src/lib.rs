//! Shared types, configuration, and errors for metar-watch.

pub mod config;
pub mod error;
pub mod types;

pub use error::Error;
pub use types::{FetchRequest, MetarRecord, Position, ProxyConfig};
