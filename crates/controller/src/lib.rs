//! Self-refreshing METAR cache controller.
//!
//! A `StationController` ticks once per host frame, ages three independent
//! timers, and keeps its cached observation in sync with the nearest station
//! to a moving observer. Slow network fetches run on a background worker fed
//! through a bounded queue; only the bootstrap fetch after an enable runs in
//! the foreground, so dependent logic never observes an empty cache.

pub mod cache;
pub mod controller;
pub mod pipeline;

pub use cache::CachedState;
pub use controller::{PositionSource, StationController, StationResolver};
pub use pipeline::FetchPipeline;
