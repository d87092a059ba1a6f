//! Cached observation state.

/// The controller's view of the last-accepted observation.
///
/// Owned and mutated only by the controller's task. `valid` tracks whether
/// the content corresponds to the current station and time window; it is
/// governed by the controller's timers, not by when data happened to arrive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedState {
    /// Last-accepted normalized METAR text, or empty before bootstrap.
    pub data: String,
    /// Whether `data` is currently trusted.
    pub valid: bool,
    /// The currently targeted station.
    pub station_id: String,
}

impl CachedState {
    pub fn is_populated(&self) -> bool {
        !self.data.is_empty()
    }
}
