//! Host-provided station table and nearest-station lookup.
//!
//! Stands in for the spatial index the controller treats as an external
//! collaborator: a flat list of known METAR stations searched by
//! great-circle distance.

use common::config::StationConfig;
use common::Position;
use controller::StationResolver;

const EARTH_RADIUS_NM: f64 = 3440.065;

/// A fixed table of METAR stations.
#[derive(Debug, Clone)]
pub struct StationTable {
    stations: Vec<StationConfig>,
}

impl StationTable {
    pub fn new(stations: Vec<StationConfig>) -> Self {
        Self { stations }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

/// Great-circle distance in nautical miles (haversine).
fn distance_nm(a: Position, b: Position) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_NM * h.sqrt().asin()
}

impl StationResolver for StationTable {
    fn nearest(&self, position: Position, radius_nm: f64) -> Option<String> {
        self.stations
            .iter()
            .map(|s| (distance_nm(position, Position::new(s.lat, s.lon)), s))
            .filter(|(d, _)| *d <= radius_nm)
            .min_by(|(d1, _), (d2, _)| d1.total_cmp(d2))
            .map(|(_, s)| s.id.clone())
    }
}
