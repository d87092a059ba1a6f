//! The station controller: timers, refresh decisions, cache ownership.

use std::sync::Arc;

use common::config::MetarConfig;
use common::{FetchRequest, MetarRecord, Position, ProxyConfig};
use metar_source::MetarSource;
use tracing::{debug, info, warn};

use crate::cache::CachedState;
use crate::pipeline::FetchPipeline;

/// Where the observer currently is. Read once per tick.
pub trait PositionSource: Send + Sync {
    fn current(&self) -> Position;
}

/// Resolves the nearest qualifying station to a coordinate.
pub trait StationResolver: Send + Sync {
    /// Nearest station within `radius_nm`, or `None` if nothing qualifies.
    fn nearest(&self, position: Position, radius_nm: f64) -> Option<String>;
}

/// Keeps a cached METAR synchronized with the nearest station to a moving
/// observer.
///
/// All state lives on the instance; multiple controllers (one per simulated
/// observer) are independent. The host drives `tick` once per frame with the
/// elapsed simulation seconds; everything slow happens on the pipeline's
/// worker except the one foreground bootstrap fetch per enable-cycle.
pub struct StationController {
    cfg: MetarConfig,
    proxy: ProxyConfig,
    position: Arc<dyn PositionSource>,
    resolver: Arc<dyn StationResolver>,
    pipeline: FetchPipeline,
    cache: CachedState,

    /// Seconds until the cached record is no longer trusted.
    record_ttl: f64,
    /// Seconds until the nearest station is re-resolved.
    position_ttl: f64,
    /// Seconds until another fetch request may be issued.
    min_request_interval: f64,

    enabled: bool,
    /// Whether the previous tick ran enabled. Cleared on disable so the next
    /// enabled tick repeats the bootstrap path.
    seen_enabled: bool,
}

impl StationController {
    pub fn new(
        cfg: MetarConfig,
        proxy: ProxyConfig,
        source: Arc<dyn MetarSource>,
        position: Arc<dyn PositionSource>,
        resolver: Arc<dyn StationResolver>,
    ) -> Self {
        let pipeline = FetchPipeline::spawn(source, cfg.max_age_min, cfg.request_queue_limit);
        Self {
            cfg,
            proxy,
            position,
            resolver,
            pipeline,
            cache: CachedState::default(),
            record_ttl: 0.0,
            position_ttl: 0.0,
            min_request_interval: 0.0,
            enabled: true,
            seen_enabled: false,
        }
    }

    /// Reset the bootstrap flag and tick once with zero elapsed time so the
    /// cache is populated as soon as possible. The fetch this triggers runs
    /// in the foreground, bounded only by the transport's own timeout.
    pub async fn start(&mut self) -> Option<MetarRecord> {
        self.seen_enabled = false;
        self.tick(0.0).await
    }

    /// Reset enable bookkeeping. The worker keeps running; it is torn down
    /// by `shutdown`.
    pub fn stop(&mut self) {
        self.seen_enabled = false;
    }

    /// The external enable gate.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn cache(&self) -> &CachedState {
        &self.cache
    }

    /// Whether the cached data is currently trusted.
    pub fn is_trusted(&self) -> bool {
        self.cache.valid
    }

    pub fn station_id(&self) -> &str {
        &self.cache.station_id
    }

    /// Per-frame entry point. No-op while disabled (and re-arms the
    /// bootstrap path for the next enable). Returns the record drained this
    /// tick, if any, so the host can forward it to its output sink.
    pub async fn tick(&mut self, elapsed_secs: f64) -> Option<MetarRecord> {
        if !self.enabled {
            self.seen_enabled = false;
            return None;
        }
        let first = !self.seen_enabled;
        self.seen_enabled = true;
        self.refresh(first, elapsed_secs).await
    }

    /// Tear down the fetch worker (sentinel + join).
    pub async fn shutdown(self) {
        self.pipeline.shutdown().await;
    }

    async fn refresh(&mut self, first: bool, elapsed_secs: f64) -> Option<MetarRecord> {
        self.record_ttl -= elapsed_secs;
        self.position_ttl -= elapsed_secs;
        self.min_request_interval -= elapsed_secs;

        let mut valid = self.cache.valid;
        let mut station_id = if valid {
            self.cache.station_id.clone()
        } else {
            String::new()
        };

        // Force an immediate refresh decision on the first tick of an
        // enable-cycle, whatever the inherited timers say.
        if first {
            self.record_ttl = 0.0;
        }

        if self.record_ttl <= 0.0 {
            valid = false;
            self.record_ttl = self.cfg.refresh_secs;
            self.position_ttl = 0.0;
        }

        if self.position_ttl <= 0.0 || !valid {
            self.position_ttl = self.cfg.position_secs;

            let pos = self.position.current();
            let Some(nearest) = self.resolver.nearest(pos, self.cfg.search_radius_nm) else {
                warn!(
                    "no METAR station within {} NM of ({:.4}, {:.4})",
                    self.cfg.search_radius_nm, pos.lat, pos.lon
                );
                return None;
            };

            if station_id != nearest {
                valid = false;
                station_id = nearest;
            }
        }

        if !valid && self.min_request_interval <= 0.0 && !station_id.is_empty() {
            let request = FetchRequest::new(station_id.clone(), self.proxy.clone());
            // The first fetch of an enable-cycle runs in the foreground so a
            // record is in the cache before dependent logic runs; everything
            // after goes through the background queue.
            self.pipeline.submit(request, !first).await;
            self.min_request_interval = self.cfg.min_request_interval_secs;
        }

        self.cache.valid = valid;
        self.cache.station_id = station_id;

        if let Some(record) = self.pipeline.try_take() {
            info!("received METAR for {}: {}", record.station_id, record.raw);
            self.cache.data = record.raw.clone();
            // Receipt updates content only; trust is timer-driven. The one
            // exception: a record for the currently targeted station means
            // the content now matches the station/time window.
            if record.station_id == self.cache.station_id {
                self.cache.valid = true;
            } else {
                debug!(
                    "late METAR for superseded station {} (current target {})",
                    record.station_id, self.cache.station_id
                );
            }
            return Some(record);
        }

        None
    }
}
