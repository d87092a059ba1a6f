//! metar-watch: keep a live METAR cache for a moving observer.
//!
//! Single-binary Tokio application that:
//! 1. Resolves the nearest METAR station to the configured position
//! 2. Fetches observations from NOAA off the critical path
//! 3. Ticks the station controller once per interval
//! 4. Journals every accepted observation as JSONL

mod config;
mod journal;
mod stations;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use common::{FetchRequest, Position};
use controller::{PositionSource, StationController};
use journal::ObservationJournal;
use stations::StationTable;

/// Live METAR cache for a moving observer
#[derive(Parser)]
#[command(name = "metar-watch", about = "Live METAR cache for a moving observer")]
struct Cli {
    /// Fetch a single station once, print the record, and exit.
    #[arg(long, value_name = "STATION")]
    check_fetch: Option<String>,

    /// Run the bootstrap tick, print the cache, and exit.
    #[arg(long)]
    once: bool,
}

/// Position source backed by the loaded config.
struct FixedPosition(Position);

impl PositionSource for FixedPosition {
    fn current(&self) -> Position {
        self.0
    }
}

fn resolve_journal_dir() -> PathBuf {
    if let Ok(raw) = std::env::var("OBSERVATIONS_DIR") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    PathBuf::from("observations")
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "metar_watch=info,controller=info,metar_source=info".into()),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    // Load configuration.
    let cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let source = match metar_source::create_source(&cfg.metar.data_source) {
        Ok(s) => s,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    // ── Check-fetch mode ─────────────────────────────────────────────
    if let Some(station) = cli.check_fetch {
        info!("Fetching {} once...", station);
        let request = FetchRequest::new(station, cfg.proxy.clone());
        match source.fetch(&request).await {
            Ok(metar) => {
                info!(
                    "✅ {} ({} min old): {}",
                    metar.station_id,
                    metar.age_min(),
                    metar.raw.replace('\n', " ")
                );
            }
            Err(e) => {
                error!("❌ Fetch failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    info!(
        "Watching from ({:.4}, {:.4}) — {} stations, refresh={}s, position={}s, throttle={}s",
        cfg.position.lat,
        cfg.position.lon,
        cfg.stations.len(),
        cfg.metar.refresh_secs,
        cfg.metar.position_secs,
        cfg.metar.min_request_interval_secs,
    );

    let resolver = Arc::new(StationTable::new(cfg.stations.clone()));
    let position = Arc::new(FixedPosition(Position::new(
        cfg.position.lat,
        cfg.position.lon,
    )));

    let journal_dir = resolve_journal_dir();
    let mut journal = match ObservationJournal::open(journal_dir) {
        Ok(j) => {
            info!("Observation journal path: {}", j.dir().display());
            Some(j)
        }
        Err(e) => {
            warn!("Journal disabled: {}", e);
            None
        }
    };

    let mut ctrl = StationController::new(
        cfg.metar.clone(),
        cfg.proxy.clone(),
        source,
        position,
        resolver,
    );
    ctrl.set_enabled(cfg.enabled);

    // Bootstrap: one foreground fetch so the cache starts populated.
    if let Some(record) = ctrl.start().await {
        if let Some(j) = journal.as_mut() {
            j.write_record(&record);
        }
    }

    if cli.once {
        let cache = ctrl.cache();
        info!(
            "station={} trusted={} data={:?}",
            cache.station_id, cache.valid, cache.data
        );
        ctrl.shutdown().await;
        return;
    }

    // ── Tick loop ────────────────────────────────────────────────────
    info!("🛰️  metar-watch is running. Press Ctrl+C to stop.");

    let mut interval = tokio::time::interval(Duration::from_secs_f64(cfg.metar.tick_interval_secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            _ = interval.tick() => {
                let elapsed = last_tick.elapsed().as_secs_f64();
                last_tick = Instant::now();
                if let Some(record) = ctrl.tick(elapsed).await {
                    if let Some(j) = journal.as_mut() {
                        j.write_record(&record);
                    }
                }
            }
        }
    }

    ctrl.shutdown().await;
    info!("metar-watch shut down.");
}
