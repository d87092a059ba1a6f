//! Fetch pipeline: bounded request queue, background worker, response queue.
//!
//! Requests flow controller → bounded channel → worker; validated records
//! flow back on an unbounded channel the controller drains with `try_recv`,
//! so the tick path never suspends on the pipeline. Shutdown is cooperative:
//! a sentinel request followed by a join.

use std::sync::Arc;

use common::{Error, FetchRequest, MetarRecord};
use metar_source::MetarSource;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Handle to the background fetch worker and its queues.
pub struct FetchPipeline {
    request_tx: mpsc::Sender<FetchRequest>,
    response_tx: mpsc::UnboundedSender<MetarRecord>,
    response_rx: mpsc::UnboundedReceiver<MetarRecord>,
    worker: JoinHandle<()>,
    source: Arc<dyn MetarSource>,
    max_age_min: i64,
    queue_limit: usize,
}

impl FetchPipeline {
    /// Spawn the worker task. `queue_limit` bounds the number of outstanding
    /// background requests; `max_age_min = 0` disables the stale-at-source
    /// check.
    pub fn spawn(source: Arc<dyn MetarSource>, max_age_min: i64, queue_limit: usize) -> Self {
        let (request_tx, request_rx) = mpsc::channel(queue_limit.max(1));
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        let worker = tokio::spawn(run_worker(
            request_rx,
            response_tx.clone(),
            source.clone(),
            max_age_min,
        ));

        Self {
            request_tx,
            response_tx,
            response_rx,
            worker,
            source,
            max_age_min,
            queue_limit,
        }
    }

    /// Submit a fetch request.
    ///
    /// `background = true` hands the request to the worker without blocking;
    /// if the queue is at capacity the request is dropped and logged, and
    /// `false` is returned. `background = false` bypasses the queue and
    /// fetches inline on the caller's task (bootstrap only), pushing any
    /// valid record onto the response queue so the same tick can drain it.
    pub async fn submit(&self, request: FetchRequest, background: bool) -> bool {
        if !background {
            if let Some(record) =
                fetch_and_validate(self.source.as_ref(), &request, self.max_age_min).await
            {
                let _ = self.response_tx.send(record);
            }
            return true;
        }

        match self.request_tx.try_send(request) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(request)) => {
                error!(
                    "more than {} outstanding METAR requests, dropping {}",
                    self.queue_limit, request.station_id
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(request)) => {
                warn!(
                    "fetch worker gone, dropping request for {}",
                    request.station_id
                );
                false
            }
        }
    }

    /// Non-blocking drain of one completed record, if any.
    pub fn try_take(&mut self) -> Option<MetarRecord> {
        self.response_rx.try_recv().ok()
    }

    /// Cooperative teardown: append the sentinel, then wait for the worker to
    /// observe it and exit. The sentinel uses a waiting send so it is never
    /// dropped by a full queue.
    pub async fn shutdown(self) {
        let _ = self.request_tx.send(FetchRequest::sentinel()).await;
        let _ = self.worker.await;
    }
}

/// Worker loop: pop, fetch, validate, respond. Exits only on the sentinel
/// (or when every request sender is gone, which happens strictly after the
/// pipeline itself is dropped).
async fn run_worker(
    mut request_rx: mpsc::Receiver<FetchRequest>,
    response_tx: mpsc::UnboundedSender<MetarRecord>,
    source: Arc<dyn MetarSource>,
    max_age_min: i64,
) {
    while let Some(request) = request_rx.recv().await {
        if request.is_sentinel() {
            debug!("fetch worker observed shutdown sentinel");
            break;
        }

        if let Some(record) = fetch_and_validate(source.as_ref(), &request, max_age_min).await {
            if response_tx.send(record).is_err() {
                break;
            }
        }
    }
}

/// Fetch one station and validate the payload.
///
/// Transport failures, empty payloads, and records older than `max_age_min`
/// are logged and discarded; there is no retry here — the controller's
/// timer loop is the retry mechanism.
pub(crate) async fn fetch_and_validate(
    source: &dyn MetarSource,
    request: &FetchRequest,
    max_age_min: i64,
) -> Option<MetarRecord> {
    let fetched = match source.fetch(request).await {
        Ok(f) => f,
        Err(e) => {
            warn!("can't get METAR for {}: {}", request.station_id, e);
            return None;
        }
    };

    match validate(fetched, max_age_min) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("dropping METAR for {}: {}", request.station_id, e);
            None
        }
    }
}

/// Normalize a fetched payload and apply the stale-at-source bound.
fn validate(fetched: metar_source::FetchedMetar, max_age_min: i64) -> Result<MetarRecord, Error> {
    let raw = normalize(&fetched.raw);
    if raw.is_empty() {
        return Err(Error::EmptyRecord(fetched.station_id));
    }

    let age_min = fetched.age_min();
    if max_age_min > 0 && age_min > max_age_min {
        return Err(Error::StaleRecord {
            age_min,
            max_age_min,
        });
    }

    Ok(MetarRecord {
        station_id: fetched.station_id,
        raw,
        age_min,
    })
}

/// Collapse embedded line breaks to single spaces and trim the ends.
fn normalize(raw: &str) -> String {
    raw.replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use common::{Error, ProxyConfig};
    use metar_source::FetchedMetar;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Source that serves a canned payload, optionally parking forever on
    /// the first fetch to simulate a slow transport.
    #[derive(Debug)]
    struct MockSource {
        raw: String,
        age_min: i64,
        fail: bool,
        block_first: Option<Arc<Notify>>,
        fetches: AtomicUsize,
    }

    impl MockSource {
        fn new(raw: &str) -> Self {
            Self {
                raw: raw.into(),
                age_min: 0,
                fail: false,
                block_first: None,
                fetches: AtomicUsize::new(0),
            }
        }

        fn with_age(mut self, age_min: i64) -> Self {
            self.age_min = age_min;
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    #[async_trait]
    impl MetarSource for MockSource {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchedMetar, Error> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                if let Some(ref gate) = self.block_first {
                    gate.notified().await;
                }
            }
            if self.fail {
                return Err(Error::Transport("connection refused".into()));
            }
            Ok(FetchedMetar {
                station_id: request.station_id.clone(),
                raw: self.raw.clone(),
                observed_at: Utc::now() - Duration::minutes(self.age_min),
            })
        }
    }

    fn request(station: &str) -> FetchRequest {
        FetchRequest::new(station, ProxyConfig::default())
    }

    #[test]
    fn test_normalize_collapses_line_breaks() {
        assert_eq!(
            normalize("  KJFK 291251Z\n18010KT 10SM\r\nFEW250 \n"),
            "KJFK 291251Z 18010KT 10SM FEW250"
        );
    }

    #[tokio::test]
    async fn test_fetch_and_validate_discards_transport_failure() {
        let source = MockSource::new("whatever").failing();
        let got = fetch_and_validate(&source, &request("KJFK"), 0).await;
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_fetch_and_validate_discards_empty_payload() {
        let source = MockSource::new("  \n ");
        let got = fetch_and_validate(&source, &request("KJFK"), 0).await;
        assert!(got.is_none());
    }

    #[test]
    fn test_validate_classifies_empty_and_stale() {
        let empty = FetchedMetar {
            station_id: "KJFK".into(),
            raw: " \n ".into(),
            observed_at: Utc::now(),
        };
        assert!(matches!(
            validate(empty, 0),
            Err(Error::EmptyRecord(id)) if id == "KJFK"
        ));

        let stale = FetchedMetar {
            station_id: "KJFK".into(),
            raw: "KJFK 291251Z 18010KT".into(),
            observed_at: Utc::now() - Duration::minutes(90),
        };
        assert!(matches!(
            validate(stale, 60),
            Err(Error::StaleRecord { max_age_min: 60, .. })
        ));
    }

    #[tokio::test]
    async fn test_max_age_bound_drops_old_records() {
        let source = MockSource::new("KJFK 291251Z 18010KT").with_age(120);
        assert!(fetch_and_validate(&source, &request("KJFK"), 60)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_max_age_zero_delivers_regardless_of_age() {
        let source = MockSource::new("KJFK 291251Z 18010KT").with_age(120);
        let record = fetch_and_validate(&source, &request("KJFK"), 0)
            .await
            .expect("record should be delivered");
        assert_eq!(record.station_id, "KJFK");
        assert!(record.age_min >= 120);
    }

    #[tokio::test]
    async fn test_foreground_submit_bypasses_queue() {
        let source = Arc::new(MockSource::new("KJFK 291251Z 18010KT"));
        let mut pipeline = FetchPipeline::spawn(source, 0, 10);

        assert!(pipeline.submit(request("KJFK"), false).await);
        let record = pipeline.try_take().expect("record available same tick");
        assert_eq!(record.raw, "KJFK 291251Z 18010KT");

        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_saturated_queue_drops_without_blocking() {
        // Worker parks on the first fetch, so everything after it stays
        // queued. The gate is never released: dropped submissions must not
        // block the caller either way.
        let gate = Arc::new(Notify::new());
        let mut source = MockSource::new("KJFK 291251Z 18010KT");
        source.block_first = Some(gate.clone());
        let source = Arc::new(source);

        let pipeline = FetchPipeline::spawn(source.clone(), 0, 10);

        // First request is popped by the worker, which then blocks mid-fetch.
        assert!(pipeline.submit(request("S1"), true).await);
        while source.fetches.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        // Ten more fill the queue to its limit.
        for i in 2..=11 {
            assert!(
                pipeline.submit(request(&format!("S{i}")), true).await,
                "request S{i} should enqueue"
            );
        }

        // The next one exceeds the ceiling and is dropped, not blocked.
        assert!(!pipeline.submit(request("S12"), true).await);

        gate.notify_waiters();
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_worker_survives_transport_failures() {
        let source = Arc::new(MockSource::new("ignored").failing());
        let mut pipeline = FetchPipeline::spawn(source.clone(), 0, 10);

        assert!(pipeline.submit(request("KORD"), true).await);
        while source.fetches.load(Ordering::SeqCst) < 1 {
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;

        // Failure was discarded, no response produced, and the loop is still
        // alive: it observes the sentinel and exits cleanly.
        assert!(pipeline.try_take().is_none());
        tokio::time::timeout(std::time::Duration::from_secs(5), pipeline.shutdown())
            .await
            .expect("worker should exit on sentinel after failures");
    }

    #[tokio::test]
    async fn test_shutdown_sentinel_terminates_worker() {
        let source = Arc::new(MockSource::new("KJFK 291251Z 18010KT"));
        let pipeline = FetchPipeline::spawn(source, 0, 10);

        tokio::time::timeout(std::time::Duration::from_secs(5), pipeline.shutdown())
            .await
            .expect("worker should exit on sentinel");
    }
}
