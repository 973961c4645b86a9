use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ProcessingConfig;
use crate::error::{DubError, Result};
use super::{reconcile, ProcessingApi, ProcessingRequest, ProcessingSnapshot, RemoteOutcome, StatusSequence};

/// Terminal success signal of one run, tagged with the generation that started it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingDone {
    pub generation: u64,
    pub result_reference: String,
}

/// Mutable state of one activation. Both tasks write only through this record.
#[derive(Debug)]
struct ProcessingRun {
    cursor: usize,
    outcome: RemoteOutcome,
    torn_down: bool,
}

impl ProcessingRun {
    fn is_live(&self) -> bool {
        !self.torn_down && self.outcome.is_pending()
    }
}

struct RunShared {
    id: Uuid,
    generation: u64,
    sequence: StatusSequence,
    run: Mutex<ProcessingRun>,
    snapshots: watch::Sender<ProcessingSnapshot>,
}

impl RunShared {
    fn lock(&self) -> MutexGuard<'_, ProcessingRun> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, run: &ProcessingRun) {
        self.snapshots.send_replace(reconcile(&self.sequence, run.cursor, &run.outcome));
    }
}

/// Runs the cosmetic phase ticker and the remote submission side by side
pub struct ProcessingOrchestrator {
    api: Arc<dyn ProcessingApi>,
    sequence: StatusSequence,
    tick_interval: Duration,
}

impl ProcessingOrchestrator {
    /// Fails on a zero tick interval
    pub fn new(api: Arc<dyn ProcessingApi>, sequence: StatusSequence, tick_interval: Duration) -> Result<Self> {
        if tick_interval.is_zero() {
            return Err(DubError::Config("processing tick interval must be greater than zero".to_string()));
        }
        Ok(Self { api, sequence, tick_interval })
    }

    pub fn from_config(api: Arc<dyn ProcessingApi>, config: &ProcessingConfig) -> Result<Self> {
        Self::new(api, StatusSequence::from_config(config)?, config.tick_interval())
    }

    pub fn sequence(&self) -> &StatusSequence {
        &self.sequence
    }

    /// Start one run. Must be called inside a tokio runtime.
    ///
    /// The success signal goes to `done_tx` at most once. Dropping the returned
    /// handle tears the run down.
    pub fn activate(
        &self,
        request: ProcessingRequest,
        generation: u64,
        done_tx: mpsc::UnboundedSender<ProcessingDone>,
    ) -> ProcessingHandle {
        let id = Uuid::new_v4();
        let initial = ProcessingRun {
            cursor: 0,
            outcome: RemoteOutcome::Pending,
            torn_down: false,
        };
        let (snapshots, receiver) = watch::channel(reconcile(&self.sequence, initial.cursor, &initial.outcome));

        let shared = Arc::new(RunShared {
            id,
            generation,
            sequence: self.sequence.clone(),
            run: Mutex::new(initial),
            snapshots,
        });

        info!(
            run_id = %id,
            generation,
            "Processing {} [{} -> {}]",
            request.file.name,
            request.source_language,
            request.target_language
        );

        let ticker = tokio::spawn(run_ticker(Arc::clone(&shared), self.tick_interval)).abort_handle();
        tokio::spawn(run_remote(
            Arc::clone(&shared),
            Arc::clone(&self.api),
            request,
            ticker.clone(),
            done_tx,
        ));

        ProcessingHandle {
            shared,
            snapshots: receiver,
            ticker,
        }
    }
}

async fn run_ticker(shared: Arc<RunShared>, period: Duration) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let mut run = shared.lock();
        if !run.is_live() {
            break;
        }
        let Some(next) = shared.sequence.advance(run.cursor) else {
            break;
        };
        run.cursor = next;
        shared.publish(&run);
        debug!(run_id = %shared.id, cursor = next, "{}", shared.sequence.phase(next));

        if shared.sequence.advance(next).is_none() {
            debug!(run_id = %shared.id, "All phases shown, ticker stopped");
            break;
        }
    }
}

async fn run_remote(
    shared: Arc<RunShared>,
    api: Arc<dyn ProcessingApi>,
    request: ProcessingRequest,
    ticker: AbortHandle,
    done_tx: mpsc::UnboundedSender<ProcessingDone>,
) {
    let result = api.process_video(request).await;

    let mut run = shared.lock();
    if !run.is_live() {
        debug!(run_id = %shared.id, generation = shared.generation, "Discarding response for superseded run");
        return;
    }

    ticker.abort();
    run.outcome = match result {
        Ok(reference) => {
            info!(run_id = %shared.id, "Processing complete: {}", reference);
            RemoteOutcome::Succeeded(reference)
        }
        Err(e) => {
            warn!(run_id = %shared.id, "Processing failed: {}", e);
            RemoteOutcome::Failed(e.to_string())
        }
    };

    // Queued before publishing so a terminal snapshot always has its signal waiting
    if let RemoteOutcome::Succeeded(reference) = &run.outcome {
        let done = ProcessingDone {
            generation: shared.generation,
            result_reference: reference.clone(),
        };
        if done_tx.send(done).is_err() {
            debug!(run_id = %shared.id, "Controller gone, success signal dropped");
        }
    }
    shared.publish(&run);
}

/// Handle on a mounted run
pub struct ProcessingHandle {
    shared: Arc<RunShared>,
    snapshots: watch::Receiver<ProcessingSnapshot>,
    ticker: AbortHandle,
}

impl ProcessingHandle {
    pub fn run_id(&self) -> Uuid {
        self.shared.id
    }

    pub fn generation(&self) -> u64 {
        self.shared.generation
    }

    /// Current display state
    pub fn snapshot(&self) -> ProcessingSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that observes every display change
    pub fn subscribe(&self) -> watch::Receiver<ProcessingSnapshot> {
        self.snapshots.clone()
    }

    pub fn is_ticker_finished(&self) -> bool {
        self.ticker.is_finished()
    }

    /// Wait until the remote outcome leaves `Pending`
    pub async fn wait_terminal(&mut self) -> RemoteOutcome {
        loop {
            let outcome = self.snapshots.borrow_and_update().outcome.clone();
            if !outcome.is_pending() {
                return outcome;
            }
            if self.snapshots.changed().await.is_err() {
                return self.snapshots.borrow().outcome.clone();
            }
        }
    }

    /// Stop the ticker and make any later remote response a no-op. Idempotent.
    pub fn teardown(&self) {
        let mut run = self.shared.lock();
        if !run.torn_down {
            run.torn_down = true;
            self.ticker.abort();
            debug!(run_id = %self.shared.id, generation = self.shared.generation, "Processing run torn down");
        }
    }
}

impl Drop for ProcessingHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::DubError;
    use crate::processing::MockProcessingApi;
    use crate::session::VideoFile;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    const SECOND: Duration = Duration::from_secs(1);

    /// Resolves after `delay` with a fixed result
    struct DelayedApi {
        delay: Duration,
        result: std::result::Result<String, String>,
        calls: AtomicUsize,
    }

    impl DelayedApi {
        fn succeeding(delay: Duration, reference: &str) -> Arc<Self> {
            Arc::new(Self {
                delay,
                result: Ok(reference.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(delay: Duration, message: &str) -> Arc<Self> {
            Arc::new(Self {
                delay,
                result: Err(message.to_string()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ProcessingApi for DelayedApi {
        async fn process_video(&self, _request: ProcessingRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            sleep(self.delay).await;
            self.result.clone().map_err(DubError::Remote)
        }
    }

    fn orchestrator(api: Arc<dyn ProcessingApi>) -> ProcessingOrchestrator {
        ProcessingOrchestrator::from_config(api, &Config::default().processing).unwrap()
    }

    fn request() -> ProcessingRequest {
        ProcessingRequest {
            file: VideoFile::new("talk.mp4", "video/mp4", b"bytes".to_vec()),
            source_language: "auto".to_string(),
            target_language: "fr".to_string(),
        }
    }

    /// Let spawned tasks observe the current virtual time
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_fifth_tick() {
        let api = DelayedApi::succeeding(16 * SECOND, "http://backend/processed/out.mp4");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = orchestrator(api.clone()).activate(request(), 1, tx);

        sleep(Duration::from_millis(15_500)).await;
        settle().await;
        let before = handle.snapshot();
        assert_eq!(before.cursor, 5);
        assert_eq!(before.progress, 45);
        assert_eq!(before.status, "Translating text to target language...");

        sleep(SECOND).await;
        settle().await;
        let after = handle.snapshot();
        assert_eq!(after.progress, 100);
        assert_eq!(after.status, "Processing complete!");
        assert_eq!(after.outcome, RemoteOutcome::Succeeded("http://backend/processed/out.mp4".to_string()));

        let done = rx.try_recv().unwrap();
        assert_eq!(done.generation, 1);
        assert_eq!(done.result_reference, "http://backend/processed/out.mp4");
        assert!(rx.try_recv().is_err());
        assert!(handle.is_ticker_finished());

        // No further ticks change anything
        sleep(60 * SECOND).await;
        settle().await;
        assert_eq!(handle.snapshot(), after);
        assert!(rx.try_recv().is_err());
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_before_first_tick() {
        let api = DelayedApi::failing(2 * SECOND, "connection refused");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handle = orchestrator(api).activate(request(), 7, tx);

        let outcome = handle.wait_terminal().await;
        assert!(matches!(outcome, RemoteOutcome::Failed(ref msg) if msg.contains("connection refused")));

        let failed = handle.snapshot();
        assert_eq!(failed.progress, 0);
        assert_eq!(failed.cursor, 0);
        assert_eq!(failed.status, "Error processing video. Please ensure backend is running.");

        sleep(40 * SECOND).await;
        settle().await;
        assert_eq!(handle.snapshot(), failed);
        assert!(handle.is_ticker_finished());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backend_holds_last_phase() {
        let api = DelayedApi::succeeding(120 * SECOND, "http://backend/late.mp4");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handle = orchestrator(api).activate(request(), 1, tx);

        sleep(100 * SECOND).await;
        settle().await;
        let held = handle.snapshot();
        assert_eq!(held.cursor, 9);
        assert_eq!(held.progress, 81);
        assert_eq!(held.status, "Finalizing translated video...");
        assert!(handle.is_ticker_finished());

        let outcome = handle.wait_terminal().await;
        assert_eq!(outcome, RemoteOutcome::Succeeded("http://backend/late.mp4".to_string()));
        assert_eq!(handle.snapshot().progress, 100);
        assert_eq!(rx.try_recv().unwrap().result_reference, "http://backend/late.mp4");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cursor_monotonic_and_progress_capped() {
        let api = DelayedApi::succeeding(200 * SECOND, "http://backend/x.mp4");
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = orchestrator(api).activate(request(), 1, tx);
        let mut snapshots = handle.subscribe();

        let mut last_cursor = 0;
        loop {
            let snapshot = snapshots.borrow_and_update().clone();
            if snapshot.is_terminal() {
                break;
            }
            assert!(snapshot.cursor >= last_cursor);
            assert!(snapshot.cursor <= 9);
            assert!(snapshot.progress <= 90);
            last_cursor = snapshot.cursor;
            if snapshots.changed().await.is_err() {
                break;
            }
        }
        assert_eq!(last_cursor, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_discards_late_response() {
        let api = DelayedApi::succeeding(10 * SECOND, "http://backend/stale.mp4");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = orchestrator(api.clone()).activate(request(), 3, tx);

        sleep(Duration::from_millis(6_500)).await;
        settle().await;
        let at_teardown = handle.snapshot();
        assert_eq!(at_teardown.cursor, 2);

        handle.teardown();
        handle.teardown();

        sleep(30 * SECOND).await;
        settle().await;
        assert_eq!(handle.snapshot(), at_teardown);
        assert!(handle.is_ticker_finished());
        assert!(rx.try_recv().is_err());
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_tears_down() {
        let api = DelayedApi::succeeding(5 * SECOND, "http://backend/dropped.mp4");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = orchestrator(api).activate(request(), 1, tx);
        let observer = handle.subscribe();

        drop(handle);
        sleep(20 * SECOND).await;
        settle().await;

        assert!(observer.borrow().outcome.is_pending());
        assert_eq!(observer.borrow().cursor, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_inputs_passed_through_unchanged() {
        let mut api = MockProcessingApi::new();
        api.expect_process_video()
            .withf(|req| {
                req.file.data.is_empty()
                    && req.file.name == "empty.mp4"
                    && req.source_language == "auto"
                    && req.target_language == "de"
            })
            .times(1)
            .returning(|_| Ok("http://backend/empty.mp4".to_string()));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let request = ProcessingRequest {
            file: VideoFile::new("empty.mp4", "video/mp4", Vec::<u8>::new()),
            source_language: "auto".to_string(),
            target_language: "de".to_string(),
        };
        let mut handle = orchestrator(Arc::new(api)).activate(request, 1, tx);

        let outcome = handle.wait_terminal().await;
        assert_eq!(outcome, RemoteOutcome::Succeeded("http://backend/empty.mp4".to_string()));
        assert_eq!(rx.recv().await.unwrap().result_reference, "http://backend/empty.mp4");
    }

    #[test]
    fn test_zero_tick_interval_is_rejected() {
        let mut config = Config::default().processing;
        config.tick_interval_ms = 0;
        let api = DelayedApi::succeeding(SECOND, "http://backend/never.mp4");

        let err = ProcessingOrchestrator::from_config(api.clone(), &config).err();
        assert!(matches!(err, Some(DubError::Config(_))));

        let sequence = StatusSequence::from_config(&config).unwrap();
        let err = ProcessingOrchestrator::new(api, sequence, Duration::ZERO).err();
        assert!(matches!(err, Some(DubError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_phase_sequence_never_ticks() {
        let api = DelayedApi::succeeding(30 * SECOND, "http://backend/one.mp4");
        let sequence = StatusSequence::new(vec!["Working...".to_string()], "Done", "Failed").unwrap();
        let orchestrator = ProcessingOrchestrator::new(api, sequence, 3 * SECOND).unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = orchestrator.activate(request(), 1, tx);

        sleep(10 * SECOND).await;
        settle().await;
        assert!(handle.is_ticker_finished());
        assert_eq!(handle.snapshot().status, "Working...");
        assert_eq!(handle.snapshot().progress, 0);
    }
}
