//! Capture session scheduling.
//!
//! [`CaptureState`] is the pure state machine (Idle → Waiting ⇄ Resolving
//! → Stopped); [`CaptureLoop`] drives it from tokio timers. Each attempt
//! runs on a blocking worker while the loop keeps servicing stop and
//! refresh requests. At most one attempt is ever in flight.

use crate::engine::{Attempt, EngineError, Feedback, Resolver};
use rollcall_core::{FrameSource, SignatureSource};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No session yet.
    Idle,
    /// Session active, waiting out the settle delay.
    Waiting,
    /// One attempt in flight.
    Resolving,
    /// Terminal.
    Stopped,
}

/// Capture session state machine. Time is passed in, never read.
#[derive(Debug)]
pub struct CaptureState {
    state: LoopState,
    settle_delay: Duration,
    ready_at: Option<Instant>,
}

impl CaptureState {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            state: LoopState::Idle,
            settle_delay,
            ready_at: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Idle → Waiting. The first attempt waits one settle delay so the
    /// camera can adjust exposure.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.state != LoopState::Idle {
            return false;
        }
        self.state = LoopState::Waiting;
        self.ready_at = Some(now + self.settle_delay);
        true
    }

    /// Waiting → Resolving once the settle delay has elapsed. Never
    /// succeeds while an attempt is already in flight.
    pub fn try_begin(&mut self, now: Instant) -> bool {
        match (self.state, self.ready_at) {
            (LoopState::Waiting, Some(ready_at)) if now >= ready_at => {
                self.state = LoopState::Resolving;
                self.ready_at = None;
                true
            }
            _ => false,
        }
    }

    /// Resolving → Waiting, whatever the attempt's outcome. A stopped
    /// session stays stopped.
    pub fn finish(&mut self, now: Instant) {
        if self.state == LoopState::Resolving {
            self.state = LoopState::Waiting;
            self.ready_at = Some(now + self.settle_delay);
        }
    }

    /// Make the next attempt due now instead of after the settle delay.
    /// Has no effect while an attempt is in flight or once stopped.
    pub fn expedite(&mut self, now: Instant) -> bool {
        if self.state != LoopState::Waiting {
            return false;
        }
        self.ready_at = Some(now);
        true
    }

    /// Any state → Stopped. An attempt in flight is left to complete.
    pub fn stop(&mut self) {
        self.state = LoopState::Stopped;
        self.ready_at = None;
    }
}

/// Loop timing.
#[derive(Debug, Clone, Copy)]
pub struct LoopConfig {
    /// How often the loop checks whether an attempt may start.
    pub poll_interval: Duration,
    /// Minimum spacing between the end of one attempt and the next.
    pub settle_delay: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// Requests sent to a running loop.
enum Control {
    Stop,
    RefreshRegistry,
    CaptureNow,
}

/// Clone-safe handle to a capture session.
#[derive(Clone)]
pub struct CaptureHandle {
    tx: mpsc::Sender<Control>,
}

impl CaptureHandle {
    /// Stop scheduling attempts. One already in flight still completes.
    pub async fn stop(&self) {
        let _ = self.tx.send(Control::Stop).await;
    }

    /// Reload the registry snapshot before the next attempt.
    pub async fn refresh_registry(&self) {
        let _ = self.tx.send(Control::RefreshRegistry).await;
    }

    /// Start an attempt at the next poll rather than after the settle
    /// delay. Ignored while an attempt is in flight.
    pub async fn capture_now(&self) {
        let _ = self.tx.send(Control::CaptureNow).await;
    }
}

/// Per-session outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub attempts: u32,
    pub recorded: u32,
    pub already_recorded: u32,
    pub unrecognized: u32,
    pub no_face: u32,
    pub failed: u32,
    /// Outcomes not delivered because the feedback listener lagged.
    pub feedback_dropped: u32,
}

impl SessionSummary {
    fn count(&mut self, feedback: &Feedback) {
        self.attempts += 1;
        match feedback {
            Feedback::NoFace => self.no_face += 1,
            Feedback::Unrecognized => self.unrecognized += 1,
            Feedback::AlreadyRecorded { .. } => self.already_recorded += 1,
            Feedback::Recorded { .. } => self.recorded += 1,
            Feedback::AttemptFailed { .. } => self.failed += 1,
        }
    }
}

type InFlight<F, S> = JoinHandle<(Resolver<F, S>, Result<Attempt, EngineError>)>;

/// One capture session.
pub struct CaptureLoop<F, S> {
    resolver: Resolver<F, S>,
    config: LoopConfig,
    control: mpsc::Receiver<Control>,
    feedback: mpsc::Sender<Feedback>,
}

impl<F, S> CaptureLoop<F, S>
where
    F: FrameSource + 'static,
    S: SignatureSource + 'static,
{
    pub fn new(
        resolver: Resolver<F, S>,
        config: LoopConfig,
        feedback: mpsc::Sender<Feedback>,
    ) -> (Self, CaptureHandle) {
        let (tx, control) = mpsc::channel(4);
        let session = Self {
            resolver,
            config,
            control,
            feedback,
        };
        (session, CaptureHandle { tx })
    }

    /// Run until stopped, the frame source closes, or a fatal error.
    ///
    /// Dropping every [`CaptureHandle`] counts as a stop request.
    pub async fn run(self) -> Result<SessionSummary, EngineError> {
        let Self {
            resolver,
            config,
            mut control,
            feedback,
        } = self;

        let mut state = CaptureState::new(config.settle_delay);
        let mut idle: Option<Resolver<F, S>> = Some(resolver);
        let mut in_flight: Option<InFlight<F, S>> = None;
        let mut refresh = false;
        let mut control_open = true;
        let mut summary = SessionSummary::default();

        let mut ticker = tokio::time::interval(config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        state.start(Instant::now());
        tracing::info!(
            poll_ms = config.poll_interval.as_millis() as u64,
            settle_ms = config.settle_delay.as_millis() as u64,
            "capture session started"
        );

        loop {
            if state.state() == LoopState::Stopped && in_flight.is_none() {
                break;
            }

            tokio::select! {
                biased;

                request = control.recv(), if control_open => match request {
                    Some(Control::Stop) => {
                        tracing::info!("capture session stop requested");
                        state.stop();
                    }
                    Some(Control::RefreshRegistry) => refresh = true,
                    Some(Control::CaptureNow) => {
                        if state.expedite(Instant::now()) {
                            tracing::debug!("manual capture requested");
                        }
                    }
                    None => {
                        tracing::info!("all capture handles dropped; stopping");
                        control_open = false;
                        state.stop();
                    }
                },

                joined = join_in_flight(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    let (resolver, result) = joined.map_err(|e| {
                        tracing::error!(error = %e, "capture worker failed");
                        EngineError::WorkerPanicked
                    })?;
                    idle = Some(resolver);
                    state.finish(Instant::now());

                    match result {
                        Ok(Attempt::Reported(outcome)) => {
                            summary.count(&outcome);
                            // Never wait on the listener: the loop must keep servicing control.
                            match feedback.try_send(outcome) {
                                Ok(()) | Err(TrySendError::Closed(_)) => {}
                                Err(TrySendError::Full(outcome)) => {
                                    summary.feedback_dropped += 1;
                                    tracing::warn!(?outcome, "feedback listener lagging; outcome dropped");
                                }
                            }
                        }
                        Ok(Attempt::Closed) => {
                            tracing::info!("frame source closed");
                            state.stop();
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "capture session failed");
                            state.stop();
                            return Err(e);
                        }
                    }
                },

                _ = ticker.tick() => {
                    if state.try_begin(Instant::now()) {
                        if let Some(mut resolver) = idle.take() {
                            if std::mem::take(&mut refresh) {
                                resolver.request_refresh();
                            }
                            in_flight = Some(tokio::task::spawn_blocking(move || {
                                let result = resolver.attempt();
                                (resolver, result)
                            }));
                        }
                    }
                },
            }
        }

        tracing::info!(
            attempts = summary.attempts,
            recorded = summary.recorded,
            feedback_dropped = summary.feedback_dropped,
            "capture session stopped"
        );
        Ok(summary)
    }
}

async fn join_in_flight<T>(
    handle: &mut Option<JoinHandle<T>>,
) -> Result<T, tokio::task::JoinError> {
    match handle {
        Some(h) => h.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::*;
    use crate::engine::MatchSettings;
    use rollcall_core::{
        AttendanceEvent, ExtractError, Frame, NewAttendance, Punctuality, Signature, YearMonth,
    };
    use rollcall_store::{AttendanceLedger, MemoryStore, StoreError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_state_machine_transitions() {
        let t0 = Instant::now();
        let settle = Duration::from_millis(1000);
        let mut s = CaptureState::new(settle);
        assert_eq!(s.state(), LoopState::Idle);
        assert!(!s.try_begin(t0));

        assert!(s.start(t0));
        assert!(!s.start(t0));
        assert_eq!(s.state(), LoopState::Waiting);
        assert!(!s.try_begin(t0 + Duration::from_millis(999)));
        assert!(s.try_begin(t0 + settle));
        assert_eq!(s.state(), LoopState::Resolving);

        // Mutual exclusion: no second attempt however much time passes.
        assert!(!s.try_begin(t0 + Duration::from_secs(3600)));

        let done = t0 + Duration::from_secs(2);
        s.finish(done);
        assert_eq!(s.state(), LoopState::Waiting);
        assert!(!s.try_begin(done + Duration::from_millis(500)));
        assert!(s.try_begin(done + settle));

        s.stop();
        assert!(!s.expedite(done));
        s.finish(done + Duration::from_secs(5));
        assert_eq!(s.state(), LoopState::Stopped);
        assert!(!s.try_begin(done + Duration::from_secs(10)));
    }

    #[test]
    fn test_expedite_only_while_waiting() {
        let t0 = Instant::now();
        let mut s = CaptureState::new(Duration::from_secs(60));
        assert!(!s.expedite(t0));

        s.start(t0);
        assert!(!s.try_begin(t0 + Duration::from_secs(1)));
        assert!(s.expedite(t0 + Duration::from_secs(1)));
        assert!(s.try_begin(t0 + Duration::from_secs(1)));

        // Still one attempt at a time.
        assert!(!s.expedite(t0 + Duration::from_secs(2)));
        assert!(!s.try_begin(t0 + Duration::from_secs(2)));
    }

    /// Model that records how many extractions overlap.
    struct Overlap {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        calls: Arc<AtomicUsize>,
    }

    impl SignatureSource for Overlap {
        fn extract(&mut self, _frame: &Frame) -> Result<Option<Signature>, ExtractError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    fn fast_config() -> LoopConfig {
        LoopConfig {
            poll_interval: Duration::from_millis(10),
            settle_delay: Duration::from_millis(30),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_more_than_one_attempt_in_flight() {
        let store = Arc::new(MemoryStore::new());
        let peak = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let model = Overlap {
            active: Arc::new(AtomicUsize::new(0)),
            peak: peak.clone(),
            calls: calls.clone(),
        };
        let resolver = Resolver::new(
            ScriptedFrames::new(20),
            model,
            store.clone(),
            store.clone(),
            Arc::new(FixedClock::at(8, 0)),
            MatchSettings::default(),
        )
        .unwrap();

        let (tx, mut rx) = mpsc::channel(64);
        let (session, _handle) = CaptureLoop::new(resolver, fast_config(), tx);
        let summary = session.run().await.unwrap();

        assert_eq!(summary.attempts, 20);
        assert_eq!(summary.no_face, 20);
        assert_eq!(calls.load(Ordering::SeqCst), 20);
        assert_eq!(peak.load(Ordering::SeqCst), 1);

        let mut seen = 0;
        while let Ok(fb) = rx.try_recv() {
            assert_eq!(fb, Feedback::NoFace);
            seen += 1;
        }
        assert_eq!(seen, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_spaced_by_settle_delay() {
        let store = Arc::new(MemoryStore::new());
        let resolver = Resolver::new(
            ScriptedFrames::new(3),
            ScriptedModel::new(vec![Shot::Empty, Shot::Empty, Shot::Empty]),
            store.clone(),
            store.clone(),
            Arc::new(FixedClock::at(8, 0)),
            MatchSettings::default(),
        )
        .unwrap();

        let (tx, _rx) = mpsc::channel(8);
        let config = LoopConfig {
            poll_interval: Duration::from_millis(250),
            settle_delay: Duration::from_millis(1200),
        };
        let (session, _handle) = CaptureLoop::new(resolver, config, tx);

        let started = Instant::now();
        let summary = session.run().await.unwrap();
        assert_eq!(summary.attempts, 3);
        // Three attempts plus the closing one, each behind a settle delay.
        assert!(started.elapsed() >= Duration::from_millis(4 * 1200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_records_once_per_day_across_attempts() {
        let store = Arc::new(MemoryStore::new());
        store.insert_person(person("P", &[0.0, 0.0])).unwrap();
        let clock = Arc::new(FixedClock::at(7, 55));
        let resolver = Resolver::new(
            ScriptedFrames::new(4),
            ScriptedModel::new(vec![
                Shot::Face(vec![0.3, 0.0]),
                Shot::Face(vec![0.0, 0.3]),
                Shot::Face(vec![5.0, 5.0]),
                Shot::Empty,
            ]),
            store.clone(),
            store.clone(),
            clock,
            MatchSettings::default(),
        )
        .unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let (session, _handle) = CaptureLoop::new(resolver, fast_config(), tx);
        let summary = session.run().await.unwrap();

        assert_eq!(
            summary,
            SessionSummary {
                attempts: 4,
                recorded: 1,
                already_recorded: 1,
                unrecognized: 1,
                no_face: 1,
                failed: 0,
                feedback_dropped: 0,
            }
        );
        assert!(matches!(rx.recv().await, Some(Feedback::Recorded { .. })));
        assert!(matches!(rx.recv().await, Some(Feedback::AlreadyRecorded { .. })));
        assert_eq!(rx.recv().await, Some(Feedback::Unrecognized));
        assert_eq!(rx.recv().await, Some(Feedback::NoFace));
        assert_eq!(store.events_on_date(day()).unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_camera_loss_stops_session_with_error() {
        let store = Arc::new(MemoryStore::new());
        let resolver = Resolver::new(
            DeadCamera,
            ScriptedModel::new(vec![]),
            store.clone(),
            store.clone(),
            Arc::new(FixedClock::at(8, 0)),
            MatchSettings::default(),
        )
        .unwrap();

        let (tx, _rx) = mpsc::channel(8);
        let (session, _handle) = CaptureLoop::new(resolver, fast_config(), tx);
        let err = session.run().await.unwrap_err();
        assert!(matches!(err, EngineError::CameraUnavailable(_)));
    }

    /// Model that blocks inside extraction until released.
    struct Gated {
        entered: mpsc::UnboundedSender<()>,
        release: std::sync::mpsc::Receiver<()>,
    }

    impl SignatureSource for Gated {
        fn extract(&mut self, _frame: &Frame) -> Result<Option<Signature>, ExtractError> {
            let _ = self.entered.send(());
            let _ = self.release.recv();
            Ok(None)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_lets_in_flight_attempt_finish() {
        let store = Arc::new(MemoryStore::new());
        let (entered_tx, mut entered_rx) = mpsc::unbounded_channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let resolver = Resolver::new(
            ScriptedFrames::new(10),
            Gated {
                entered: entered_tx,
                release: release_rx,
            },
            store.clone(),
            store.clone(),
            Arc::new(FixedClock::at(8, 0)),
            MatchSettings::default(),
        )
        .unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let (session, handle) = CaptureLoop::new(resolver, fast_config(), tx);
        let running = tokio::spawn(session.run());

        entered_rx.recv().await.unwrap();
        handle.stop().await;
        release_tx.send(()).unwrap();

        let summary = running.await.unwrap().unwrap();
        assert_eq!(summary.attempts, 1);
        assert_eq!(rx.recv().await, Some(Feedback::NoFace));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handles_stops_session() {
        let store = Arc::new(MemoryStore::new());
        let resolver = Resolver::new(
            ScriptedFrames::new(1000),
            ScriptedModel::new(vec![]),
            store.clone(),
            store.clone(),
            Arc::new(FixedClock::at(8, 0)),
            MatchSettings::default(),
        )
        .unwrap();

        let (tx, _rx) = mpsc::channel(8);
        let (session, handle) = CaptureLoop::new(resolver, fast_config(), tx);
        drop(handle);
        let summary = session.run().await.unwrap();
        assert_eq!(summary.attempts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_observed_while_listener_never_reads() {
        let store = Arc::new(MemoryStore::new());
        let resolver = Resolver::new(
            ScriptedFrames::new(1000),
            ScriptedModel::new(vec![]),
            store.clone(),
            store.clone(),
            Arc::new(FixedClock::at(8, 0)),
            MatchSettings::default(),
        )
        .unwrap();

        // Held open but never drained.
        let (tx, _rx) = mpsc::channel(1);
        let (session, handle) = CaptureLoop::new(resolver, fast_config(), tx);
        let running = tokio::spawn(session.run());

        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.stop().await;

        let summary = tokio::time::timeout(Duration::from_secs(30), running)
            .await
            .expect("session ignored stop")
            .unwrap()
            .unwrap();
        assert!(summary.attempts > 1);
        assert_eq!(summary.feedback_dropped, summary.attempts - 1);
    }

    /// Ledger whose first appends fail as if the disk were away.
    struct FlakyLedger {
        inner: Arc<MemoryStore>,
        failures: AtomicUsize,
    }

    impl AttendanceLedger for FlakyLedger {
        fn already_recorded(
            &self,
            person_id: &rollcall_core::PersonId,
            date: chrono::NaiveDate,
        ) -> Result<bool, StoreError> {
            self.inner.already_recorded(person_id, date)
        }

        fn append(&self, entry: NewAttendance) -> Result<uuid::Uuid, StoreError> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(StoreError::StorageUnavailable("disk I/O error".into()));
            }
            self.inner.append(entry)
        }

        fn events_on_date(
            &self,
            date: chrono::NaiveDate,
        ) -> Result<Vec<AttendanceEvent>, StoreError> {
            self.inner.events_on_date(date)
        }

        fn events_in_month(&self, month: YearMonth) -> Result<Vec<AttendanceEvent>, StoreError> {
            self.inner.events_in_month(month)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_failure_is_one_failed_attempt() {
        let store = Arc::new(MemoryStore::new());
        store.insert_person(person("P", &[0.0, 0.0])).unwrap();
        let ledger = Arc::new(FlakyLedger {
            inner: store.clone(),
            failures: AtomicUsize::new(1),
        });
        let resolver = Resolver::new(
            ScriptedFrames::new(2),
            ScriptedModel::new(vec![Shot::Face(vec![0.0, 0.0]), Shot::Face(vec![0.1, 0.0])]),
            store.clone(),
            ledger,
            Arc::new(FixedClock::at(8, 5)),
            MatchSettings::default(),
        )
        .unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let (session, _handle) = CaptureLoop::new(resolver, fast_config(), tx);
        let summary = session.run().await.unwrap();

        assert_eq!(summary.attempts, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.recorded, 1);
        assert!(matches!(rx.recv().await, Some(Feedback::AttemptFailed { .. })));
        match rx.recv().await {
            Some(Feedback::Recorded { status, .. }) => assert_eq!(status, Punctuality::OnTime),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(store.events_on_date(day()).unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_through_handle_reaches_next_attempt() {
        let store = Arc::new(MemoryStore::new());
        let resolver = Resolver::new(
            ScriptedFrames::new(2),
            ScriptedModel::new(vec![Shot::Face(vec![0.0, 0.0]), Shot::Face(vec![0.0, 0.0])]),
            store.clone(),
            store.clone(),
            Arc::new(FixedClock::at(7, 40)),
            MatchSettings::default(),
        )
        .unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let (session, handle) = CaptureLoop::new(resolver, LoopConfig::default(), tx);
        let running = tokio::spawn(session.run());

        assert_eq!(rx.recv().await, Some(Feedback::Unrecognized));
        store.insert_person(person("newcomer", &[0.0, 0.0])).unwrap();
        handle.refresh_registry().await;

        match rx.recv().await {
            Some(Feedback::Recorded { person_id, status, .. }) => {
                assert_eq!(person_id.as_str(), "newcomer");
                assert_eq!(status, Punctuality::Early);
            }
            other => panic!("unexpected {other:?}"),
        }
        let summary = running.await.unwrap().unwrap();
        assert_eq!(summary.recorded, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_now_skips_settle_delay() {
        let store = Arc::new(MemoryStore::new());
        let resolver = Resolver::new(
            ScriptedFrames::new(5),
            ScriptedModel::new(vec![]),
            store.clone(),
            store.clone(),
            Arc::new(FixedClock::at(8, 0)),
            MatchSettings::default(),
        )
        .unwrap();

        let config = LoopConfig {
            poll_interval: Duration::from_millis(10),
            settle_delay: Duration::from_secs(60),
        };
        let (tx, mut rx) = mpsc::channel(8);
        let (session, handle) = CaptureLoop::new(resolver, config, tx);
        let started = Instant::now();
        let running = tokio::spawn(session.run());

        handle.capture_now().await;
        assert_eq!(rx.recv().await, Some(Feedback::NoFace));
        assert!(started.elapsed() < Duration::from_secs(1));

        handle.stop().await;
        let summary = running.await.unwrap().unwrap();
        assert_eq!(summary.attempts, 1);
    }
}
