use crate::application::persistence_bridge::{BridgeOutcome, IntervalRecorder, SubmissionTrigger};
use crate::application::presentation::TimerView;
use crate::application::NowProvider;
use crate::domain::messages::{messages_for, pick_message};
use crate::domain::models::{CompletedInterval, TimerLimits, TimerPhase, TimerStatus};
use crate::domain::timer::{PhaseSwitch, TimerSession, ToggleOutcome};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::notifier::{NotificationPermission, Notifier};
use crate::infrastructure::session_store::SessionStore;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct ControlOutcome {
    pub view: TimerView,
    /// Upload of the segment closed by this action, if any.
    pub submission: Option<JoinHandle<BridgeOutcome>>,
}

#[derive(Debug, Clone, Copy)]
enum MirrorWrite {
    Save,
    Clear,
}

/// Shared handle to the one timer of this client. Clones drive the same session.
#[derive(Clone)]
pub struct TimerService {
    session: Arc<Mutex<TimerSession>>,
    limits: TimerLimits,
    store: Arc<dyn SessionStore>,
    recorder: Arc<dyn IntervalRecorder>,
    notifier: Arc<dyn Notifier>,
    rng: Arc<Mutex<StdRng>>,
    now_provider: NowProvider,
    views: Arc<watch::Sender<TimerView>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    mounted: Arc<AtomicBool>,
    tick_period: Duration,
}

impl TimerService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        recorder: Arc<dyn IntervalRecorder>,
        notifier: Arc<dyn Notifier>,
        limits: TimerLimits,
    ) -> Self {
        let session = match store.load() {
            Ok(Some(persisted)) => TimerSession::restore(&persisted),
            Ok(None) => TimerSession::new(),
            Err(error) => {
                warn!("could not restore timer session, starting fresh: {error}");
                TimerSession::new()
            }
        };
        let now_provider: NowProvider = Arc::new(Utc::now);
        let (views, _) = watch::channel(TimerView::capture(&session, &limits, now_provider()));

        Self {
            session: Arc::new(Mutex::new(session)),
            limits,
            store,
            recorder,
            notifier,
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
            now_provider,
            views: Arc::new(views),
            ticker: Arc::new(Mutex::new(None)),
            mounted: Arc::new(AtomicBool::new(false)),
            tick_period: DEFAULT_TICK_PERIOD,
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        if let Ok(view) = self.view() {
            self.views.send_replace(view);
        }
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Arc::new(Mutex::new(rng));
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.now_provider)()
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, TimerSession>, InfraError> {
        self.session
            .lock()
            .map_err(|error| InfraError::LockPoisoned(format!("timer session: {error}")))
    }

    /// First mount asks for notification permission; later mounts reuse the answer.
    pub fn mount(&self) -> NotificationPermission {
        if self.mounted.swap(true, Ordering::SeqCst) {
            return self.notifier.permission();
        }
        let permission = self.notifier.request_permission();
        info!("notification permission: {}", permission.as_str());
        permission
    }

    /// Stops the tick source. The session and the permission answer are left as is.
    pub fn shutdown(&self) {
        self.cancel_ticker();
    }

    pub fn view(&self) -> Result<TimerView, InfraError> {
        let now = self.now();
        let session = self.lock_session()?;
        Ok(TimerView::capture(&session, &self.limits, now))
    }

    pub fn subscribe(&self) -> watch::Receiver<TimerView> {
        self.views.subscribe()
    }

    pub fn has_ticker(&self) -> bool {
        self.ticker
            .lock()
            .map(|ticker| ticker.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }

    pub fn start(&self) -> Result<ControlOutcome, InfraError> {
        self.control(SubmissionTrigger::Pause, |session, now| {
            session.start(now);
            None
        })
    }

    pub fn pause(&self) -> Result<ControlOutcome, InfraError> {
        self.control(SubmissionTrigger::Pause, TimerSession::pause)
    }

    pub fn stop(&self) -> Result<ControlOutcome, InfraError> {
        self.control(SubmissionTrigger::Stop, TimerSession::stop)
    }

    pub fn toggle(&self) -> Result<ControlOutcome, InfraError> {
        self.control(SubmissionTrigger::Pause, |session, now| {
            match session.toggle(now) {
                ToggleOutcome::Started => None,
                ToggleOutcome::Paused(closed) => closed,
            }
        })
    }

    /// Stop plus a reset of the session total and iteration count. The mirror row is
    /// dropped rather than rewritten with zeros.
    pub fn end_session(&self) -> Result<ControlOutcome, InfraError> {
        self.control_with(SubmissionTrigger::Stop, MirrorWrite::Clear, TimerSession::end_session)
    }

    /// The mirror write and the view publish happen under the session lock, so a tick
    /// racing a control can never publish or persist a stale state after it.
    fn control<F>(&self, trigger: SubmissionTrigger, action: F) -> Result<ControlOutcome, InfraError>
    where
        F: FnOnce(&mut TimerSession, DateTime<Utc>) -> Option<CompletedInterval>,
    {
        self.control_with(trigger, MirrorWrite::Save, action)
    }

    fn control_with<F>(
        &self,
        trigger: SubmissionTrigger,
        mirror: MirrorWrite,
        action: F,
    ) -> Result<ControlOutcome, InfraError>
    where
        F: FnOnce(&mut TimerSession, DateTime<Utc>) -> Option<CompletedInterval>,
    {
        let now = self.now();
        let (view, closed) = {
            let mut session = self.lock_session()?;
            let closed = action(&mut *session, now);
            let written = match mirror {
                MirrorWrite::Save => self.store.save(&session.persisted()),
                MirrorWrite::Clear => self.store.clear(),
            };
            if let Err(error) = written {
                warn!("failed to persist timer session: {error}");
            }
            let view = TimerView::capture(&session, &self.limits, now);
            self.sync_ticker(view.status);
            self.views.send_replace(view.clone());
            (view, closed)
        };
        debug!("timer {} in {} phase", view.status.as_str(), view.phase.as_str());

        let submission = closed.and_then(|interval| self.dispatch(interval, trigger));
        Ok(ControlOutcome { view, submission })
    }

    /// One recomputation step: derive live time, switch phase when the block is full,
    /// and publish the result.
    pub fn tick(&self) -> Result<TimerView, InfraError> {
        let now = self.now();
        let (view, switch) = {
            let mut session = self.lock_session()?;
            let switch = session.evaluate(now, &self.limits);
            if switch.is_some() {
                if let Err(error) = self.store.save(&session.persisted()) {
                    warn!("failed to persist timer session after phase switch: {error}");
                }
            }
            let view = TimerView::capture(&session, &self.limits, now);
            self.views.send_replace(view.clone());
            (view, switch)
        };

        if let Some(switch) = switch {
            self.on_phase_switch(switch);
        }
        Ok(view)
    }

    /// Switches only announce the new phase; uploads come from pause and stop.
    fn on_phase_switch(&self, switch: PhaseSwitch) {
        info!(
            "phase switch {} -> {} after {}s",
            switch.from.as_str(),
            switch.to.as_str(),
            switch.committed_seconds
        );
        self.announce(switch.to);
    }

    fn announce(&self, entered: TimerPhase) {
        let message = match self.rng.lock() {
            Ok(mut rng) => pick_message(messages_for(entered), &mut *rng),
            Err(error) => {
                warn!("message rng unavailable: {error}");
                messages_for(entered).first().copied()
            }
        };
        if let Some(message) = message {
            self.notifier.notify(message);
        }
    }

    fn dispatch(
        &self,
        interval: CompletedInterval,
        trigger: SubmissionTrigger,
    ) -> Option<JoinHandle<BridgeOutcome>> {
        let Ok(runtime) = Handle::try_current() else {
            warn!(
                "no async runtime, dropping {}s interval closed by {}",
                interval.duration_seconds(),
                trigger.as_str()
            );
            return None;
        };
        let recorder = Arc::clone(&self.recorder);
        Some(runtime.spawn(async move { recorder.submit(interval, trigger).await }))
    }

    fn sync_ticker(&self, status: TimerStatus) {
        if status == TimerStatus::Running {
            self.spawn_ticker();
        } else {
            self.cancel_ticker();
        }
    }

    fn spawn_ticker(&self) {
        let Ok(mut ticker) = self.ticker.lock() else {
            warn!("ticker lock poisoned");
            return;
        };
        if ticker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            debug!("no async runtime, ticks must be driven by the caller");
            return;
        };

        let service = self.clone();
        let period = self.tick_period;
        *ticker = Some(runtime.spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match service.tick() {
                    Ok(view) if view.is_running() => {}
                    Ok(_) => break,
                    Err(error) => {
                        warn!("timer tick failed: {error}");
                        break;
                    }
                }
            }
        }));
    }

    fn cancel_ticker(&self) {
        match self.ticker.lock() {
            Ok(mut ticker) => {
                if let Some(handle) = ticker.take() {
                    handle.abort();
                }
            }
            Err(error) => warn!("ticker lock poisoned: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::persistence_bridge::SessionPersistenceBridge;
    use crate::domain::messages::{BREAK_MESSAGES, WORK_MESSAGES};
    use crate::domain::models::{AuthSession, DailyTotal, PersistedAccumulators};
    use crate::infrastructure::credential_store::InMemoryCredentialStore;
    use crate::infrastructure::notifier::InMemoryNotifier;
    use crate::infrastructure::productivity_client::ProductivityApiClient;
    use crate::infrastructure::session_store::{InMemorySessionStore, SqliteSessionStore};
    use crate::infrastructure::storage::initialize_database;
    use async_trait::async_trait;

    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(
                    DateTime::parse_from_rfc3339("2026-02-16T09:00:00Z")
                        .expect("valid datetime")
                        .with_timezone(&Utc),
                ),
            })
        }

        fn advance(&self, seconds: i64) {
            *self.now.lock().expect("clock lock") += chrono::Duration::seconds(seconds);
        }

        fn provider(self: &Arc<Self>) -> NowProvider {
            let clock = Arc::clone(self);
            Arc::new(move || *clock.now.lock().expect("clock lock"))
        }
    }

    #[derive(Default)]
    struct RecordingRecorder {
        submissions: Mutex<Vec<(CompletedInterval, SubmissionTrigger)>>,
    }

    impl RecordingRecorder {
        fn submissions(&self) -> Vec<(CompletedInterval, SubmissionTrigger)> {
            self.submissions.lock().expect("lock submissions").clone()
        }
    }

    #[async_trait]
    impl IntervalRecorder for RecordingRecorder {
        async fn submit(&self, interval: CompletedInterval, trigger: SubmissionTrigger) -> BridgeOutcome {
            self.submissions
                .lock()
                .expect("lock submissions")
                .push((interval, trigger));
            BridgeOutcome::Recorded
        }
    }

    struct UnreachableBackend;

    #[async_trait]
    impl ProductivityApiClient for UnreachableBackend {
        async fn record_interval(
            &self,
            _access_token: &str,
            _interval: &CompletedInterval,
        ) -> Result<(), InfraError> {
            Err(InfraError::Http("network error while recording interval".to_string()))
        }

        async fn fetch_daily_totals(&self, _access_token: &str) -> Result<Vec<DailyTotal>, InfraError> {
            Err(InfraError::Http("network error while fetching totals".to_string()))
        }
    }

    struct Harness {
        clock: Arc<ManualClock>,
        recorder: Arc<RecordingRecorder>,
        notifier: Arc<InMemoryNotifier>,
        store: Arc<InMemorySessionStore>,
        service: TimerService,
    }

    fn harness_with(store: InMemorySessionStore, limits: TimerLimits) -> Harness {
        let clock = ManualClock::new();
        let recorder = Arc::new(RecordingRecorder::default());
        let notifier = Arc::new(InMemoryNotifier::granting());
        let store = Arc::new(store);
        let service = TimerService::new(store.clone(), recorder.clone(), notifier.clone(), limits)
            .with_now_provider(clock.provider())
            .with_rng(StdRng::seed_from_u64(7));
        Harness {
            clock,
            recorder,
            notifier,
            store,
            service,
        }
    }

    fn harness() -> Harness {
        harness_with(InMemorySessionStore::default(), TimerLimits::default())
    }

    async fn settle(outcome: ControlOutcome) -> (TimerView, Option<BridgeOutcome>) {
        let submitted = match outcome.submission {
            Some(handle) => Some(handle.await.expect("submission task")),
            None => None,
        };
        (outcome.view, submitted)
    }

    #[tokio::test]
    async fn pause_and_stop_accumulate_session_work() {
        let h = harness();
        h.service.start().expect("start");
        h.clock.advance(10);
        let (view, submitted) = settle(h.service.pause().expect("pause")).await;
        assert_eq!(view.status, TimerStatus::Paused);
        assert_eq!(submitted, Some(BridgeOutcome::Recorded));

        h.service.start().expect("resume");
        h.clock.advance(20);
        let (view, _) = settle(h.service.stop().expect("stop")).await;

        assert_eq!(view.status, TimerStatus::Idle);
        assert_eq!(view.session_work_seconds, 30);
        assert_eq!(view.work_seconds, 0);

        let submissions = h.recorder.submissions();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[0].0.duration_seconds(), 10);
        assert_eq!(submissions[0].1, SubmissionTrigger::Pause);
        assert_eq!(submissions[1].0.duration_seconds(), 20);
        assert_eq!(submissions[1].1, SubmissionTrigger::Stop);

        let mirrored = h.store.load().expect("load").expect("mirror written");
        assert_eq!(mirrored.session_total_work_seconds, 30);
        assert_eq!(mirrored.work_time_accum_seconds, 0);
    }

    #[tokio::test]
    async fn double_pause_submits_once() {
        let h = harness();
        h.service.start().expect("start");
        h.clock.advance(12);
        settle(h.service.pause().expect("pause")).await;
        h.clock.advance(30);
        let second = h.service.pause().expect("second pause");

        assert!(second.submission.is_none());
        assert_eq!(second.view.work_seconds, 12);
        assert_eq!(h.recorder.submissions().len(), 1);
    }

    #[tokio::test]
    async fn tick_switches_phase_at_the_limit() {
        let h = harness_with(
            InMemorySessionStore::with_state(PersistedAccumulators {
                work_time_accum_seconds: 1799,
                ..PersistedAccumulators::default()
            }),
            TimerLimits::default(),
        );
        h.service.mount();
        h.service.start().expect("start");

        let view = h.service.tick().expect("tick at limit minus one");
        assert_eq!(view.phase, TimerPhase::Work);
        assert_eq!(view.work_seconds, 1799);

        h.clock.advance(1);
        let view = h.service.tick().expect("tick at limit");
        assert_eq!(view.phase, TimerPhase::Break);
        assert_eq!(view.work_seconds, 0);
        assert_eq!(view.break_seconds, 0);
        assert_eq!(view.session_iterations, 0.5);

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(BREAK_MESSAGES.contains(&sent[0].as_str()));

        let mirrored = h.store.load().expect("load").expect("mirror");
        assert_eq!(mirrored.phase, TimerPhase::Break);
        assert_eq!(mirrored.session_iterations, 0.5);
    }

    #[tokio::test]
    async fn full_cycle_counts_one_iteration_and_two_notifications() {
        let h = harness_with(
            InMemorySessionStore::default(),
            TimerLimits {
                work_limit_seconds: 60,
                break_limit_seconds: 20,
            },
        );
        h.service.mount();
        h.service.start().expect("start");

        h.clock.advance(60);
        h.service.tick().expect("work block full");
        h.clock.advance(20);
        let view = h.service.tick().expect("break block full");

        assert_eq!(view.phase, TimerPhase::Work);
        assert_eq!(view.session_iterations, 1.0);
        assert_eq!(view.session_work_seconds, 60);

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 2);
        assert!(BREAK_MESSAGES.contains(&sent[0].as_str()));
        assert!(WORK_MESSAGES.contains(&sent[1].as_str()));

        tokio::task::yield_now().await;
        h.service.shutdown();
    }

    #[tokio::test]
    async fn unmounted_or_denied_timer_stays_silent() {
        let clock = ManualClock::new();
        let notifier = Arc::new(InMemoryNotifier::denying());
        let service = TimerService::new(
            Arc::new(InMemorySessionStore::default()),
            Arc::new(RecordingRecorder::default()),
            notifier.clone(),
            TimerLimits {
                work_limit_seconds: 5,
                break_limit_seconds: 5,
            },
        )
        .with_now_provider(clock.provider());

        assert_eq!(service.mount(), NotificationPermission::Denied);
        assert_eq!(service.mount(), NotificationPermission::Denied);
        assert_eq!(notifier.permission_requests(), 1);

        service.start().expect("start");
        clock.advance(5);
        assert_eq!(service.tick().expect("tick").phase, TimerPhase::Break);
        assert!(notifier.sent().is_empty());
        service.shutdown();
    }

    #[tokio::test]
    async fn ticker_only_exists_while_running() {
        let h = harness();
        assert!(!h.service.has_ticker());

        h.service.start().expect("start");
        assert!(h.service.has_ticker());

        h.service.pause().expect("pause");
        assert!(!h.service.has_ticker());

        h.service.toggle().expect("toggle resumes");
        assert!(h.service.has_ticker());

        h.service.shutdown();
        assert!(!h.service.has_ticker());
    }

    #[tokio::test]
    async fn observers_see_every_control() {
        let h = harness();
        let mut views = h.service.subscribe();

        h.service.start().expect("start");
        assert!(views.has_changed().expect("sender alive"));
        assert_eq!(views.borrow_and_update().status, TimerStatus::Running);

        h.clock.advance(3);
        h.service.tick().expect("tick");
        assert_eq!(views.borrow_and_update().work_seconds, 3);
        h.service.shutdown();
    }

    #[tokio::test]
    async fn backend_failure_leaves_local_state_intact() {
        let clock = ManualClock::new();
        let bridge = SessionPersistenceBridge::new(
            Arc::new(InMemoryCredentialStore::with_session(AuthSession {
                user_id: "user_1".to_string(),
                access_token: "token-1".to_string(),
                expires_at: None,
            })),
            Arc::new(UnreachableBackend),
        );
        let service = TimerService::new(
            Arc::new(InMemorySessionStore::default()),
            Arc::new(bridge),
            Arc::new(InMemoryNotifier::granting()),
            TimerLimits::default(),
        )
        .with_now_provider(clock.provider());

        service.start().expect("start");
        clock.advance(10);
        let (view, submitted) = settle(service.pause().expect("pause")).await;

        assert!(matches!(submitted, Some(BridgeOutcome::Failed(_))));
        assert_eq!(view.status, TimerStatus::Paused);
        assert_eq!(view.work_seconds, 10);
        assert_eq!(view.session_work_seconds, 10);
        assert_eq!(service.view().expect("view"), view);
    }

    #[tokio::test]
    async fn committed_time_survives_restart() {
        let path = std::env::temp_dir().join(format!(
            "taskai-timer-service-restart-{}.sqlite",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        initialize_database(&path).expect("initialize database");

        let clock = ManualClock::new();
        let first = TimerService::new(
            Arc::new(SqliteSessionStore::new(&path)),
            Arc::new(RecordingRecorder::default()),
            Arc::new(InMemoryNotifier::granting()),
            TimerLimits::default(),
        )
        .with_now_provider(clock.provider());
        first.start().expect("start");
        clock.advance(42);
        settle(first.pause().expect("pause")).await;
        first.shutdown();

        clock.advance(600);
        let second = TimerService::new(
            Arc::new(SqliteSessionStore::new(&path)),
            Arc::new(RecordingRecorder::default()),
            Arc::new(InMemoryNotifier::granting()),
            TimerLimits::default(),
        )
        .with_now_provider(clock.provider());
        let view = second.view().expect("view");

        assert_eq!(view.status, TimerStatus::Paused);
        assert_eq!(view.work_seconds, 42);
        assert_eq!(view.session_work_seconds, 42);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn controls_work_without_a_runtime() {
        let h = harness();
        h.service.start().expect("start");
        assert!(!h.service.has_ticker());
        h.clock.advance(5);
        let outcome = h.service.pause().expect("pause");
        assert!(outcome.submission.is_none());
        assert_eq!(outcome.view.work_seconds, 5);
    }

    #[tokio::test]
    async fn end_session_clears_aggregates_and_mirror() {
        let h = harness();
        h.service.start().expect("start");
        h.clock.advance(15);
        settle(h.service.pause().expect("pause")).await;
        assert!(h.store.load().expect("load").is_some());

        let (view, _) = settle(h.service.end_session().expect("end session")).await;
        assert_eq!(view.session_work_seconds, 0);
        assert_eq!(view.session_iterations, 0.0);
        assert_eq!(h.recorder.submissions().len(), 1);
        assert_eq!(h.store.load().expect("load"), None);
    }

    #[tokio::test]
    async fn phase_switch_uploads_nothing_until_pause() {
        let h = harness_with(
            InMemorySessionStore::with_state(PersistedAccumulators {
                work_time_accum_seconds: 1799,
                ..PersistedAccumulators::default()
            }),
            TimerLimits::default(),
        );
        h.service.start().expect("start");
        h.clock.advance(1);
        assert_eq!(h.service.tick().expect("tick").phase, TimerPhase::Break);
        tokio::task::yield_now().await;
        assert!(h.recorder.submissions().is_empty());

        h.clock.advance(10);
        settle(h.service.pause().expect("pause")).await;
        let submissions = h.recorder.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].1, SubmissionTrigger::Pause);
        assert_eq!(submissions[0].0.duration_seconds(), 10);
    }

    #[tokio::test]
    async fn remount_keeps_first_permission_answer() {
        let h = harness();
        assert_eq!(h.service.mount(), NotificationPermission::Granted);
        h.service.shutdown();
        assert_eq!(h.service.mount(), NotificationPermission::Granted);
        assert_eq!(h.notifier.permission_requests(), 1);
    }

    /// Blocks the first armed save until released.
    #[derive(Default)]
    struct GatedStore {
        inner: InMemorySessionStore,
        entered: Mutex<Option<std::sync::mpsc::Sender<()>>>,
        release: Mutex<Option<std::sync::mpsc::Receiver<()>>>,
    }

    impl GatedStore {
        fn arm(&self) -> (std::sync::mpsc::Receiver<()>, std::sync::mpsc::Sender<()>) {
            let (entered_tx, entered_rx) = std::sync::mpsc::channel();
            let (release_tx, release_rx) = std::sync::mpsc::channel();
            *self.entered.lock().expect("gate lock") = Some(entered_tx);
            *self.release.lock().expect("gate lock") = Some(release_rx);
            (entered_rx, release_tx)
        }
    }

    impl SessionStore for GatedStore {
        fn load(&self) -> Result<Option<PersistedAccumulators>, InfraError> {
            self.inner.load()
        }

        fn save(&self, accumulators: &PersistedAccumulators) -> Result<(), InfraError> {
            let entered = self.entered.lock().expect("gate lock").take();
            if let Some(entered) = entered {
                entered.send(()).expect("signal entered");
                let release = self.release.lock().expect("gate lock").take();
                if let Some(release) = release {
                    release.recv().expect("wait for release");
                }
            }
            self.inner.save(accumulators)
        }

        fn clear(&self) -> Result<(), InfraError> {
            self.inner.clear()
        }
    }

    #[test]
    fn tick_cannot_publish_while_a_control_is_persisting() {
        let clock = ManualClock::new();
        let store = Arc::new(GatedStore::default());
        let service = TimerService::new(
            store.clone(),
            Arc::new(RecordingRecorder::default()),
            Arc::new(InMemoryNotifier::granting()),
            TimerLimits::default(),
        )
        .with_now_provider(clock.provider());
        let views = service.subscribe();

        service.start().expect("start");
        clock.advance(5);
        let (entered, release) = store.arm();

        let pausing = service.clone();
        let pause = std::thread::spawn(move || pausing.pause().expect("pause"));
        entered.recv().expect("pause reached the store");

        let ticking = service.clone();
        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let tick = std::thread::spawn(move || {
            let view = ticking.tick().expect("tick");
            done_tx.send(view).expect("report tick");
        });
        assert!(done_rx
            .recv_timeout(Duration::from_millis(100))
            .is_err());

        release.send(()).expect("release save");
        let paused = pause.join().expect("pause thread");
        tick.join().expect("tick thread");
        let ticked = done_rx.recv().expect("tick view");

        assert_eq!(paused.view.status, TimerStatus::Paused);
        assert_eq!(ticked.status, TimerStatus::Paused);
        assert_eq!(views.borrow().status, TimerStatus::Paused);
        assert_eq!(store.load().expect("load").expect("mirror").work_time_accum_seconds, 5);
    }
}
