use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::debug;

use exam_core::Clock;
use exam_core::model::{Choice, TestReport};

use super::controller::{SessionEvent, TestSession};
use super::progress::SessionProgress;

/// Drives a session's one-second cadence on a dedicated tokio task.
///
/// The runner is the only scheduling primitive a session ever gets: it owns
/// the shared session, ticks it once per second, and publishes a progress
/// snapshot through a watch channel after every change. The tick task ends
/// itself at completion, and `cancel` (or dropping the runner) aborts it, so
/// no stale tick can fire after teardown or a retake.
pub struct SessionRunner {
    session: Arc<Mutex<TestSession>>,
    clock: Clock,
    snapshots: Arc<watch::Sender<SessionProgress>>,
    // Keep the initial receiver alive: `watch::Sender::send` is a no-op (and
    // the stored value is left untouched) when no receivers exist, so the
    // published snapshot would otherwise never update until a caller happened
    // to be subscribed.
    _keepalive: watch::Receiver<SessionProgress>,
    ticker: JoinHandle<()>,
}

impl SessionRunner {
    /// Start `session` and begin ticking it once per second.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(mut session: TestSession, clock: Clock) -> Self {
        session.start(clock.now());
        let (snapshots, keepalive) = watch::channel(session.progress());
        let snapshots = Arc::new(snapshots);
        let session = Arc::new(Mutex::new(session));

        let ticker = tokio::spawn(Self::tick_loop(
            Arc::clone(&session),
            clock,
            Arc::clone(&snapshots),
        ));

        Self {
            session,
            clock,
            snapshots,
            _keepalive: keepalive,
            ticker,
        }
    }

    async fn tick_loop(
        session: Arc<Mutex<TestSession>>,
        clock: Clock,
        snapshots: Arc<watch::Sender<SessionProgress>>,
    ) {
        let mut interval = time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // a tokio interval yields its first tick immediately; skip it so the
        // session loses its first second only after a real second has passed
        interval.tick().await;

        loop {
            interval.tick().await;
            let complete = {
                let Ok(mut guard) = session.lock() else {
                    return;
                };
                guard.tick(clock.now());
                let progress = guard.progress();
                let complete = progress.is_complete;
                let _ = snapshots.send(progress);
                complete
            };
            if complete {
                debug!("session completed; tick task stopping");
                return;
            }
        }
    }

    fn with_session<T>(&self, apply: impl FnOnce(&mut TestSession) -> T) -> Option<T> {
        let Ok(mut guard) = self.session.lock() else {
            return None;
        };
        let value = apply(&mut guard);
        let _ = self.snapshots.send(guard.progress());
        Some(value)
    }

    /// Record an answer for the current question.
    pub fn select_answer(&self, choice: Choice) -> Option<SessionEvent> {
        self.with_session(|session| session.select_answer(choice))
            .flatten()
    }

    /// Move to the next question.
    pub fn next(&self) -> Option<SessionEvent> {
        self.with_session(TestSession::next).flatten()
    }

    /// Move to the previous question.
    pub fn previous(&self) -> Option<SessionEvent> {
        self.with_session(TestSession::previous).flatten()
    }

    /// Submit the test from wherever the user currently is.
    pub fn submit(&self) -> Option<SessionEvent> {
        let now = self.clock.now();
        self.with_session(|session| session.submit(now)).flatten()
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        self.snapshots.borrow().clone()
    }

    /// Watch receiver for progress snapshots; one is published after every
    /// tick and every accepted input.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionProgress> {
        self.snapshots.subscribe()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.progress().is_complete
    }

    /// Final score once the session has completed.
    #[must_use]
    pub fn report(&self) -> Option<TestReport> {
        self.session.lock().ok().and_then(|guard| guard.report())
    }

    /// Stop the tick task immediately. Idempotent; also runs on drop.
    pub fn cancel(&self) {
        self.ticker.abort();
    }
}

impl Drop for SessionRunner {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}
