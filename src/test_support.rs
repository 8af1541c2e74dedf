//! Collaborator doubles shared by unit tests

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use tokio::sync::watch;

use crate::{
    clock::Clock,
    cycle::{Collaborators, CycleMachine, DriverMode, TickControl},
    error::NotifyError,
    services::{CuePayload, CuePlayer, Notifier},
    state::{AppState, Lifecycle},
    store::MemoryStore,
};

/// Seconds since epoch the manual clock starts at in app-level tests
pub const TEST_EPOCH: f64 = 1_700_000_000.0;

/// App state wired to in-memory doubles
pub struct TestApp {
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
    pub cue: Arc<RecordingCue>,
    pub notifier: Arc<RecordingNotifier>,
    ticks: watch::Receiver<DriverMode>,
}

impl TestApp {
    pub fn new(cycle_duration_seconds: u64) -> Self {
        let clock = Arc::new(ManualClock::new(TEST_EPOCH));
        let cue = Arc::new(RecordingCue::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let lifecycle = Arc::new(Lifecycle::new());
        let (ticker, ticks) = TickControl::channel();

        let machine = CycleMachine::new(
            cycle_duration_seconds,
            Some(42),
            Collaborators {
                clock: clock.clone(),
                store: Box::new(MemoryStore::new()),
                notifier: notifier.clone(),
                cue: cue.clone(),
                foreground: lifecycle.clone(),
            },
            ticker,
        );
        let state = Arc::new(AppState::new(0, "127.0.0.1".to_string(), machine, lifecycle));

        Self {
            state,
            clock,
            cue,
            notifier,
            ticks,
        }
    }

    /// Receiver for a tick driver under test
    pub fn ticks(&self) -> watch::Receiver<DriverMode> {
        self.ticks.clone()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, seconds: f64) {
        *self.now.lock().unwrap() += seconds;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock().unwrap()
    }
}

/// Cue player that counts how often it was asked to play
#[derive(Debug, Default)]
pub struct RecordingCue {
    plays: AtomicUsize,
}

impl RecordingCue {
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

impl CuePlayer for RecordingCue {
    fn play(&self) {
        self.plays.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierCall {
    Schedule { id: String, delay_seconds: u64 },
    Cancel { id: String },
    CancelAll,
}

/// Notifier that records calls and tracks the one pending delay per id
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<NotifierCall>>,
    pending: Mutex<Vec<(String, u64)>>,
    refuse: bool,
}

impl RecordingNotifier {
    /// A notifier that rejects every schedule, like one without permission
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<NotifierCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Delay of the pending notification for `id`, if any
    pub fn pending_delay(&self, id: &str) -> Option<u64> {
        self.pending
            .lock()
            .unwrap()
            .iter()
            .find(|(pending_id, _)| pending_id == id)
            .map(|(_, delay)| *delay)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn schedule_one_shot(&self, id: &str, delay_seconds: u64, _payload: &CuePayload) -> Result<(), NotifyError> {
        self.calls.lock().unwrap().push(NotifierCall::Schedule {
            id: id.to_string(),
            delay_seconds,
        });
        if self.refuse {
            return Err(NotifyError::Rejected {
                id: id.to_string(),
                reason: "permission denied".to_string(),
            });
        }
        let mut pending = self.pending.lock().unwrap();
        pending.retain(|(pending_id, _)| pending_id != id);
        pending.push((id.to_string(), delay_seconds));
        Ok(())
    }

    fn cancel(&self, id: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(NotifierCall::Cancel { id: id.to_string() });
        self.pending.lock().unwrap().retain(|(pending_id, _)| pending_id != id);
    }

    fn cancel_all(&self) {
        self.calls.lock().unwrap().push(NotifierCall::CancelAll);
        self.pending.lock().unwrap().clear();
    }
}
