//! Cycle state machine
//!
//! Owns the [`CycleState`] and is the only thing that mutates it. Every
//! mutation is persisted straight away.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!   ^        |  \__ round complete: new cycle, stays Running
//!   |________|____ reset (from any state)
//! ```
//!
//! Time enters in two ways: `tick()` once per second while running, and
//! `restore_from_elapsed_time()` which jumps over a suspension gap in closed
//! form. Only the beep offset of the current cycle is known when jumping, so
//! rounds skipped during the gap do not get individual cues.

use std::sync::Arc;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{
    beep::BeepScheduler,
    ticker::{DriverMode, TickControl},
};
use crate::{
    clock::{whole_seconds_between, Clock},
    services::{CuePayload, CuePlayer, Notifier},
    state::{CyclePhase, CycleSnapshot, CycleState, ForegroundProbe},
    store::StateStore,
};

/// Everything the machine talks to, injected at construction
pub struct Collaborators {
    pub clock: Arc<dyn Clock>,
    pub store: Box<dyn StateStore>,
    pub notifier: Arc<dyn Notifier>,
    pub cue: Arc<dyn CuePlayer>,
    pub foreground: Arc<dyn ForegroundProbe>,
}

/// Transition applied by a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CycleEvent {
    Started,
    Paused,
    Resumed,
    Reset,
    Restored { full_rounds: u64, leftover_seconds: u64 },
}

/// What a single tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub ticked: bool,
    pub beep_fired: bool,
    pub round_completed: bool,
}

pub struct CycleMachine {
    state: CycleState,
    rng: Pcg64,
    clock: Arc<dyn Clock>,
    store: Box<dyn StateStore>,
    beep: BeepScheduler,
    cue: Arc<dyn CuePlayer>,
    foreground: Arc<dyn ForegroundProbe>,
    ticker: TickControl,
}

impl CycleMachine {
    /// Build a machine, loading whatever state the store holds.
    ///
    /// Stored state recorded for a different cycle length is discarded.
    /// Call [`recover_after_launch`](Self::recover_after_launch) afterwards
    /// to pick a running cycle back up.
    pub fn new(
        cycle_duration_seconds: u64,
        seed: Option<u64>,
        deps: Collaborators,
        ticker: TickControl,
    ) -> Self {
        let duration = cycle_duration_seconds.max(1);
        let state = match deps.store.load(duration) {
            Ok(Some(state)) if state.cycle_duration_seconds == duration => {
                info!(
                    "Loaded cycle state: phase={:?}, countdown={}s, rounds={}",
                    state.phase(),
                    state.countdown_seconds,
                    state.rounds_completed
                );
                state
            }
            Ok(Some(state)) => {
                warn!(
                    "Stored cycle length {}s differs from configured {}s, starting fresh",
                    state.cycle_duration_seconds, duration
                );
                CycleState::new(duration)
            }
            Ok(None) => CycleState::new(duration),
            Err(e) => {
                warn!("Failed to load cycle state, starting fresh: {}", e);
                CycleState::new(duration)
            }
        };

        let rng = match seed {
            Some(seed) => Pcg64::seed_from_u64(seed),
            None => Pcg64::from_entropy(),
        };

        Self {
            state,
            rng,
            clock: deps.clock,
            store: deps.store,
            beep: BeepScheduler::new(deps.notifier, CuePayload::default()),
            cue: deps.cue,
            foreground: deps.foreground,
            ticker,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &CycleState {
        &self.state
    }

    pub fn snapshot(&self) -> CycleSnapshot {
        self.state.snapshot()
    }

    pub fn driver_mode(&self) -> DriverMode {
        self.ticker.mode()
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<CycleEvent> {
        if self.state.is_running {
            debug!("Start ignored, cycle already running");
            return None;
        }

        self.state.is_running = true;
        self.state.is_paused = false;
        self.begin_cycle();
        self.ticker.activate();
        info!("Cycle started ({}s rounds)", self.state.cycle_duration_seconds);

        self.persist();
        Some(CycleEvent::Started)
    }

    pub fn pause(&mut self) -> Option<CycleEvent> {
        if self.state.phase() != CyclePhase::Running {
            debug!("Pause ignored in phase {:?}", self.state.phase());
            return None;
        }

        self.ticker.suspend();
        self.state.is_paused = true;
        self.beep.disarm();
        info!("Cycle paused at {}s", self.state.countdown_seconds);

        self.persist();
        Some(CycleEvent::Paused)
    }

    pub fn resume(&mut self) -> Option<CycleEvent> {
        if self.state.phase() != CyclePhase::Paused {
            debug!("Resume ignored in phase {:?}", self.state.phase());
            return None;
        }

        self.state.is_paused = false;
        // Shift the anchor forward by the time spent paused
        self.state.cycle_start_timestamp =
            self.clock.now() - self.state.seconds_into_round() as f64;
        self.arm_beep();
        self.ticker.activate();
        info!("Cycle resumed at {}s", self.state.countdown_seconds);

        self.persist();
        Some(CycleEvent::Resumed)
    }

    /// Return to a fresh idle state; valid from anywhere
    pub fn reset(&mut self) -> Option<CycleEvent> {
        self.ticker.stop();
        self.beep.disarm();
        self.state = CycleState::new(self.state.cycle_duration_seconds);
        info!("Cycle reset");

        self.persist();
        Some(CycleEvent::Reset)
    }

    /// Start, pause or resume depending on where the cycle is
    pub fn toggle(&mut self) -> Option<CycleEvent> {
        match self.state.phase() {
            CyclePhase::Idle => self.start(),
            CyclePhase::Running => self.pause(),
            CyclePhase::Paused => self.resume(),
        }
    }

    /// Advance one second. A no-op unless running.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state.phase() != CyclePhase::Running {
            return TickOutcome::default();
        }

        let mut outcome = TickOutcome {
            ticked: true,
            ..TickOutcome::default()
        };
        self.state.countdown_seconds = self.state.countdown_seconds.saturating_sub(1);
        self.state.total_elapsed_seconds = self.state.total_elapsed_seconds.saturating_add(1);

        if self.state.countdown_seconds == self.state.ding_countdown() && !self.state.beep_fired {
            if self.foreground.is_foreground() {
                self.cue.play();
                self.beep.disarm();
            } else {
                debug!("In background, leaving the cue to the pending notification");
            }
            self.state.beep_fired = true;
            outcome.beep_fired = true;
            info!("Cue fired at {}s", self.state.countdown_seconds);
        }

        if self.state.countdown_seconds == 0 {
            self.state.rounds_completed = self.state.rounds_completed.saturating_add(1);
            outcome.round_completed = true;
            info!("Round {} complete", self.state.rounds_completed);
            self.begin_cycle();
        }

        self.persist();
        outcome
    }

    /// Tick on behalf of the driver activation `epoch`; stale epochs are dropped
    pub fn tick_from_driver(&mut self, epoch: u64) -> TickOutcome {
        if !self.ticker.is_current(epoch) {
            debug!("Dropping stale tick from driver epoch {}", epoch);
            return TickOutcome::default();
        }
        self.tick()
    }

    /// Jump the running cycle `elapsed_seconds` past its start anchor in one step.
    ///
    /// `elapsed_seconds` counts from the start of the current round; the part
    /// of it already covered by ticks is not added to the total twice.
    pub fn restore_from_elapsed_time(&mut self, elapsed_seconds: u64) -> Option<CycleEvent> {
        if !self.state.is_running {
            debug!("Restore ignored, no cycle running");
            return None;
        }

        let duration = self.state.cycle_duration_seconds;
        let full_rounds = elapsed_seconds / duration;
        let leftover = elapsed_seconds % duration;
        let already_counted = self.state.seconds_into_round();
        let now = self.clock.now();

        if full_rounds == 0 && leftover < already_counted {
            // Ticks ran ahead of the wall clock; keep the countdown, fix the anchor
            debug!(
                "Restore of {}s is behind {}s already ticked, re-anchoring only",
                elapsed_seconds, already_counted
            );
            self.state.cycle_start_timestamp = now - already_counted as f64;
            self.persist();
            return None;
        }

        self.state.rounds_completed = self.state.rounds_completed.saturating_add(full_rounds);
        self.state.countdown_seconds = duration - leftover;
        self.state.total_elapsed_seconds = self.state
            .total_elapsed_seconds
            .saturating_add(elapsed_seconds - already_counted);
        self.state.beep_fired = self.state.countdown_seconds <= self.state.ding_countdown();
        self.state.cycle_start_timestamp = now - leftover as f64;
        if !self.state.is_paused {
            self.arm_beep();
        }
        info!(
            "Restored {}s elapsed: {} full rounds, countdown now {}s",
            elapsed_seconds, full_rounds, self.state.countdown_seconds
        );

        self.persist();
        Some(CycleEvent::Restored {
            full_rounds,
            leftover_seconds: leftover,
        })
    }

    /// Rebuild a running cycle from the wall clock
    pub fn reconcile(&mut self) -> Option<CycleEvent> {
        if self.state.phase() != CyclePhase::Running {
            return None;
        }
        let elapsed = whole_seconds_between(self.state.cycle_start_timestamp, self.clock.now());
        self.restore_from_elapsed_time(elapsed)
    }

    /// Pick up a cycle loaded from the store after a process restart
    pub fn recover_after_launch(&mut self) -> Option<CycleEvent> {
        match self.state.phase() {
            CyclePhase::Idle => None,
            CyclePhase::Paused => {
                info!("Recovered paused cycle at {}s", self.state.countdown_seconds);
                None
            }
            CyclePhase::Running => {
                self.ticker.activate();
                let event = self.reconcile();
                if event.is_none() {
                    self.arm_beep();
                }
                event
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Fresh round: full countdown, new offset, new anchor, cue armed
    fn begin_cycle(&mut self) {
        self.state.countdown_seconds = self.state.cycle_duration_seconds;
        self.state.beep_offset_seconds = self.rng.gen_range(1..=self.state.max_beep_offset());
        self.state.beep_fired = false;
        self.state.cycle_start_timestamp = self.clock.now();
        self.arm_beep();
    }

    fn arm_beep(&self) {
        match self.state.seconds_until_beep() {
            Some(after) => self.beep.arm(after),
            None => self.beep.disarm(),
        }
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.state) {
            warn!("Failed to persist cycle state: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cycle::beep::CUE_NOTIFICATION_ID,
        error::StoreError,
        state::{Lifecycle, LifecycleEvent},
        store::{JsonFileStore, MemoryStore},
        test_support::{ManualClock, RecordingCue, RecordingNotifier},
    };
    use proptest::prelude::*;
    use tempfile::TempDir;
    use tokio::sync::watch;

    const T0: f64 = 1_700_000_000.0;

    struct Harness {
        machine: CycleMachine,
        clock: Arc<ManualClock>,
        notifier: Arc<RecordingNotifier>,
        cue: Arc<RecordingCue>,
        lifecycle: Arc<Lifecycle>,
        _ticks: watch::Receiver<DriverMode>,
    }

    fn harness_with(duration: u64, seed: u64, store: Box<dyn StateStore>, clock: Arc<ManualClock>) -> Harness {
        let notifier = Arc::new(RecordingNotifier::default());
        let cue = Arc::new(RecordingCue::default());
        let lifecycle = Arc::new(Lifecycle::new());
        let (ticker, ticks) = TickControl::channel();
        let machine = CycleMachine::new(
            duration,
            Some(seed),
            Collaborators {
                clock: clock.clone(),
                store,
                notifier: notifier.clone(),
                cue: cue.clone(),
                foreground: lifecycle.clone(),
            },
            ticker,
        );
        Harness {
            machine,
            clock,
            notifier,
            cue,
            lifecycle,
            _ticks: ticks,
        }
    }

    fn harness(duration: u64) -> Harness {
        harness_with(duration, 7, Box::new(MemoryStore::new()), Arc::new(ManualClock::new(T0)))
    }

    /// Start with a known offset so the cue lands at a known countdown
    fn start_with_offset(h: &mut Harness, offset: u64) {
        h.machine.start();
        h.machine.state.beep_offset_seconds = offset;
        h.machine.arm_beep();
    }

    fn tick_n(h: &mut Harness, n: u64) {
        for _ in 0..n {
            h.clock.advance(1.0);
            h.machine.tick();
        }
    }

    struct FailingStore;

    impl StateStore for FailingStore {
        fn load(&self, _default_duration: u64) -> Result<Option<CycleState>, StoreError> {
            Err(StoreError::NotAnObject)
        }

        fn save(&mut self, _state: &CycleState) -> Result<(), StoreError> {
            Err(StoreError::NotAnObject)
        }
    }

    #[test]
    fn start_arms_cue_and_driver() {
        let mut h = harness(300);
        assert_eq!(h.machine.start(), Some(CycleEvent::Started));

        let state = h.machine.state();
        assert_eq!(state.phase(), CyclePhase::Running);
        assert_eq!(state.countdown_seconds, 300);
        assert!((1..=180).contains(&state.beep_offset_seconds));
        assert_eq!(state.cycle_start_timestamp, T0);
        assert_eq!(
            h.notifier.pending_delay(CUE_NOTIFICATION_ID),
            Some(state.beep_offset_seconds)
        );
        assert_eq!(h.machine.driver_mode(), DriverMode::Active { epoch: 1 });
    }

    #[test]
    fn beep_fires_once_then_round_rolls_over() {
        let mut h = harness(300);
        start_with_offset(&mut h, 100);

        tick_n(&mut h, 99);
        assert!(!h.machine.state().beep_fired);
        tick_n(&mut h, 1);
        assert_eq!(h.machine.state().countdown_seconds, 200);
        assert!(h.machine.state().beep_fired);
        assert_eq!(h.cue.plays(), 1);

        tick_n(&mut h, 199);
        assert_eq!(h.machine.state().countdown_seconds, 1);
        assert_eq!(h.cue.plays(), 1);

        let outcome = h.machine.tick();
        assert!(outcome.round_completed);
        let state = h.machine.state();
        assert_eq!(state.countdown_seconds, 300);
        assert_eq!(state.rounds_completed, 1);
        assert_eq!(state.total_elapsed_seconds, 300);
        assert!(!state.beep_fired);
        assert!((1..=180).contains(&state.beep_offset_seconds));
        assert_eq!(state.phase(), CyclePhase::Running);
        assert_eq!(
            h.notifier.pending_delay(CUE_NOTIFICATION_ID),
            Some(state.beep_offset_seconds)
        );
    }

    #[test]
    fn exactly_one_beep_transition_per_cycle() {
        let mut h = harness(60);
        h.machine.start();

        let mut transitions = 0;
        for _ in 0..60 * 5 {
            if h.machine.tick().beep_fired {
                transitions += 1;
            }
        }
        assert_eq!(transitions, 5);
        assert_eq!(h.machine.state().rounds_completed, 5);
    }

    #[test]
    fn start_then_reset_matches_fresh_launch() {
        let mut h = harness(300);
        h.machine.start();
        tick_n(&mut h, 42);
        assert_eq!(h.machine.reset(), Some(CycleEvent::Reset));

        assert_eq!(h.machine.state(), &CycleState::new(300));
        assert_eq!(h.machine.driver_mode(), DriverMode::Stopped);
        assert_eq!(h.notifier.pending_count(), 0);
    }

    #[test]
    fn ticks_while_paused_change_nothing() {
        let mut h = harness(300);
        h.machine.start();
        h.machine.pause();
        let before = h.machine.state().clone();

        for _ in 0..50 {
            assert_eq!(h.machine.tick(), TickOutcome::default());
        }
        assert_eq!(h.machine.state(), &before);
    }

    #[test]
    fn pause_disarms_and_resume_rearms_remaining() {
        let mut h = harness(300);
        start_with_offset(&mut h, 100);
        tick_n(&mut h, 30);

        h.machine.pause();
        assert_eq!(h.notifier.pending_count(), 0);
        assert_eq!(h.machine.driver_mode(), DriverMode::Suspended);

        h.clock.advance(500.0);
        assert_eq!(h.machine.resume(), Some(CycleEvent::Resumed));
        assert_eq!(h.notifier.pending_delay(CUE_NOTIFICATION_ID), Some(70));
        assert_eq!(h.machine.state().cycle_start_timestamp, h.clock.now() - 30.0);
        assert_eq!(h.machine.driver_mode(), DriverMode::Active { epoch: 2 });
    }

    #[test]
    fn resume_after_cue_does_not_rearm() {
        let mut h = harness(300);
        start_with_offset(&mut h, 10);
        tick_n(&mut h, 20);
        h.machine.pause();
        h.machine.resume();
        assert_eq!(h.notifier.pending_count(), 0);
    }

    #[test]
    fn invalid_transitions_are_ignored() {
        let mut h = harness(300);
        assert_eq!(h.machine.pause(), None);
        assert_eq!(h.machine.resume(), None);
        assert_eq!(h.machine.restore_from_elapsed_time(100), None);
        assert_eq!(h.machine.reconcile(), None);
        assert_eq!(h.machine.state(), &CycleState::new(300));

        h.machine.start();
        let running = h.machine.state().clone();
        assert_eq!(h.machine.start(), None);
        assert_eq!(h.machine.resume(), None);
        assert_eq!(h.machine.state(), &running);
    }

    #[test]
    fn background_cue_is_left_to_notification() {
        let mut h = harness(300);
        start_with_offset(&mut h, 5);
        h.lifecycle.apply(LifecycleEvent::EnteredBackground);

        tick_n(&mut h, 5);
        assert!(h.machine.state().beep_fired);
        assert_eq!(h.cue.plays(), 0);
        assert_eq!(h.notifier.pending_delay(CUE_NOTIFICATION_ID), Some(5));
    }

    #[test]
    fn foreground_cue_plays_and_disarms_backstop() {
        let mut h = harness(300);
        start_with_offset(&mut h, 5);
        tick_n(&mut h, 5);
        assert_eq!(h.cue.plays(), 1);
        assert_eq!(h.notifier.pending_count(), 0);
    }

    #[test]
    fn foreground_reentry_reconstructs_from_wall_clock() {
        let mut h = harness(300);
        start_with_offset(&mut h, 100);
        h.lifecycle.apply(LifecycleEvent::EnteredBackground);

        h.clock.advance(650.0);
        h.lifecycle.apply(LifecycleEvent::EnteredForeground);
        assert_eq!(
            h.machine.reconcile(),
            Some(CycleEvent::Restored {
                full_rounds: 2,
                leftover_seconds: 50
            })
        );

        let state = h.machine.state();
        assert_eq!(state.countdown_seconds, 250);
        assert_eq!(state.rounds_completed, 2);
        assert_eq!(state.total_elapsed_seconds, 650);
        assert!(!state.beep_fired);
        assert_eq!(state.cycle_start_timestamp, T0 + 600.0);
        assert_eq!(h.notifier.pending_delay(CUE_NOTIFICATION_ID), Some(50));
    }

    #[test]
    fn reconcile_counts_ticked_seconds_once() {
        let mut h = harness(300);
        start_with_offset(&mut h, 100);
        tick_n(&mut h, 30);

        h.clock.advance(120.0);
        h.machine.reconcile();
        let state = h.machine.state();
        assert_eq!(state.countdown_seconds, 150);
        assert_eq!(state.total_elapsed_seconds, 150);
        assert!(state.beep_fired);
        assert_eq!(h.notifier.pending_count(), 0);
    }

    #[test]
    fn restore_handles_days_of_suspension() {
        let mut h = harness(300);
        h.machine.start();
        let week = 7 * 24 * 3600 + 17;
        h.machine.restore_from_elapsed_time(week);

        let state = h.machine.state();
        assert_eq!(state.rounds_completed, week / 300);
        assert_eq!(state.countdown_seconds, 300 - 17);
        assert_eq!(state.total_elapsed_seconds, week);
    }

    #[test]
    fn restore_behind_ticks_only_reanchors() {
        let mut h = harness(300);
        h.machine.start();
        tick_n(&mut h, 40);
        let countdown = h.machine.state().countdown_seconds;

        assert_eq!(h.machine.restore_from_elapsed_time(10), None);
        assert_eq!(h.machine.state().countdown_seconds, countdown);
        assert_eq!(h.machine.state().cycle_start_timestamp, h.clock.now() - 40.0);
    }

    #[test]
    fn toggle_walks_start_pause_resume() {
        let mut h = harness(300);
        assert_eq!(h.machine.toggle(), Some(CycleEvent::Started));
        assert_eq!(h.machine.toggle(), Some(CycleEvent::Paused));
        assert_eq!(h.machine.toggle(), Some(CycleEvent::Resumed));
        assert_eq!(h.machine.state().phase(), CyclePhase::Running);
    }

    #[test]
    fn stale_driver_ticks_are_dropped() {
        let mut h = harness(300);
        h.machine.start();
        assert!(h.machine.tick_from_driver(1).ticked);

        h.machine.pause();
        h.machine.resume();
        assert!(!h.machine.tick_from_driver(1).ticked);
        assert!(h.machine.tick_from_driver(2).ticked);

        h.machine.reset();
        assert!(!h.machine.tick_from_driver(2).ticked);
    }

    #[test]
    fn running_cycle_survives_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let clock = Arc::new(ManualClock::new(T0));

        let mut first = harness_with(300, 1, Box::new(JsonFileStore::new(&path)), clock.clone());
        start_with_offset(&mut first, 150);
        tick_n(&mut first, 10);
        drop(first);

        clock.advance(20.0);
        let mut second = harness_with(300, 2, Box::new(JsonFileStore::new(&path)), clock);
        assert_eq!(second.machine.state().countdown_seconds, 290);
        second.machine.recover_after_launch();

        let state = second.machine.state();
        assert_eq!(state.countdown_seconds, 270);
        assert_eq!(state.total_elapsed_seconds, 30);
        assert_eq!(state.beep_offset_seconds, 150);
        assert_eq!(second.machine.driver_mode(), DriverMode::Active { epoch: 1 });
        assert_eq!(second.notifier.pending_delay(CUE_NOTIFICATION_ID), Some(120));
    }

    #[test]
    fn paused_cycle_stays_paused_after_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let clock = Arc::new(ManualClock::new(T0));

        let mut first = harness_with(300, 1, Box::new(JsonFileStore::new(&path)), clock.clone());
        first.machine.start();
        tick_n(&mut first, 10);
        first.machine.pause();
        drop(first);

        clock.advance(1000.0);
        let mut second = harness_with(300, 2, Box::new(JsonFileStore::new(&path)), clock);
        assert_eq!(second.machine.recover_after_launch(), None);
        assert_eq!(second.machine.state().phase(), CyclePhase::Paused);
        assert_eq!(second.machine.state().countdown_seconds, 290);
        assert_eq!(second.machine.driver_mode(), DriverMode::Stopped);
        assert_eq!(second.notifier.pending_count(), 0);
    }

    #[test]
    fn corrupted_duration_on_disk_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let garbage = serde_json::json!({
            "cycle_duration_seconds": u64::MAX / 2,
            "is_running": true,
            "rounds_completed": u64::MAX
        });
        std::fs::write(&path, garbage.to_string()).unwrap();

        let mut h = harness_with(300, 1, Box::new(JsonFileStore::new(&path)), Arc::new(ManualClock::new(T0)));
        assert_eq!(h.machine.state(), &CycleState::new(300));
        assert_eq!(h.machine.recover_after_launch(), None);
        assert_eq!(h.machine.driver_mode(), DriverMode::Stopped);
    }

    #[test]
    fn changed_cycle_length_discards_stored_state() {
        let mut store = MemoryStore::new();
        let mut stored = CycleState::new(600);
        stored.is_running = true;
        stored.rounds_completed = 3;
        store.save(&stored).unwrap();

        let h = harness_with(300, 1, Box::new(store), Arc::new(ManualClock::new(T0)));
        assert_eq!(h.machine.state(), &CycleState::new(300));
    }

    #[test]
    fn broken_store_does_not_stop_the_timer() {
        let mut h = harness_with(300, 1, Box::new(FailingStore), Arc::new(ManualClock::new(T0)));
        h.machine.start();
        tick_n(&mut h, 3);
        assert_eq!(h.machine.state().countdown_seconds, 297);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Start,
        Pause,
        Resume,
        Reset,
        Toggle,
        Tick(u16),
        Restore(u32),
        Advance(u16),
        Background,
        Foreground,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Start),
            Just(Op::Pause),
            Just(Op::Resume),
            Just(Op::Reset),
            Just(Op::Toggle),
            (1u16..200).prop_map(Op::Tick),
            (0u32..5000).prop_map(Op::Restore),
            (0u16..1000).prop_map(Op::Advance),
            Just(Op::Background),
            Just(Op::Foreground),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn closed_form_matches_tick_replay(duration in 1u64..400, elapsed in 0u64..3000, seed in any::<u64>()) {
            let mut replayed = harness_with(duration, seed, Box::new(MemoryStore::new()), Arc::new(ManualClock::new(T0)));
            let mut jumped = harness_with(duration, seed, Box::new(MemoryStore::new()), Arc::new(ManualClock::new(T0)));
            replayed.machine.start();
            jumped.machine.start();

            for _ in 0..elapsed {
                replayed.machine.tick();
            }
            jumped.machine.restore_from_elapsed_time(elapsed);

            let (a, b) = (replayed.machine.state(), jumped.machine.state());
            prop_assert_eq!(a.rounds_completed, b.rounds_completed);
            prop_assert_eq!(a.countdown_seconds, b.countdown_seconds);
            prop_assert_eq!(a.total_elapsed_seconds, b.total_elapsed_seconds);
        }

        #[test]
        fn invariants_hold_for_any_sequence(ops in prop::collection::vec(op(), 1..40), duration in 1u64..400) {
            let mut h = harness_with(duration, 11, Box::new(MemoryStore::new()), Arc::new(ManualClock::new(T0)));
            let mut rounds = 0;
            let mut total = 0;

            for op in ops {
                match op {
                    Op::Start => { h.machine.start(); }
                    Op::Pause => { h.machine.pause(); }
                    Op::Resume => { h.machine.resume(); }
                    Op::Reset => { h.machine.reset(); rounds = 0; total = 0; }
                    Op::Toggle => { h.machine.toggle(); }
                    Op::Tick(n) => { for _ in 0..n { h.machine.tick(); } }
                    Op::Restore(s) => { h.machine.restore_from_elapsed_time(u64::from(s)); }
                    Op::Advance(s) => h.clock.advance(f64::from(s)),
                    Op::Background => { h.lifecycle.apply(LifecycleEvent::EnteredBackground); }
                    Op::Foreground => { h.lifecycle.apply(LifecycleEvent::EnteredForeground); h.machine.reconcile(); }
                }

                let state = h.machine.state();
                prop_assert!(state.countdown_seconds <= state.cycle_duration_seconds);
                prop_assert!(state.countdown_seconds > 0);
                prop_assert!(!state.is_paused || state.is_running);
                prop_assert!(!state.beep_fired || state.countdown_seconds <= state.ding_countdown());
                prop_assert!(state.rounds_completed >= rounds);
                prop_assert!(state.total_elapsed_seconds >= total);
                prop_assert!(h.notifier.pending_count() <= 1);
                match state.phase() {
                    CyclePhase::Idle => {
                        prop_assert_eq!(h.machine.driver_mode(), DriverMode::Stopped);
                        prop_assert_eq!(h.notifier.pending_count(), 0);
                    }
                    CyclePhase::Running => {
                        prop_assert!((1..=state.max_beep_offset()).contains(&state.beep_offset_seconds));
                        let ticking = matches!(h.machine.driver_mode(), DriverMode::Active { .. });
                        prop_assert!(ticking, "running cycle must keep the driver active");
                    }
                    CyclePhase::Paused => {
                        prop_assert_eq!(h.machine.driver_mode(), DriverMode::Suspended);
                        prop_assert_eq!(h.notifier.pending_count(), 0);
                    }
                }
                rounds = state.rounds_completed;
                total = state.total_elapsed_seconds;
            }
        }
    }
}
