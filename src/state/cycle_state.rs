//! Cycle state structure and its flat key-value form

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default length of one round
pub const DEFAULT_CYCLE_SECONDS: u64 = 300;

/// Longest round the daemon accepts on the command line: one day
pub const MAX_CYCLE_SECONDS: u64 = 24 * 60 * 60;

/// Persistence keys, one per field
pub mod keys {
    pub const COUNTDOWN: &str = "countdown_seconds";
    pub const CYCLE_DURATION: &str = "cycle_duration_seconds";
    pub const ROUNDS_COMPLETED: &str = "rounds_completed";
    pub const TOTAL_ELAPSED: &str = "total_elapsed_seconds";
    pub const BEEP_OFFSET: &str = "beep_offset_seconds";
    pub const BEEP_FIRED: &str = "beep_fired";
    pub const IS_RUNNING: &str = "is_running";
    pub const IS_PAUSED: &str = "is_paused";
    pub const CYCLE_START: &str = "cycle_start_timestamp";
}

/// Where the cycle currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePhase {
    Idle,
    Running,
    Paused,
}

/// State of the running focus cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleState {
    /// Seconds left in the current round
    pub countdown_seconds: u64,
    pub cycle_duration_seconds: u64,
    pub rounds_completed: u64,
    pub total_elapsed_seconds: u64,
    /// Seconds into the round at which the cue fires
    pub beep_offset_seconds: u64,
    pub beep_fired: bool,
    pub is_running: bool,
    pub is_paused: bool,
    /// Unix time the current round began, shifted by time spent paused; 0 when idle
    pub cycle_start_timestamp: f64,
}

impl CycleState {
    /// Create an idle state for rounds of `cycle_duration_seconds`
    pub fn new(cycle_duration_seconds: u64) -> Self {
        let cycle_duration_seconds = cycle_duration_seconds.max(1);
        Self {
            countdown_seconds: cycle_duration_seconds,
            cycle_duration_seconds,
            rounds_completed: 0,
            total_elapsed_seconds: 0,
            beep_offset_seconds: 0,
            beep_fired: false,
            is_running: false,
            is_paused: false,
            cycle_start_timestamp: 0.0,
        }
    }

    pub fn phase(&self) -> CyclePhase {
        match (self.is_running, self.is_paused) {
            (false, _) => CyclePhase::Idle,
            (true, false) => CyclePhase::Running,
            (true, true) => CyclePhase::Paused,
        }
    }

    /// Largest offset a round may draw: three fifths of the round, at least one second
    pub fn max_beep_offset(&self) -> u64 {
        let d = self.cycle_duration_seconds;
        (d / 5 * 3 + d % 5 * 3 / 5).max(1)
    }

    /// Countdown value at which the cue fires
    pub fn ding_countdown(&self) -> u64 {
        self.cycle_duration_seconds.saturating_sub(self.beep_offset_seconds)
    }

    /// Seconds of the current round already behind us
    pub fn seconds_into_round(&self) -> u64 {
        self.cycle_duration_seconds - self.countdown_seconds
    }

    /// Seconds from now until the cue, or `None` once it has fired
    pub fn seconds_until_beep(&self) -> Option<i64> {
        if self.beep_fired {
            None
        } else {
            Some(self.countdown_seconds as i64 - self.ding_countdown() as i64)
        }
    }

    /// Bring a loaded state back inside its invariants
    pub fn sanitize(&mut self) {
        self.cycle_duration_seconds = self.cycle_duration_seconds.max(1);
        if self.countdown_seconds == 0 || self.countdown_seconds > self.cycle_duration_seconds {
            self.countdown_seconds = self.cycle_duration_seconds;
        }
        if self.is_paused && !self.is_running {
            self.is_paused = false;
        }
        if self.is_running {
            self.beep_offset_seconds = self.beep_offset_seconds.clamp(1, self.max_beep_offset());
        }
        if !self.cycle_start_timestamp.is_finite() || self.cycle_start_timestamp < 0.0 {
            self.cycle_start_timestamp = 0.0;
        }
    }

    /// Flat key-value form written to the store
    pub fn to_pairs(&self) -> Map<String, Value> {
        let mut pairs = Map::new();
        pairs.insert(keys::COUNTDOWN.into(), self.countdown_seconds.into());
        pairs.insert(keys::CYCLE_DURATION.into(), self.cycle_duration_seconds.into());
        pairs.insert(keys::ROUNDS_COMPLETED.into(), self.rounds_completed.into());
        pairs.insert(keys::TOTAL_ELAPSED.into(), self.total_elapsed_seconds.into());
        pairs.insert(keys::BEEP_OFFSET.into(), self.beep_offset_seconds.into());
        pairs.insert(keys::BEEP_FIRED.into(), self.beep_fired.into());
        pairs.insert(keys::IS_RUNNING.into(), self.is_running.into());
        pairs.insert(keys::IS_PAUSED.into(), self.is_paused.into());
        pairs.insert(keys::CYCLE_START.into(), self.cycle_start_timestamp.into());
        pairs
    }

    /// Rebuild a state from stored pairs; missing or mistyped keys fall back to defaults
    pub fn from_pairs(pairs: &Map<String, Value>, default_duration: u64) -> Self {
        let defaults = Self::new(default_duration);
        let int = |key: &str, default: u64| pairs.get(key).and_then(Value::as_u64).unwrap_or(default);
        let flag = |key: &str| pairs.get(key).and_then(Value::as_bool).unwrap_or(false);

        let mut state = Self {
            countdown_seconds: int(keys::COUNTDOWN, defaults.countdown_seconds),
            cycle_duration_seconds: int(keys::CYCLE_DURATION, defaults.cycle_duration_seconds),
            rounds_completed: int(keys::ROUNDS_COMPLETED, 0),
            total_elapsed_seconds: int(keys::TOTAL_ELAPSED, 0),
            beep_offset_seconds: int(keys::BEEP_OFFSET, 0),
            beep_fired: flag(keys::BEEP_FIRED),
            is_running: flag(keys::IS_RUNNING),
            is_paused: flag(keys::IS_PAUSED),
            cycle_start_timestamp: pairs
                .get(keys::CYCLE_START)
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
        };
        state.sanitize();
        state
    }

    /// Read-only view handed to API clients
    pub fn snapshot(&self) -> CycleSnapshot {
        let cycle_started_at = if self.is_running {
            DateTime::<Utc>::from_timestamp_millis((self.cycle_start_timestamp * 1000.0) as i64)
        } else {
            None
        };

        CycleSnapshot {
            phase: self.phase(),
            countdown_seconds: self.countdown_seconds,
            cycle_duration_seconds: self.cycle_duration_seconds,
            rounds_completed: self.rounds_completed,
            total_elapsed_seconds: self.total_elapsed_seconds,
            elapsed_minutes: self.total_elapsed_seconds / 60,
            beep_fired: self.beep_fired,
            cycle_started_at,
        }
    }
}

impl Default for CycleState {
    fn default() -> Self {
        Self::new(DEFAULT_CYCLE_SECONDS)
    }
}

/// Cycle view without the beep offset, so the cue stays unpredictable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSnapshot {
    pub phase: CyclePhase,
    pub countdown_seconds: u64,
    pub cycle_duration_seconds: u64,
    pub rounds_completed: u64,
    pub total_elapsed_seconds: u64,
    pub elapsed_minutes: u64,
    pub beep_fired: bool,
    pub cycle_started_at: Option<DateTime<Utc>>,
}
