//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{CycleSnapshot, ForegroundProbe, Lifecycle, LifecycleEvent};
use crate::cycle::{CycleEvent, CycleMachine, DriverMode, TickOutcome};

/// Result of a command: the transition it applied, if any, and the state after it
pub type CommandResult = Result<(Option<CycleEvent>, CycleSnapshot), String>;

/// Main application state that owns the cycle machine
pub struct AppState {
    /// The single cycle machine; every tick and command goes through this lock
    pub machine: Arc<Mutex<CycleMachine>>,
    /// Foreground/background flag
    pub lifecycle: Arc<Lifecycle>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl AppState {
    /// Create a new AppState around an already built machine
    pub fn new(port: u16, host: String, machine: CycleMachine, lifecycle: Arc<Lifecycle>) -> Self {
        Self {
            machine: Arc::new(Mutex::new(machine)),
            lifecycle,
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
        }
    }

    /// Run a command against the machine and record it as the last action
    pub fn update_cycle<F>(&self, action: &str, command: F) -> CommandResult
    where
        F: FnOnce(&mut CycleMachine) -> Option<CycleEvent>,
    {
        let mut machine = self.machine.lock()
            .map_err(|e| format!("Failed to lock cycle machine: {}", e))?;

        let event = command(&mut *machine);
        let snapshot = machine.snapshot();
        drop(machine); // Release the lock early

        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }

        match event {
            Some(event) => debug!("Action '{}' applied: {:?}", action, event),
            None => debug!("Action '{}' ignored in phase {:?}", action, snapshot.phase),
        }
        Ok((event, snapshot))
    }

    pub fn start(&self) -> CommandResult {
        self.update_cycle("start", CycleMachine::start)
    }

    pub fn pause(&self) -> CommandResult {
        self.update_cycle("pause", CycleMachine::pause)
    }

    pub fn resume(&self) -> CommandResult {
        self.update_cycle("resume", CycleMachine::resume)
    }

    pub fn reset(&self) -> CommandResult {
        self.update_cycle("reset", CycleMachine::reset)
    }

    pub fn toggle(&self) -> CommandResult {
        self.update_cycle("toggle", CycleMachine::toggle)
    }

    /// Tick from the driver task
    pub fn driver_tick(&self, epoch: u64) -> Result<TickOutcome, String> {
        let mut machine = self.machine.lock()
            .map_err(|e| format!("Failed to lock cycle machine: {}", e))?;
        Ok(machine.tick_from_driver(epoch))
    }

    /// Rebuild a running cycle from the wall clock
    pub fn reconcile(&self, action: &str) -> CommandResult {
        self.update_cycle(action, CycleMachine::reconcile)
    }

    /// Pick up a stored cycle once at launch
    pub fn recover_after_launch(&self) -> CommandResult {
        self.update_cycle("launch", CycleMachine::recover_after_launch)
    }

    pub fn entered_background(&self) -> CommandResult {
        self.lifecycle.apply(LifecycleEvent::EnteredBackground);
        let snapshot = self.get_cycle_snapshot()?;
        Ok((None, snapshot))
    }

    /// Back in front of the user: replay the wall-clock time spent away
    pub fn entered_foreground(&self) -> CommandResult {
        self.lifecycle.apply(LifecycleEvent::EnteredForeground);
        let result = self.reconcile("foreground")?;
        if let (Some(event), snapshot) = &result {
            info!("Foreground reconciliation: {:?}, countdown {}s", event, snapshot.countdown_seconds);
        }
        Ok(result)
    }

    pub fn is_foreground(&self) -> bool {
        self.lifecycle.is_foreground()
    }

    /// Get current cycle state
    pub fn get_cycle_snapshot(&self) -> Result<CycleSnapshot, String> {
        self.machine.lock()
            .map(|machine| machine.snapshot())
            .map_err(|e| format!("Failed to lock cycle machine: {}", e))
    }

    pub fn get_driver_mode(&self) -> Result<DriverMode, String> {
        self.machine.lock()
            .map(|machine| machine.driver_mode())
            .map_err(|e| format!("Failed to lock cycle machine: {}", e))
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}
