//! Foreground/background tracking

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Answers whether the user is currently looking at the timer.
pub trait ForegroundProbe: Send + Sync {
    fn is_foreground(&self) -> bool;
}

/// Lifecycle transition reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    EnteredBackground,
    EnteredForeground,
}

/// Foreground flag flipped by lifecycle signals
#[derive(Debug)]
pub struct Lifecycle {
    foreground: AtomicBool,
}

impl Lifecycle {
    /// A daemon attached to a terminal starts in the foreground
    pub fn new() -> Self {
        Self {
            foreground: AtomicBool::new(true),
        }
    }

    /// Record a transition; returns true when the flag actually changed
    pub fn apply(&self, event: LifecycleEvent) -> bool {
        let foreground = event == LifecycleEvent::EnteredForeground;
        let previous = self.foreground.swap(foreground, Ordering::SeqCst);
        if previous != foreground {
            info!("Lifecycle transition: {:?}", event);
        }
        previous != foreground
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl ForegroundProbe for Lifecycle {
    fn is_foreground(&self) -> bool {
        self.foreground.load(Ordering::SeqCst)
    }
}
