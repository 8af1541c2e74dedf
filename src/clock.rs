//! Wall-clock source

use chrono::Utc;

/// Supplies wall-clock time as seconds since the Unix epoch.
///
/// Elapsed time across a suspension gap is computed from two readings of this
/// clock, never from a monotonic one, because monotonic clocks stop while the
/// host sleeps on some platforms.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Clock backed by the system time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        Utc::now().timestamp_millis() as f64 / 1000.0
    }
}

/// Whole seconds between `earlier` and `later`, never negative.
pub fn whole_seconds_between(earlier: f64, later: f64) -> u64 {
    let delta = later - earlier;
    if delta.is_finite() && delta > 0.0 {
        delta.floor() as u64
    } else {
        0
    }
}
