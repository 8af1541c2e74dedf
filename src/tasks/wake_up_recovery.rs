//! Wake-up recovery background task

use std::{sync::Arc, time::Duration};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{clock::Clock, state::AppState};

/// Smallest wall-clock jump treated as a host suspension
const MIN_GAP: Duration = Duration::from_secs(5);

/// Seconds the wall clock moved beyond the monotonic clock, if that reaches `threshold`
pub fn suspension_gap(wall_delta: f64, monotonic_delta: f64, threshold: f64) -> Option<f64> {
    let gap = wall_delta - monotonic_delta;
    (gap >= threshold).then_some(gap)
}

/// Background task that detects host sleep and reconciles the cycle afterwards.
///
/// Tokio's clock does not advance while the machine sleeps, but the wall
/// clock does; a jump between the two means time passed unseen.
pub async fn wake_up_recovery_task(state: Arc<AppState>, clock: Arc<dyn Clock>, period: Duration) {
    info!("Starting wake-up recovery task (every {}s)", period.as_secs());

    let threshold = period.max(MIN_GAP).as_secs_f64();
    let mut interval = interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await;

    let mut last_wall = clock.now();
    let mut last_monotonic = Instant::now();

    loop {
        interval.tick().await;

        let wall = clock.now();
        let monotonic = Instant::now();
        let gap = suspension_gap(
            wall - last_wall,
            monotonic.duration_since(last_monotonic).as_secs_f64(),
            threshold,
        );
        last_wall = wall;
        last_monotonic = monotonic;

        let Some(gap) = gap else {
            continue;
        };

        info!("System wake-up detected ({:.0}s unaccounted), reconciling cycle", gap);
        match state.reconcile("wake-up") {
            Ok((Some(event), snapshot)) => {
                info!("Wake-up reconciliation: {:?}, countdown {}s", event, snapshot.countdown_seconds);
            }
            Ok((None, _)) => {
                debug!("No running cycle to reconcile after wake-up");
            }
            Err(e) => {
                warn!("Failed to reconcile after wake-up: {}", e);
            }
        }
    }
}
