//! One-second tick driver background task

use std::{sync::Arc, time::Duration};
use tokio::{
    sync::watch,
    time::{interval_at, Instant, Interval, MissedTickBehavior},
};
use tracing::{debug, error, info};

use crate::{cycle::DriverMode, state::AppState};

const TICK_PERIOD: Duration = Duration::from_secs(1);

fn new_interval() -> Interval {
    let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    // After a stall the reconciler catches up from the wall clock; bursting would double count
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Background task that ticks the cycle machine while the driver is active.
///
/// The interval is created on the first activation, left alone while
/// suspended, restarted on re-activation and dropped on stop. The task exits
/// when the control handle is dropped.
pub async fn tick_driver_task(state: Arc<AppState>, mut mode_rx: watch::Receiver<DriverMode>) {
    info!("Starting tick driver task");

    let mut interval: Option<Interval> = None;
    let mut current_epoch: Option<u64> = None;

    loop {
        let mode = *mode_rx.borrow_and_update();

        match mode {
            DriverMode::Active { epoch } => {
                if current_epoch != Some(epoch) {
                    match interval.as_mut() {
                        Some(existing) => existing.reset(),
                        None => interval = Some(new_interval()),
                    }
                    current_epoch = Some(epoch);
                    debug!("Tick driver active (epoch {})", epoch);
                }

                let Some(ticker) = interval.as_mut() else {
                    continue;
                };

                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = state.driver_tick(epoch) {
                            error!("Failed to tick cycle: {}", e);
                        }
                    }
                    changed = mode_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            DriverMode::Suspended => {
                debug!("Tick driver suspended");
                current_epoch = None;
                if mode_rx.changed().await.is_err() {
                    break;
                }
            }
            DriverMode::Stopped => {
                if interval.take().is_some() {
                    debug!("Tick driver stopped");
                }
                current_epoch = None;
                if mode_rx.changed().await.is_err() {
                    break;
                }
            }
        }
    }

    info!("Tick driver task finished");
}
