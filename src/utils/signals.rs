//! Signal handling for graceful shutdown and lifecycle transitions

use std::sync::Arc;
use signal_hook::consts::{SIGCONT, SIGINT, SIGTERM, SIGUSR1, SIGUSR2};
use signal_hook_tokio::Signals;
use futures::stream::StreamExt;
use tracing::{error, info, warn};

use crate::state::{AppState, LifecycleEvent};

/// Lifecycle transition a Unix signal stands for
pub fn lifecycle_event_for(signal: i32) -> Option<LifecycleEvent> {
    match signal {
        SIGUSR1 => Some(LifecycleEvent::EnteredBackground),
        SIGUSR2 | SIGCONT => Some(LifecycleEvent::EnteredForeground),
        _ => None,
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
pub async fn shutdown_signal() {
    let mut signals = match Signals::new([SIGTERM, SIGINT]) {
        Ok(signals) => signals,
        Err(e) => {
            error!("Failed to create shutdown signal handler: {}", e);
            return futures::future::pending().await;
        }
    };

    if let Some(signal) = signals.next().await {
        info!("Received signal: {}", signal);
    }
}

/// Map SIGUSR1 to background and SIGUSR2/SIGCONT to foreground.
///
/// SIGCONT arrives when a stopped process is continued, which is exactly a
/// return from suspension.
pub async fn lifecycle_signal_task(state: Arc<AppState>) {
    let mut signals = match Signals::new([SIGUSR1, SIGUSR2, SIGCONT]) {
        Ok(signals) => signals,
        Err(e) => {
            warn!("Lifecycle signals unavailable: {}", e);
            return;
        }
    };
    info!("Listening for lifecycle signals (USR1=background, USR2/CONT=foreground)");

    while let Some(signal) = signals.next().await {
        let result = match lifecycle_event_for(signal) {
            Some(LifecycleEvent::EnteredBackground) => state.entered_background(),
            Some(LifecycleEvent::EnteredForeground) => state.entered_foreground(),
            None => continue,
        };
        if let Err(e) = result {
            error!("Failed to handle lifecycle signal {}: {}", signal, e);
        }
    }
}
