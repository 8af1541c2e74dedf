//! Focus Bell - A focus interval timer daemon
//!
//! This is the main entry point for the focus-bell application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use focus_bell::{
    clock::{Clock, SystemClock},
    config::Config,
    cycle::{Collaborators, CycleMachine, TickControl},
    services::{CommandCuePlayer, CuePlayer, TokioNotifier},
    state::{AppState, Lifecycle},
    store::{default_state_path, JsonFileStore, MemoryStore, StateStore},
    api::create_router,
    tasks::{tick_driver_task, wake_up_recovery_task},
    utils::{lifecycle_signal_task, shutdown_signal},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("focus_bell={},tower_http=info", config.log_level()))
        .init();

    info!("Starting focus-bell v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, round={}s",
          config.host, config.port, config.cycle_seconds);

    let store: Box<dyn StateStore> = if config.ephemeral {
        info!("Ephemeral mode, cycle state will not survive a restart");
        Box::new(MemoryStore::new())
    } else {
        let path = config.state_file.clone().unwrap_or_else(default_state_path);
        info!("Cycle state file: {}", path.display());
        Box::new(JsonFileStore::new(path))
    };

    // Collaborators for the cycle machine
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let lifecycle = Arc::new(Lifecycle::new());
    let cue: Arc<dyn CuePlayer> = Arc::new(CommandCuePlayer::new(config.cue_command.clone()));
    let notifier = Arc::new(TokioNotifier::new(
        Arc::clone(&cue),
        lifecycle.clone(),
        config.notify_command.clone(),
    ));

    let (ticker, tick_rx) = TickControl::channel();
    let machine = CycleMachine::new(
        config.cycle_seconds,
        config.seed,
        Collaborators {
            clock: Arc::clone(&clock),
            store,
            notifier,
            cue,
            foreground: lifecycle.clone(),
        },
        ticker,
    );

    // Create application state
    let state = Arc::new(AppState::new(config.port, config.host.clone(), machine, lifecycle));

    // Start the tick driver before recovering, so a running cycle keeps ticking
    let driver_state = Arc::clone(&state);
    tokio::spawn(async move {
        tick_driver_task(driver_state, tick_rx).await;
    });

    match state.recover_after_launch() {
        Ok((Some(event), cycle)) => info!("Recovered cycle: {:?}, countdown {}s", event, cycle.countdown_seconds),
        Ok((None, cycle)) => info!("Cycle is {:?} at launch", cycle.phase),
        Err(e) => tracing::error!("Failed to recover cycle: {}", e),
    }

    // Start the wake-up detection and lifecycle signal tasks
    let wake_state = Arc::clone(&state);
    let wake_period = config.wake_check_period();
    tokio::spawn(async move {
        wake_up_recovery_task(wake_state, clock, wake_period).await;
    });

    let signal_state = Arc::clone(&state);
    tokio::spawn(async move {
        lifecycle_signal_task(signal_state).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /start                - Start a cycle");
    info!("  POST /pause                - Pause the running cycle");
    info!("  POST /resume               - Resume the paused cycle");
    info!("  POST /reset                - Reset to idle");
    info!("  POST /toggle               - Start, pause or resume");
    info!("  POST /lifecycle/background - Mark the timer as backgrounded");
    info!("  POST /lifecycle/foreground - Mark the timer as foregrounded and catch up");
    info!("  GET  /status               - Current cycle status");
    info!("  GET  /health               - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
