//! Focus Bell - A focus interval timer that rings once per round
//! 
//! This library provides the cycle state machine, its persistence and
//! wall-clock recovery, and the daemon pieces that host it: a tick driver,
//! wake-up detection, lifecycle signals and an HTTP control API.

pub mod api;
pub mod clock;
pub mod config;
pub mod cycle;
pub mod error;
pub mod services;
pub mod state;
pub mod store;
pub mod tasks;
pub mod utils;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use cycle::{CycleEvent, CycleMachine};
pub use state::AppState;
pub use utils::signals::shutdown_signal;
