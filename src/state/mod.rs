//! State management module
//! 
//! This module contains the cycle state, lifecycle tracking and the shared
//! application state that owns the cycle machine.

pub mod app_state;
pub mod cycle_state;
pub mod lifecycle;

// Re-export main types
pub use app_state::AppState;
pub use cycle_state::{CyclePhase, CycleSnapshot, CycleState, DEFAULT_CYCLE_SECONDS, MAX_CYCLE_SECONDS};
pub use lifecycle::{ForegroundProbe, Lifecycle, LifecycleEvent};
