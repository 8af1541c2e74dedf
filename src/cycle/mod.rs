//! Focus cycle engine
//!
//! The state machine plus the two handles it drives: the deferred cue and the
//! tick driver control.

pub mod beep;
pub mod machine;
pub mod ticker;

// Re-export main types
pub use beep::{BeepScheduler, CUE_NOTIFICATION_ID};
pub use machine::{Collaborators, CycleEvent, CycleMachine, TickOutcome};
pub use ticker::{DriverMode, TickControl};
