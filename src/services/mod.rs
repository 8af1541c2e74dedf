//! Host services module
//! 
//! This module contains the collaborators the cycle machine reaches out to:
//! cue playback and deferred notifications.

pub mod cue;
pub mod notifier;

// Re-export main types
pub use cue::{CommandCuePlayer, CuePlayer};
pub use notifier::{CuePayload, Notifier, TokioNotifier};
