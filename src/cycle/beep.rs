//! One deferred cue per cycle

use std::sync::Arc;
use tracing::{debug, warn};

use crate::services::{CuePayload, Notifier};

/// Identifier shared by every cue notification, so arming replaces rather than stacks
pub const CUE_NOTIFICATION_ID: &str = "focus-bell.cue";

/// Keeps at most one deferred cue pending.
///
/// This is the backstop for when the cue cannot be played directly; a failed
/// schedule is logged and otherwise ignored.
pub struct BeepScheduler {
    notifier: Arc<dyn Notifier>,
    payload: CuePayload,
}

impl BeepScheduler {
    pub fn new(notifier: Arc<dyn Notifier>, payload: CuePayload) -> Self {
        Self { notifier, payload }
    }

    /// Arm the cue `after_seconds` from now; non-positive delays only disarm
    pub fn arm(&self, after_seconds: i64) {
        self.notifier.cancel(CUE_NOTIFICATION_ID);
        if after_seconds <= 0 {
            debug!("Not arming cue with delay {}s", after_seconds);
            return;
        }

        if let Err(e) = self
            .notifier
            .schedule_one_shot(CUE_NOTIFICATION_ID, after_seconds as u64, &self.payload)
        {
            warn!("Failed to arm cue notification: {}", e);
        } else {
            debug!("Cue armed in {}s", after_seconds);
        }
    }

    pub fn disarm(&self) {
        self.notifier.cancel(CUE_NOTIFICATION_ID);
    }
}
