//! Deferred one-shot notifications

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::{runtime::Handle, task::JoinHandle, time::sleep};
use tracing::{debug, info, warn};

use super::cue::{run_shell_command, CuePlayer};
use crate::{error::NotifyError, state::ForegroundProbe};

/// Content of a delivered cue notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuePayload {
    pub title: String,
    pub body: String,
}

impl Default for CuePayload {
    fn default() -> Self {
        Self {
            title: "Focus Bell".to_string(),
            body: "Time to check in".to_string(),
        }
    }
}

/// Schedules notifications that fire after a delay, keyed by identifier.
pub trait Notifier: Send + Sync {
    /// Schedule `payload` for delivery in `delay_seconds`, replacing any pending one with the same `id`
    fn schedule_one_shot(&self, id: &str, delay_seconds: u64, payload: &CuePayload) -> Result<(), NotifyError>;
    fn cancel(&self, id: &str);
    fn cancel_all(&self);
}

#[derive(Debug)]
struct Pending {
    token: u64,
    task: JoinHandle<()>,
}

/// Notifier that sleeps on the tokio runtime and delivers in-process.
///
/// Delivery is suppressed while the app is in the foreground, where the
/// cue has already been played directly.
pub struct TokioNotifier {
    pending: Arc<Mutex<HashMap<String, Pending>>>,
    next_token: AtomicU64,
    cue: Arc<dyn CuePlayer>,
    foreground: Arc<dyn ForegroundProbe>,
    notify_command: Option<String>,
}

impl TokioNotifier {
    pub fn new(
        cue: Arc<dyn CuePlayer>,
        foreground: Arc<dyn ForegroundProbe>,
        notify_command: Option<String>,
    ) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_token: AtomicU64::new(0),
            cue,
            foreground,
            notify_command,
        }
    }

    /// Number of notifications waiting to fire
    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl Notifier for TokioNotifier {
    fn schedule_one_shot(&self, id: &str, delay_seconds: u64, payload: &CuePayload) -> Result<(), NotifyError> {
        if delay_seconds == 0 {
            return Err(NotifyError::Rejected {
                id: id.to_string(),
                reason: "delay must be at least one second".to_string(),
            });
        }
        let handle = Handle::try_current().map_err(|e| NotifyError::Unavailable(e.to_string()))?;

        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        let delivery = Delivery {
            id: id.to_string(),
            token,
            payload: payload.clone(),
            pending: Arc::clone(&self.pending),
            cue: Arc::clone(&self.cue),
            foreground: Arc::clone(&self.foreground),
            notify_command: self.notify_command.clone(),
        };

        let mut pending = self
            .pending
            .lock()
            .map_err(|e| NotifyError::Unavailable(format!("pending table poisoned: {}", e)))?;
        if let Some(previous) = pending.remove(id) {
            previous.task.abort();
        }
        let task = handle.spawn(async move {
            sleep(Duration::from_secs(delay_seconds)).await;
            delivery.run().await;
        });
        pending.insert(id.to_string(), Pending { token, task });

        debug!("Notification '{}' scheduled in {}s", id, delay_seconds);
        Ok(())
    }

    fn cancel(&self, id: &str) {
        let removed = match self.pending.lock() {
            Ok(mut pending) => pending.remove(id),
            Err(e) => {
                warn!("Failed to lock pending notifications: {}", e);
                None
            }
        };
        if let Some(previous) = removed {
            previous.task.abort();
            debug!("Notification '{}' cancelled", id);
        }
    }

    fn cancel_all(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            for (_, previous) in pending.drain() {
                previous.task.abort();
            }
        }
    }
}

/// Everything a sleeping notification needs when it wakes up
struct Delivery {
    id: String,
    token: u64,
    payload: CuePayload,
    pending: Arc<Mutex<HashMap<String, Pending>>>,
    cue: Arc<dyn CuePlayer>,
    foreground: Arc<dyn ForegroundProbe>,
    notify_command: Option<String>,
}

impl Delivery {
    async fn run(self) {
        if let Ok(mut pending) = self.pending.lock() {
            if pending.get(&self.id).map(|p| p.token) == Some(self.token) {
                pending.remove(&self.id);
            }
        }

        if self.foreground.is_foreground() {
            debug!("Notification '{}' suppressed while in foreground", self.id);
            return;
        }

        info!("Delivering notification '{}': {}", self.id, self.payload.title);
        self.cue.play();

        if let Some(command) = &self.notify_command {
            let args = [self.payload.title.clone(), self.payload.body.clone()];
            if let Err(e) = run_shell_command(command, &args).await {
                warn!("Notification command failed: {}", e);
            }
        }
    }
}
