//! Control handle for the one-second tick driver

use tokio::sync::watch;

/// What the tick driver should be doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverMode {
    /// No timer exists
    Stopped,
    /// Timer kept alive but inert
    Suspended,
    /// Ticking; ticks carry `epoch` so stale ones can be told apart
    Active { epoch: u64 },
}

/// Owner side of the tick driver, held by the cycle machine.
///
/// Mode changes are published synchronously, so once `suspend` or `stop`
/// returns no tick from an earlier activation is accepted.
#[derive(Debug)]
pub struct TickControl {
    tx: watch::Sender<DriverMode>,
    epoch: u64,
}

impl TickControl {
    /// Create a control handle and the receiver the driver task listens on
    pub fn channel() -> (Self, watch::Receiver<DriverMode>) {
        let (tx, rx) = watch::channel(DriverMode::Stopped);
        (Self { tx, epoch: 0 }, rx)
    }

    /// Start ticking, or restart after a suspension
    pub fn activate(&mut self) {
        self.epoch += 1;
        self.tx.send_replace(DriverMode::Active { epoch: self.epoch });
    }

    pub fn suspend(&mut self) {
        if self.mode() != DriverMode::Stopped {
            self.tx.send_replace(DriverMode::Suspended);
        }
    }

    pub fn stop(&mut self) {
        self.tx.send_replace(DriverMode::Stopped);
    }

    pub fn mode(&self) -> DriverMode {
        *self.tx.borrow()
    }

    /// Whether a tick from activation `epoch` should still be honoured
    pub fn is_current(&self, epoch: u64) -> bool {
        self.mode() == DriverMode::Active { epoch }
    }
}
