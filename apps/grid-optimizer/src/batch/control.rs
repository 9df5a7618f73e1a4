//! Pause, resume and stop handle for a running batch.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Default)]
struct Flags {
    paused: bool,
    stopped: bool,
}

#[derive(Debug, Default)]
struct Shared {
    flags: Mutex<Flags>,
    changed: Condvar,
    cancel: CancellationToken,
}

/// Cloneable control handle; every clone drives the same batch.
///
/// Pause and stop take effect between units, never inside one. Only
/// [`BatchControl::abort`] reaches into the running unit.
#[derive(Debug, Clone, Default)]
pub struct BatchControl {
    shared: Arc<Shared>,
}

impl BatchControl {
    /// New handle in the running state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the batch before its next unit.
    pub fn pause(&self) {
        self.shared.flags.lock().paused = true;
        info!("Batch pause requested");
    }

    /// Release a paused batch.
    pub fn resume(&self) {
        self.shared.flags.lock().paused = false;
        self.shared.changed.notify_all();
        info!("Batch resumed");
    }

    /// End the batch after the current unit; also releases a pause.
    pub fn stop(&self) {
        {
            let mut flags = self.shared.flags.lock();
            flags.stopped = true;
            flags.paused = false;
        }
        self.shared.changed.notify_all();
        info!("Batch stop requested");
    }

    /// Stop, and stop submitting the current unit's remaining combinations.
    ///
    /// The interrupted unit is not recorded and runs again on resume.
    pub fn abort(&self) {
        self.shared.cancel.cancel();
        self.stop();
    }

    /// Whether [`BatchControl::abort`] was called.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Token observed by the dispatcher.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.shared.cancel
    }

    /// Whether a pause is in effect.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.shared.flags.lock().paused
    }

    /// Whether stop was requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shared.flags.lock().stopped
    }

    /// Block while paused. Returns `true` if the batch should stop.
    pub fn wait_if_paused(&self) -> bool {
        let mut flags = self.shared.flags.lock();
        while flags.paused && !flags.stopped {
            self.shared.changed.wait(&mut flags);
        }
        flags.stopped
    }
}
