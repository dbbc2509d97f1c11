//! Logout timer — dispatches `Logout` when the session token lapses.
//!
//! DESIGN
//! ======
//! At most one expiry task is pending. Every `arm` or `cancel` bumps a
//! generation number under the same lock the firing task takes before it
//! dispatches, so a cancelled or superseded timer can never emit `Logout`
//! even if its sleep already completed on another worker thread.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::intent::Intent;
use crate::store::StoreHandle;

#[derive(Default)]
struct Pending {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct LogoutTimer {
    store: StoreHandle,
    pending: Arc<Mutex<Pending>>,
}

impl LogoutTimer {
    #[must_use]
    pub fn new(store: StoreHandle) -> Self {
        Self { store, pending: Arc::new(Mutex::new(Pending::default())) }
    }

    /// Schedule `Logout` after `after`, replacing any pending expiry.
    /// Zero or negative durations fire on the next scheduler turn.
    pub fn arm(&self, after: time::Duration) {
        let delay = std::time::Duration::try_from(after).unwrap_or_default();
        let mut pending = lock(&self.pending);
        pending.generation += 1;
        if let Some(task) = pending.task.take() {
            task.abort();
        }

        let generation = pending.generation;
        let shared = Arc::clone(&self.pending);
        let store = self.store.clone();
        pending.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut pending = lock(&shared);
            if pending.generation != generation {
                return;
            }
            pending.task = None;
            info!("timer: session expired");
            store.dispatch(Intent::Logout);
        }));
        debug!(?delay, "timer: armed");
    }

    /// Cancel the pending expiry. No-op when nothing is armed.
    pub fn cancel(&self) {
        let mut pending = lock(&self.pending);
        pending.generation += 1;
        if let Some(task) = pending.task.take() {
            task.abort();
            debug!("timer: cancelled");
        }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        lock(&self.pending).task.is_some()
    }
}

// The guarded data stays consistent even if a holder panicked.
fn lock(pending: &Mutex<Pending>) -> std::sync::MutexGuard<'_, Pending> {
    pending.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
#[path = "timer_test.rs"]
mod tests;
