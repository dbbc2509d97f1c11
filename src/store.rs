//! Central state broadcaster.
//!
//! DESIGN
//! ======
//! One actor task owns `AuthState`. Intents arrive over an unbounded `mpsc`
//! channel and are applied strictly in dispatch order through `reduce`. After
//! each transition the new snapshot is published on a `watch` channel (UI,
//! route guard) and the intent itself is forwarded to every feed (effect
//! pipeline) and fanned out on a `broadcast` channel (observers). State is
//! therefore always updated before effects see the intent that caused it.
//!
//! Feeds are unbounded like the intent channel, so a slow pipeline delays its
//! reactions but never loses a `Logout`. Broadcast observers may lag and skip.
//!
//! Snapshots are `Arc<AuthState>` and never mutated once published, so readers
//! always observe a complete state without locking.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::intent::Intent;
use crate::reducer::{AuthState, reduce};

/// Buffered applied intents per broadcast observer before it starts lagging.
pub const ACTION_CHANNEL_CAPACITY: usize = 256;

/// Cloneable handle to the broadcaster actor.
#[derive(Clone)]
pub struct StoreHandle {
    intents: mpsc::UnboundedSender<Intent>,
    state: watch::Receiver<Arc<AuthState>>,
    actions: broadcast::Sender<Arc<Intent>>,
    feeds: Feeds,
}

type Feeds = Arc<Mutex<Vec<mpsc::UnboundedSender<Arc<Intent>>>>>;

impl StoreHandle {
    /// Queue an intent. Never blocks; a stopped actor only logs.
    pub fn dispatch(&self, intent: Intent) {
        let kind = intent.kind();
        if self.intents.send(intent).is_err() {
            warn!(intent = kind, "store: dispatch after actor stopped");
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<AuthState> {
        self.state.borrow().clone()
    }

    /// Subscribe to state snapshots. The receiver starts at the current state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<AuthState>> {
        self.state.clone()
    }

    /// Subscribe to intents after they have been applied. Lossy: a receiver
    /// that falls more than [`ACTION_CHANNEL_CAPACITY`] behind skips intents.
    #[must_use]
    pub fn actions(&self) -> broadcast::Receiver<Arc<Intent>> {
        self.actions.subscribe()
    }

    /// Lossless subscription to applied intents, starting with the next one.
    #[must_use]
    pub fn feed(&self) -> mpsc::UnboundedReceiver<Arc<Intent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.feeds.lock().unwrap_or_else(PoisonError::into_inner).push(tx);
        rx
    }
}

/// Spawn the broadcaster actor with the initial anonymous state.
#[must_use]
pub fn spawn_store() -> (StoreHandle, JoinHandle<()>) {
    let (intent_tx, intent_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(Arc::new(AuthState::default()));
    let (action_tx, _) = broadcast::channel(ACTION_CHANNEL_CAPACITY);

    let feeds = Feeds::default();

    let handle =
        StoreHandle { intents: intent_tx, state: state_rx, actions: action_tx.clone(), feeds: Arc::clone(&feeds) };
    let task = tokio::spawn(run_store(intent_rx, state_tx, action_tx, feeds));
    (handle, task)
}

async fn run_store(
    mut intents: mpsc::UnboundedReceiver<Intent>,
    state: watch::Sender<Arc<AuthState>>,
    actions: broadcast::Sender<Arc<Intent>>,
    feeds: Feeds,
) {
    while let Some(intent) = intents.recv().await {
        let current = state.borrow().clone();
        let next = reduce(&current, &intent);
        debug!(
            intent = intent.kind(),
            authenticated = next.is_authenticated(),
            loading = next.loading,
            "store: intent applied"
        );

        if next != *current {
            state.send_replace(Arc::new(next));
        }

        let intent = Arc::new(intent);
        feeds.lock().unwrap_or_else(PoisonError::into_inner).retain(|feed| feed.send(Arc::clone(&intent)).is_ok());

        // No observers is fine; nothing reacts to this intent.
        let _ = actions.send(intent);
    }
    debug!("store: intent channel closed");
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
