//! Auth effect pipeline — network, persistence, timer and navigation.
//!
//! DESIGN
//! ======
//! The pipeline observes intents after the store has applied them and never
//! touches `AuthState` directly; it only dispatches follow-up intents.
//!
//! - `SignInStart` / `SignUpStart` spawn one authentication chain: provider
//!   call, then persist, `AuthenticateSuccess` and arm the timer, or
//!   `AuthenticateFail` with the mapped message.
//! - `AutoLogin` restores a stored live session with `redirect: false`.
//! - `AuthenticateSuccess` navigates to the landing route when `redirect`.
//! - `Logout` cancels the timer, clears storage, navigates to login.
//!
//! CONCURRENCY
//! ===========
//! Only the newest authentication chain may complete. Starting another chain
//! or logging out bumps the attempt number under the attempt lock and then
//! aborts the in-flight task. A chain re-checks its attempt under that lock
//! before any side effect and holds it until its follow-up is dispatched, so a
//! response that lands after being superseded is dropped.
//!
//! Session storage is synchronous (`std::fs` for the file store) and runs on
//! the blocking pool. The attempt lock is a `tokio` mutex because a chain holds
//! it across that hop.
//!
//! A success is dispatched before the logout timer is armed. A lifetime that
//! has already lapsed therefore queues its `Logout` behind the success.

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::persistence::SessionStore;
use super::timer::LogoutTimer;
use crate::intent::{AuthMode, Authenticated, Credentials, Intent};
use crate::provider::{AuthResponse, IdentityProvider, user_message};
use crate::route::{Navigator, Route};
use crate::session::Session;
use crate::store::StoreHandle;

pub struct EffectPipeline {
    store: StoreHandle,
    provider: Arc<dyn IdentityProvider>,
    sessions: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    timer: LogoutTimer,
    attempt: Arc<Mutex<u64>>,
    in_flight: Option<JoinHandle<()>>,
}

impl EffectPipeline {
    #[must_use]
    pub fn new(
        store: StoreHandle,
        provider: Arc<dyn IdentityProvider>,
        sessions: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
        timer: LogoutTimer,
    ) -> Self {
        Self {
            store,
            provider,
            sessions,
            navigator,
            timer,
            attempt: Arc::new(Mutex::new(0)),
            in_flight: None,
        }
    }

    /// Subscribe to applied intents and run the pipeline on its own task.
    /// The subscription is taken before returning, so nothing dispatched
    /// afterwards is missed.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        let feed = self.store.feed();
        tokio::spawn(self.run(feed))
    }

    async fn run(mut self, mut feed: mpsc::UnboundedReceiver<Arc<Intent>>) {
        while let Some(intent) = feed.recv().await {
            self.handle(&intent).await;
        }
        self.abort_in_flight();
    }

    async fn handle(&mut self, intent: &Intent) {
        match intent {
            Intent::SignInStart(credentials) => self.start_authentication(AuthMode::SignIn, credentials.clone()).await,
            Intent::SignUpStart(credentials) => self.start_authentication(AuthMode::SignUp, credentials.clone()).await,
            Intent::AutoLogin => {
                if let Some(restored) = restore_session(&self.sessions, OffsetDateTime::now_utc()).await {
                    restored.apply(&self.store, &self.timer);
                }
            }
            Intent::AuthenticateSuccess(auth) => {
                if auth.redirect {
                    self.navigator.navigate(Route::Landing);
                }
            }
            Intent::Logout => self.logout().await,
            Intent::AuthenticateFail(_) => {}
        }
    }

    async fn start_authentication(&mut self, mode: AuthMode, credentials: Credentials) {
        let id = self.supersede().await;
        info!(?mode, email = %credentials.email, attempt = id, "effects: authentication started");

        let chain = AuthChain {
            id,
            attempt: Arc::clone(&self.attempt),
            store: self.store.clone(),
            provider: Arc::clone(&self.provider),
            sessions: Arc::clone(&self.sessions),
            timer: self.timer.clone(),
        };
        self.in_flight = Some(tokio::spawn(chain.run(mode, credentials)));
    }

    async fn logout(&mut self) {
        self.supersede().await;
        self.timer.cancel();
        if let Some(Err(e)) = with_storage(&self.sessions, |sessions| sessions.clear()).await {
            warn!(error = %e, "effects: stored session not cleared");
        }
        info!("effects: logged out");
        self.navigator.navigate(Route::Login);
    }

    /// Invalidate the in-flight chain and return the new attempt number.
    /// Waits for a chain inside its locked section to finish dispatching.
    async fn supersede(&mut self) -> u64 {
        let id = {
            let mut attempt = self.attempt.lock().await;
            *attempt += 1;
            *attempt
        };
        self.abort_in_flight();
        id
    }

    fn abort_in_flight(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}

// =============================================================================
// AUTHENTICATION CHAIN
// =============================================================================

struct AuthChain {
    id: u64,
    attempt: Arc<Mutex<u64>>,
    store: StoreHandle,
    provider: Arc<dyn IdentityProvider>,
    sessions: Arc<dyn SessionStore>,
    timer: LogoutTimer,
}

impl AuthChain {
    async fn run(self, mode: AuthMode, credentials: Credentials) {
        let result = match mode {
            AuthMode::SignIn => self.provider.sign_in(&credentials).await,
            AuthMode::SignUp => self.provider.sign_up(&credentials).await,
        };

        let current = self.attempt.lock().await;
        if *current != self.id {
            debug!(attempt = self.id, "effects: superseded response dropped");
            return;
        }

        match result {
            Ok(response) => {
                complete_authentication(&response, &self.sessions, OffsetDateTime::now_utc())
                    .await
                    .apply(&self.store, &self.timer);
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), ?mode, "effects: authentication failed");
                self.store.dispatch(Intent::AuthenticateFail(user_message(&e).to_string()));
            }
        }
        drop(current);
    }
}

/// A signed-in session ready to publish: the success intent plus the token
/// lifetime the logout timer must run for.
#[derive(Debug)]
pub(crate) struct Established {
    pub(crate) intent: Intent,
    pub(crate) lifetime: time::Duration,
}

impl Established {
    /// Dispatch the success, then arm the timer for the remaining lifetime.
    pub(crate) fn apply(self, store: &StoreHandle, timer: &LogoutTimer) {
        store.dispatch(self.intent);
        timer.arm(self.lifetime);
    }
}

/// Persist the fresh session and build the redirecting success.
pub(crate) async fn complete_authentication(
    response: &AuthResponse,
    sessions: &Arc<dyn SessionStore>,
    now: OffsetDateTime,
) -> Established {
    let lifetime = time::Duration::seconds(i64::try_from(response.expires_in).unwrap_or(i64::MAX));
    let expiration_date = now.saturating_add(lifetime);
    let session = Session::new(
        response.email.clone(),
        response.local_id.clone(),
        Some(response.id_token.clone()),
        expiration_date,
    );

    if let Some(Err(e)) = with_storage(sessions, move |sessions| sessions.save(&session)).await {
        warn!(error = %e, "effects: session not persisted");
    }
    info!(user_id = %response.local_id, expires_in = response.expires_in, "effects: authenticated");

    Established {
        intent: Intent::AuthenticateSuccess(Authenticated {
            email: response.email.clone(),
            user_id: response.local_id.clone(),
            token: response.id_token.clone(),
            expiration_date,
            redirect: true,
        }),
        lifetime,
    }
}

/// Rebuild the success from storage. `None` when nothing is stored or the
/// stored session has no token.
pub(crate) async fn restore_session(sessions: &Arc<dyn SessionStore>, now: OffsetDateTime) -> Option<Established> {
    let Some(session) = with_storage(sessions, |sessions| sessions.load()).await.flatten() else {
        debug!("effects: no stored session");
        return None;
    };
    let Some(token) = session.token.clone() else {
        debug!("effects: stored session has no token");
        return None;
    };

    info!(user_id = %session.id, "effects: session restored");
    let lifetime = session.remaining(now);
    Some(Established {
        intent: Intent::AuthenticateSuccess(Authenticated {
            email: session.email,
            user_id: session.id,
            token,
            expiration_date: session.token_expiration,
            redirect: false,
        }),
        lifetime,
    })
}

/// Run a storage call on the blocking pool. `None` if that task panicked.
pub(crate) async fn with_storage<T, F>(sessions: &Arc<dyn SessionStore>, op: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn SessionStore) -> T + Send + 'static,
{
    let sessions = Arc::clone(sessions);
    match tokio::task::spawn_blocking(move || op(sessions.as_ref())).await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "effects: session storage task failed");
            None
        }
    }
}

#[cfg(test)]
#[path = "effects_test.rs"]
mod tests;
