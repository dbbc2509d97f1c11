//! Auth context — explicit wiring of the store, effects and timer.
//!
//! DESIGN
//! ======
//! There is no global store. Callers build one `AuthContext` with the provider,
//! session storage and navigator they want, and hand it (or its
//! `StoreHandle`/`RouteGuard`) to whatever needs auth state. Dropping the
//! context stops its tasks.
//!
//! SETTLING
//! ========
//! `dispatch` and friends return immediately. Short-lived hosts use
//! `restore`, `authenticate` and `logout_settled`, which wait for the intents
//! and navigation that end each flow. `authenticate` only accepts the
//! redirecting success of a new attempt, never a session restored meanwhile.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::guard::RouteGuard;
use crate::intent::{AuthMode, Authenticated, Credentials, Intent};
use crate::provider::IdentityProvider;
use crate::reducer::AuthState;
use crate::route::{Navigator, Route, TrackedNavigator};
use crate::services::effects::{EffectPipeline, with_storage};
use crate::services::persistence::SessionStore;
use crate::services::timer::LogoutTimer;
use crate::session::Session;
use crate::store::{StoreHandle, spawn_store};

#[derive(Debug, thiserror::Error)]
pub enum SettleError {
    #[error("timed out waiting for the auth flow to settle")]
    Timeout,
    #[error("auth store stopped")]
    Stopped,
}

/// How an attempt started with [`AuthContext::authenticate`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    SignedIn(Authenticated),
    /// User-facing message from the fixed error table.
    Failed(String),
    /// A logout cancelled the attempt before it answered.
    LoggedOut,
}

pub struct AuthContext {
    store: StoreHandle,
    timer: LogoutTimer,
    sessions: Arc<dyn SessionStore>,
    navigator: Arc<TrackedNavigator>,
    tasks: Vec<JoinHandle<()>>,
}

impl AuthContext {
    /// Spawn the store actor and effect pipeline. Must be called inside a
    /// tokio runtime.
    #[must_use]
    pub fn start(
        provider: Arc<dyn IdentityProvider>,
        sessions: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (store, store_task) = spawn_store();
        let timer = LogoutTimer::new(store.clone());
        let navigator = Arc::new(TrackedNavigator::new(navigator));
        let effects = EffectPipeline::new(
            store.clone(),
            provider,
            Arc::clone(&sessions),
            navigator.clone(),
            timer.clone(),
        )
        .spawn();

        Self { store, timer, sessions, navigator, tasks: vec![store_task, effects] }
    }

    pub fn dispatch(&self, intent: Intent) {
        self.store.dispatch(intent);
    }

    /// Restore a persisted session, if any.
    pub fn auto_login(&self) {
        self.dispatch(Intent::AutoLogin);
    }

    pub fn logout(&self) {
        self.dispatch(Intent::Logout);
    }

    /// Dispatch `AutoLogin` and wait until a stored session has been signed in
    /// (and logged out again if its token already lapsed).
    ///
    /// # Errors
    ///
    /// [`SettleError::Timeout`] when that takes longer than `limit`.
    pub async fn restore(&self, limit: Duration) -> Result<(), SettleError> {
        let lapsed = with_storage(&self.sessions, |sessions| sessions.load())
            .await
            .flatten()
            .filter(Session::is_live)
            .map(|session| session.remaining(OffsetDateTime::now_utc()) <= time::Duration::ZERO);

        let mut actions = self.store.actions();
        let mut routes = self.navigator.requests();
        self.auto_login();

        settle_within(limit, async {
            let Some(lapsed) = lapsed else {
                return next_intent(&mut actions, |intent| matches!(intent, Intent::AutoLogin).then_some(())).await;
            };
            next_intent(&mut actions, |intent| {
                matches!(intent, Intent::AuthenticateSuccess(auth) if !auth.redirect).then_some(())
            })
            .await?;
            if lapsed {
                next_route(&mut routes, Route::Login).await?;
            }
            Ok(())
        })
        .await
    }

    /// Start a sign-in or sign-up and wait for its outcome. A success also
    /// waits for the landing navigation, after which the session is stored.
    ///
    /// # Errors
    ///
    /// [`SettleError::Timeout`] when no outcome arrives within `limit`.
    pub async fn authenticate(
        &self,
        mode: AuthMode,
        credentials: Credentials,
        limit: Duration,
    ) -> Result<AuthOutcome, SettleError> {
        let mut actions = self.store.actions();
        let mut routes = self.navigator.requests();
        self.dispatch(Intent::start(mode, credentials));

        settle_within(limit, async {
            let outcome = next_intent(&mut actions, |intent| match intent {
                Intent::AuthenticateSuccess(auth) if auth.redirect => Some(AuthOutcome::SignedIn(auth.clone())),
                Intent::AuthenticateFail(message) => Some(AuthOutcome::Failed(message.clone())),
                Intent::Logout => Some(AuthOutcome::LoggedOut),
                _ => None,
            })
            .await?;
            if matches!(outcome, AuthOutcome::SignedIn(_)) {
                next_route(&mut routes, Route::Landing).await?;
            }
            Ok(outcome)
        })
        .await
    }

    /// Dispatch `Logout` and wait until storage is cleared and the login
    /// route requested.
    ///
    /// # Errors
    ///
    /// [`SettleError::Timeout`] when that takes longer than `limit`.
    pub async fn logout_settled(&self, limit: Duration) -> Result<(), SettleError> {
        let mut routes = self.navigator.requests();
        self.logout();
        settle_within(limit, next_route(&mut routes, Route::Login)).await
    }

    #[must_use]
    pub fn state(&self) -> Arc<AuthState> {
        self.store.snapshot()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    #[must_use]
    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    #[must_use]
    pub fn timer(&self) -> &LogoutTimer {
        &self.timer
    }

    #[must_use]
    pub fn guard(&self) -> RouteGuard {
        RouteGuard::new(self.store.clone(), self.navigator.clone())
    }
}

impl Drop for AuthContext {
    fn drop(&mut self) {
        self.timer.cancel();
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn settle_within<T>(
    limit: Duration,
    flow: impl Future<Output = Result<T, SettleError>>,
) -> Result<T, SettleError> {
    tokio::time::timeout(limit, flow).await.map_err(|_| SettleError::Timeout)?
}

async fn next_intent<T>(
    actions: &mut broadcast::Receiver<Arc<Intent>>,
    mut pick: impl FnMut(&Intent) -> Option<T>,
) -> Result<T, SettleError> {
    loop {
        match actions.recv().await {
            Ok(intent) => {
                if let Some(found) = pick(&intent) {
                    return Ok(found);
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "context: intent watcher lagged"),
            Err(RecvError::Closed) => return Err(SettleError::Stopped),
        }
    }
}

async fn next_route(routes: &mut broadcast::Receiver<Route>, route: Route) -> Result<(), SettleError> {
    loop {
        match routes.recv().await {
            Ok(requested) if requested == route => return Ok(()),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "context: navigation watcher lagged"),
            Err(RecvError::Closed) => return Err(SettleError::Stopped),
        }
    }
}

#[cfg(test)]
pub mod test_helpers {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use tokio::sync::{Semaphore, watch};

    use super::*;
    use crate::intent::{AuthMode, Credentials};
    use crate::provider::{AuthResponse, ProviderError};
    use crate::route::Route;
    use crate::services::persistence::MemorySessionStore;

    const WAIT: Duration = Duration::from_secs(2);

    /// Canned provider outcome, consumed in call order.
    pub enum StubOutcome {
        Ok(AuthResponse),
        Rejected(serde_json::Value),
        Unreachable,
    }

    /// Identity provider returning queued outcomes. With a gate, every call
    /// waits for a semaphore permit before answering.
    pub struct StubProvider {
        outcomes: Mutex<VecDeque<StubOutcome>>,
        gate: Option<Arc<Semaphore>>,
        calls: Mutex<Vec<(AuthMode, Credentials)>>,
    }

    impl StubProvider {
        #[must_use]
        pub fn new(outcomes: Vec<StubOutcome>) -> Self {
            Self { outcomes: Mutex::new(outcomes.into()), gate: None, calls: Mutex::new(Vec::new()) }
        }

        #[must_use]
        pub fn gated(outcomes: Vec<StubOutcome>, gate: Arc<Semaphore>) -> Self {
            Self { gate: Some(gate), ..Self::new(outcomes) }
        }

        #[must_use]
        pub fn calls(&self) -> Vec<(AuthMode, Credentials)> {
            self.calls.lock().unwrap().clone()
        }

        async fn answer(&self, mode: AuthMode, credentials: &Credentials) -> Result<AuthResponse, ProviderError> {
            self.calls.lock().unwrap().push((mode, credentials.clone()));
            let outcome = self.outcomes.lock().unwrap().pop_front().unwrap_or(StubOutcome::Unreachable);
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await.unwrap();
            }
            match outcome {
                StubOutcome::Ok(resp) => Ok(resp),
                StubOutcome::Rejected(body) => Err(ProviderError::Rejected { status: 400, body }),
                StubOutcome::Unreachable => Err(ProviderError::Request("connection refused".into())),
            }
        }
    }

    #[async_trait::async_trait]
    impl IdentityProvider for StubProvider {
        async fn sign_up(&self, credentials: &Credentials) -> Result<AuthResponse, ProviderError> {
            self.answer(AuthMode::SignUp, credentials).await
        }

        async fn sign_in(&self, credentials: &Credentials) -> Result<AuthResponse, ProviderError> {
            self.answer(AuthMode::SignIn, credentials).await
        }
    }

    /// Navigator recording every requested route.
    pub struct RecordingNavigator {
        routes: watch::Sender<Vec<Route>>,
    }

    impl Default for RecordingNavigator {
        fn default() -> Self {
            Self { routes: watch::Sender::new(Vec::new()) }
        }
    }

    impl RecordingNavigator {
        #[must_use]
        pub fn routes(&self) -> Vec<Route> {
            self.routes.borrow().clone()
        }

        pub async fn wait_for(&self, route: Route) {
            let mut rx = self.routes.subscribe();
            tokio::time::timeout(WAIT, rx.wait_for(|routes| routes.contains(&route)))
                .await
                .expect("timed out waiting for navigation")
                .expect("navigator dropped");
        }
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, route: Route) {
            self.routes.send_modify(|routes| routes.push(route));
        }
    }

    /// Provider success body like the Identity Toolkit's.
    #[must_use]
    pub fn auth_response(token: &str, expires_in: u64) -> AuthResponse {
        serde_json::from_value(serde_json::json!({
            "idToken": token,
            "email": "a@b.com",
            "refreshToken": "r1",
            "expiresIn": expires_in.to_string(),
            "localId": "u1"
        }))
        .expect("valid auth response")
    }

    pub struct Harness {
        pub ctx: AuthContext,
        pub provider: Arc<StubProvider>,
        pub sessions: Arc<MemorySessionStore>,
        pub navigator: Arc<RecordingNavigator>,
    }

    #[must_use]
    pub fn harness(provider: StubProvider, sessions: MemorySessionStore) -> Harness {
        let provider = Arc::new(provider);
        let sessions = Arc::new(sessions);
        let navigator = Arc::new(RecordingNavigator::default());
        let ctx = AuthContext::start(provider.clone(), sessions.clone(), navigator.clone());
        Harness { ctx, provider, sessions, navigator }
    }

    /// Wait until the store publishes a state matching `pred`.
    pub async fn wait_for_state(store: &StoreHandle, pred: impl FnMut(&Arc<AuthState>) -> bool) -> Arc<AuthState> {
        let mut rx = store.subscribe();
        let state = tokio::time::timeout(WAIT, rx.wait_for(pred))
            .await
            .expect("timed out waiting for state")
            .expect("store stopped");
        state.clone()
    }

    /// Wait until `n` provider calls have been made.
    pub async fn wait_for_calls(provider: &StubProvider, n: usize) {
        tokio::time::timeout(WAIT, async {
            while provider.calls().len() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for provider calls");
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
