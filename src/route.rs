//! Navigation targets and the navigate capability.

use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

/// Buffered navigation requests per listener before it starts lagging.
pub const NAVIGATION_CHANNEL_CAPACITY: usize = 16;

/// The two fixed destinations the auth core navigates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Authenticated landing page.
    Landing,
    /// Anonymous sign-in page.
    Login,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Landing => "/recipes",
            Self::Login => "/auth",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Router capability. Implementations must not block.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator for headless hosts: records nothing, only logs the request.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: Route) {
        info!(path = route.path(), "navigate");
    }
}

/// Forwards every request to another navigator, then republishes it to
/// listeners. Navigation is the last step of the login and logout effects, so
/// hosts use it to learn that those effects have finished.
pub struct TrackedNavigator {
    inner: Arc<dyn Navigator>,
    requests: broadcast::Sender<Route>,
}

impl TrackedNavigator {
    #[must_use]
    pub fn new(inner: Arc<dyn Navigator>) -> Self {
        let (requests, _) = broadcast::channel(NAVIGATION_CHANNEL_CAPACITY);
        Self { inner, requests }
    }

    /// Listen for requests made after this call.
    #[must_use]
    pub fn requests(&self) -> broadcast::Receiver<Route> {
        self.requests.subscribe()
    }
}

impl Navigator for TrackedNavigator {
    fn navigate(&self, route: Route) {
        self.inner.navigate(route);
        let _ = self.requests.send(route);
    }
}
