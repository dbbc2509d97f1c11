//! Route guard — gate protected destinations on user presence.
//!
//! The check reads one snapshot per navigation attempt; it does not hold a
//! subscription. A denied attempt redirects to the login route.

use std::sync::Arc;

use tracing::debug;

use crate::route::{Navigator, Route};
use crate::store::StoreHandle;

#[derive(Clone)]
pub struct RouteGuard {
    store: StoreHandle,
    navigator: Arc<dyn Navigator>,
}

impl RouteGuard {
    #[must_use]
    pub fn new(store: StoreHandle, navigator: Arc<dyn Navigator>) -> Self {
        Self { store, navigator }
    }

    /// Permit navigation to `target` iff a user is signed in. On denial the
    /// navigator is sent to the login route.
    pub fn can_activate(&self, target: &str) -> bool {
        let allowed = self.store.snapshot().is_authenticated();
        debug!(path = target, allowed, "guard: checked");
        if !allowed {
            self.navigator.navigate(Route::Login);
        }
        allowed
    }

    /// Send the user to the landing route if signed in, else to login.
    pub fn navigate_home(&self) -> Route {
        let route = if self.store.snapshot().is_authenticated() { Route::Landing } else { Route::Login };
        self.navigator.navigate(route);
        route
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
