//! Auth transition function.
//!
//! `reduce` is pure and total: it never performs I/O and every intent maps to
//! a new state. The broadcaster replaces its snapshot with the result.

use crate::intent::Intent;
use crate::session::Session;

/// Complete snapshot of the authentication domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<Session>,
    pub loading: bool,
    pub auth_error: Option<String>,
}

impl AuthState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[must_use]
pub fn reduce(state: &AuthState, intent: &Intent) -> AuthState {
    match intent {
        Intent::SignInStart(_) | Intent::SignUpStart(_) => {
            AuthState { user: state.user.clone(), loading: true, auth_error: None }
        }
        Intent::AuthenticateSuccess(auth) => AuthState {
            user: Some(Session::new(
                auth.email.clone(),
                auth.user_id.clone(),
                Some(auth.token.clone()),
                auth.expiration_date,
            )),
            loading: false,
            auth_error: None,
        },
        Intent::AuthenticateFail(message) => {
            AuthState { user: None, loading: false, auth_error: Some(message.clone()) }
        }
        Intent::Logout => AuthState::default(),
        Intent::AutoLogin => state.clone(),
    }
}

#[cfg(test)]
#[path = "reducer_test.rs"]
mod tests;
