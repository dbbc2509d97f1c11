//! Intents — immutable messages describing auth events and requests.
//!
//! Every intent carries all data the reducer needs; none of them trigger I/O
//! on their own. Side effects are the effect pipeline's job.

use std::fmt;

use time::OffsetDateTime;

// =============================================================================
// CREDENTIALS
// =============================================================================

/// Which identity provider endpoint a credential submission targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    SignIn,
    SignUp,
}

impl AuthMode {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::SignIn => Self::SignUp,
            Self::SignUp => Self::SignIn,
        }
    }
}

/// Email/password pair submitted by the user.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into() }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// AUTHENTICATED PAYLOAD
// =============================================================================

/// Payload of a successful authentication, fresh or restored.
#[derive(Clone, PartialEq, Eq)]
pub struct Authenticated {
    pub email: String,
    pub user_id: String,
    pub token: String,
    pub expiration_date: OffsetDateTime,
    /// Navigate to the landing route once applied. `false` for auto-login.
    pub redirect: bool,
}

impl fmt::Debug for Authenticated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticated")
            .field("email", &self.email)
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .field("expiration_date", &self.expiration_date)
            .field("redirect", &self.redirect)
            .finish()
    }
}

// =============================================================================
// INTENT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SignInStart(Credentials),
    SignUpStart(Credentials),
    AuthenticateSuccess(Authenticated),
    AuthenticateFail(String),
    Logout,
    AutoLogin,
}

impl Intent {
    /// Build the start intent matching `mode`.
    #[must_use]
    pub fn start(mode: AuthMode, credentials: Credentials) -> Self {
        match mode {
            AuthMode::SignIn => Self::SignInStart(credentials),
            AuthMode::SignUp => Self::SignUpStart(credentials),
        }
    }

    /// Stable label used in log events.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SignInStart(_) => "auth:sign_in_start",
            Self::SignUpStart(_) => "auth:sign_up_start",
            Self::AuthenticateSuccess(_) => "auth:authenticate_success",
            Self::AuthenticateFail(_) => "auth:authenticate_fail",
            Self::Logout => "auth:logout",
            Self::AutoLogin => "auth:auto_login",
        }
    }
}

#[cfg(test)]
#[path = "intent_test.rs"]
mod tests;
