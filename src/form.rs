//! Credential form — local validation before any intent is dispatched.
//!
//! Invalid submissions never reach the store; `authError` stays reserved for
//! provider failures.

use crate::intent::{AuthMode, Credentials, Intent};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("email is required")]
    MissingEmail,
    #[error("email address is not valid")]
    InvalidEmail,
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
}

/// Sign-in / sign-up form state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthForm {
    mode: AuthMode,
}

impl Default for AuthForm {
    fn default() -> Self {
        Self { mode: AuthMode::SignIn }
    }
}

impl AuthForm {
    #[must_use]
    pub fn new(mode: AuthMode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
    }

    /// Validate the submission and build the matching start intent.
    ///
    /// # Errors
    ///
    /// Returns a [`FormError`] describing the first invalid field.
    pub fn submit(&self, email: &str, password: &str) -> Result<Intent, FormError> {
        let credentials = validate(email, password)?;
        Ok(Intent::start(self.mode, credentials))
    }
}

/// Check an email/password pair.
///
/// # Errors
///
/// Returns a [`FormError`] describing the first invalid field.
pub fn validate(email: &str, password: &str) -> Result<Credentials, FormError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(FormError::MissingEmail);
    }
    if !looks_like_email(email) {
        return Err(FormError::InvalidEmail);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(FormError::PasswordTooShort { min: MIN_PASSWORD_LEN });
    }
    Ok(Credentials::new(email, password))
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !email.contains(char::is_whitespace)
}

#[cfg(test)]
#[path = "form_test.rs"]
mod tests;
