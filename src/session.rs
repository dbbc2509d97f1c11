//! Session — an authenticated identity snapshot.
//!
//! DESIGN
//! ======
//! A session is live iff it carries a token. Expiry is enforced by the logout
//! timer, never by reading `token_expiration` here, so a restored session whose
//! date has passed is still live until the timer fires.
//!
//! The serde shape is the durable storage schema:
//! `{ email, id, _token, _tokenExpirationDate }` with the date as RFC 3339.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    pub id: String,
    #[serde(rename = "_token", default)]
    pub token: Option<String>,
    #[serde(rename = "_tokenExpirationDate", with = "time::serde::rfc3339")]
    pub token_expiration: OffsetDateTime,
}

impl Session {
    #[must_use]
    pub fn new(
        email: impl Into<String>,
        id: impl Into<String>,
        token: Option<String>,
        token_expiration: OffsetDateTime,
    ) -> Self {
        Self { email: email.into(), id: id.into(), token, token_expiration }
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.token.is_some()
    }

    /// Time left until `token_expiration`, negative once it has passed.
    #[must_use]
    pub fn remaining(&self, now: OffsetDateTime) -> time::Duration {
        self.token_expiration - now
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
