//! # authflow
//!
//! Client-side session and authentication core: a single-owner store that
//! applies auth intents through a pure reducer, an effect pipeline that talks
//! to the identity provider, persists the session and arms the logout timer,
//! and a route guard that gates protected navigation on user presence.
//!
//! ```text
//! caller ──Intent──▶ store (reduce) ──snapshot──▶ subscribers / guard
//!                        │
//!                        └──applied intent──▶ effects ──follow-up Intent──▶ store
//! ```

pub mod config;
pub mod context;
pub mod form;
pub mod guard;
pub mod intent;
pub mod provider;
pub mod reducer;
pub mod route;
pub mod services;
pub mod session;
pub mod store;

pub use context::{AuthContext, AuthOutcome, SettleError};
pub use intent::{AuthMode, Credentials, Intent};
pub use reducer::AuthState;
pub use session::Session;
