//! Side-effect services behind the auth store.
//!
//! ARCHITECTURE
//! ============
//! The store and reducer stay pure; everything that touches the network,
//! the disk, the clock or the router lives here and talks back to the store
//! only by dispatching intents.

pub mod effects;
pub mod persistence;
pub mod timer;
