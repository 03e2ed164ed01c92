//! Durable state persistence.

mod state;

pub use state::{StateError, StateStore, SyncState};
