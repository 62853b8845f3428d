//! Application state store.
//!
//! This module provides the `Store`, the single writer for every entity the
//! app knows about:
//! - Blood requests and their mission progress
//! - Donor and admin profiles, and the active role
//! - Blood bank inventory
//! - Notifications, with automatic expiry
//! - The scripted system demo
//!
//! Views read through `Store::state()` and change things only through the
//! store's operations. Each committed mutation is reported to subscribed
//! `StoreObserver`s, which is how snapshots get written.

pub mod events;
pub mod manager;
pub mod state;

pub use events::{Completion, StoreEvent, StoreObserver, UpdateOutcome};
pub use manager::{Store, COMPLETION_REWARD_POINTS, NOTIFICATION_TTL_MS};
pub use state::AppState;
