//! Blood Bridge core library.
//!
//! Client-side state for an emergency blood donation coordination demo: the
//! entity model, the application store with its timed notifications and
//! scripted demo, snapshot persistence, and configuration. Front ends own a
//! [`Store`], call its operations, and drive its timers with
//! [`Store::run_due`].

pub mod clock;
pub mod config;
pub mod demo;
pub mod error;
pub mod ids;
pub mod models;
pub mod persist;
pub mod scheduler;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::PersistError;
pub use persist::{PersistOnChange, SnapshotStore};
pub use store::{AppState, Store, StoreEvent, StoreObserver, UpdateOutcome};
