//! Snapshot persistence for the store.
//!
//! The whole `AppState` is written as one JSON document after every
//! mutation, and read back at startup. The file name carries the schema
//! version, so bumping `SCHEMA_VERSION` invalidates old snapshots instead of
//! migrating them.

pub mod snapshot;

pub use snapshot::{PersistOnChange, Snapshot, SnapshotStore, SCHEMA_VERSION, SNAPSHOT_NAME};
