use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::PersistError;
use crate::store::{AppState, Store, StoreEvent, StoreObserver};

/// Base name of the snapshot file.
pub const SNAPSHOT_NAME: &str = "blood-bridge-persist";

/// Bump to discard snapshots written by an incompatible build.
pub const SCHEMA_VERSION: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub state: AppState,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    saved_at: DateTime<Utc>,
    state: &'a AppState,
}

/// Only the version is read first, so a snapshot from another schema is
/// discarded rather than reported as corrupt.
#[derive(Deserialize)]
struct SnapshotHeader {
    version: u32,
}

pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: PathBuf) -> Result<Self, PersistError> {
        std::fs::create_dir_all(&dir).map_err(|e| PersistError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> PathBuf {
        self.dir
            .join(format!("{}-v{}.json", SNAPSHOT_NAME, SCHEMA_VERSION))
    }

    pub fn load(&self) -> Result<Option<Snapshot>, PersistError> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path).map_err(|e| PersistError::io(&path, e))?;

        let header: SnapshotHeader =
            serde_json::from_str(&contents).map_err(|source| PersistError::Parse {
                path: path.clone(),
                source,
            })?;
        if header.version != SCHEMA_VERSION {
            debug!(
                found = header.version,
                expected = SCHEMA_VERSION,
                "Ignoring snapshot from another schema version"
            );
            return Ok(None);
        }

        let snapshot: Snapshot =
            serde_json::from_str(&contents).map_err(|source| PersistError::Parse { path, source })?;
        Ok(Some(snapshot))
    }

    /// Write the snapshot through a temp file so a crash never leaves a
    /// half-written document behind.
    pub fn save(&self, state: &AppState, saved_at: DateTime<Utc>) -> Result<(), PersistError> {
        let snapshot = SnapshotRef {
            version: SCHEMA_VERSION,
            saved_at,
            state,
        };
        let contents = serde_json::to_string_pretty(&snapshot)?;

        let path = self.path();
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).map_err(|e| PersistError::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| PersistError::io(&path, e))?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), PersistError> {
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| PersistError::io(&path, e))?;
        }
        Ok(())
    }

    /// Build a store from the saved snapshot, or from seed data when there is
    /// none or it cannot be read.
    pub fn restore(&self, clock: Arc<dyn Clock>) -> Store {
        match self.load() {
            Ok(Some(snapshot)) => {
                info!(
                    saved_at = %snapshot.saved_at,
                    requests = snapshot.state.requests.len(),
                    "Restored snapshot"
                );
                Store::from_state(clock, snapshot.state)
            }
            Ok(None) => {
                debug!("No snapshot found, starting from seed data");
                Store::new(clock)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load snapshot, starting from seed data");
                Store::new(clock)
            }
        }
    }
}

/// Observer that rewrites the snapshot after every mutation.
pub struct PersistOnChange {
    snapshots: SnapshotStore,
    clock: Arc<dyn Clock>,
}

impl PersistOnChange {
    pub fn new(snapshots: SnapshotStore, clock: Arc<dyn Clock>) -> Self {
        Self { snapshots, clock }
    }
}

impl StoreObserver for PersistOnChange {
    fn on_change(&mut self, event: &StoreEvent, state: &AppState) {
        if let Err(e) = self.snapshots.save(state, self.clock.now()) {
            warn!(error = %e, ?event, "Failed to persist snapshot");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use crate::clock::ManualClock;
    use crate::models::{BloodGroup, DonorRef, RequestStatus, Role, Severity};
    use chrono::TimeZone;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 2, 14, 8, 0, 0).unwrap()))
    }

    fn subscribed_store(dir: &Path, clock: Arc<ManualClock>) -> Store {
        let snapshots = SnapshotStore::new(dir.to_path_buf()).unwrap();
        let mut store = snapshots.restore(clock.clone());
        store.subscribe(PersistOnChange::new(
            SnapshotStore::new(dir.to_path_buf()).unwrap(),
            clock,
        ));
        store
    }

    #[test]
    fn test_missing_snapshot_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = SnapshotStore::new(dir.path().to_path_buf()).unwrap();
        assert!(snapshots.load().unwrap().is_none());
    }

    #[test]
    fn test_snapshot_file_name_is_versioned() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = SnapshotStore::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(
            snapshots.path().file_name().unwrap().to_str().unwrap(),
            "blood-bridge-persist-v3.json"
        );
    }

    #[test]
    fn test_every_mutation_reaches_disk() {
        let dir = tempfile::tempdir().unwrap();
        let clock = clock();
        let mut store = subscribed_store(dir.path(), clock.clone());

        store.set_role(Some(Role::Donor));
        store.update_request_status("1", RequestStatus::Completed, Some(DonorRef::id("Diana Ross")), None);
        store.add_notification("Donation logged", Severity::Success);

        let snapshot = SnapshotStore::new(dir.path().to_path_buf())
            .unwrap()
            .load()
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.version, SCHEMA_VERSION);
        assert_eq!(&snapshot.state, store.state());
        assert_eq!(snapshot.state.inventory.get(BloodGroup::OPositive), 112);
    }

    #[test]
    fn test_restart_resumes_from_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let clock = clock();
        {
            let mut store = subscribed_store(dir.path(), clock.clone());
            store.set_role(Some(Role::Admin));
            store.run_system_demo();
        }

        let store = subscribed_store(dir.path(), clock);
        assert_eq!(store.state().role, Some(Role::Admin));
        // The demo's timers died with the old process
        assert!(!store.is_demo_running());
        assert_eq!(store.state().notifications.len(), 1);
        assert_eq!(store.pending_timers(), 1);
    }

    #[test]
    fn test_other_schema_version_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = SnapshotStore::new(dir.path().to_path_buf()).unwrap();
        std::fs::write(snapshots.path(), r#"{"version": 2, "state": {"role": "donor"}}"#).unwrap();
        assert!(snapshots.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_snapshot_falls_back_to_seed() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = SnapshotStore::new(dir.path().to_path_buf()).unwrap();
        std::fs::write(snapshots.path(), "{ not json").unwrap();

        assert!(matches!(snapshots.load(), Err(PersistError::Parse { .. })));
        let store = snapshots.restore(clock());
        assert_eq!(store.state().requests.len(), 1);
    }

    #[test]
    fn test_partial_inventory_is_incompatible() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = SnapshotStore::new(dir.path().to_path_buf()).unwrap();
        let mut value = serde_json::to_value(Snapshot {
            version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            state: AppState::initial(Utc::now()),
        })
        .unwrap();
        value["state"]["inventory"]
            .as_object_mut()
            .unwrap()
            .remove("AB-");
        std::fs::write(snapshots.path(), value.to_string()).unwrap();

        assert!(snapshots.load().is_err());
    }

    #[test]
    fn test_clear_removes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = SnapshotStore::new(dir.path().to_path_buf()).unwrap();
        snapshots.save(&AppState::initial(Utc::now()), Utc::now()).unwrap();
        assert!(snapshots.path().exists());
        snapshots.clear().unwrap();
        assert!(!snapshots.path().exists());
        snapshots.clear().unwrap();
    }
}
