use std::cell::Cell;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use cipherstudio_storage::{KeyValueStore, StorageError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::path::FilePath;
use crate::store::{FileMap, ProjectStore};

/// Storage key of the "last used snapshot" pointer.
pub const LAST_PROJECT_KEY: &str = "lastProject";

/// Prefix of the storage keys holding snapshots.
pub const SNAPSHOT_KEY_PREFIX: &str = "project:";

/// Prefix of generated snapshot ids.
pub const DEFAULT_ID_PREFIX: &str = "proj_";

/// Identifier of a saved snapshot, e.g. `proj_1718000000000`.
/// 快照識別碼。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(String);

impl SnapshotId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn storage_key(&self) -> String {
        format!("{SNAPSHOT_KEY_PREFIX}{}", self.0)
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised while saving or loading snapshots.
/// 儲存或載入快照時的錯誤。
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot {0} not found")]
    NotFound(SnapshotId),
    #[error("snapshot {id} is malformed: {source}")]
    Malformed {
        id: SnapshotId,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SnapshotError {
    /// Malformed snapshots count as missing: they are never partially applied.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SnapshotError::NotFound(_) | SnapshotError::Malformed { .. }
        )
    }
}

/// Decoded snapshot, ready to replace the current project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedProject {
    pub id: SnapshotId,
    pub files: FileMap,
    /// Smallest path of `files`, `None` when the snapshot is empty.
    pub active: Option<FilePath>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LastProjectPointer {
    id: String,
}

/// Produces ids that never repeat within a namespace.
/// 產生不重複的快照識別碼。
///
/// Ids are the wall clock in milliseconds, pushed forward past the last id
/// issued by this generator and past any id already present in storage.
pub struct SnapshotIdGenerator {
    prefix: String,
    clock: Box<dyn Fn() -> u64>,
    last: Cell<u64>,
}

impl SnapshotIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_clock(prefix, unix_time_ms)
    }

    pub fn with_clock(prefix: impl Into<String>, clock: impl Fn() -> u64 + 'static) -> Self {
        Self {
            prefix: prefix.into(),
            clock: Box::new(clock),
            last: Cell::new(0),
        }
    }

    fn next<S: KeyValueStore>(&self, storage: &S) -> Result<SnapshotId, StorageError> {
        let mut stamp = (self.clock)().max(self.last.get().saturating_add(1));
        loop {
            let id = SnapshotId(format!("{}{stamp}", self.prefix));
            if !storage.contains(&id.storage_key())? {
                self.last.set(stamp);
                return Ok(id);
            }
            stamp = stamp.saturating_add(1);
        }
    }
}

impl Default for SnapshotIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_PREFIX)
    }
}

impl fmt::Debug for SnapshotIdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotIdGenerator")
            .field("prefix", &self.prefix)
            .field("last", &self.last.get())
            .finish()
    }
}

/// Saves projects as independent snapshots and reads them back.
/// 將專案儲存為獨立快照並可再次載入。
#[derive(Debug)]
pub struct SnapshotManager<S> {
    storage: S,
    ids: SnapshotIdGenerator,
}

impl<S: KeyValueStore> SnapshotManager<S> {
    pub fn new(storage: S) -> Self {
        Self::with_generator(storage, SnapshotIdGenerator::default())
    }

    pub fn with_generator(storage: S, ids: SnapshotIdGenerator) -> Self {
        Self { storage, ids }
    }

    /// Writes the project's files under a fresh id and records it as last used.
    /// 以新的識別碼儲存專案檔案，並記錄為最近使用。
    ///
    /// The returned id is valid once the snapshot itself is stored; a failure
    /// to update the last-used pointer is only logged.
    pub fn save(&self, project: &ProjectStore) -> Result<SnapshotId, SnapshotError> {
        let payload = serde_json::to_string(project.files()).map_err(SnapshotError::Encode)?;
        let id = self.ids.next(&self.storage)?;
        self.storage.set(&id.storage_key(), &payload)?;
        info!(id = %id, files = project.len(), "saved snapshot");

        let pointer = LastProjectPointer {
            id: id.as_str().to_string(),
        };
        let pointer = serde_json::to_string(&pointer).map_err(SnapshotError::Encode)?;
        if let Err(err) = self.storage.set(LAST_PROJECT_KEY, &pointer) {
            warn!(id = %id, %err, "failed to record last used snapshot");
        }
        Ok(id)
    }

    /// Reads and decodes a snapshot. Nothing is modified.
    /// 讀取並解碼快照，不會修改任何狀態。
    pub fn load(&self, id: &SnapshotId) -> Result<LoadedProject, SnapshotError> {
        let Some(raw) = self.storage.get(&id.storage_key())? else {
            debug!(id = %id, "snapshot missing");
            return Err(SnapshotError::NotFound(id.clone()));
        };
        let files: FileMap =
            serde_json::from_str(&raw).map_err(|source| SnapshotError::Malformed {
                id: id.clone(),
                source,
            })?;
        let active = files.keys().next().cloned();
        info!(id = %id, files = files.len(), "loaded snapshot");
        Ok(LoadedProject {
            id: id.clone(),
            files,
            active,
        })
    }

    /// Id recorded by the last successful save, if it can be read.
    /// 讀取最近一次儲存的快照識別碼；不會自動載入。
    pub fn load_last_used_id(&self) -> Result<Option<SnapshotId>, SnapshotError> {
        let Some(raw) = self.storage.get(LAST_PROJECT_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<LastProjectPointer>(&raw) {
            Ok(pointer) if !pointer.id.trim().is_empty() => Ok(Some(SnapshotId(pointer.id))),
            Ok(_) => Ok(None),
            Err(err) => {
                warn!(%err, "ignoring unreadable last project pointer");
                Ok(None)
            }
        }
    }

    /// Removes a stored snapshot; returns whether it existed.
    /// The last-used pointer is left as is and may now dangle.
    pub fn delete(&self, id: &SnapshotId) -> Result<bool, SnapshotError> {
        let key = id.storage_key();
        if !self.storage.contains(&key)? {
            return Ok(false);
        }
        self.storage.remove(&key)?;
        info!(id = %id, "deleted snapshot");
        Ok(true)
    }
}

fn unix_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipherstudio_storage::MemoryStore;

    fn frozen_manager(store: MemoryStore) -> SnapshotManager<MemoryStore> {
        SnapshotManager::with_generator(
            store,
            SnapshotIdGenerator::with_clock(DEFAULT_ID_PREFIX, || 1_000),
        )
    }

    #[test]
    fn frozen_clock_still_yields_distinct_ids() {
        let manager = frozen_manager(MemoryStore::new());
        let project = ProjectStore::seeded();
        let first = manager.save(&project).unwrap();
        let second = manager.save(&project).unwrap();
        assert_eq!(first.as_str(), "proj_1000");
        assert_eq!(second.as_str(), "proj_1001");
    }

    #[test]
    fn ids_skip_snapshots_already_in_storage() {
        let store = MemoryStore::new();
        store.set("project:proj_1000", "{}").unwrap();
        store.set("project:proj_1001", "{}").unwrap();
        let manager = frozen_manager(store);
        let id = manager.save(&ProjectStore::seeded()).unwrap();
        assert_eq!(id.as_str(), "proj_1002");
    }

    #[test]
    fn payload_maps_paths_to_content_only() {
        let store = MemoryStore::new();
        let manager = frozen_manager(store.clone());
        let id = manager.save(&ProjectStore::seeded()).unwrap();
        let raw = store.get(&format!("project:{id}")).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 2);
        let entry = object["/App.js"].as_object().unwrap();
        assert_eq!(entry.keys().collect::<Vec<_>>(), vec!["content"]);
    }

    #[test]
    fn save_records_last_used_pointer() {
        let store = MemoryStore::new();
        let manager = frozen_manager(store.clone());
        assert_eq!(manager.load_last_used_id().unwrap(), None);
        let id = manager.save(&ProjectStore::seeded()).unwrap();
        assert_eq!(
            store.get(LAST_PROJECT_KEY).unwrap().as_deref(),
            Some(r#"{"id":"proj_1000"}"#)
        );
        assert_eq!(manager.load_last_used_id().unwrap(), Some(id));
    }

    #[test]
    fn unreadable_pointer_is_ignored() {
        let store = MemoryStore::new();
        store.set(LAST_PROJECT_KEY, "not json").unwrap();
        let manager = frozen_manager(store.clone());
        assert_eq!(manager.load_last_used_id().unwrap(), None);
        store.set(LAST_PROJECT_KEY, r#"{"id":""}"#).unwrap();
        assert_eq!(manager.load_last_used_id().unwrap(), None);
    }

    #[test]
    fn load_picks_smallest_path_as_active() {
        let manager = frozen_manager(MemoryStore::new());
        let mut project = ProjectStore::seeded();
        project.create_file("Zeta");
        project.select_file(FilePath::parse("/index.js").unwrap());
        let id = manager.save(&project).unwrap();
        let loaded = manager.load(&id).unwrap();
        assert_eq!(loaded.active.as_ref().map(FilePath::as_str), Some("/App.js"));
        assert_eq!(loaded.files, *project.files());
    }

    #[test]
    fn empty_snapshot_loads_without_active() {
        let manager = frozen_manager(MemoryStore::new());
        let id = manager.save(&ProjectStore::new()).unwrap();
        let loaded = manager.load(&id).unwrap();
        assert!(loaded.files.is_empty());
        assert_eq!(loaded.active, None);
    }

    #[test]
    fn malformed_payloads_count_as_not_found() {
        let store = MemoryStore::new();
        store.set("project:bad-json", "{").unwrap();
        store.set("project:bad-path", r#"{"App":{"content":""}}"#).unwrap();
        store.set("project:null", "null").unwrap();
        store
            .set("project:empty-name", r#"{"/dir/.js":{"content":""}}"#)
            .unwrap();
        let manager = frozen_manager(store);
        for id in ["bad-json", "bad-path", "null", "empty-name"] {
            let err = manager.load(&SnapshotId::new(id)).unwrap_err();
            assert!(matches!(err, SnapshotError::Malformed { .. }), "{id}");
            assert!(err.is_not_found());
        }
    }

    #[test]
    fn legacy_payloads_with_code_field_load() {
        let store = MemoryStore::new();
        store
            .set("project:proj_1", r#"{"/App.js":{"code":"legacy"}}"#)
            .unwrap();
        let manager = frozen_manager(store);
        let loaded = manager.load(&SnapshotId::new("proj_1")).unwrap();
        assert_eq!(loaded.files["/App.js"].content, "legacy");
    }

    #[test]
    fn delete_keeps_pointer() {
        let store = MemoryStore::new();
        let manager = frozen_manager(store);
        let id = manager.save(&ProjectStore::seeded()).unwrap();
        assert!(manager.delete(&id).unwrap());
        assert!(!manager.delete(&id).unwrap());
        assert!(manager.load(&id).unwrap_err().is_not_found());
        assert_eq!(manager.load_last_used_id().unwrap(), Some(id));
    }

    #[test]
    fn pointer_failure_does_not_fail_save() {
        // Room for the snapshot but not for the pointer.
        let project = ProjectStore::new();
        let store = MemoryStore::with_quota("project:proj_1000".len() + "{}".len());
        let manager = frozen_manager(store.clone());
        let id = manager.save(&project).unwrap();
        assert_eq!(store.get(LAST_PROJECT_KEY).unwrap(), None);
        assert!(manager.load(&id).is_ok());
    }

    #[test]
    fn unavailable_storage_fails_save() {
        let store = MemoryStore::new();
        store.set_available(false);
        let manager = frozen_manager(store);
        let err = manager.save(&ProjectStore::seeded()).unwrap_err();
        assert!(matches!(err, SnapshotError::Storage(_)));
        assert!(!err.is_not_found());
    }
}
