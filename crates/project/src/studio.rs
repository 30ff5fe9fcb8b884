use cipherstudio_storage::KeyValueStore;
use thiserror::Error;
use tracing::{info, warn};

use crate::bridge::{EditEvent, EditOutcome, EditorBridge, PreviewRuntime, SyncAction};
use crate::path::{FilePath, PathError};
use crate::snapshot::{SnapshotError, SnapshotId, SnapshotManager};
use crate::store::{CreateOutcome, ProjectStore, RenameOutcome};

/// Failures surfaced to the user by save/load commands.
/// 儲存/載入指令回報給使用者的錯誤。
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Project not found")]
    ProjectNotFound {
        id: SnapshotId,
        #[source]
        source: SnapshotError,
    },
    #[error("project storage failed: {0}")]
    Storage(#[source] SnapshotError),
}

impl StudioError {
    fn from_snapshot(id: Option<&SnapshotId>, err: SnapshotError) -> Self {
        match id {
            Some(id) if err.is_not_found() => StudioError::ProjectNotFound {
                id: id.clone(),
                source: err,
            },
            _ => StudioError::Storage(err),
        }
    }
}

/// Owns one editing session: the project, its snapshots and the runtime link.
/// 管理單一編輯工作階段：專案、快照與執行環境連結。
///
/// Failed saves and loads never touch the in-memory project.
#[derive(Debug)]
pub struct Studio<S> {
    project: ProjectStore,
    snapshots: SnapshotManager<S>,
    bridge: EditorBridge,
    load_id: String,
}

impl<S: KeyValueStore> Studio<S> {
    /// Starts a session over `storage` with the seeded project.
    pub fn open(storage: S) -> Self {
        Self::with_snapshots(SnapshotManager::new(storage))
    }

    /// Starts a session with a preconfigured snapshot manager. The load-id
    /// field is prefilled from the last-used pointer but nothing is loaded.
    pub fn with_snapshots(snapshots: SnapshotManager<S>) -> Self {
        let load_id = match snapshots.load_last_used_id() {
            Ok(Some(id)) => id.as_str().to_string(),
            Ok(None) => String::new(),
            Err(err) => {
                warn!(%err, "could not read last used snapshot id");
                String::new()
            }
        };
        Self {
            project: ProjectStore::seeded(),
            snapshots,
            bridge: EditorBridge::new(),
            load_id,
        }
    }

    pub fn project(&self) -> &ProjectStore {
        &self.project
    }

    /// Current content of the load-id field.
    pub fn load_id(&self) -> &str {
        &self.load_id
    }

    pub fn set_load_id(&mut self, id: impl Into<String>) {
        self.load_id = id.into();
    }

    pub fn create_file(&mut self, name: &str) -> CreateOutcome {
        self.project.create_file(name)
    }

    pub fn delete_file(&mut self, path: &str) -> bool {
        self.project.delete_file(path)
    }

    pub fn select_file(&mut self, path: &str) -> Result<(), PathError> {
        let path = FilePath::parse(path)?;
        self.project.select_file(path);
        Ok(())
    }

    pub fn rename_file(&mut self, from: &str, new_name: &str) -> RenameOutcome {
        self.project.rename_file(from, new_name)
    }

    /// Feeds an editor change for the active file back into the project.
    pub fn edit_active(&mut self, content: impl Into<String>) -> EditOutcome {
        self.bridge.apply_edit(&mut self.project, EditEvent::new(content))
    }

    pub fn sync_runtime<R: PreviewRuntime + ?Sized>(&mut self, runtime: &mut R) -> SyncAction {
        self.bridge.sync(&self.project, runtime)
    }

    /// Saves the project as a new snapshot and puts its id in the load-id field.
    /// 將專案儲存為新快照並把識別碼填入載入欄位。
    pub fn save_project(&mut self) -> Result<SnapshotId, StudioError> {
        let id = self
            .snapshots
            .save(&self.project)
            .map_err(|err| StudioError::from_snapshot(None, err))?;
        self.load_id = id.as_str().to_string();
        Ok(id)
    }

    /// Replaces the project with snapshot `id`; on any failure nothing changes.
    /// 以指定快照取代目前專案；失敗時維持原狀。
    pub fn load_project(&mut self, id: &str) -> Result<(), StudioError> {
        let id = SnapshotId::new(id.trim());
        let loaded = self
            .snapshots
            .load(&id)
            .map_err(|err| StudioError::from_snapshot(Some(&id), err))?;
        self.project.replace(loaded.files, loaded.active);
        self.load_id = id.as_str().to_string();
        info!(id = %id, files = self.project.len(), "project replaced from snapshot");
        Ok(())
    }

    /// Loads whatever id is currently in the load-id field.
    pub fn load_from_field(&mut self) -> Result<(), StudioError> {
        let id = self.load_id.clone();
        self.load_project(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::RuntimeBundle;
    use cipherstudio_storage::MemoryStore;

    #[derive(Default)]
    struct CountingRuntime {
        reloads: Vec<RuntimeBundle>,
    }

    impl PreviewRuntime for CountingRuntime {
        fn reload(&mut self, bundle: &RuntimeBundle) {
            self.reloads.push(bundle.clone());
        }

        fn focus(&mut self, _active: Option<&FilePath>) {}
    }

    #[test]
    fn open_prefills_load_id_without_loading() {
        let store = MemoryStore::new();
        let mut first = Studio::open(store.clone());
        first.create_file("Saved");
        let id = first.save_project().unwrap();

        let second = Studio::open(store);
        assert_eq!(second.load_id(), id.as_str());
        assert!(!second.project().contains("/Saved.js"));
    }

    #[test]
    fn open_survives_unavailable_storage() {
        let store = MemoryStore::new();
        store.set_available(false);
        let studio = Studio::open(store);
        assert_eq!(studio.load_id(), "");
        assert_eq!(studio.project().len(), 2);
    }

    #[test]
    fn failed_load_keeps_project_and_field() {
        let mut studio = Studio::open(MemoryStore::new());
        studio.create_file("Draft");
        studio.set_load_id("typed-id");
        let before = studio.project().files().clone();

        let err = studio.load_project("missing").unwrap_err();
        assert!(matches!(err, StudioError::ProjectNotFound { .. }));
        assert_eq!(err.to_string(), "Project not found");
        assert_eq!(studio.project().files(), &before);
        assert_eq!(
            studio.project().active().map(FilePath::as_str),
            Some("/Draft.js")
        );
        assert_eq!(studio.load_id(), "typed-id");
    }

    #[test]
    fn storage_failure_is_not_reported_as_missing() {
        let store = MemoryStore::new();
        let mut studio = Studio::open(store.clone());
        store.set_available(false);
        assert!(matches!(
            studio.save_project(),
            Err(StudioError::Storage(_))
        ));
        assert!(matches!(
            studio.load_project("proj_1"),
            Err(StudioError::Storage(_))
        ));
        assert_eq!(studio.project().len(), 2);
    }

    #[test]
    fn load_from_field_uses_trimmed_id() {
        let mut studio = Studio::open(MemoryStore::new());
        let id = studio.save_project().unwrap();
        studio.delete_file("/index.js");
        studio.set_load_id(format!("  {id} "));
        studio.load_from_field().unwrap();
        assert!(studio.project().contains("/index.js"));
        assert_eq!(studio.load_id(), id.as_str());
    }

    #[test]
    fn successful_load_reloads_runtime_with_snapshot() {
        let mut studio = Studio::open(MemoryStore::new());
        studio.create_file("Kept");
        let id = studio.save_project().unwrap();
        studio.delete_file("/Kept.js");

        let mut runtime = CountingRuntime::default();
        assert_eq!(studio.sync_runtime(&mut runtime), SyncAction::Reloaded);
        assert_eq!(studio.sync_runtime(&mut runtime), SyncAction::Unchanged);

        studio.load_project(id.as_str()).unwrap();
        assert_eq!(studio.sync_runtime(&mut runtime), SyncAction::Reloaded);
        let bundle = runtime.reloads.last().unwrap();
        assert!(bundle.files.contains_key("/Kept.js"));
        assert_eq!(
            bundle.active.as_ref().map(FilePath::as_str),
            Some("/App.js")
        );
    }

    #[test]
    fn failed_load_does_not_reload_runtime() {
        let mut studio = Studio::open(MemoryStore::new());
        let mut runtime = CountingRuntime::default();
        studio.sync_runtime(&mut runtime);

        assert!(studio.load_project("proj_0").is_err());
        assert_eq!(studio.sync_runtime(&mut runtime), SyncAction::Unchanged);
        assert_eq!(runtime.reloads.len(), 1);
    }

    #[test]
    fn select_rejects_non_canonical_paths() {
        let mut studio = Studio::open(MemoryStore::new());
        assert!(studio.select_file("index").is_err());
        studio.select_file("/index.js").unwrap();
        assert_eq!(
            studio.project().active().map(FilePath::as_str),
            Some("/index.js")
        );
    }
}
