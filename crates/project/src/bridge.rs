//! Boundary between the project store and the external editor/preview runtime.
//! 專案狀態與外部編輯/預覽執行環境之間的介面。
//!
//! The runtime receives the complete file set whenever the set of paths
//! changes and is rebuilt from scratch; it is never patched incrementally.
//! Edits flow back one event at a time and only for the active file.

use std::collections::BTreeMap;

use tracing::debug;

use crate::path::FilePath;
use crate::store::ProjectStore;

/// Everything a runtime needs to (re)initialise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeBundle {
    pub files: BTreeMap<FilePath, String>,
    /// `None` when nothing is selected or the selection dangles.
    pub active: Option<FilePath>,
}

impl RuntimeBundle {
    pub fn from_store(store: &ProjectStore) -> Self {
        Self {
            files: store.to_file_map(),
            active: store.active_file().map(|(path, _)| path.clone()),
        }
    }
}

/// External editing/preview runtime.
pub trait PreviewRuntime {
    /// Discards all runtime state and starts over from `bundle`.
    fn reload(&mut self, bundle: &RuntimeBundle);

    /// Moves the editor to another file of the current bundle.
    fn focus(&mut self, active: Option<&FilePath>);
}

/// Content edit reported by the runtime for the file it is showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditEvent {
    pub content: String,
}

impl EditEvent {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Reloaded,
    Refocused,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Applied(FilePath),
    /// No existing file is active; the edit has nowhere to go.
    Ignored,
}

/// Tracks what the runtime was last given.
/// 記錄上次提供給執行環境的狀態。
#[derive(Debug, Default)]
pub struct EditorBridge {
    supplied_revision: Option<u64>,
    supplied_active: Option<FilePath>,
}

impl EditorBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces the next [`EditorBridge::sync`] to reload the runtime.
    pub fn invalidate(&mut self) {
        self.supplied_revision = None;
    }

    /// Brings the runtime in line with the store.
    /// 依專案狀態同步執行環境：檔案集合改變時完整重新載入。
    pub fn sync<R: PreviewRuntime + ?Sized>(
        &mut self,
        store: &ProjectStore,
        runtime: &mut R,
    ) -> SyncAction {
        let active = store.active_file().map(|(path, _)| path.clone());
        if self.supplied_revision != Some(store.revision()) {
            let bundle = RuntimeBundle::from_store(store);
            debug!(
                revision = store.revision(),
                files = bundle.files.len(),
                "reloading preview runtime"
            );
            runtime.reload(&bundle);
            self.supplied_revision = Some(store.revision());
            self.supplied_active = active;
            return SyncAction::Reloaded;
        }
        if self.supplied_active != active {
            runtime.focus(active.as_ref());
            self.supplied_active = active;
            return SyncAction::Refocused;
        }
        SyncAction::Unchanged
    }

    /// Applies one runtime edit to the active file.
    /// 將執行環境回報的編輯套用至作用中檔案。
    pub fn apply_edit(&self, store: &mut ProjectStore, edit: EditEvent) -> EditOutcome {
        let Some((path, _)) = store.active_file() else {
            debug!("dropping edit without an active file");
            return EditOutcome::Ignored;
        };
        let path = path.clone();
        store.update_file(&path, edit.content);
        EditOutcome::Applied(path)
    }
}
