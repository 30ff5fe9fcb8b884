//! Project, snapshot and editor-bridge primitives for CipherStudio.
//! 管理 CipherStudio 專案檔案、快照與編輯器橋接的核心模組。

pub mod bridge;
pub mod path;
pub mod seed;
pub mod snapshot;
pub mod store;
pub mod studio;

pub use bridge::{EditEvent, EditOutcome, EditorBridge, PreviewRuntime, RuntimeBundle, SyncAction};
pub use path::{FilePath, PathError, SEPARATOR, SOURCE_EXTENSION};
pub use snapshot::{
    LoadedProject, SnapshotError, SnapshotId, SnapshotIdGenerator, SnapshotManager,
    DEFAULT_ID_PREFIX, LAST_PROJECT_KEY, SNAPSHOT_KEY_PREFIX,
};
pub use store::{CreateOutcome, FileMap, ProjectStore, RenameOutcome, SourceFile, UpdateOutcome};
pub use studio::{Studio, StudioError};
