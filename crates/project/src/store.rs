use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::path::{FilePath, PathError};
use crate::seed;

/// A single source file. Only the content is tracked.
/// 單一原始碼檔案，只記錄內容。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SourceFile {
    #[serde(alias = "code")]
    pub content: String,
}

impl SourceFile {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Path-ordered file mapping of a project.
pub type FileMap = BTreeMap<FilePath, SourceFile>;

/// Result of [`ProjectStore::create_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(FilePath),
    /// The path already existed; nothing was overwritten.
    Exists(FilePath),
    /// The name could not be normalized; nothing changed.
    Rejected(PathError),
}

impl CreateOutcome {
    pub fn path(&self) -> Option<&FilePath> {
        match self {
            CreateOutcome::Created(path) | CreateOutcome::Exists(path) => Some(path),
            CreateOutcome::Rejected(_) => None,
        }
    }
}

/// Result of [`ProjectStore::update_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Replaced,
    /// The path was unknown and has been added.
    Inserted,
}

/// Result of [`ProjectStore::rename_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed { from: FilePath, to: FilePath },
    SourceMissing,
    TargetExists(FilePath),
    Rejected(PathError),
}

/// Owns the canonical file map and the active-file pointer.
/// 管理專案檔案對應表與目前作用中的檔案指標。
///
/// After `create_file`, `delete_file`, `rename_file` and `replace`, the active
/// pointer names an existing file whenever the map is non-empty and is `None`
/// when it is empty. `select_file` and `update_file` do not re-validate it.
///
/// The revision counter changes whenever the set of paths changes, which is
/// what the editor bridge keys full runtime reloads on.
#[derive(Debug, Clone, Default)]
pub struct ProjectStore {
    files: FileMap,
    active: Option<FilePath>,
    revision: u64,
}

impl ProjectStore {
    /// Empty project with no active file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Project holding the entry component and its bootstrap, with the entry active.
    /// 建立含有入口元件與啟動檔的預設專案。
    pub fn seeded() -> Self {
        let entry = FilePath::from_static(seed::ENTRY_PATH);
        let bootstrap = FilePath::from_static(seed::BOOTSTRAP_PATH);
        let mut files = FileMap::new();
        files.insert(entry.clone(), SourceFile::new(seed::ENTRY_SOURCE));
        files.insert(bootstrap, SourceFile::new(seed::BOOTSTRAP_SOURCE));
        Self {
            files,
            active: Some(entry),
            revision: 0,
        }
    }

    pub fn files(&self) -> &FileMap {
        &self.files
    }

    pub fn file(&self, path: &str) -> Option<&SourceFile> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &FilePath> {
        self.files.keys()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Raw active pointer; may dangle after an unchecked `select_file`.
    pub fn active(&self) -> Option<&FilePath> {
        self.active.as_ref()
    }

    /// Active path and file, or `None` when nothing (existing) is selected.
    pub fn active_file(&self) -> Option<(&FilePath, &SourceFile)> {
        let path = self.active.as_ref()?;
        self.files.get_key_value(path.as_str())
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Path to content mapping, detached from the store.
    pub fn to_file_map(&self) -> BTreeMap<FilePath, String> {
        self.files
            .iter()
            .map(|(path, file)| (path.clone(), file.content.clone()))
            .collect()
    }

    /// Creates a file from a bare or qualified name and makes it active.
    /// 依名稱建立新檔案並設為作用中；已存在時不覆寫。
    pub fn create_file(&mut self, name: &str) -> CreateOutcome {
        let path = match FilePath::normalize(name) {
            Ok(path) => path,
            Err(err) => {
                debug!(name, %err, "ignoring create with invalid name");
                return CreateOutcome::Rejected(err);
            }
        };
        if self.files.contains_key(&path) {
            return CreateOutcome::Exists(path);
        }
        self.files.insert(path.clone(), SourceFile::new(seed::ENTRY_SOURCE));
        self.active = Some(path.clone());
        self.bump();
        debug!(path = %path, "created file");
        CreateOutcome::Created(path)
    }

    /// Removes a file. When it was active, the smallest remaining path takes over.
    /// 刪除檔案；若為作用中檔案，改以剩餘路徑中最小者接替。
    pub fn delete_file(&mut self, path: &str) -> bool {
        let Some((removed, _)) = self.files.remove_entry(path) else {
            return false;
        };
        if self.active.as_ref() == Some(&removed) {
            self.active = self.first_path();
        }
        self.bump();
        debug!(path = %removed, active = ?self.active, "deleted file");
        true
    }

    /// Replaces the content of `path`, inserting it when unknown.
    pub fn update_file(&mut self, path: &FilePath, content: impl Into<String>) -> UpdateOutcome {
        match self.files.get_mut(path) {
            Some(file) => {
                file.content = content.into();
                UpdateOutcome::Replaced
            }
            None => {
                self.files.insert(path.clone(), SourceFile::new(content));
                self.bump();
                debug!(path = %path, "update inserted unknown path");
                UpdateOutcome::Inserted
            }
        }
    }

    /// Points the active pointer at `path` without checking it exists.
    pub fn select_file(&mut self, path: FilePath) {
        self.active = Some(path);
    }

    /// Moves a file's content to a new name in one step.
    /// 將檔案內容移至新名稱；來源為作用中檔案時一併切換。
    pub fn rename_file(&mut self, from: &str, new_name: &str) -> RenameOutcome {
        let to = match FilePath::normalize(new_name) {
            Ok(path) => path,
            Err(err) => return RenameOutcome::Rejected(err),
        };
        if !self.files.contains_key(from) {
            return RenameOutcome::SourceMissing;
        }
        if self.files.contains_key(&to) {
            return RenameOutcome::TargetExists(to);
        }
        let Some((from, file)) = self.files.remove_entry(from) else {
            return RenameOutcome::SourceMissing;
        };
        self.files.insert(to.clone(), file);
        if self.active.as_ref() == Some(&from) {
            self.active = Some(to.clone());
        }
        self.bump();
        debug!(from = %from, to = %to, "renamed file");
        RenameOutcome::Renamed { from, to }
    }

    /// Replaces the whole project state. An active path that is not part of
    /// `files` falls back to the smallest path.
    pub fn replace(&mut self, files: FileMap, active: Option<FilePath>) {
        self.files = files;
        self.active = match active {
            Some(path) if self.files.contains_key(&path) => Some(path),
            _ => self.first_path(),
        };
        self.bump();
    }

    fn first_path(&self) -> Option<FilePath> {
        self.files.keys().next().cloned()
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
