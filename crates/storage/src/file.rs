use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::{KeyValueStore, StorageError};

/// Persists the whole key/value namespace as a single JSON object on disk.
/// 以單一 JSON 物件檔案保存整個鍵值命名空間。
///
/// The file is read once at [`FileStore::open`]; every mutation rewrites it
/// atomically and only then updates the in-memory copy, so a failed write
/// leaves both untouched.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: Rc<RefCell<BTreeMap<String, String>>>,
    /// Set when the file could not be opened; every call then fails with it.
    fault: Option<String>,
}

impl FileStore {
    /// Opens the store at `path`. A missing file is an empty store.
    /// 開啟指定路徑的儲存檔；檔案不存在時視為空白。
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let entries: BTreeMap<String, String> = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|source| {
                StorageError::Corrupt {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        debug!(path = %path.display(), keys = entries.len(), "opened file store");
        Ok(Self {
            path,
            entries: Rc::new(RefCell::new(entries)),
            fault: None,
        })
    }

    /// A store for `path` that refuses every request with `reason`.
    /// 無法開啟儲存檔時使用：所有存取都回報無法使用，且不會改寫檔案。
    pub fn unavailable(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            entries: Rc::default(),
            fault: Some(reason.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_available(&self) -> Result<(), StorageError> {
        match &self.fault {
            Some(reason) => Err(StorageError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn commit(&self, next: BTreeMap<String, String>) -> Result<(), StorageError> {
        let payload = serde_json::to_vec_pretty(&next).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        write_atomic(&self.path, &payload).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })?;
        *self.entries.borrow_mut() = next;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_available()?;
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_available()?;
        let mut next = self.entries.borrow().clone();
        next.insert(key.to_string(), value.to_string());
        self.commit(next)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_available()?;
        if !self.entries.borrow().contains_key(key) {
            return Ok(());
        }
        let mut next = self.entries.borrow().clone();
        next.remove(key);
        self.commit(next)
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, data)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_opens_empty() {
        let tmp = tempdir().unwrap();
        let store = FileStore::open(tmp.path().join("nested").join("storage.json")).unwrap();
        assert_eq!(store.get("theme").unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn writes_survive_reopen() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("storage.json");
        {
            let store = FileStore::open(&path).unwrap();
            store.set("theme", "dark").unwrap();
            store.set("project:1", "{}").unwrap();
            store.remove("project:1").unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(store.get("project:1").unwrap(), None);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("storage.json");
        fs::write(&path, "not json").unwrap();
        let err = FileStore::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[test]
    fn unavailable_store_refuses_requests_and_leaves_file_alone() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("storage.json");
        fs::write(&path, "[1,2]").unwrap();
        let reason = FileStore::open(&path).unwrap_err().to_string();

        let store = FileStore::unavailable(&path, reason);
        assert!(matches!(store.get("theme"), Err(StorageError::Unavailable(_))));
        assert!(matches!(
            store.set("theme", "dark"),
            Err(StorageError::Unavailable(_))
        ));
        assert!(matches!(store.remove("theme"), Err(StorageError::Unavailable(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), "[1,2]");
    }

    #[test]
    fn failed_write_keeps_previous_entries() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("storage.json");
        let store = FileStore::open(&path).unwrap();
        store.set("theme", "light").unwrap();

        // A directory in place of the temp file makes the next write fail.
        fs::create_dir_all(path.with_extension("tmp")).unwrap();
        assert!(store.set("theme", "dark").is_err());
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("light"));
    }
}
