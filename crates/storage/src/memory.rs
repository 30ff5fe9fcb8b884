use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::{KeyValueStore, StorageError};

#[derive(Debug, Default)]
struct MemoryState {
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
    unavailable: bool,
}

impl MemoryState {
    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(existing, _)| existing.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

/// In-memory store shared between clones.
/// 於複製之間共用資料的記憶體儲存區。
///
/// Used by tests and by sessions that should not touch disk. A byte quota and
/// an availability switch let callers exercise the degraded paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that rejects writes once keys plus values exceed `limit` bytes.
    /// 建立具位元組上限的儲存區，超過時拒絕寫入。
    pub fn with_quota(limit: usize) -> Self {
        let store = Self::default();
        store.inner.borrow_mut().quota = Some(limit);
        store
    }

    /// Toggles availability; while unavailable every call fails.
    /// 切換可用狀態；停用期間所有操作皆失敗。
    pub fn set_available(&self, available: bool) {
        self.inner.borrow_mut().unavailable = !available;
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    /// Keys currently stored, in lexicographic order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.borrow().entries.keys().cloned().collect()
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.inner.borrow().unavailable {
            return Err(StorageError::Unavailable("memory store disabled".into()));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_available()?;
        Ok(self.inner.borrow().entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_available()?;
        let mut state = self.inner.borrow_mut();
        if let Some(limit) = state.quota {
            let required = state.used_bytes_without(key) + key.len() + value.len();
            if required > limit {
                return Err(StorageError::QuotaExceeded { required, limit });
            }
        }
        state.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_available()?;
        self.inner.borrow_mut().entries.remove(key);
        Ok(())
    }
}
