//! Client-local key/value persistence for CipherStudio.
//! CipherStudio 的本機鍵值儲存抽象層。

mod error;
mod file;
mod memory;
mod namespaced;

pub use error::StorageError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use namespaced::{Namespaced, DEFAULT_NAMESPACE};

/// String-keyed, string-valued store scoped to a single origin.
/// 以字串為鍵與值、限定於單一來源的儲存區。
///
/// Absence of a key is `Ok(None)`, never an error. Any `Err` means the backend
/// itself could not serve the request (disabled, over quota, unreadable).
/// Implementations are cheap handles: cloning one shares the backing data.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Returns `true` when `key` currently holds a value.
    fn contains(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }
}
