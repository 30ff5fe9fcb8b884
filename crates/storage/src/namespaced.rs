use crate::{KeyValueStore, StorageError};

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "cipherstudio";

/// Scopes every key of an inner store under `<namespace>:`.
/// 將內部儲存區的所有鍵加上 `<namespace>:` 前綴。
#[derive(Debug, Clone)]
pub struct Namespaced<S> {
    namespace: String,
    inner: S,
}

impl<S: KeyValueStore> Namespaced<S> {
    pub fn new(namespace: impl Into<String>, inner: S) -> Self {
        Self {
            namespace: namespace.into(),
            inner,
        }
    }

    pub fn with_default_namespace(inner: S) -> Self {
        Self::new(DEFAULT_NAMESPACE, inner)
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}:{key}", self.namespace)
    }
}

impl<S: KeyValueStore> KeyValueStore for Namespaced<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(&self.scoped(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set(&self.scoped(key), value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(&self.scoped(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[test]
    fn keys_are_prefixed() {
        let backing = MemoryStore::new();
        let store = Namespaced::with_default_namespace(backing.clone());
        store.set("theme", "dark").unwrap();
        assert_eq!(backing.keys(), vec!["cipherstudio:theme".to_string()]);
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn namespaces_do_not_see_each_other() {
        let backing = MemoryStore::new();
        let left = Namespaced::new("left", backing.clone());
        let right = Namespaced::new("right", backing);
        left.set("theme", "dark").unwrap();
        assert_eq!(right.get("theme").unwrap(), None);
        right.remove("theme").unwrap();
        assert_eq!(left.get("theme").unwrap().as_deref(), Some("dark"));
    }
}
