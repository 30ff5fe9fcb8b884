use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure of the persistence backend.
/// 儲存後端無法使用時的錯誤。
///
/// Every variant is a flavour of "storage unavailable": callers degrade the
/// triggering save/load and keep their in-memory state.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage quota exceeded: {required} bytes required, {limit} allowed")]
    QuotaExceeded { required: usize, limit: usize },
    #[error("storage IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("storage file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
