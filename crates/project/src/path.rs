use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Path separator used by every project path.
pub const SEPARATOR: char = '/';

/// Extension carried by every source file (the only supported kind).
pub const SOURCE_EXTENSION: &str = ".js";

/// Reasons a file name cannot become a project path.
/// 檔名無法轉為專案路徑的原因。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("file name is empty")]
    Empty,
    #[error("file name contains an unsupported character: {0:?}")]
    InvalidCharacter(char),
    #[error("`{0}` is not a canonical project path")]
    NotCanonical(String),
}

/// Canonical path of a file inside a project, e.g. `/App.js`.
/// 專案內檔案的標準路徑，例如 `/App.js`。
///
/// Always exactly one leading separator, a non-empty stem, and the source
/// extension. Ordering is plain lexicographic order on the text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilePath(String);

impl FilePath {
    /// Turns a user-entered name (`App`, `App.js`, `/App.js`) into a path.
    /// 將使用者輸入的名稱正規化為標準路徑。
    pub fn normalize(name: &str) -> Result<Self, PathError> {
        let body = name.trim().trim_start_matches(SEPARATOR);
        let file_name = body.rsplit(SEPARATOR).next().unwrap_or_default();
        if file_name.is_empty() || file_name == SOURCE_EXTENSION {
            return Err(PathError::Empty);
        }
        if let Some(bad) = body.chars().find(|c| *c == '\\' || c.is_control()) {
            return Err(PathError::InvalidCharacter(bad));
        }
        let mut path = String::with_capacity(body.len() + SOURCE_EXTENSION.len() + 1);
        path.push(SEPARATOR);
        path.push_str(body);
        if !body.ends_with(SOURCE_EXTENSION) {
            path.push_str(SOURCE_EXTENSION);
        }
        Ok(Self(path))
    }

    /// Accepts only text that is already canonical.
    /// 僅接受已是標準格式的路徑字串。
    pub fn parse(text: &str) -> Result<Self, PathError> {
        match Self::normalize(text) {
            Ok(path) if path.0 == text => Ok(path),
            Ok(_) | Err(PathError::Empty) => Err(PathError::NotCanonical(text.to_string())),
            Err(err) => Err(err),
        }
    }

    /// For compile-time constants known to be canonical.
    pub(crate) fn from_static(text: &'static str) -> Self {
        debug_assert!(Self::parse(text).is_ok(), "{text} is not canonical");
        Self(text.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name without the leading separator, as shown in a file list.
    pub fn display_name(&self) -> &str {
        &self.0[SEPARATOR.len_utf8()..]
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FilePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for FilePath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FilePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FilePath> for String {
    fn from(path: FilePath) -> Self {
        path.0
    }
}
