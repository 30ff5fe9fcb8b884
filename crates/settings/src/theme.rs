use std::env;
use std::fmt;
use std::str::FromStr;

use cipherstudio_storage::{KeyValueStore, StorageError};
use thiserror::Error;
use tracing::{debug, warn};

/// Storage key of the theme preference.
pub const THEME_KEY: &str = "theme";

/// Environment variable that overrides system appearance detection.
const COLOR_SCHEME_ENV: &str = "CIPHERSTUDIO_COLOR_SCHEME";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown theme `{0}` (expected `dark` or `light`)")]
pub struct ParseThemeError(String);

impl FromStr for Theme {
    type Err = ParseThemeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            _ => Err(ParseThemeError(value.to_string())),
        }
    }
}

/// 偵測系統外觀偏好。 / Best-effort detection of the system colour scheme.
///
/// `CIPHERSTUDIO_COLOR_SCHEME` wins when set; otherwise the terminal's
/// `COLORFGBG` background index is used (0-6 and 8 are dark backgrounds).
pub fn detect_system_theme() -> Option<Theme> {
    if let Ok(value) = env::var(COLOR_SCHEME_ENV) {
        if let Ok(theme) = value.parse() {
            return Some(theme);
        }
    }
    let colorfgbg = env::var("COLORFGBG").ok()?;
    theme_from_colorfgbg(&colorfgbg)
}

fn theme_from_colorfgbg(value: &str) -> Option<Theme> {
    let background: u8 = value.rsplit(';').next()?.trim().parse().ok()?;
    Some(match background {
        0..=6 | 8 => Theme::Dark,
        _ => Theme::Light,
    })
}

/// 主題偏好的持久化儲存。 / Persists the dark/light preference.
///
/// The in-memory theme is authoritative: when a write fails the new theme is
/// kept for the session and the error is handed back to the caller.
#[derive(Debug)]
pub struct ThemeStore<S> {
    storage: S,
    theme: Theme,
}

impl<S: KeyValueStore> ThemeStore<S> {
    /// 讀取已儲存的主題；缺少時採用系統偏好。 / Reads the stored theme, defaulting to `system`.
    ///
    /// Unreadable storage yields `Light`; an unknown stored value falls back
    /// to `system` like a missing one.
    pub fn load(storage: S, system: Option<Theme>) -> Self {
        let fallback = system.unwrap_or(Theme::Light);
        let theme = match storage.get(THEME_KEY) {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|err| {
                warn!(%err, "ignoring stored theme");
                fallback
            }),
            Ok(None) => fallback,
            Err(err) => {
                warn!(%err, "theme storage unavailable, using light theme");
                Theme::Light
            }
        };
        debug!(%theme, "theme resolved");
        Self { storage, theme }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// 切換深/淺色並儲存。 / Flips the theme and persists it.
    pub fn toggle(&mut self) -> Result<Theme, StorageError> {
        let next = self.theme.toggled();
        self.set(next)?;
        Ok(next)
    }

    /// 設定主題並儲存。 / Sets the theme and persists it.
    pub fn set(&mut self, theme: Theme) -> Result<(), StorageError> {
        self.theme = theme;
        self.storage.set(THEME_KEY, theme.as_str())
    }
}
