pub mod preferences;
pub mod theme;

pub use preferences::{
    Preferences, PreferencesError, PreferencesStore, SnapshotPreferences, StoragePreferences,
};
pub use theme::{detect_system_theme, ParseThemeError, Theme, ThemeStore, THEME_KEY};
