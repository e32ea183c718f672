//! User settings and persisted playback preferences.
//!
//! Settings are read once at startup from the XDG config directory.
//! Preferences are the small key-value store the player writes while it runs.

pub mod preferences;
pub mod settings;

pub use {
    preferences::{PreferenceError, PreferenceStore, PreferenceValue, SessionPreferences},
    settings::{SettingsError, SettingsManager, UserSettings, get_config_path, get_data_dir},
};
