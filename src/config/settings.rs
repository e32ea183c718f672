//! User settings with XDG Base Directory compliance.
//!
//! Settings cover the parts of the player a user configures rather than
//! the parts the player remembers on its own: library directories, the
//! metadata service endpoint, network timeouts and polling cadence.

use std::{
    env::var,
    fs::{create_dir_all, read_to_string, write},
    io::Error as StdError,
    path::PathBuf,
    time::Duration,
};

use {
    parking_lot::{RwLock, RwLockReadGuard},
    serde::{Deserialize, Serialize},
    serde_json::{Error as SerdeJsonError, from_str, to_string_pretty},
    thiserror::Error,
    tracing::debug,
};

/// Application directory name under the XDG roots.
const APP_DIR: &str = "melodeck";

/// Error type for settings operations.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Failed to read or write settings file.
    #[error("IO error: {0}")]
    IoError(#[from] StdError),
    /// Failed to serialize or deserialize settings.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] SerdeJsonError),
    /// Invalid settings value.
    #[error("Invalid settings value: {reason}")]
    InvalidValue { reason: String },
}

/// Serializable user settings structure with default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// Music library directories scanned at startup.
    pub library_directories: Vec<String>,
    /// Overrides the XDG data directory for the database, preferences and sidecars.
    pub data_directory: Option<String>,
    /// Base URL of the metadata search service.
    pub metadata_api_base_url: String,
    /// Timeout for metadata API requests, in seconds.
    pub http_timeout_secs: u64,
    /// Timeout for artwork downloads, in seconds.
    pub download_timeout_secs: u64,
    /// User agent sent with artwork downloads.
    pub download_user_agent: String,
    /// Number of results requested from a keyword search.
    pub search_limit: u32,
    /// Number of candidates offered when the user picks a match.
    pub candidate_count: usize,
    /// Position polling interval while playing, in milliseconds.
    pub position_poll_interval_ms: u64,
    /// How long a committed seek keeps showing the dragged position, in milliseconds.
    pub scrub_settle_ms: u64,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            library_directories: vec![],
            data_directory: None,
            metadata_api_base_url: "https://music-api.heheda.top/".to_string(),
            http_timeout_secs: 30,
            download_timeout_secs: 10,
            download_user_agent: "Mozilla/5.0 (Android)".to_string(),
            search_limit: 20,
            candidate_count: 5,
            position_poll_interval_ms: 2000,
            scrub_settle_ms: 500,
        }
    }
}

impl UserSettings {
    /// Validates values that would make the player misbehave.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.position_poll_interval_ms == 0 {
            return Err(SettingsError::InvalidValue {
                reason: "position_poll_interval_ms must be greater than zero".to_string(),
            });
        }
        if self.search_limit == 0 {
            return Err(SettingsError::InvalidValue {
                reason: "search_limit must be greater than zero".to_string(),
            });
        }
        if !self.metadata_api_base_url.ends_with('/') {
            return Err(SettingsError::InvalidValue {
                reason: "metadata_api_base_url must end with '/'".to_string(),
            });
        }
        Ok(())
    }

    /// Position polling interval as a `Duration`.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.position_poll_interval_ms)
    }

    /// Scrub settle window as a `Duration`.
    #[must_use]
    pub fn scrub_settle(&self) -> Duration {
        Duration::from_millis(self.scrub_settle_ms)
    }

    /// Resolves the data directory, honouring the override.
    #[must_use]
    pub fn resolve_data_dir(&self) -> PathBuf {
        self.data_directory
            .as_ref()
            .map_or_else(get_data_dir, PathBuf::from)
    }
}

/// Handles loading, saving, and validation of user settings.
#[derive(Debug)]
pub struct SettingsManager {
    /// Thread-safe user settings storage.
    settings: RwLock<UserSettings>,
    /// Path to the configuration file on disk.
    config_path: PathBuf,
}

impl SettingsManager {
    /// Creates a new settings manager with default config path.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if settings cannot be loaded from disk.
    pub fn new() -> Result<Self, SettingsError> {
        Self::with_config_path(get_config_path())
    }

    /// Creates a new settings manager with a custom config path.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Custom path for the settings file
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the file exists but cannot be parsed, or
    /// if it holds invalid values.
    pub fn with_config_path(config_path: PathBuf) -> Result<Self, SettingsError> {
        if let Some(parent) = config_path.parent() {
            create_dir_all(parent)?;
        }

        let settings: UserSettings = if config_path.exists() {
            debug!("Loading settings from existing file: {:?}", config_path);
            let contents = read_to_string(&config_path)?;
            from_str(&contents)?
        } else {
            debug!("Using default settings, no file at {:?}", config_path);
            UserSettings::default()
        };
        settings.validate()?;

        Ok(SettingsManager {
            settings: RwLock::new(settings),
            config_path,
        })
    }

    /// Gets the current settings.
    pub fn get_settings(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.settings.read()
    }

    /// Gets the configuration file path.
    pub fn get_config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Updates the settings and saves them to disk.
    ///
    /// # Arguments
    ///
    /// * `new_settings` - New settings to apply.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the settings are invalid or cannot be saved.
    pub fn update_settings(&self, new_settings: UserSettings) -> Result<(), SettingsError> {
        new_settings.validate()?;
        *self.settings.write() = new_settings;
        self.save_settings()
    }

    fn save_settings(&self) -> Result<(), SettingsError> {
        debug!("Saving settings to file: {:?}", self.config_path);
        let contents = to_string_pretty(&*self.settings.read())?;
        write(&self.config_path, contents)?;
        Ok(())
    }
}

/// Path of the settings file under the XDG config home.
#[must_use]
pub fn get_config_path() -> PathBuf {
    let mut config_dir = get_xdg_home("XDG_CONFIG_HOME", ".config");
    config_dir.push(APP_DIR);
    config_dir.push("settings.json");
    config_dir
}

/// Directory holding the database, preferences and sidecar caches.
#[must_use]
pub fn get_data_dir() -> PathBuf {
    let mut data_dir = get_xdg_home("XDG_DATA_HOME", ".local/share");
    data_dir.push(APP_DIR);
    data_dir
}

/// Resolves an XDG base directory from its variable, falling back to `$HOME/<fallback>`.
fn get_xdg_home(variable: &str, fallback: &str) -> PathBuf {
    if let Ok(home) = var(variable)
        && !home.is_empty()
    {
        return PathBuf::from(home);
    }

    if let Ok(home) = var("HOME") {
        let mut path = PathBuf::from(home);
        path.push(fallback);
        return path;
    }

    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use crate::config::settings::{SettingsError, SettingsManager, UserSettings};

    #[test]
    fn test_user_settings_default() {
        let settings = UserSettings::default();
        assert_eq!(settings.metadata_api_base_url, "https://music-api.heheda.top/");
        assert_eq!(settings.poll_interval(), Duration::from_secs(2));
        assert_eq!(settings.scrub_settle(), Duration::from_millis(500));
        assert_eq!(settings.download_user_agent, "Mozilla/5.0 (Android)");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_settings_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "library_directories": ["/music"] }"#).unwrap();

        let manager = SettingsManager::with_config_path(path).unwrap();
        let settings = manager.get_settings();
        assert_eq!(settings.library_directories, vec!["/music".to_string()]);
        assert_eq!(settings.search_limit, 20);
    }

    #[test]
    fn test_update_settings_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("settings.json");
        let manager = SettingsManager::with_config_path(path.clone()).unwrap();

        let mut updated = UserSettings::default();
        updated.data_directory = Some("/tmp/melodeck".to_string());
        manager.update_settings(updated.clone()).unwrap();

        let reloaded = SettingsManager::with_config_path(path).unwrap();
        assert_eq!(*reloaded.get_settings(), updated);
        assert_eq!(
            reloaded.get_settings().resolve_data_dir(),
            std::path::PathBuf::from("/tmp/melodeck")
        );
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let mut settings = UserSettings::default();
        settings.position_poll_interval_ms = 0;
        let error = settings.validate().unwrap_err();
        assert_eq!(
            error.to_string(),
            "Invalid settings value: position_poll_interval_ms must be greater than zero"
        );

        let mut settings = UserSettings::default();
        settings.metadata_api_base_url = "https://example.invalid".to_string();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidValue { .. })
        ));
    }
}
