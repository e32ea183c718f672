//! Persisted key-value preferences.
//!
//! The player remembers its last session in a flat JSON object of string
//! values. Every typed value goes through [`PreferenceValue`], so a value
//! that fails to decode is reported as a `PreferenceError` rather than
//! crashing the load, and callers choose whether to fall back.

use std::{
    collections::BTreeMap,
    fs::{create_dir_all, read_to_string, write},
    io::Error as StdError,
    path::{Path, PathBuf},
};

use {
    parking_lot::RwLock,
    serde_json::{Error as SerdeJsonError, from_str, to_string_pretty},
    thiserror::Error,
    tracing::{debug, warn},
};

use crate::{
    audio::equalizer::{BAND_COUNT, NORMAL_PRESET},
    library::models::{PlayMode, SortOrder},
};

/// Preference keys.
pub mod keys {
    pub const LAST_SONG_ID: &str = "last_song_id";
    pub const LAST_SONG_PATH: &str = "last_song_path";
    pub const PLAY_MODE: &str = "play_mode";
    pub const SORT_ORDER: &str = "sort_order";
    pub const LAST_POSITION: &str = "last_position";
    pub const EQUALIZER_BANDS: &str = "equalizer_bands";
    pub const EQUALIZER_PRESET: &str = "equalizer_preset";
}

/// Error type for preference operations.
#[derive(Error, Debug)]
pub enum PreferenceError {
    /// Failed to read or write the preference file.
    #[error("IO error: {0}")]
    IoError(#[from] StdError),
    /// Failed to serialize the preference map.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] SerdeJsonError),
    /// A stored value could not be decoded into the expected type.
    #[error("Invalid value {value:?}, expected {expected}")]
    InvalidValue { value: String, expected: &'static str },
}

impl PreferenceError {
    /// Builds an `InvalidValue` error for a raw value.
    pub fn invalid(value: &str, expected: &'static str) -> Self {
        Self::InvalidValue {
            value: value.to_string(),
            expected,
        }
    }
}

/// A type that can be stored as a preference string.
pub trait PreferenceValue: Sized {
    /// Decodes a stored string.
    ///
    /// # Errors
    ///
    /// Returns `PreferenceError::InvalidValue` when `raw` is not a valid encoding.
    fn decode(raw: &str) -> Result<Self, PreferenceError>;

    /// Encodes the value for storage.
    fn encode(&self) -> String;
}

impl PreferenceValue for String {
    fn decode(raw: &str) -> Result<Self, PreferenceError> {
        Ok(raw.to_string())
    }

    fn encode(&self) -> String {
        self.clone()
    }
}

impl PreferenceValue for u64 {
    fn decode(raw: &str) -> Result<Self, PreferenceError> {
        raw.trim()
            .parse()
            .map_err(|_| PreferenceError::invalid(raw, "unsigned integer"))
    }

    fn encode(&self) -> String {
        self.to_string()
    }
}

impl PreferenceValue for PlayMode {
    fn decode(raw: &str) -> Result<Self, PreferenceError> {
        raw.parse()
            .map_err(|_| PreferenceError::invalid(raw, "play mode"))
    }

    fn encode(&self) -> String {
        self.to_string()
    }
}

impl PreferenceValue for SortOrder {
    fn decode(raw: &str) -> Result<Self, PreferenceError> {
        raw.parse()
            .map_err(|_| PreferenceError::invalid(raw, "sort order"))
    }

    fn encode(&self) -> String {
        self.to_string()
    }
}

/// Decodes an optional raw value.
///
/// # Errors
///
/// Returns the decode error of `T` when a value is present but malformed.
pub fn decode<T: PreferenceValue>(raw: Option<&str>) -> Result<Option<T>, PreferenceError> {
    raw.map(T::decode).transpose()
}

/// Decodes an optional raw value, substituting `default` when it is absent or malformed.
pub fn decode_or<T: PreferenceValue>(key: &str, raw: Option<&str>, default: T) -> T {
    match decode(raw) {
        Ok(Some(value)) => value,
        Ok(None) => default,
        Err(e) => {
            warn!(key = key, error = %e, "Malformed preference, using default");
            default
        }
    }
}

/// JSON-file backed key-value store, written through on every change.
#[derive(Debug)]
pub struct PreferenceStore {
    values: RwLock<BTreeMap<String, String>>,
    path: PathBuf,
}

impl PreferenceStore {
    /// Opens the store at `path`, creating parent directories.
    ///
    /// A file that exists but does not parse is discarded with a warning;
    /// the store then starts empty and every key falls back to its default.
    ///
    /// # Errors
    ///
    /// Returns `PreferenceError::IoError` if the directory or file cannot be read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PreferenceError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }

        let values = if path.exists() {
            let contents = read_to_string(&path)?;
            from_str(&contents).unwrap_or_else(|e| {
                warn!("Discarding unreadable preferences at {:?}: {}", path, e);
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            values: RwLock::new(values),
            path,
        })
    }

    /// Raw string stored under `key`.
    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    /// Typed value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `PreferenceError::InvalidValue` if the stored string is malformed.
    pub fn get<T: PreferenceValue>(&self, key: &str) -> Result<Option<T>, PreferenceError> {
        decode(self.get_raw(key).as_deref())
    }

    /// Typed value stored under `key`, or `default` when absent or malformed.
    pub fn get_or<T: PreferenceValue>(&self, key: &str, default: T) -> T {
        decode_or(key, self.get_raw(key).as_deref(), default)
    }

    /// Stores a single value.
    ///
    /// # Errors
    ///
    /// Returns `PreferenceError` if the file cannot be written.
    pub fn set<T: PreferenceValue>(&self, key: &str, value: &T) -> Result<(), PreferenceError> {
        self.set_many([(key, value.encode())])
    }

    /// Stores several values with a single write.
    ///
    /// # Errors
    ///
    /// Returns `PreferenceError` if the file cannot be written.
    pub fn set_many<'a, I>(&self, entries: I) -> Result<(), PreferenceError>
    where
        I: IntoIterator<Item = (&'a str, String)>,
    {
        {
            let mut values = self.values.write();
            for (key, value) in entries {
                values.insert(key.to_string(), value);
            }
        }
        self.flush()
    }

    /// Removes `key`.
    ///
    /// # Errors
    ///
    /// Returns `PreferenceError` if the file cannot be written.
    pub fn remove(&self, key: &str) -> Result<(), PreferenceError> {
        let removed = self.values.write().remove(key).is_some();
        if removed { self.flush() } else { Ok(()) }
    }

    fn flush(&self) -> Result<(), PreferenceError> {
        debug!("Writing preferences to {:?}", self.path);
        let contents = to_string_pretty(&*self.values.read())?;
        write(&self.path, contents)?;
        Ok(())
    }
}

/// Everything the player restores at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPreferences {
    /// Identifier of the last played track.
    pub last_track_id: Option<String>,
    /// Path of the last played track, used to find it again after a rescan.
    pub last_track_path: Option<String>,
    /// Transport mode.
    pub play_mode: PlayMode,
    /// Catalog ordering.
    pub sort_order: SortOrder,
    /// Last known playback position.
    pub last_position_ms: u64,
    /// Equalizer band gains in dB.
    pub equalizer_gains: [f32; BAND_COUNT],
    /// Equalizer preset name, or `Custom`.
    pub equalizer_preset: String,
}

impl Default for SessionPreferences {
    fn default() -> Self {
        Self {
            last_track_id: None,
            last_track_path: None,
            play_mode: PlayMode::default(),
            sort_order: SortOrder::default(),
            last_position_ms: 0,
            equalizer_gains: [0.0; BAND_COUNT],
            equalizer_preset: NORMAL_PRESET.to_string(),
        }
    }
}

impl SessionPreferences {
    /// Loads the session from `store`, substituting defaults for malformed values.
    pub fn load(store: &PreferenceStore) -> Self {
        let defaults = Self::default();
        Self {
            last_track_id: store.get_raw(keys::LAST_SONG_ID),
            last_track_path: store.get_raw(keys::LAST_SONG_PATH),
            play_mode: store.get_or(keys::PLAY_MODE, defaults.play_mode),
            sort_order: store.get_or(keys::SORT_ORDER, defaults.sort_order),
            last_position_ms: store.get_or(keys::LAST_POSITION, defaults.last_position_ms),
            equalizer_gains: store.get_or(keys::EQUALIZER_BANDS, defaults.equalizer_gains),
            equalizer_preset: store.get_or(keys::EQUALIZER_PRESET, defaults.equalizer_preset),
        }
    }
}
