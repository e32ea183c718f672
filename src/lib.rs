//! Melodeck - local music player core
//!
//! Catalog ingestion and storage, a single-owner playback session with
//! play modes and session restore, time-synced lyrics, and online lyrics
//! and artwork enrichment backed by a local sidecar cache.

pub mod audio;
pub mod config;
pub mod error;
pub mod library;
pub mod lyrics;
pub mod online;
pub mod state;

// Re-export key types for convenience
pub use {
    audio::{
        ClockEngine, PlaybackCommand, PlaybackCoordinator, PlaybackEngine, PlaybackService,
        SessionSnapshot,
    },
    config::{PreferenceStore, SessionPreferences, SettingsManager, UserSettings},
    error::{EnrichmentError, LibraryError, PlaybackError},
    library::{LibraryDatabase, MusicRepository, PlayMode, SortOrder, Track},
    lyrics::{LyricLine, LyricTimeline, parse_lyrics},
    online::{MetadataClient, MetadataEnricher},
    state::{AppState, AppStateEvent, CatalogView},
};
