//! Music catalog management.
//!
//! This module covers everything about which tracks exist: the SQLite
//! store, ingestion from a media index or a directory scan, and the
//! lyrics/artwork sidecar files that travel with each track.

pub mod database;
pub mod media_index;
pub mod models;
pub mod repository;
pub mod scanner;
pub mod schema;
pub mod sidecar;

pub use {
    database::LibraryDatabase,
    media_index::{DirectoryMediaIndex, MediaIndex, MediaIndexEntry},
    models::{PlayMode, SortOrder, Track},
    repository::{LibraryEvent, MusicRepository},
    scanner::{LibraryScanner, ScannerConfig},
    schema::{CURRENT_SCHEMA_VERSION, SchemaManager},
    sidecar::SidecarPaths,
};
