//! Device media index ingestion.
//!
//! A media index is whatever already knows about the audio files on the
//! machine. The catalog is repopulated from it wholesale. Hosts without a
//! platform index use [`DirectoryMediaIndex`], which is the directory scanner
//! behind the same interface.

use std::{future::Future, path::PathBuf};

use crate::{
    error::domain::LibraryError,
    library::{models::Track, scanner::LibraryScanner},
};

/// One audio file as reported by a media index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaIndexEntry {
    /// Index-assigned identifier.
    pub id: String,
    /// Title as indexed.
    pub title: String,
    /// Artist as indexed.
    pub artist: String,
    /// Album as indexed.
    pub album: String,
    /// Duration in milliseconds.
    pub duration_ms: i64,
    /// Absolute file path.
    pub path: String,
    /// Time the file was indexed, in unix seconds.
    pub date_added: i64,
    /// File size in bytes.
    pub size: i64,
    /// Album identifier, if the index groups albums.
    pub album_id: Option<i64>,
}

impl From<MediaIndexEntry> for Track {
    fn from(entry: MediaIndexEntry) -> Self {
        Self {
            id: entry.id,
            title: entry.title,
            artist: entry.artist,
            album: entry.album,
            duration_ms: entry.duration_ms,
            path: entry.path,
            date_added: entry.date_added,
            file_size: entry.size,
            album_id: entry.album_id,
            artwork_path: None,
        }
    }
}

impl From<Track> for MediaIndexEntry {
    fn from(track: Track) -> Self {
        Self {
            id: track.id,
            title: track.title,
            artist: track.artist,
            album: track.album,
            duration_ms: track.duration_ms,
            path: track.path,
            date_added: track.date_added,
            size: track.file_size,
            album_id: track.album_id,
        }
    }
}

/// Bulk source of device-known audio files.
pub trait MediaIndex {
    /// Reads every audio entry the index knows about.
    fn query_audio(&self) -> impl Future<Output = Result<Vec<MediaIndexEntry>, LibraryError>> + Send;
}

/// Media index backed by a recursive directory scan.
#[derive(Debug, Clone, Default)]
pub struct DirectoryMediaIndex {
    scanner: LibraryScanner,
    roots: Vec<PathBuf>,
}

impl DirectoryMediaIndex {
    /// Creates an index over `roots`.
    #[must_use]
    pub fn new(scanner: LibraryScanner, roots: Vec<PathBuf>) -> Self {
        Self { scanner, roots }
    }
}

impl MediaIndex for DirectoryMediaIndex {
    async fn query_audio(&self) -> Result<Vec<MediaIndexEntry>, LibraryError> {
        let tracks = self.scanner.scan_directories(self.roots.clone()).await?;
        Ok(tracks.into_iter().map(MediaIndexEntry::from).collect())
    }
}
