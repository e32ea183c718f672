//! Catalog repository.
//!
//! `MusicRepository` combines the track store, the directory scanner and
//! the sidecar layout behind one API and broadcasts a `LibraryEvent`
//! whenever the catalog changes, so views can reload.

use std::{
    io::ErrorKind::NotFound,
    path::{Path, PathBuf},
};

use {
    tokio::{
        fs::{create_dir_all, remove_file, write},
        sync::broadcast::{Receiver, Sender, channel},
        task::spawn_blocking,
    },
    tracing::{debug, info},
};

use crate::{
    error::domain::LibraryError,
    library::{
        database::LibraryDatabase,
        media_index::MediaIndex,
        models::Track,
        scanner::LibraryScanner,
        sidecar::SidecarPaths,
    },
};

/// Events emitted by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryEvent {
    /// Tracks were added, replaced or updated.
    CatalogChanged,
    /// A track and its files were deleted.
    TrackDeleted(String),
}

/// Store, scanner and sidecars behind one interface.
#[derive(Debug, Clone)]
pub struct MusicRepository {
    database: LibraryDatabase,
    scanner: LibraryScanner,
    sidecars: SidecarPaths,
    events: Sender<LibraryEvent>,
}

impl MusicRepository {
    /// Creates a repository.
    #[must_use]
    pub fn new(database: LibraryDatabase, scanner: LibraryScanner, sidecars: SidecarPaths) -> Self {
        let (events, _) = channel(16);
        Self {
            database,
            scanner,
            sidecars,
            events,
        }
    }

    /// Subscribes to catalog change events.
    pub fn subscribe(&self) -> Receiver<LibraryEvent> {
        self.events.subscribe()
    }

    /// Sidecar layout used by this repository.
    pub fn sidecars(&self) -> &SidecarPaths {
        &self.sidecars
    }

    fn notify(&self, event: LibraryEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// All tracks, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the store cannot be queried.
    pub async fn all_tracks(&self) -> Result<Vec<Track>, LibraryError> {
        self.database.get_all_tracks().await
    }

    /// Store-level substring search over title and artist.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the store cannot be queried.
    pub async fn search(&self, text: &str) -> Result<Vec<Track>, LibraryError> {
        self.database.search_tracks(text).await
    }

    /// Replaces the catalog with everything `index` reports.
    ///
    /// Returns the number of tracks now in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the index or the store fails; the previous
    /// catalog is kept in that case.
    pub async fn sync_from_index<I: MediaIndex>(&self, index: &I) -> Result<usize, LibraryError> {
        let tracks: Vec<Track> = index
            .query_audio()
            .await?
            .into_iter()
            .map(Track::from)
            .collect();
        self.database.replace_all_tracks(&tracks).await?;
        info!("Catalog synchronized from media index: {} tracks", tracks.len());
        self.notify(LibraryEvent::CatalogChanged);
        Ok(tracks.len())
    }

    /// Scans `directories` and adds what it finds, replacing rows for known paths.
    ///
    /// Returns the number of tracks imported.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the scan or the store fails.
    pub async fn import_directories(&self, directories: Vec<PathBuf>) -> Result<usize, LibraryError> {
        let tracks = self.scanner.scan_directories(directories).await?;
        if tracks.is_empty() {
            return Ok(0);
        }
        self.database.insert_tracks(&tracks).await?;
        info!("Imported {} tracks from directory scan", tracks.len());
        self.notify(LibraryEvent::CatalogChanged);
        Ok(tracks.len())
    }

    /// Deletes a track: its row, its audio file and its cached sidecars.
    ///
    /// Files that are already gone are not errors.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the row cannot be deleted or a file exists
    /// but cannot be removed.
    pub async fn delete_track(&self, track: &Track) -> Result<(), LibraryError> {
        self.database.delete_track(&track.id).await?;

        for path in [
            PathBuf::from(&track.path),
            self.sidecars.cached_lyrics_path(track),
            self.sidecars.cached_artwork_path(track),
        ] {
            remove_if_present(&path).await?;
        }

        info!("Deleted track {} ({})", track.id, track.path);
        self.notify(LibraryEvent::TrackDeleted(track.id.clone()));
        Ok(())
    }

    /// Lyrics text for `track` from the cache or an external sidecar.
    pub async fn load_lyrics(&self, track: &Track) -> Option<String> {
        let sidecars = self.sidecars.clone();
        let track = track.clone();
        spawn_blocking(move || sidecars.read_lyrics(&track))
            .await
            .ok()
            .flatten()
    }

    /// Writes lyrics into the app-private cache.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::IoError` if the file cannot be written.
    pub async fn save_lyrics(&self, track: &Track, text: &str) -> Result<PathBuf, LibraryError> {
        let path = self.sidecars.cached_lyrics_path(track);
        if let Some(parent) = path.parent() {
            create_dir_all(parent).await?;
        }
        write(&path, text).await?;
        debug!("Saved lyrics for {} to {:?}", track.id, path);
        Ok(path)
    }

    /// Best available artwork file for `track`.
    pub async fn find_artwork(&self, track: &Track) -> Option<PathBuf> {
        let sidecars = self.sidecars.clone();
        let track = track.clone();
        spawn_blocking(move || sidecars.find_artwork(&track))
            .await
            .ok()
            .flatten()
    }

    /// Records a downloaded artwork file on the track row.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the store update fails.
    pub async fn record_artwork(&self, track: &Track, artwork: &Path) -> Result<(), LibraryError> {
        self.database
            .update_artwork_path(&track.id, Some(&artwork.to_string_lossy()))
            .await?;
        self.notify(LibraryEvent::CatalogChanged);
        Ok(())
    }
}

async fn remove_if_present(path: &Path) -> Result<(), LibraryError> {
    match remove_file(path).await {
        Ok(()) => {
            debug!("Removed {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
