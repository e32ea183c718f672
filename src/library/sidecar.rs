//! Sidecar file layout and lookup.
//!
//! Lyrics and artwork are companion files matched to a track by filename
//! stem. The app-private cache under the data directory wins over files
//! sitting next to the audio file.

use std::{
    collections::HashMap,
    fs::{create_dir_all, metadata, read_dir, read_to_string},
    io::Error as IoError,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::library::models::Track;

/// Extensions tried for artwork named after the track or its folder.
const ARTWORK_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Folder-level artwork names, in order of preference.
const FOLDER_ARTWORK_NAMES: &[&str] = &["cover", "folder", "album"];

/// Locations of the app-private sidecar caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarPaths {
    lyrics_dir: PathBuf,
    artwork_dir: PathBuf,
}

impl SidecarPaths {
    /// Lays the caches out under `data_dir` (`lyrics/` and `album_art/`).
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            lyrics_dir: data_dir.join("lyrics"),
            artwork_dir: data_dir.join("album_art"),
        }
    }

    /// Creates both cache directories.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error if a directory cannot be created.
    pub fn ensure_dirs(&self) -> Result<(), IoError> {
        create_dir_all(&self.lyrics_dir)?;
        create_dir_all(&self.artwork_dir)
    }

    /// Cached lyrics file for `track` (`lyrics/<stem>.lrc`).
    #[must_use]
    pub fn cached_lyrics_path(&self, track: &Track) -> PathBuf {
        self.lyrics_dir.join(format!("{}.lrc", track.file_stem()))
    }

    /// Cached artwork file for `track` (`album_art/<stem>.jpg`).
    #[must_use]
    pub fn cached_artwork_path(&self, track: &Track) -> PathBuf {
        self.artwork_dir.join(format!("{}.jpg", track.file_stem()))
    }

    /// Lyrics files to try, in lookup order.
    #[must_use]
    pub fn lyrics_search_paths(&self, track: &Track) -> Vec<PathBuf> {
        let audio_path = Path::new(&track.path);
        let stem = track.file_stem();
        let mut candidates = vec![
            self.cached_lyrics_path(track),
            audio_path.with_extension("lrc"),
            audio_path.with_extension("txt"),
        ];
        if let Some(dir) = audio_path.parent() {
            candidates.push(dir.join(format!("{stem}.lrc")));
            candidates.push(dir.join(format!("{stem}.txt")));
        }

        // Stem-based and extension-swapped names usually coincide.
        let mut paths = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !paths.contains(&candidate) {
                paths.push(candidate);
            }
        }
        paths
    }

    /// Reads the first lyrics file that exists, if any.
    #[must_use]
    pub fn read_lyrics(&self, track: &Track) -> Option<String> {
        self.lyrics_search_paths(track)
            .into_iter()
            .filter(|path| path.is_file())
            .find_map(|path| match read_to_string(&path) {
                Ok(text) => {
                    debug!("Using lyrics from {:?}", path);
                    Some(text)
                }
                Err(e) => {
                    debug!("Unreadable lyrics file {:?}: {}", path, e);
                    None
                }
            })
    }

    /// Finds artwork for `track`.
    ///
    /// Order: the app-private cache, the recorded artwork path, then
    /// `<stem>.*`, `cover.*`, `folder.*` and `album.*` next to the audio file.
    #[must_use]
    pub fn find_artwork(&self, track: &Track) -> Option<PathBuf> {
        let cached = self.cached_artwork_path(track);
        if is_valid_file(&cached) {
            return Some(cached);
        }

        if let Some(recorded) = track.artwork_path.as_deref().map(PathBuf::from)
            && is_valid_file(&recorded)
        {
            return Some(recorded);
        }

        let dir = Path::new(&track.path).parent()?;
        find_external_artwork(dir, &track.file_stem())
    }
}

/// A sidecar is usable only when it exists and is non-empty.
#[must_use]
pub fn is_valid_file(path: &Path) -> bool {
    metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}

/// Finds artwork next to an audio file.
///
/// Names are compared case-insensitively; `<stem>.*` beats folder-level art.
///
/// # Arguments
///
/// * `dir` - Directory holding the audio file.
/// * `stem` - File stem of the audio file.
pub fn find_external_artwork(dir: &Path, stem: &str) -> Option<PathBuf> {
    let entries = read_dir(dir).ok()?;
    let by_name: HashMap<String, PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_lowercase();
            Some((name, path))
        })
        .collect();

    std::iter::once(stem)
        .chain(FOLDER_ARTWORK_NAMES.iter().copied())
        .flat_map(|base| {
            ARTWORK_EXTENSIONS
                .iter()
                .map(move |ext| format!("{base}.{ext}").to_lowercase())
        })
        .find_map(|name| by_name.get(&name).filter(|path| is_valid_file(path)).cloned())
}
