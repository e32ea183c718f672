//! Filesystem ingestion of audio files.
//!
//! The scanner walks library directories, keeps files whose extension is
//! on the allow-list, and turns each one into a `Track` using embedded tags
//! with filename fallbacks.

use std::{
    fs::metadata,
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use {
    tokio::task::spawn_blocking,
    tracing::{debug, warn},
    walkdir::WalkDir,
};

use crate::{
    audio::metadata::TagReader,
    error::domain::LibraryError,
    library::models::Track,
};

mod config;

pub use config::{SUPPORTED_AUDIO_EXTENSIONS, ScannerConfig};

/// Directory scanner producing catalog tracks.
#[derive(Debug, Clone, Default)]
pub struct LibraryScanner {
    config: ScannerConfig,
}

impl LibraryScanner {
    /// Creates a scanner with the given configuration.
    #[must_use]
    pub fn new(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Gets the current scanner configuration.
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Whether `path` has an allow-listed audio extension.
    #[must_use]
    pub fn is_supported_audio_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.config
                    .supported_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }

    /// Recursively collects audio files from a directory and its subdirectories.
    ///
    /// Unreadable directories are skipped and directory symlinks are not
    /// followed. The result is sorted by path.
    ///
    /// # Arguments
    ///
    /// * `dir_path` - Path to the directory to scan.
    pub fn collect_audio_files_from_directory(&self, dir_path: &Path) -> Vec<PathBuf> {
        let mut audio_files: Vec<PathBuf> = WalkDir::new(dir_path)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry under {:?}: {}", dir_path, e);
                    None
                }
            })
            .map(|entry| entry.into_path())
            .filter(|path| path.is_file() && self.is_supported_audio_file(path))
            .collect();
        audio_files.sort();
        audio_files
    }

    /// Builds a catalog track for one file.
    ///
    /// Missing or unreadable tags fall back to the file stem for the title
    /// and to the configured placeholders for artist and album.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::IoError` if the file itself cannot be stat'ed.
    pub fn read_track(&self, path: &Path) -> Result<Track, LibraryError> {
        let file_metadata = metadata(path)?;
        let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let path_string = absolute.to_string_lossy().into_owned();

        let tags = TagReader::read_tags(&absolute).unwrap_or_else(|e| {
            debug!("No usable tags in {:?}: {}", absolute, e);
            Default::default()
        });

        let stem = absolute
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path_string.clone());

        let date_added = file_metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX));

        Ok(Track {
            id: track_id_for_path(&path_string),
            title: tags.title.unwrap_or(stem),
            artist: tags
                .artist
                .unwrap_or_else(|| self.config.unknown_artist.clone()),
            album: tags
                .album
                .unwrap_or_else(|| self.config.unknown_album.clone()),
            duration_ms: i64::try_from(tags.duration_ms).unwrap_or(i64::MAX),
            path: path_string,
            date_added,
            file_size: i64::try_from(file_metadata.len()).unwrap_or(i64::MAX),
            album_id: None,
            artwork_path: None,
        })
    }

    /// Scans `directories` on a blocking worker and returns the tracks found.
    ///
    /// Files that disappear mid-scan are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::InvalidData` if the blocking worker panicked.
    pub async fn scan_directories(&self, directories: Vec<PathBuf>) -> Result<Vec<Track>, LibraryError> {
        let scanner = self.clone();
        spawn_blocking(move || {
            let mut tracks = Vec::new();
            for dir in &directories {
                let files = scanner.collect_audio_files_from_directory(dir);
                debug!("Found {} audio files under {:?}", files.len(), dir);
                for file in files {
                    match scanner.read_track(&file) {
                        Ok(track) => tracks.push(track),
                        Err(e) => warn!("Skipping {:?}: {}", file, e),
                    }
                }
            }
            tracks
        })
        .await
        .map_err(|e| LibraryError::invalid_data(format!("scan worker failed: {e}")))
    }
}

/// Stable track identifier derived from the file path (64-bit FNV-1a, hex).
#[must_use]
pub fn track_id_for_path(path: &str) -> String {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let hash = path.bytes().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(PRIME)
    });
    format!("{hash:016x}")
}

#[cfg(test)]
mod tests {
    use std::{
        fs::{create_dir_all, write},
        path::Path,
    };

    use tempfile::TempDir;

    use crate::library::scanner::{LibraryScanner, ScannerConfig, track_id_for_path};

    #[test]
    fn test_scanner_config_default() {
        let config = ScannerConfig::default();
        assert_eq!(config.supported_extensions.len(), 16);
        assert_eq!(config.unknown_artist, "Unknown Artist");
        assert_eq!(config.unknown_album, "Unknown Album");
    }

    #[test]
    fn test_extension_allow_list_is_case_insensitive() {
        let scanner = LibraryScanner::default();
        assert!(scanner.is_supported_audio_file(Path::new("a/b/Song.FLAC")));
        assert!(scanner.is_supported_audio_file(Path::new("song.3gp")));
        assert!(!scanner.is_supported_audio_file(Path::new("cover.jpg")));
        assert!(!scanner.is_supported_audio_file(Path::new("README")));
    }

    #[test]
    fn test_collects_recursively_and_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_dir_all(root.join("b/deeper")).unwrap();
        write(root.join("b/deeper/z.mp3"), b"x").unwrap();
        write(root.join("a.ogg"), b"x").unwrap();
        write(root.join("b/notes.txt"), b"x").unwrap();

        let scanner = LibraryScanner::default();
        let files = scanner.collect_audio_files_from_directory(root);
        assert_eq!(files, vec![root.join("a.ogg"), root.join("b/deeper/z.mp3")]);

        assert!(
            scanner
                .collect_audio_files_from_directory(&root.join("missing"))
                .is_empty()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_symlink_loop_is_not_followed() {
        let temp_dir = TempDir::new().unwrap();
        let music = temp_dir.path().join("music");
        create_dir_all(&music).unwrap();
        write(music.join("a.mp3"), b"x").unwrap();
        std::os::unix::fs::symlink(&music, music.join("loop")).unwrap();

        let files = LibraryScanner::default().collect_audio_files_from_directory(&music);
        assert_eq!(files, vec![music.join("a.mp3")]);
    }

    #[test]
    fn test_untagged_file_uses_fallbacks() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Morning Walk.mp3");
        write(&path, vec![0u8; 2048]).unwrap();

        let track = LibraryScanner::default().read_track(&path).unwrap();
        assert_eq!(track.title, "Morning Walk");
        assert_eq!(track.artist, "Unknown Artist");
        assert_eq!(track.album, "Unknown Album");
        assert_eq!(track.duration_ms, 0);
        assert_eq!(track.file_size, 2048);
        assert_eq!(track.id, track_id_for_path(&track.path));
        assert!(track.date_added > 0);
    }

    #[test]
    fn test_track_id_is_stable() {
        assert_eq!(track_id_for_path(""), "cbf29ce484222325");
        assert_eq!(track_id_for_path("a"), "af63dc4c8601ec8c");
        assert_ne!(track_id_for_path("/m/a.mp3"), track_id_for_path("/m/b.mp3"));
    }

    #[tokio::test]
    async fn test_scan_directories_reads_every_file() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path().join("one.mp3"), b"x").unwrap();
        write(temp_dir.path().join("two.wav"), b"x").unwrap();

        let tracks = LibraryScanner::default()
            .scan_directories(vec![temp_dir.path().to_path_buf()])
            .await
            .unwrap();
        let titles: Vec<_> = tracks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["one", "two"]);
    }
}
