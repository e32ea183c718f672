//! Configuration for library scanning behavior.

/// Extensions accepted by the directory scan (compared case-insensitively).
pub const SUPPORTED_AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "flac", "aac", "ogg", "m4a", "wma", "opus", "mp4", "3gp", "amr", "awb", "wv",
    "ape", "dts", "ac3",
];

/// Configuration for library scanning behavior.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// File extensions treated as audio.
    pub supported_extensions: Vec<String>,
    /// Artist recorded when a file has no artist tag.
    pub unknown_artist: String,
    /// Album recorded when a file has no album tag.
    pub unknown_album: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            supported_extensions: SUPPORTED_AUDIO_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
            unknown_artist: "Unknown Artist".to_string(),
            unknown_album: "Unknown Album".to_string(),
        }
    }
}
