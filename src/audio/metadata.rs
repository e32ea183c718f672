//! Audio file tag and property extraction using the `lofty` crate.
//!
//! The catalog only needs a handful of fields (title, artist, album and
//! duration), while diagnostics also look at the stream properties. Both
//! read through `TagReader`.

use std::path::Path;

use {
    lofty::{
        error::{ErrorKind::Io, LoftyError},
        file::FileType,
        prelude::{AudioFile, TaggedFileExt},
        probe::Probe,
        tag::Accessor,
    },
    serde::{Deserialize, Serialize},
    thiserror::Error,
};

/// Error type for metadata extraction operations.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// Failed to read or parse the audio file.
    #[error("Failed to read audio file: {0}")]
    ReadError(#[from] LoftyError),
    /// The container format could not be identified.
    #[error("Unsupported file format")]
    UnsupportedFormat,
}

/// Tags and stream properties of one audio file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackTags {
    /// Track title.
    pub title: Option<String>,
    /// Track artist.
    pub artist: Option<String>,
    /// Album name.
    pub album: Option<String>,
    /// Duration in milliseconds.
    pub duration_ms: u64,
    /// Overall bitrate in kbps, if reported.
    pub bitrate_kbps: Option<u32>,
    /// Sample rate in Hz, if reported.
    pub sample_rate: Option<u32>,
    /// Channel count, if reported.
    pub channels: Option<u8>,
    /// MIME type of the container, if known.
    pub mime_type: Option<String>,
}

/// Reads tags with `lofty`.
///
/// # Examples
///
/// ```no_run
/// use melodeck::audio::metadata::TagReader;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let tags = TagReader::read_tags("/path/to/song.flac")?;
///     println!("Title: {:?} ({} ms)", tags.title, tags.duration_ms);
///     Ok(())
/// }
/// ```
pub struct TagReader;

impl TagReader {
    /// Reads the primary tag and stream properties of an audio file.
    ///
    /// # Errors
    ///
    /// Returns `MetadataError` if the file cannot be opened, its format
    /// cannot be guessed, or its container is malformed.
    pub fn read_tags<P: AsRef<Path>>(path: P) -> Result<TrackTags, MetadataError> {
        let probe = Probe::open(path.as_ref())?
            .guess_file_type()
            .map_err(|e| LoftyError::new(Io(e)))?;
        let file_type = probe.file_type().ok_or(MetadataError::UnsupportedFormat)?;
        let tagged_file = probe.read()?;

        let tag = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag());
        let properties = tagged_file.properties();

        let non_empty = |value: Option<std::borrow::Cow<'_, str>>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(TrackTags {
            title: tag.and_then(|t| non_empty(t.title())),
            artist: tag.and_then(|t| non_empty(t.artist())),
            album: tag.and_then(|t| non_empty(t.album())),
            duration_ms: u64::try_from(properties.duration().as_millis()).unwrap_or(u64::MAX),
            bitrate_kbps: properties.overall_bitrate().or(properties.audio_bitrate()),
            sample_rate: properties.sample_rate(),
            channels: properties.channels(),
            mime_type: mime_for_file_type(file_type).map(str::to_string),
        })
    }
}

/// MIME type for a container detected by `lofty`.
#[must_use]
pub fn mime_for_file_type(file_type: FileType) -> Option<&'static str> {
    match file_type {
        FileType::Aac => Some("audio/aac"),
        FileType::Aiff => Some("audio/aiff"),
        FileType::Ape => Some("audio/ape"),
        FileType::Flac => Some("audio/flac"),
        FileType::Mpeg => Some("audio/mpeg"),
        FileType::Mp4 => Some("audio/mp4"),
        FileType::Mpc => Some("audio/musepack"),
        FileType::Opus => Some("audio/opus"),
        FileType::Vorbis | FileType::Speex => Some("audio/ogg"),
        FileType::Wav => Some("audio/wav"),
        FileType::WavPack => Some("audio/wavpack"),
        _ => None,
    }
}

/// MIME type guessed from a file extension, for files `lofty` cannot open.
#[must_use]
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "mp3" => Some("audio/mpeg"),
        "flac" => Some("audio/flac"),
        "wav" => Some("audio/wav"),
        "aac" => Some("audio/aac"),
        "ogg" => Some("audio/ogg"),
        "opus" => Some("audio/opus"),
        "m4a" | "mp4" => Some("audio/mp4"),
        "wma" => Some("audio/x-ms-wma"),
        "3gp" => Some("audio/3gpp"),
        "amr" => Some("audio/amr"),
        "awb" => Some("audio/amr-wb"),
        "wv" => Some("audio/wavpack"),
        "ape" => Some("audio/ape"),
        "dts" => Some("audio/vnd.dts"),
        "ac3" => Some("audio/ac3"),
        _ => None,
    }
}
