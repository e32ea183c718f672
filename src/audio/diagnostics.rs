//! Diagnostics for files that failed to play.
//!
//! When the engine reports an error, the coordinator dumps an
//! `AudioFileInfo` to the log before moving on, so a broken file can be
//! told apart from a broken engine.

use std::{fs::File, path::Path};

use {
    serde::{Deserialize, Serialize},
    tracing::{Level, event},
};

use crate::audio::metadata::{TagReader, mime_for_extension};

/// Files smaller than this are flagged as possibly corrupted.
const SUSPICIOUS_SIZE_BYTES: u64 = 1024;

/// Bitrate above which a file is reported as high quality.
const HIGH_QUALITY_KBPS: u32 = 320;

/// Extensions treated as lossless.
const LOSSLESS_EXTENSIONS: [&str; 3] = ["flac", "wav", "ape"];

macro_rules! dump {
    ($level:expr, $info:expr) => {{
        let info = $info;
        event!(
            $level,
            path = %info.path,
            exists = info.exists,
            readable = info.readable,
            size = info.size,
            duration_ms = info.duration_ms,
            bitrate_kbps = info.bitrate_kbps,
            sample_rate = info.sample_rate,
            channels = info.channels,
            mime = info.mime_type.as_deref().unwrap_or("unknown"),
            lossless = info.is_lossless,
            high_quality = info.is_high_quality,
            "Audio file diagnostics"
        );
        for issue in &info.issues {
            event!($level, path = %info.path, "  issue: {issue}");
        }
    }};
}

/// Everything that can be learned about an audio file without playing it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFileInfo {
    /// Inspected path.
    pub path: String,
    /// The path exists.
    pub exists: bool,
    /// The file can be opened for reading.
    pub readable: bool,
    /// Size in bytes.
    pub size: u64,
    /// Duration in milliseconds, 0 if unknown.
    pub duration_ms: u64,
    /// Bitrate in kbps, 0 if unknown.
    pub bitrate_kbps: u32,
    /// Sample rate in Hz, 0 if unknown.
    pub sample_rate: u32,
    /// Channel count, 0 if unknown.
    pub channels: u8,
    /// MIME type, if known.
    pub mime_type: Option<String>,
    /// Lossless container by extension.
    pub is_lossless: bool,
    /// Bitrate above 320 kbps.
    pub is_high_quality: bool,
    /// Problems found, in the order they were detected.
    pub issues: Vec<String>,
}

impl AudioFileInfo {
    /// Whether no problems were found.
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }

    /// Writes the report to the log at `level`. Levels above `DEBUG` log as `WARN`.
    pub fn log(&self, level: Level) {
        if level == Level::TRACE || level == Level::DEBUG {
            dump!(Level::DEBUG, self);
        } else {
            dump!(Level::WARN, self);
        }
    }
}

/// Source of file diagnostics.
pub trait FileInspector: Send + Sync {
    /// Inspects the file at `path`. Never fails; problems land in `issues`.
    fn inspect(&self, path: &Path) -> AudioFileInfo;
}

/// Inspector backed by the filesystem and `lofty`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyInspector;

impl FileInspector for LoftyInspector {
    fn inspect(&self, path: &Path) -> AudioFileInfo {
        let mut info = AudioFileInfo {
            path: path.to_string_lossy().into_owned(),
            ..AudioFileInfo::default()
        };

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        info.is_lossless = LOSSLESS_EXTENSIONS.contains(&extension.as_str());

        let Ok(metadata) = path.metadata() else {
            info.issues.push("File does not exist".to_string());
            return info;
        };
        info.exists = true;
        info.size = metadata.len();

        info.readable = File::open(path).is_ok();
        if !info.readable {
            info.issues.push("File is not readable".to_string());
            return info;
        }
        if info.size == 0 {
            info.issues.push("File is empty".to_string());
            return info;
        }
        if info.size < SUSPICIOUS_SIZE_BYTES {
            info.issues
                .push(format!("File is only {} bytes, possibly corrupted", info.size));
        }

        match TagReader::read_tags(path) {
            Ok(tags) => {
                info.duration_ms = tags.duration_ms;
                info.bitrate_kbps = tags.bitrate_kbps.unwrap_or(0);
                info.sample_rate = tags.sample_rate.unwrap_or(0);
                info.channels = tags.channels.unwrap_or(0);
                info.mime_type = tags.mime_type;
            }
            Err(e) => info.issues.push(format!("Cannot read stream properties: {e}")),
        }

        if info.mime_type.is_none() {
            info.mime_type = mime_for_extension(&extension).map(str::to_string);
        }
        info.is_high_quality = info.bitrate_kbps > HIGH_QUALITY_KBPS;

        if info.duration_ms == 0 {
            info.issues.push("Duration is zero or unknown".to_string());
        }
        if info.bitrate_kbps == 0 {
            info.issues.push("Bitrate is zero or unknown".to_string());
        }
        if info.mime_type.is_none() {
            info.issues.push("Unknown MIME type".to_string());
        }
        info
    }
}
