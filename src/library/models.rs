//! Data models for the music catalog.
//!
//! This module defines the `Track` row stored in the catalog table together
//! with the transport and ordering enums the rest of the player shares.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::Path,
    str::FromStr,
};

use {
    serde::{Deserialize, Serialize},
    sqlx::FromRow,
};

/// A single audio file with its catalog metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, Default)]
pub struct Track {
    /// Stable identifier (media index id or a hash of the path).
    pub id: String,
    /// Track title.
    pub title: String,
    /// Track artist.
    pub artist: String,
    /// Album name.
    pub album: String,
    /// Duration in milliseconds (0 when unknown).
    pub duration_ms: i64,
    /// File system path to the audio file.
    pub path: String,
    /// Time the file was added, in unix seconds.
    pub date_added: i64,
    /// File size in bytes.
    pub file_size: i64,
    /// Album identifier reported by the media index, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_id: Option<i64>,
    /// Cached artwork file, once one has been found or downloaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artwork_path: Option<String>,
}

impl Track {
    /// File name component of the path (everything after the last separator).
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.rsplit(['/', '\\']).next().unwrap_or(&self.path)
    }

    /// File name without its extension; the key for sidecar files.
    #[must_use]
    pub fn file_stem(&self) -> String {
        Path::new(self.file_name())
            .file_stem()
            .map_or_else(|| self.file_name().to_string(), |s| s.to_string_lossy().into_owned())
    }
}

/// Transport behaviour when advancing through the active list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayMode {
    /// Advance in list order, wrapping at the end.
    #[default]
    Sequential,
    /// Pick a random other entry on each advance.
    Shuffle,
    /// Replay the current track when it ends naturally.
    RepeatOne,
}

impl PlayMode {
    /// The mode a "cycle mode" control switches to next.
    #[must_use]
    pub fn cycled(self) -> Self {
        match self {
            Self::Sequential => Self::Shuffle,
            Self::Shuffle => Self::RepeatOne,
            Self::RepeatOne => Self::Sequential,
        }
    }
}

impl Display for PlayMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Sequential => "SEQUENTIAL",
            Self::Shuffle => "SHUFFLE",
            Self::RepeatOne => "REPEAT_ONE",
        })
    }
}

impl FromStr for PlayMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SEQUENTIAL" => Ok(Self::Sequential),
            "SHUFFLE" => Ok(Self::Shuffle),
            "REPEAT_ONE" => Ok(Self::RepeatOne),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Ordering applied to the catalog before it becomes the active list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Newest first.
    #[default]
    DateAdded,
    /// Title, ascending.
    Title,
    /// Artist, ascending.
    Artist,
    /// Longest first.
    Duration,
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::DateAdded => "DATE_ADDED",
            Self::Title => "TITLE",
            Self::Artist => "ARTIST",
            Self::Duration => "DURATION",
        })
    }
}

impl FromStr for SortOrder {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DATE_ADDED" => Ok(Self::DateAdded),
            "TITLE" => Ok(Self::Title),
            "ARTIST" => Ok(Self::Artist),
            "DURATION" => Ok(Self::Duration),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// A persisted enum spelling that matched no variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl Display for UnknownVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "unknown variant {:?}", self.0)
    }
}

impl std::error::Error for UnknownVariant {}
