//! Wire types of the metadata API.
//!
//! Every field tolerates absence and an explicit `null`; a response missing
//! the parts we need is treated as "no result" by the caller, never as a
//! decode error.

use serde::{Deserialize, Deserializer, Serialize};

/// Decodes `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Response of `GET search?keywords=&type=1&limit=`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    /// Result block, absent on errors.
    pub result: Option<SearchResult>,
    /// API status code.
    #[serde(deserialize_with = "null_as_default")]
    pub code: i64,
}

impl SearchResponse {
    /// Songs in the response, in ranking order.
    pub fn into_songs(self) -> Vec<RemoteSong> {
        self.result.map(|result| result.songs).unwrap_or_default()
    }
}

/// Search result block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    /// Matching songs.
    #[serde(deserialize_with = "null_as_default")]
    pub songs: Vec<RemoteSong>,
    /// More results are available.
    #[serde(rename = "hasMore")]
    pub has_more: Option<bool>,
    /// Total number of matches.
    #[serde(rename = "songCount")]
    pub song_count: Option<i64>,
}

/// One song from the search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSong {
    /// Remote id, used to fetch lyrics.
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,
    /// Song name.
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    /// Performing artists.
    #[serde(deserialize_with = "null_as_default")]
    pub artists: Vec<RemoteArtist>,
    /// Album the song belongs to.
    pub album: Option<RemoteAlbum>,
}

impl RemoteSong {
    /// `"<name> - <first artist>"`, with `Unknown` when there is no artist.
    pub fn display_name(&self) -> String {
        let artist = self
            .artists
            .first()
            .map_or("Unknown", |artist| artist.name.as_str());
        format!("{} - {}", self.name, artist)
    }

    /// Image URL used as artwork: the album artist's picture.
    pub fn artwork_url(&self) -> Option<&str> {
        self.album
            .as_ref()
            .and_then(|album| album.artist.as_ref())
            .and_then(|artist| artist.img_url.as_deref())
            .filter(|url| !url.trim().is_empty())
    }
}

/// An artist entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteArtist {
    /// Artist name.
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    /// Square picture URL.
    #[serde(rename = "img1v1Url")]
    pub img_url: Option<String>,
}

/// An album entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteAlbum {
    /// Album name.
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    /// Cover picture id.
    #[serde(rename = "picId", deserialize_with = "null_as_default")]
    pub pic_id: i64,
    /// Album artist.
    pub artist: Option<RemoteArtist>,
}

/// Response of `GET lyric?id=`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LyricResponse {
    /// Timed lyrics block.
    pub lrc: Option<LyricBody>,
}

impl LyricResponse {
    /// Lyric text, if present and not blank.
    pub fn into_text(self) -> Option<String> {
        self.lrc
            .and_then(|body| body.lyric)
            .filter(|text| !text.trim().is_empty())
    }
}

/// Lyric text block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LyricBody {
    /// LRC text.
    pub lyric: Option<String>,
}
