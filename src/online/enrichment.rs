//! Online lyrics and artwork enrichment with a local sidecar cache.
//!
//! Every lookup is cache-first. On a miss the enricher searches the
//! metadata service for `"<title> <artist>"`, takes the top result, and
//! writes what it finds into the app-private cache. Failures are logged
//! and come back as `None` or an empty list; a cached file is only ever
//! replaced by a complete new one.

use std::{
    future::Future,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::{
    error::{EnrichmentError, ErrorReporter},
    library::{models::Track, repository::MusicRepository},
    online::{inflight::InFlight, models::RemoteSong},
};

/// Remote source of search results, lyrics and files.
pub trait MetadataSource: Send + Sync {
    /// Keyword search, best match first.
    fn search(
        &self,
        keywords: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<RemoteSong>, EnrichmentError>> + Send;

    /// Lyrics of a search result, `None` if it has none.
    fn fetch_lyrics(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<String>, EnrichmentError>> + Send;

    /// Downloads `url` to `dest`, returning the byte count. `dest` is
    /// untouched unless the whole body arrived and was non-empty.
    fn download(
        &self,
        url: &str,
        dest: &Path,
    ) -> impl Future<Output = Result<u64, EnrichmentError>> + Send;
}

/// A match the user can pick from: display name and payload (lyrics text or image URL).
pub type Candidate = (String, String);

/// Lyrics and artwork lookups for catalog tracks.
pub struct MetadataEnricher<S: MetadataSource> {
    source: S,
    repository: MusicRepository,
    inflight: InFlight,
    search_limit: u32,
    candidate_count: usize,
}

fn search_keywords(track: &Track) -> String {
    format!("{} {}", track.title, track.artist)
}

impl<S: MetadataSource> MetadataEnricher<S> {
    /// Creates an enricher.
    ///
    /// # Arguments
    ///
    /// * `source` - Remote metadata source.
    /// * `repository` - Catalog and sidecar cache.
    /// * `search_limit` - Results requested per search.
    /// * `candidate_count` - Candidates offered for manual selection.
    pub fn new(
        source: S,
        repository: MusicRepository,
        search_limit: u32,
        candidate_count: usize,
    ) -> Self {
        Self {
            source,
            repository,
            inflight: InFlight::new(),
            search_limit,
            candidate_count,
        }
    }

    /// The remote source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Lyrics for `track`: the cached or external sidecar if there is one,
    /// otherwise the top search result's lyrics, which are then cached.
    pub async fn lyrics_for(&self, track: &Track) -> Option<String> {
        let _guard = self.inflight.acquire(&lyrics_key(track)).await;
        if let Some(text) = self.repository.load_lyrics(track).await {
            return Some(text);
        }

        let text = ErrorReporter::absorb(self.fetch_top_lyrics(track).await, "Fetching lyrics")?;
        ErrorReporter::absorb(
            self.repository.save_lyrics(track, &text).await,
            "Caching lyrics",
        );
        info!("Fetched lyrics for {} - {}", track.title, track.artist);
        Some(text)
    }

    async fn fetch_top_lyrics(&self, track: &Track) -> Result<String, EnrichmentError> {
        let top = self.top_result(track).await?;
        self.source
            .fetch_lyrics(top.id)
            .await?
            .ok_or_else(|| EnrichmentError::EmptyBody {
                url: format!("lyric?id={}", top.id),
            })
    }

    /// Up to `candidate_count` lyrics candidates. Results without lyrics
    /// are skipped; a failing lookup for one result does not drop the others.
    pub async fn lyrics_candidates(&self, track: &Track) -> Vec<Candidate> {
        let Some(songs) = ErrorReporter::absorb(self.search(track).await, "Searching lyrics")
        else {
            return Vec::new();
        };

        let mut candidates = Vec::new();
        for song in songs.into_iter().take(self.candidate_count) {
            let lyrics =
                ErrorReporter::absorb(self.source.fetch_lyrics(song.id).await, "Fetching lyrics");
            if let Some(text) = lyrics.flatten() {
                candidates.push((song.display_name(), text));
            }
        }
        debug!("{} lyrics candidates for {}", candidates.len(), track.id);
        candidates
    }

    /// Caches lyrics the user picked.
    pub async fn apply_lyrics(&self, track: &Track, text: &str) -> Option<PathBuf> {
        let _guard = self.inflight.acquire(&lyrics_key(track)).await;
        ErrorReporter::absorb(
            self.repository.save_lyrics(track, text).await,
            "Caching lyrics",
        )
    }

    /// Artwork for `track`: an existing file if there is one, otherwise the
    /// top search result's image, downloaded into the cache and recorded on
    /// the track.
    pub async fn artwork_for(&self, track: &Track) -> Option<PathBuf> {
        let _guard = self.inflight.acquire(&artwork_key(track)).await;
        if let Some(path) = self.repository.find_artwork(track).await {
            return Some(path);
        }

        ErrorReporter::absorb(self.fetch_top_artwork(track).await, "Fetching artwork")
    }

    async fn fetch_top_artwork(&self, track: &Track) -> Result<PathBuf, EnrichmentError> {
        let top = self.top_result(track).await?;
        let url = top
            .artwork_url()
            .ok_or_else(|| EnrichmentError::NoCandidates {
                keywords: search_keywords(track),
            })?;
        self.download_artwork(track, url).await
    }

    /// Up to `candidate_count` artwork candidates with an image URL.
    pub async fn artwork_candidates(&self, track: &Track) -> Vec<Candidate> {
        let Some(songs) = ErrorReporter::absorb(self.search(track).await, "Searching artwork")
        else {
            return Vec::new();
        };
        songs
            .iter()
            .take(self.candidate_count)
            .filter_map(|song| {
                song.artwork_url()
                    .map(|url| (song.display_name(), url.to_string()))
            })
            .collect()
    }

    /// Downloads the artwork the user picked.
    pub async fn apply_artwork(&self, track: &Track, url: &str) -> Option<PathBuf> {
        let _guard = self.inflight.acquire(&artwork_key(track)).await;
        ErrorReporter::absorb(
            self.download_artwork(track, url).await,
            "Downloading artwork",
        )
    }

    async fn download_artwork(&self, track: &Track, url: &str) -> Result<PathBuf, EnrichmentError> {
        let dest = self.repository.sidecars().cached_artwork_path(track);
        self.source.download(url, &dest).await?;
        self.repository.record_artwork(track, &dest).await?;
        info!("Saved artwork for {} to {:?}", track.id, dest);
        Ok(dest)
    }

    async fn search(&self, track: &Track) -> Result<Vec<RemoteSong>, EnrichmentError> {
        self.source
            .search(&search_keywords(track), self.search_limit)
            .await
    }

    async fn top_result(&self, track: &Track) -> Result<RemoteSong, EnrichmentError> {
        self.search(track)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EnrichmentError::NoCandidates {
                keywords: search_keywords(track),
            })
    }
}

fn lyrics_key(track: &Track) -> String {
    format!("lyrics:{}", track.file_stem())
}

fn artwork_key(track: &Track) -> String {
    format!("artwork:{}", track.file_stem())
}
