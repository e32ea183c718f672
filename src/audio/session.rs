//! Playback session state.
//!
//! `SessionState` is owned by the coordinator and mutated only there.
//! Everyone else sees `SessionSnapshot` copies.

use serde::{Deserialize, Serialize};

use crate::library::models::{PlayMode, Track};

/// Read-only copy of the session handed to observers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Track loaded in the engine, if any.
    pub current_track: Option<Track>,
    /// Position of the current track in the active list, if it is in it.
    pub current_index: Option<usize>,
    /// Whether audio is playing.
    pub is_playing: bool,
    /// Last sampled position.
    pub position_ms: u64,
    /// Last sampled duration.
    pub duration_ms: u64,
    /// Transport mode.
    pub play_mode: PlayMode,
}

/// The single source of truth for what is playing.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    current_track: Option<Track>,
    current_index: Option<usize>,
    is_playing: bool,
    position_ms: u64,
    duration_ms: u64,
    play_mode: PlayMode,
    /// The current track is loaded in the engine and can resume in place.
    prepared: bool,
}

impl SessionState {
    /// Current track.
    pub fn current_track(&self) -> Option<&Track> {
        self.current_track.as_ref()
    }

    /// Index of the current track in the active list.
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Whether audio is playing.
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Last sampled position.
    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    /// Transport mode.
    pub fn play_mode(&self) -> PlayMode {
        self.play_mode
    }

    /// Whether the current track is loaded in the engine.
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub(crate) fn set_current(&mut self, track: Track, index: Option<usize>) {
        self.current_track = Some(track);
        self.current_index = index;
        self.position_ms = 0;
        self.duration_ms = 0;
        self.prepared = false;
    }

    pub(crate) fn clear_current(&mut self) {
        self.current_track = None;
        self.current_index = None;
        self.is_playing = false;
        self.position_ms = 0;
        self.duration_ms = 0;
        self.prepared = false;
    }

    pub(crate) fn set_prepared(&mut self, prepared: bool) {
        self.prepared = prepared;
    }

    pub(crate) fn set_playing(&mut self, playing: bool) {
        self.is_playing = playing;
    }

    pub(crate) fn set_play_mode(&mut self, mode: PlayMode) {
        self.play_mode = mode;
    }

    pub(crate) fn set_progress(&mut self, position_ms: u64, duration_ms: Option<u64>) {
        self.position_ms = position_ms;
        if let Some(duration) = duration_ms {
            self.duration_ms = duration;
        }
    }

    /// Re-resolves the current index against a new active list by track id.
    pub(crate) fn resolve_index(&mut self, playlist: &[Track]) -> Option<usize> {
        self.current_index = self
            .current_track
            .as_ref()
            .and_then(|current| playlist.iter().position(|t| t.id == current.id));
        self.current_index
    }

    /// Copy for observers.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_track: self.current_track.clone(),
            current_index: self.current_index,
            is_playing: self.is_playing,
            position_ms: self.position_ms,
            duration_ms: self.duration_ms,
            play_mode: self.play_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        audio::session::SessionState,
        library::models::{PlayMode, Track},
    };

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            ..Track::default()
        }
    }

    #[test]
    fn test_resolve_index_follows_the_track() {
        let mut session = SessionState::default();
        session.set_current(track("b"), Some(1));

        assert_eq!(session.resolve_index(&[track("c"), track("a"), track("b")]), Some(2));
        assert_eq!(session.resolve_index(&[track("a")]), None);
        assert_eq!(session.current_track().map(|t| t.id.as_str()), Some("b"));
    }

    #[test]
    fn test_snapshot_and_clear() {
        let mut session = SessionState::default();
        session.set_current(track("a"), Some(0));
        session.set_playing(true);
        session.set_progress(1500, Some(90_000));
        session.set_play_mode(PlayMode::Shuffle);

        let snapshot = session.snapshot();
        assert!(snapshot.is_playing);
        assert_eq!(snapshot.position_ms, 1500);
        assert_eq!(snapshot.duration_ms, 90_000);
        assert_eq!(snapshot.play_mode, PlayMode::Shuffle);

        session.clear_current();
        let cleared = session.snapshot();
        assert!(cleared.current_track.is_none());
        assert!(!cleared.is_playing);
        assert_eq!(cleared.play_mode, PlayMode::Shuffle);
    }
}
