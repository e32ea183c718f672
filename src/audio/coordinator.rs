//! Playback session coordinator.
//!
//! `PlaybackCoordinator` owns the session state and the engine. It is driven
//! by one task (see [`crate::audio::service`]) so transport commands, engine
//! events and playlist updates are applied strictly one after another.
//! Every change is published to [`AppState`].

use std::{
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use {
    rand::rngs::StdRng,
    tracing::{Level, debug, enabled, info, warn},
};

use crate::{
    audio::{
        diagnostics::FileInspector,
        engine::{EngineEvent, PlaybackEngine},
        equalizer::EqualizerState,
        navigation::{EndOfTrack, next_index, on_track_ended, previous_index},
        scrub::SeekScrubber,
        session::SessionState,
    },
    config::preferences::{PreferenceStore, PreferenceValue, SessionPreferences, keys},
    error::{ErrorReporter, PlaybackError},
    library::models::{PlayMode, Track},
    state::{AppState, PositionState},
};

/// Collaborators a coordinator is built from.
pub struct CoordinatorParts<E> {
    /// Decode/output engine.
    pub engine: E,
    /// Persisted key-value store.
    pub preferences: Arc<PreferenceStore>,
    /// Observable state the coordinator publishes to.
    pub app_state: Arc<AppState>,
    /// Diagnostics source for failed files.
    pub inspector: Arc<dyn FileInspector>,
    /// Randomness for shuffle.
    pub rng: StdRng,
    /// How long the seek bar keeps the committed drag position.
    pub scrub_settle: Duration,
}

/// Single owner of the playback session.
pub struct PlaybackCoordinator<E: PlaybackEngine> {
    engine: E,
    session: SessionState,
    playlist: Arc<Vec<Track>>,
    preferences: Arc<PreferenceStore>,
    app_state: Arc<AppState>,
    inspector: Arc<dyn FileInspector>,
    equalizer: EqualizerState,
    scrubber: SeekScrubber,
    rng: StdRng,
}

impl<E: PlaybackEngine> PlaybackCoordinator<E> {
    /// Creates an idle coordinator with an empty playlist.
    pub fn new(parts: CoordinatorParts<E>) -> Self {
        Self {
            engine: parts.engine,
            session: SessionState::default(),
            playlist: Arc::new(Vec::new()),
            preferences: parts.preferences,
            app_state: parts.app_state,
            inspector: parts.inspector,
            equalizer: EqualizerState::default(),
            scrubber: SeekScrubber::new(parts.scrub_settle),
            rng: parts.rng,
        }
    }

    /// The engine being driven.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Current session.
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Active ordered list.
    pub fn playlist(&self) -> &[Track] {
        &self.playlist
    }

    /// Current equalizer settings.
    pub fn equalizer(&self) -> &EqualizerState {
        &self.equalizer
    }

    /// Starts `track`. Does nothing unless the track is in the active list.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::NotInPlaylist` if the track is not in the
    /// active list, or `PlaybackError::EngineError` if it cannot be loaded.
    pub fn play(&mut self, track: &Track) -> Result<(), PlaybackError> {
        let index = self
            .playlist
            .iter()
            .position(|entry| entry.id == track.id)
            .ok_or_else(|| PlaybackError::NotInPlaylist {
                id: track.id.clone(),
            })?;
        self.start_at(index)
    }

    /// Pauses when playing, otherwise resumes or starts something.
    ///
    /// With nothing loaded the current track is started, and with no current
    /// track the first entry of the list.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::EmptyPlaylist` if there is nothing to start.
    pub fn toggle_play_pause(&mut self) -> Result<(), PlaybackError> {
        if self.session.is_playing() {
            self.pause();
            return Ok(());
        }
        self.continue_last_playback()
    }

    /// Moves to the next entry according to the play mode.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::EmptyPlaylist` on an empty list, or the
    /// engine error if the next track cannot be loaded.
    pub fn skip_next(&mut self) -> Result<(), PlaybackError> {
        let index = next_index(
            self.session.play_mode(),
            self.session.current_index(),
            self.playlist.len(),
            &mut self.rng,
        )
        .ok_or(PlaybackError::EmptyPlaylist)?;
        self.start_at(index)
    }

    /// Moves to the previous entry according to the play mode.
    ///
    /// # Errors
    ///
    /// Same as [`PlaybackCoordinator::skip_next`].
    pub fn skip_previous(&mut self) -> Result<(), PlaybackError> {
        let index = previous_index(
            self.session.play_mode(),
            self.session.current_index(),
            self.playlist.len(),
            &mut self.rng,
        )
        .ok_or(PlaybackError::EmptyPlaylist)?;
        self.start_at(index)
    }

    /// Moves the playhead of the loaded track.
    ///
    /// # Errors
    ///
    /// Returns the engine error if nothing is loaded.
    pub fn seek(&mut self, position_ms: u64) -> Result<(), PlaybackError> {
        self.engine.seek(position_ms)?;
        self.session
            .set_progress(self.engine.position_ms(), self.engine.duration_ms());
        self.publish_position(Instant::now());
        Ok(())
    }

    /// Applies an engine callback.
    ///
    /// # Errors
    ///
    /// Returns an error if the follow-up transport action fails.
    pub fn handle_event(&mut self, event: EngineEvent) -> Result<(), PlaybackError> {
        match event {
            EngineEvent::Ended => self.on_ended(),
            EngineEvent::Failed { message } => self.on_failed(&message),
            EngineEvent::PlayingChanged(playing) => {
                if playing != self.session.is_playing() {
                    self.session.set_playing(playing);
                    if !playing {
                        self.persist_position();
                    }
                    self.publish();
                }
                Ok(())
            }
        }
    }

    fn on_ended(&mut self) -> Result<(), PlaybackError> {
        let decision = on_track_ended(
            self.session.play_mode(),
            self.session.current_index(),
            self.playlist.len(),
            &mut self.rng,
        );
        debug!("Track ended: {decision:?}");
        match decision {
            EndOfTrack::Advance(index) => self.start_at(index),
            EndOfTrack::Restart => {
                self.engine.seek(0)?;
                self.engine.play()?;
                self.session.set_progress(0, self.engine.duration_ms());
                self.session.set_playing(true);
                self.publish();
                Ok(())
            }
            EndOfTrack::Idle => {
                self.engine.pause();
                self.session.set_playing(false);
                self.publish();
                Ok(())
            }
        }
    }

    fn on_failed(&mut self, message: &str) -> Result<(), PlaybackError> {
        match self.session.current_track() {
            Some(track) => {
                warn!(path = %track.path, "Playback failed: {message}");
                self.inspector.inspect(Path::new(&track.path)).log(Level::WARN);
            }
            None => warn!("Playback failed with no current track: {message}"),
        }
        self.session.set_playing(false);
        self.session.set_prepared(false);
        self.publish();
        self.skip_next()
    }

    /// Samples position and duration while playing, publishes them and
    /// persists the position so an unclean exit resumes close to it.
    pub fn tick(&mut self, now: Instant) {
        if !self.session.is_playing() {
            return;
        }
        self.session
            .set_progress(self.engine.position_ms(), self.engine.duration_ms());
        self.persist_position();
        self.publish_position(now);
    }

    /// Replaces the active list and re-resolves the current index by track id.
    pub fn set_playlist(&mut self, playlist: Arc<Vec<Track>>) {
        self.playlist = playlist;
        let index = self.session.resolve_index(&self.playlist);
        debug!(
            "Active list now has {} entries, current index {index:?}",
            self.playlist.len()
        );
        self.publish();
    }

    /// Changes the play mode and persists it.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::PreferenceError` if it cannot be persisted.
    pub fn set_play_mode(&mut self, mode: PlayMode) -> Result<(), PlaybackError> {
        self.session.set_play_mode(mode);
        self.publish();
        self.preferences.set(keys::PLAY_MODE, &mode)?;
        Ok(())
    }

    /// Restores the previous session: play mode, equalizer and the last
    /// track prepared at its saved position, paused.
    ///
    /// The track is looked up in the active list by path, then by id.
    ///
    /// # Returns
    ///
    /// `true` if a track was prepared.
    pub fn restore_session(&mut self, saved: &SessionPreferences) -> bool {
        self.session.set_play_mode(saved.play_mode);
        self.equalizer =
            EqualizerState::restored(saved.equalizer_gains, saved.equalizer_preset.clone());
        self.engine.apply_equalizer(&self.equalizer.gains);
        self.app_state.update_equalizer(self.equalizer.clone());

        let found = self.playlist.iter().enumerate().find(|(_, track)| {
            saved.last_track_path.as_deref() == Some(track.path.as_str())
                || saved.last_track_id.as_deref() == Some(track.id.as_str())
        });
        let Some((index, track)) = found.map(|(index, track)| (index, track.clone())) else {
            debug!("No previous track to restore");
            self.publish();
            return false;
        };

        self.session.set_current(track.clone(), Some(index));
        let loaded = ErrorReporter::absorb(
            self.engine.load(Path::new(&track.path)),
            "Restoring last track",
        );
        if loaded.is_some() {
            if saved.last_position_ms > 0 {
                ErrorReporter::absorb(
                    self.engine.seek(saved.last_position_ms),
                    "Restoring last position",
                );
            }
            self.session
                .set_progress(self.engine.position_ms(), self.engine.duration_ms());
            self.session.set_prepared(true);
            info!(
                "Restored {} at {} ms (paused)",
                track.title,
                self.session.position_ms()
            );
        }
        self.publish();
        self.publish_position(Instant::now());
        loaded.is_some()
    }

    /// Persists the current track, position and play mode.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::PreferenceError` if the store cannot be written.
    pub fn save_state(&mut self) -> Result<(), PlaybackError> {
        let mut entries = vec![(keys::PLAY_MODE, self.session.play_mode().encode())];
        if let Some(track) = self.session.current_track() {
            entries.push((keys::LAST_SONG_ID, track.id.clone()));
            entries.push((keys::LAST_SONG_PATH, track.path.clone()));
            entries.push((keys::LAST_POSITION, self.current_position().encode()));
        }
        self.preferences.set_many(entries)?;
        Ok(())
    }

    /// Resumes the prepared track, else starts the current track, else the
    /// first entry.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::EmptyPlaylist` if there is nothing to start.
    pub fn continue_last_playback(&mut self) -> Result<(), PlaybackError> {
        if self.session.is_prepared() {
            self.engine.play()?;
            self.session.set_playing(true);
            self.publish();
            return Ok(());
        }
        if let Some(index) = self.session.current_index() {
            return self.start_at(index);
        }
        if self.playlist.is_empty() {
            return Err(PlaybackError::EmptyPlaylist);
        }
        self.start_at(0)
    }

    /// Switches to sequential mode and starts the first entry.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::EmptyPlaylist` if the list is empty.
    pub fn start_from_beginning(&mut self) -> Result<(), PlaybackError> {
        if self.playlist.is_empty() {
            return Err(PlaybackError::EmptyPlaylist);
        }
        self.set_play_mode(PlayMode::Sequential)?;
        self.start_at(0)
    }

    /// Stops and clears the session if the deleted track is the current one.
    pub fn on_track_deleted(&mut self, id: &str) {
        if self.session.current_track().is_none_or(|track| track.id != id) {
            return;
        }
        info!("Current track {id} was deleted, stopping");
        self.engine.stop();
        self.session.clear_current();
        for key in [keys::LAST_SONG_ID, keys::LAST_SONG_PATH, keys::LAST_POSITION] {
            ErrorReporter::absorb(self.preferences.remove(key), "Forgetting deleted track");
        }
        self.publish();
        self.publish_position(Instant::now());
    }

    /// Starts or continues a seek-bar drag.
    pub fn scrub_to(&mut self, position_ms: u64, now: Instant) {
        self.scrubber.drag_to(position_ms);
        self.publish_position(now);
    }

    /// Ends a drag and seeks to its position.
    ///
    /// # Errors
    ///
    /// Returns the engine error if the seek fails.
    pub fn commit_scrub(&mut self, now: Instant) -> Result<(), PlaybackError> {
        match self.scrubber.commit(now) {
            Some(position_ms) => self.seek(position_ms),
            None => Ok(()),
        }
    }

    /// Abandons a drag.
    pub fn cancel_scrub(&mut self, now: Instant) {
        self.scrubber.cancel();
        self.publish_position(now);
    }

    /// Position the seek bar should show at `now`.
    pub fn displayed_position(&self, now: Instant) -> u64 {
        self.scrubber
            .displayed_position(self.current_position(), now)
    }

    /// Sets one equalizer band.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid band or gain, or if persisting fails.
    pub fn set_equalizer_band(&mut self, band: usize, gain_db: f32) -> Result<(), PlaybackError> {
        self.equalizer.set_band(band, gain_db)?;
        self.equalizer_changed()
    }

    /// Switches to a built-in equalizer preset.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown preset, or if persisting fails.
    pub fn apply_equalizer_preset(&mut self, name: &str) -> Result<(), PlaybackError> {
        self.equalizer.apply_preset(name)?;
        self.equalizer_changed()
    }

    /// Restores the flat equalizer.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::PreferenceError` if persisting fails.
    pub fn reset_equalizer(&mut self) -> Result<(), PlaybackError> {
        self.equalizer.reset();
        self.equalizer_changed()
    }

    fn equalizer_changed(&mut self) -> Result<(), PlaybackError> {
        self.engine.apply_equalizer(&self.equalizer.gains);
        self.app_state.update_equalizer(self.equalizer.clone());
        self.preferences.set_many([
            (keys::EQUALIZER_BANDS, self.equalizer.gains.encode()),
            (keys::EQUALIZER_PRESET, self.equalizer.preset.clone()),
        ])?;
        Ok(())
    }

    fn start_at(&mut self, index: usize) -> Result<(), PlaybackError> {
        let track = self
            .playlist
            .get(index)
            .cloned()
            .ok_or(PlaybackError::EmptyPlaylist)?;
        let path = Path::new(&track.path);

        // The dump parses the whole file; skip it unless it will be logged.
        if enabled!(Level::DEBUG) {
            self.inspector.inspect(path).log(Level::DEBUG);
        }
        self.session.set_current(track.clone(), Some(index));

        if let Err(e) = self.engine.load(path).and_then(|()| self.engine.play()) {
            self.session.set_playing(false);
            self.publish();
            return Err(e.into());
        }
        self.session.set_prepared(true);
        self.session.set_playing(true);
        self.session.set_progress(0, self.engine.duration_ms());
        info!("Playing {} - {}", track.title, track.artist);

        ErrorReporter::absorb(
            self.preferences.set_many([
                (keys::LAST_SONG_ID, track.id.clone()),
                (keys::LAST_SONG_PATH, track.path.clone()),
                (keys::LAST_POSITION, 0u64.encode()),
            ]),
            "Persisting last played track",
        );
        self.publish();
        self.publish_position(Instant::now());
        Ok(())
    }

    fn pause(&mut self) {
        self.engine.pause();
        self.session.set_playing(false);
        self.session
            .set_progress(self.engine.position_ms(), self.engine.duration_ms());
        self.persist_position();
        self.publish();
    }

    fn current_position(&self) -> u64 {
        if self.session.is_prepared() {
            self.engine.position_ms()
        } else {
            self.session.position_ms()
        }
    }

    fn persist_position(&self) {
        if self.session.current_track().is_some() {
            ErrorReporter::absorb(
                self.preferences
                    .set(keys::LAST_POSITION, &self.current_position()),
                "Persisting playback position",
            );
        }
    }

    fn publish(&self) {
        self.app_state.update_session(self.session.snapshot());
    }

    fn publish_position(&self, now: Instant) {
        let snapshot = self.session.snapshot();
        self.app_state.update_position(PositionState {
            position_ms: self.scrubber.displayed_position(snapshot.position_ms, now),
            duration_ms: snapshot.duration_ms,
        });
    }
}
