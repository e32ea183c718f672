//! Decoder/output collaborator seam.
//!
//! The player never decodes audio itself. It drives a `PlaybackEngine`
//! (load, play, pause, seek, position) and listens for `EngineEvent`s on a
//! channel. `ClockEngine` is a wall-clock stand-in that behaves like an
//! engine without producing sound, for headless runs.

use std::{
    fs::metadata,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering::SeqCst},
    },
    time::{Duration, Instant},
};

use {
    async_channel::Sender,
    serde::{Deserialize, Serialize},
    thiserror::Error,
    tokio::{runtime::Handle, time::sleep},
    tracing::{debug, warn},
};

use crate::audio::{equalizer::BAND_COUNT, metadata::TagReader};

/// Error type for engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The file could not be opened for playback.
    #[error("Failed to open {path}: {reason}")]
    OpenFailed { path: String, reason: String },
    /// Operation needs a loaded track.
    #[error("No track loaded")]
    NoTrackLoaded,
}

/// Callbacks from the engine, delivered asynchronously.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// The loaded track played to its end.
    Ended,
    /// Playback failed; the track is considered unplayable.
    Failed { message: String },
    /// The engine started or stopped producing audio.
    PlayingChanged(bool),
}

/// Minimal transport contract of a decode/output engine.
pub trait PlaybackEngine: Send {
    /// Prepares `path` for playback, replacing any loaded track. Does not start playback.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::OpenFailed` if the file cannot be opened.
    fn load(&mut self, path: &Path) -> Result<(), EngineError>;

    /// Starts or resumes playback of the loaded track.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NoTrackLoaded` if nothing is loaded.
    fn play(&mut self) -> Result<(), EngineError>;

    /// Pauses playback, keeping the position.
    fn pause(&mut self);

    /// Stops playback and unloads the track.
    fn stop(&mut self);

    /// Moves the playhead.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NoTrackLoaded` if nothing is loaded.
    fn seek(&mut self, position_ms: u64) -> Result<(), EngineError>;

    /// Current playhead position.
    fn position_ms(&self) -> u64;

    /// Duration of the loaded track, once known.
    fn duration_ms(&self) -> Option<u64>;

    /// Whether audio is currently being produced.
    fn is_playing(&self) -> bool;

    /// Applies equalizer band gains in dB. Engines without an equalizer ignore this.
    fn apply_equalizer(&mut self, _gains: &[f32; BAND_COUNT]) {}
}

/// Engine that advances a virtual playhead with the wall clock.
///
/// Duration comes from the file's tags. A file with no readable duration
/// is reported as failed when playback starts, as a real decoder would.
#[derive(Debug)]
pub struct ClockEngine {
    events: Sender<EngineEvent>,
    loaded: Option<PathBuf>,
    duration_ms: Option<u64>,
    anchor_position_ms: u64,
    playing_since: Option<Instant>,
    generation: Arc<AtomicU64>,
    equalizer: [f32; BAND_COUNT],
}

impl ClockEngine {
    /// Creates an engine reporting to `events`.
    #[must_use]
    pub fn new(events: Sender<EngineEvent>) -> Self {
        Self {
            events,
            loaded: None,
            duration_ms: None,
            anchor_position_ms: 0,
            playing_since: None,
            generation: Arc::new(AtomicU64::new(0)),
            equalizer: [0.0; BAND_COUNT],
        }
    }

    /// Gains last applied through [`PlaybackEngine::apply_equalizer`].
    pub fn equalizer(&self) -> &[f32; BAND_COUNT] {
        &self.equalizer
    }

    fn emit(&self, event: EngineEvent) {
        if let Err(e) = self.events.try_send(event) {
            debug!("ClockEngine: event dropped: {e}");
        }
    }

    fn raw_position(&self) -> u64 {
        let elapsed = self.playing_since.map_or(0, |since| {
            u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
        });
        self.anchor_position_ms.saturating_add(elapsed)
    }

    /// Invalidates any pending end-of-track timer.
    fn cancel_timer(&self) {
        self.generation.fetch_add(1, SeqCst);
    }

    fn schedule_end(&self) {
        let Some(duration) = self.duration_ms else {
            return;
        };
        let Ok(handle) = Handle::try_current() else {
            warn!("ClockEngine: no runtime, end of track will not be reported");
            return;
        };

        let remaining = Duration::from_millis(duration.saturating_sub(self.raw_position()));
        let ticket = self.generation.fetch_add(1, SeqCst) + 1;
        let generation = self.generation.clone();
        let events = self.events.clone();

        handle.spawn(async move {
            sleep(remaining).await;
            if generation.load(SeqCst) == ticket {
                let _ = events.send(EngineEvent::Ended).await;
            }
        });
    }
}

impl PlaybackEngine for ClockEngine {
    fn load(&mut self, path: &Path) -> Result<(), EngineError> {
        let open_failed = |reason: String| EngineError::OpenFailed {
            path: path.to_string_lossy().into_owned(),
            reason,
        };

        let file = metadata(path).map_err(|e| open_failed(e.to_string()))?;
        if !file.is_file() {
            return Err(open_failed("not a regular file".to_string()));
        }

        self.cancel_timer();
        self.duration_ms = TagReader::read_tags(path)
            .ok()
            .map(|tags| tags.duration_ms)
            .filter(|duration| *duration > 0);
        self.loaded = Some(path.to_path_buf());
        self.anchor_position_ms = 0;
        if self.playing_since.take().is_some() {
            self.emit(EngineEvent::PlayingChanged(false));
        }
        debug!("ClockEngine: loaded {:?} ({:?} ms)", path, self.duration_ms);
        Ok(())
    }

    fn play(&mut self) -> Result<(), EngineError> {
        if self.loaded.is_none() {
            return Err(EngineError::NoTrackLoaded);
        }
        if self.duration_ms.is_none() {
            self.emit(EngineEvent::Failed {
                message: "unknown duration, stream cannot be decoded".to_string(),
            });
            return Ok(());
        }
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
            self.schedule_end();
            self.emit(EngineEvent::PlayingChanged(true));
        }
        Ok(())
    }

    fn pause(&mut self) {
        if self.playing_since.is_some() {
            self.anchor_position_ms = self.position_ms();
            self.playing_since = None;
            self.cancel_timer();
            self.emit(EngineEvent::PlayingChanged(false));
        }
    }

    fn stop(&mut self) {
        self.pause();
        self.loaded = None;
        self.duration_ms = None;
        self.anchor_position_ms = 0;
    }

    fn seek(&mut self, position_ms: u64) -> Result<(), EngineError> {
        if self.loaded.is_none() {
            return Err(EngineError::NoTrackLoaded);
        }
        self.anchor_position_ms = self
            .duration_ms
            .map_or(position_ms, |duration| position_ms.min(duration));
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
            self.schedule_end();
        }
        Ok(())
    }

    fn position_ms(&self) -> u64 {
        let position = self.raw_position();
        self.duration_ms
            .map_or(position, |duration| position.min(duration))
    }

    fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    fn is_playing(&self) -> bool {
        self.playing_since.is_some()
            && self
                .duration_ms
                .is_some_and(|duration| self.raw_position() < duration)
    }

    fn apply_equalizer(&mut self, gains: &[f32; BAND_COUNT]) {
        self.equalizer = *gains;
    }
}
