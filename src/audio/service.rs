//! Playback service task.
//!
//! `PlaybackService` spawns the one task that owns the coordinator and the
//! catalog view. Commands, engine events, playlist updates, catalog changes
//! and the position poll all arrive through channels and are applied in
//! order on that task.

use std::{sync::Arc, time::Duration};

use {
    async_channel::{Receiver, Sender, unbounded},
    tokio::{
        select,
        sync::{broadcast::error::RecvError, watch},
        task::JoinHandle,
        time::{Instant, MissedTickBehavior, interval},
    },
    tracing::{debug, info, warn},
};

use crate::{
    audio::{
        coordinator::PlaybackCoordinator,
        engine::{EngineEvent, PlaybackEngine},
    },
    config::preferences::{PreferenceStore, SessionPreferences, keys},
    error::ErrorReporter,
    library::{
        models::{PlayMode, SortOrder, Track},
        repository::{LibraryEvent, MusicRepository},
    },
    state::CatalogView,
};

/// Requests accepted by the playback task.
#[derive(Debug, Clone)]
pub enum PlaybackCommand {
    /// Start a track from the active list.
    Play(Track),
    /// Pause, resume or start.
    TogglePlayPause,
    /// Next entry per play mode.
    Next,
    /// Previous entry per play mode.
    Previous,
    /// Move the playhead.
    Seek(u64),
    /// Seek-bar drag moved.
    ScrubTo(u64),
    /// Seek-bar drag released.
    CommitScrub,
    /// Seek-bar drag abandoned.
    CancelScrub,
    /// Change the play mode.
    SetPlayMode(PlayMode),
    /// Move to the next play mode in the cycle.
    CyclePlayMode,
    /// Change the catalog sort order.
    SetSortOrder(SortOrder),
    /// Change the catalog filter.
    SetFilter(String),
    /// Resume the last session.
    ContinueLast,
    /// Sequential playback from the first entry.
    StartFromBeginning,
    /// Delete a track and its files.
    DeleteTrack(Track),
    /// Set one equalizer band.
    SetEqualizerBand { band: usize, gain_db: f32 },
    /// Switch to a built-in equalizer preset.
    ApplyEqualizerPreset(String),
    /// Flat equalizer.
    ResetEqualizer,
    /// Persist the session now.
    SaveState,
    /// Persist the session and stop the task.
    Shutdown,
}

/// Everything the playback task takes ownership of.
pub struct ServiceParts<E: PlaybackEngine> {
    /// Session coordinator.
    pub coordinator: PlaybackCoordinator<E>,
    /// Events from the engine the coordinator drives.
    pub engine_events: Receiver<EngineEvent>,
    /// Catalog view feeding the active list.
    pub catalog: CatalogView,
    /// Catalog store.
    pub repository: MusicRepository,
    /// Persisted key-value store.
    pub preferences: Arc<PreferenceStore>,
    /// Position poll interval while playing.
    pub poll_interval: Duration,
    /// Session to restore once the active list is known.
    pub restore: Option<SessionPreferences>,
}

/// Handle to the running playback task.
pub struct PlaybackService {
    commands: Sender<PlaybackCommand>,
    playlist: watch::Receiver<Arc<Vec<Track>>>,
    task: JoinHandle<()>,
}

impl PlaybackService {
    /// Spawns the playback task on the current runtime.
    ///
    /// # Arguments
    ///
    /// * `parts` - Coordinator, catalog and channels to move into the task.
    ///
    /// # Returns
    ///
    /// A handle for sending commands and observing the active list.
    pub fn spawn<E: PlaybackEngine + 'static>(parts: ServiceParts<E>) -> Self {
        let (commands, command_rx) = unbounded();
        let playlist = parts.catalog.subscribe();
        let task = tokio::spawn(run(parts, command_rx));
        Self {
            commands,
            playlist,
            task,
        }
    }

    /// Queues a command.
    pub fn send(&self, command: PlaybackCommand) {
        if let Err(e) = self.commands.try_send(command) {
            debug!("PlaybackService: command dropped: {e}");
        }
    }

    /// A sender that can be handed to other producers.
    pub fn commands(&self) -> Sender<PlaybackCommand> {
        self.commands.clone()
    }

    /// Latest active list.
    pub fn playlist(&self) -> Arc<Vec<Track>> {
        self.playlist.borrow().clone()
    }

    /// Subscribes to active list updates.
    pub fn subscribe_playlist(&self) -> watch::Receiver<Arc<Vec<Track>>> {
        self.playlist.clone()
    }

    /// Saves the session and waits for the task to finish.
    pub async fn shutdown(self) {
        self.send(PlaybackCommand::Shutdown);
        if let Err(e) = self.task.await {
            warn!("Playback task ended abnormally: {e}");
        }
    }
}

struct PlaybackTask<E: PlaybackEngine> {
    coordinator: PlaybackCoordinator<E>,
    catalog: CatalogView,
    repository: MusicRepository,
    preferences: Arc<PreferenceStore>,
}

async fn run<E: PlaybackEngine>(parts: ServiceParts<E>, commands: Receiver<PlaybackCommand>) {
    let ServiceParts {
        coordinator,
        engine_events,
        catalog,
        repository,
        preferences,
        poll_interval,
        restore,
    } = parts;

    let mut playlist_rx = catalog.subscribe();
    let mut library_rx = repository.subscribe();
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut task = PlaybackTask {
        coordinator,
        catalog,
        repository,
        preferences,
    };
    task.coordinator
        .set_playlist(playlist_rx.borrow_and_update().clone());
    if let Some(saved) = restore {
        task.coordinator.restore_session(&saved);
    }
    info!("Playback task started");

    loop {
        select! {
            command = commands.recv() => match command {
                Ok(PlaybackCommand::Shutdown) | Err(_) => break,
                Ok(command) => task.execute(command).await,
            },
            event = engine_events.recv() => match event {
                Ok(event) => {
                    ErrorReporter::absorb(
                        task.coordinator.handle_event(event),
                        "Handling engine event",
                    );
                }
                Err(_) => {
                    warn!("Engine event channel closed");
                    break;
                }
            },
            changed = playlist_rx.changed() => {
                if changed.is_ok() {
                    let playlist = playlist_rx.borrow_and_update().clone();
                    task.coordinator.set_playlist(playlist);
                }
            },
            event = library_rx.recv() => task.on_library_event(event).await,
            _ = ticker.tick() => task.coordinator.tick(Instant::now().into_std()),
        }
    }

    ErrorReporter::absorb(task.coordinator.save_state(), "Saving session on shutdown");
    info!("Playback task stopped");
}

impl<E: PlaybackEngine> PlaybackTask<E> {
    async fn execute(&mut self, command: PlaybackCommand) {
        debug!("Playback command: {command:?}");
        let now = Instant::now().into_std();
        let coordinator = &mut self.coordinator;
        let result = match command {
            PlaybackCommand::Play(track) => coordinator.play(&track),
            PlaybackCommand::TogglePlayPause => coordinator.toggle_play_pause(),
            PlaybackCommand::Next => coordinator.skip_next(),
            PlaybackCommand::Previous => coordinator.skip_previous(),
            PlaybackCommand::Seek(position_ms) => coordinator.seek(position_ms),
            PlaybackCommand::ScrubTo(position_ms) => {
                coordinator.scrub_to(position_ms, now);
                Ok(())
            }
            PlaybackCommand::CommitScrub => coordinator.commit_scrub(now),
            PlaybackCommand::CancelScrub => {
                coordinator.cancel_scrub(now);
                Ok(())
            }
            PlaybackCommand::SetPlayMode(mode) => coordinator.set_play_mode(mode),
            PlaybackCommand::CyclePlayMode => {
                let mode = coordinator.session().play_mode().cycled();
                coordinator.set_play_mode(mode)
            }
            PlaybackCommand::SetSortOrder(order) => {
                self.catalog.set_sort_order(order);
                ErrorReporter::absorb(
                    self.preferences.set(keys::SORT_ORDER, &order),
                    "Persisting sort order",
                );
                Ok(())
            }
            PlaybackCommand::SetFilter(filter) => {
                self.catalog.set_filter(filter);
                Ok(())
            }
            PlaybackCommand::ContinueLast => coordinator.continue_last_playback(),
            PlaybackCommand::StartFromBeginning => coordinator.start_from_beginning(),
            PlaybackCommand::DeleteTrack(track) => {
                if ErrorReporter::absorb(self.repository.delete_track(&track).await, "Deleting track")
                    .is_some()
                {
                    coordinator.on_track_deleted(&track.id);
                }
                Ok(())
            }
            PlaybackCommand::SetEqualizerBand { band, gain_db } => {
                coordinator.set_equalizer_band(band, gain_db)
            }
            PlaybackCommand::ApplyEqualizerPreset(name) => coordinator.apply_equalizer_preset(&name),
            PlaybackCommand::ResetEqualizer => coordinator.reset_equalizer(),
            PlaybackCommand::SaveState => coordinator.save_state(),
            PlaybackCommand::Shutdown => Ok(()),
        };
        ErrorReporter::absorb(result, "Playback command");
    }

    async fn on_library_event(&mut self, event: Result<LibraryEvent, RecvError>) {
        match event {
            Ok(LibraryEvent::TrackDeleted(id)) => {
                self.coordinator.on_track_deleted(&id);
                self.reload_catalog().await;
            }
            Ok(LibraryEvent::CatalogChanged) | Err(RecvError::Lagged(_)) => {
                self.reload_catalog().await;
            }
            Err(RecvError::Closed) => {}
        }
    }

    async fn reload_catalog(&mut self) {
        if let Some(tracks) =
            ErrorReporter::absorb(self.repository.all_tracks().await, "Reloading catalog")
        {
            debug!("Catalog reloaded: {} tracks", tracks.len());
            self.catalog.set_catalog(tracks);
        }
    }
}
