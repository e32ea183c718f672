//! Integration tests for the playback coordinator.
//!
//! The engine and file inspector are scripted fakes; shuffle uses a seeded
//! generator and preferences live in a temporary directory.

#[cfg(test)]
mod tests {
    use std::{
        path::{Path, PathBuf},
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering::SeqCst},
        },
        time::{Duration, Instant},
    };

    use {
        parking_lot::Mutex,
        rand::{SeedableRng, rngs::StdRng},
        tempfile::TempDir,
        tracing::Level,
    };

    use crate::{
        audio::{
            coordinator::{CoordinatorParts, PlaybackCoordinator},
            diagnostics::{AudioFileInfo, FileInspector},
            engine::{EngineError, EngineEvent, PlaybackEngine},
            equalizer::BAND_COUNT,
        },
        config::preferences::{PreferenceStore, SessionPreferences, keys},
        error::PlaybackError,
        library::models::{PlayMode, Track},
        state::{AppState, AppStateEvent},
    };

    /// Observable state of the scripted engine, shared with the test.
    #[derive(Debug, Default)]
    struct Script {
        calls: Vec<String>,
        loaded: Option<PathBuf>,
        playing: bool,
        position_ms: u64,
        failing_paths: Vec<String>,
        equalizer: [f32; BAND_COUNT],
    }

    impl Script {
        fn loads(&self) -> Vec<&str> {
            self.calls
                .iter()
                .filter_map(|call| call.strip_prefix("load "))
                .collect()
        }
    }

    struct ScriptedEngine(Arc<Mutex<Script>>);

    impl PlaybackEngine for ScriptedEngine {
        fn load(&mut self, path: &Path) -> Result<(), EngineError> {
            let mut script = self.0.lock();
            let path_str = path.to_string_lossy().into_owned();
            script.calls.push(format!("load {path_str}"));
            if script.failing_paths.contains(&path_str) {
                return Err(EngineError::OpenFailed {
                    path: path_str,
                    reason: "scripted failure".to_string(),
                });
            }
            script.loaded = Some(path.to_path_buf());
            script.playing = false;
            script.position_ms = 0;
            Ok(())
        }

        fn play(&mut self) -> Result<(), EngineError> {
            let mut script = self.0.lock();
            script.calls.push("play".to_string());
            if script.loaded.is_none() {
                return Err(EngineError::NoTrackLoaded);
            }
            script.playing = true;
            Ok(())
        }

        fn pause(&mut self) {
            let mut script = self.0.lock();
            script.calls.push("pause".to_string());
            script.playing = false;
        }

        fn stop(&mut self) {
            let mut script = self.0.lock();
            script.calls.push("stop".to_string());
            script.playing = false;
            script.loaded = None;
        }

        fn seek(&mut self, position_ms: u64) -> Result<(), EngineError> {
            let mut script = self.0.lock();
            script.calls.push(format!("seek {position_ms}"));
            if script.loaded.is_none() {
                return Err(EngineError::NoTrackLoaded);
            }
            script.position_ms = position_ms;
            Ok(())
        }

        fn position_ms(&self) -> u64 {
            self.0.lock().position_ms
        }

        fn duration_ms(&self) -> Option<u64> {
            self.0.lock().loaded.as_ref().map(|_| 180_000)
        }

        fn is_playing(&self) -> bool {
            self.0.lock().playing
        }

        fn apply_equalizer(&mut self, gains: &[f32; BAND_COUNT]) {
            self.0.lock().equalizer = *gains;
        }
    }

    #[derive(Default)]
    struct CountingInspector {
        inspected: AtomicUsize,
    }

    impl FileInspector for CountingInspector {
        fn inspect(&self, path: &Path) -> AudioFileInfo {
            self.inspected.fetch_add(1, SeqCst);
            AudioFileInfo {
                path: path.to_string_lossy().into_owned(),
                ..AudioFileInfo::default()
            }
        }
    }

    struct Harness {
        coordinator: PlaybackCoordinator<ScriptedEngine>,
        script: Arc<Mutex<Script>>,
        inspector: Arc<CountingInspector>,
        preferences: Arc<PreferenceStore>,
        app_state: Arc<AppState>,
        _dir: TempDir,
    }

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Title {id}"),
            artist: "Artist".to_string(),
            path: format!("/music/{id}.mp3"),
            duration_ms: 180_000,
            ..Track::default()
        }
    }

    fn playlist(ids: &[&str]) -> Arc<Vec<Track>> {
        Arc::new(ids.iter().map(|id| track(id)).collect())
    }

    fn harness_in(dir: TempDir) -> Harness {
        let script = Arc::new(Mutex::new(Script::default()));
        let inspector = Arc::new(CountingInspector::default());
        let preferences = Arc::new(PreferenceStore::open(dir.path().join("preferences.json")).unwrap());
        let app_state = Arc::new(AppState::new());

        let mut coordinator = PlaybackCoordinator::new(CoordinatorParts {
            engine: ScriptedEngine(script.clone()),
            preferences: preferences.clone(),
            app_state: app_state.clone(),
            inspector: inspector.clone(),
            rng: StdRng::seed_from_u64(7),
            scrub_settle: Duration::from_millis(500),
        });
        coordinator.set_playlist(playlist(&["a", "b", "c"]));

        Harness {
            coordinator,
            script,
            inspector,
            preferences,
            app_state,
            _dir: dir,
        }
    }

    fn harness() -> Harness {
        harness_in(TempDir::new().unwrap())
    }

    #[test]
    fn test_play_starts_track_and_persists_it() {
        let mut h = harness();
        h.coordinator.play(&track("b")).unwrap();

        let session = h.coordinator.session();
        assert_eq!(session.current_index(), Some(1));
        assert!(session.is_playing());
        assert_eq!(h.script.lock().calls, ["load /music/b.mp3", "play"]);
        assert_eq!(
            h.preferences.get_raw(keys::LAST_SONG_ID).as_deref(),
            Some("b")
        );
        assert_eq!(
            h.preferences.get_raw(keys::LAST_SONG_PATH).as_deref(),
            Some("/music/b.mp3")
        );
    }

    #[test]
    fn test_play_ignores_track_outside_active_list() {
        let mut h = harness();
        let error = h.coordinator.play(&track("zz")).unwrap_err();

        assert_eq!(error.to_string(), "Track zz is not in the active list");
        assert!(h.script.lock().calls.is_empty());
        assert!(h.coordinator.session().current_track().is_none());
    }

    #[test]
    fn test_repeat_one_end_restarts_same_track() {
        let mut h = harness();
        h.coordinator.set_play_mode(PlayMode::RepeatOne).unwrap();
        h.coordinator.play(&track("b")).unwrap();
        h.script.lock().position_ms = 180_000;

        h.coordinator.handle_event(EngineEvent::Ended).unwrap();

        assert_eq!(h.coordinator.session().current_index(), Some(1));
        assert!(h.coordinator.session().is_playing());
        let script = h.script.lock();
        assert_eq!(script.position_ms, 0);
        assert_eq!(script.loads(), ["/music/b.mp3"]);
        assert!(script.calls.ends_with(&["seek 0".to_string(), "play".to_string()]));
    }

    #[test]
    fn test_sequential_end_wraps_to_first() {
        let mut h = harness();
        h.coordinator.play(&track("c")).unwrap();

        h.coordinator.handle_event(EngineEvent::Ended).unwrap();

        assert_eq!(h.coordinator.session().current_index(), Some(0));
        assert_eq!(h.script.lock().loads(), ["/music/c.mp3", "/music/a.mp3"]);
    }

    #[test]
    fn test_shuffle_end_never_repeats_current() {
        let mut h = harness();
        h.coordinator.set_play_mode(PlayMode::Shuffle).unwrap();
        h.coordinator.play(&track("a")).unwrap();

        for _ in 0..20 {
            let before = h.coordinator.session().current_index();
            h.coordinator.handle_event(EngineEvent::Ended).unwrap();
            assert_ne!(h.coordinator.session().current_index(), before);
        }
    }

    #[test]
    fn test_failure_dumps_diagnostics_and_skips_once() {
        let mut h = harness();
        h.coordinator.play(&track("a")).unwrap();

        h.coordinator
            .handle_event(EngineEvent::Failed {
                message: "decoder error".to_string(),
            })
            .unwrap();

        assert_eq!(h.coordinator.session().current_index(), Some(1));
        assert_eq!(h.script.lock().loads(), ["/music/a.mp3", "/music/b.mp3"]);
        // Only the failure dump; pre-play dumps need debug logging.
        assert_eq!(h.inspector.inspected.load(SeqCst), 1);
    }

    #[test]
    fn test_pre_play_dump_runs_only_with_debug_logging() {
        let mut h = harness();
        h.coordinator.play(&track("a")).unwrap();
        assert_eq!(h.inspector.inspected.load(SeqCst), 0);

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            h.coordinator.play(&track("b")).unwrap();
        });
        assert_eq!(h.inspector.inspected.load(SeqCst), 1);
    }

    #[test]
    fn test_failure_does_not_loop_when_next_also_fails() {
        let mut h = harness();
        h.coordinator.play(&track("a")).unwrap();
        h.script.lock().failing_paths = vec!["/music/b.mp3".to_string()];

        let result = h.coordinator.handle_event(EngineEvent::Failed {
            message: "decoder error".to_string(),
        });

        assert!(matches!(result, Err(PlaybackError::EngineError(_))));
        assert_eq!(h.script.lock().loads(), ["/music/a.mp3", "/music/b.mp3"]);
        assert!(!h.coordinator.session().is_playing());
    }

    #[test]
    fn test_toggle_with_nothing_loaded_plays_first_entry() {
        let mut h = harness();
        h.coordinator.toggle_play_pause().unwrap();

        assert_eq!(h.coordinator.session().current_index(), Some(0));
        assert!(h.coordinator.session().is_playing());
    }

    #[test]
    fn test_toggle_pauses_and_persists_position() {
        let mut h = harness();
        h.coordinator.play(&track("a")).unwrap();
        h.script.lock().position_ms = 42_000;

        h.coordinator.toggle_play_pause().unwrap();

        assert!(!h.coordinator.session().is_playing());
        assert_eq!(h.coordinator.session().position_ms(), 42_000);
        assert_eq!(
            h.preferences.get::<u64>(keys::LAST_POSITION).unwrap(),
            Some(42_000)
        );

        h.coordinator.toggle_play_pause().unwrap();
        assert!(h.coordinator.session().is_playing());
        assert_eq!(h.script.lock().loads(), ["/music/a.mp3"]);
    }

    #[test]
    fn test_skip_on_empty_list() {
        let mut h = harness();
        h.coordinator.set_playlist(Arc::new(Vec::new()));

        assert!(matches!(
            h.coordinator.skip_next(),
            Err(PlaybackError::EmptyPlaylist)
        ));
        assert!(matches!(
            h.coordinator.toggle_play_pause(),
            Err(PlaybackError::EmptyPlaylist)
        ));
    }

    #[test]
    fn test_skip_previous_wraps_to_last() {
        let mut h = harness();
        h.coordinator.play(&track("a")).unwrap();
        h.coordinator.skip_previous().unwrap();

        assert_eq!(h.coordinator.session().current_index(), Some(2));
    }

    #[test]
    fn test_playlist_change_reresolves_index() {
        let mut h = harness();
        h.coordinator.play(&track("b")).unwrap();

        h.coordinator.set_playlist(playlist(&["c", "b"]));
        assert_eq!(h.coordinator.session().current_index(), Some(1));

        h.coordinator.set_playlist(playlist(&["a", "c"]));
        assert_eq!(h.coordinator.session().current_index(), None);
        assert_eq!(
            h.coordinator.session().current_track().map(|t| t.id.as_str()),
            Some("b")
        );

        // Without an index, next starts the filtered list from the top.
        h.coordinator.skip_next().unwrap();
        assert_eq!(
            h.coordinator.session().current_track().map(|t| t.id.as_str()),
            Some("a")
        );
    }

    #[test]
    fn test_restore_prepares_paused_at_saved_position() {
        let dir = TempDir::new().unwrap();
        {
            let store = PreferenceStore::open(dir.path().join("preferences.json")).unwrap();
            store
                .set_many([
                    (keys::LAST_SONG_ID, "c".to_string()),
                    (keys::LAST_SONG_PATH, "/music/c.mp3".to_string()),
                    (keys::LAST_POSITION, "65000".to_string()),
                    (keys::PLAY_MODE, "SHUFFLE".to_string()),
                    (keys::EQUALIZER_BANDS, "3,2,-1,-1,3".to_string()),
                    (keys::EQUALIZER_PRESET, "Rock".to_string()),
                ])
                .unwrap();
        }

        let mut h = harness_in(dir);
        let saved = SessionPreferences::load(&h.preferences);
        assert!(h.coordinator.restore_session(&saved));

        let session = h.coordinator.session();
        assert!(session.is_prepared());
        assert!(!session.is_playing());
        assert_eq!(session.current_index(), Some(2));
        assert_eq!(session.position_ms(), 65_000);
        assert_eq!(session.play_mode(), PlayMode::Shuffle);
        assert_eq!(h.coordinator.equalizer().preset, "Rock");
        {
            let script = h.script.lock();
            assert_eq!(script.calls, ["load /music/c.mp3", "seek 65000"]);
            assert_eq!(script.equalizer, [3.0, 2.0, -1.0, -1.0, 3.0]);
        }

        h.coordinator.continue_last_playback().unwrap();
        assert!(h.coordinator.session().is_playing());
        assert_eq!(h.script.lock().position_ms, 65_000);
        assert_eq!(h.script.lock().loads(), ["/music/c.mp3"]);
    }

    #[test]
    fn test_restore_without_saved_track() {
        let mut h = harness();
        assert!(!h.coordinator.restore_session(&SessionPreferences::default()));
        assert!(h.coordinator.session().current_track().is_none());
        assert!(h.script.lock().calls.is_empty());
    }

    #[test]
    fn test_start_from_beginning_forces_sequential() {
        let mut h = harness();
        h.coordinator.set_play_mode(PlayMode::Shuffle).unwrap();
        h.coordinator.play(&track("c")).unwrap();

        h.coordinator.start_from_beginning().unwrap();

        assert_eq!(h.coordinator.session().play_mode(), PlayMode::Sequential);
        assert_eq!(h.coordinator.session().current_index(), Some(0));
        assert_eq!(
            h.preferences.get::<PlayMode>(keys::PLAY_MODE).unwrap(),
            Some(PlayMode::Sequential)
        );
    }

    #[test]
    fn test_save_state_writes_session() {
        let mut h = harness();
        h.coordinator.play(&track("b")).unwrap();
        h.script.lock().position_ms = 12_345;

        h.coordinator.save_state().unwrap();

        let saved = SessionPreferences::load(&h.preferences);
        assert_eq!(saved.last_track_id.as_deref(), Some("b"));
        assert_eq!(saved.last_position_ms, 12_345);
        assert_eq!(saved.play_mode, PlayMode::Sequential);
    }

    #[test]
    fn test_deleting_current_track_stops_and_forgets_it() {
        let mut h = harness();
        h.coordinator.play(&track("b")).unwrap();

        h.coordinator.on_track_deleted("a");
        assert!(h.coordinator.session().current_track().is_some());

        h.coordinator.on_track_deleted("b");
        assert!(h.coordinator.session().current_track().is_none());
        assert!(!h.coordinator.session().is_playing());
        assert_eq!(h.script.lock().calls.last().map(String::as_str), Some("stop"));
        assert_eq!(h.preferences.get_raw(keys::LAST_SONG_ID), None);
    }

    #[test]
    fn test_playing_changed_updates_flag() {
        let mut h = harness();
        h.coordinator.play(&track("a")).unwrap();
        h.script.lock().position_ms = 9000;

        h.coordinator
            .handle_event(EngineEvent::PlayingChanged(false))
            .unwrap();

        assert!(!h.coordinator.session().is_playing());
        assert_eq!(
            h.preferences.get::<u64>(keys::LAST_POSITION).unwrap(),
            Some(9000)
        );
    }

    #[test]
    fn test_scrub_shows_drag_position_then_seeks() {
        let mut h = harness();
        h.coordinator.play(&track("a")).unwrap();
        let now = Instant::now();

        h.coordinator.scrub_to(90_000, now);
        assert_eq!(h.app_state.get_position().position_ms, 90_000);
        assert_eq!(h.coordinator.displayed_position(now), 90_000);
        assert_eq!(h.script.lock().position_ms, 0);

        h.coordinator.commit_scrub(now).unwrap();
        assert_eq!(h.script.lock().position_ms, 90_000);
        assert_eq!(
            h.coordinator
                .displayed_position(now + Duration::from_secs(1)),
            90_000
        );
    }

    #[test]
    fn test_tick_publishes_position_only_while_playing() {
        let mut h = harness();
        h.coordinator.play(&track("a")).unwrap();
        h.script.lock().position_ms = 3000;

        h.coordinator.tick(Instant::now());
        assert_eq!(h.app_state.get_position().position_ms, 3000);
        assert_eq!(h.app_state.get_position().duration_ms, 180_000);

        h.coordinator.toggle_play_pause().unwrap();
        h.script.lock().position_ms = 5000;
        h.coordinator.tick(Instant::now());
        assert_eq!(h.app_state.get_position().position_ms, 3000);
    }

    #[test]
    fn test_tick_persists_position_without_save_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");
        let mut h = harness_in(dir);
        h.coordinator.play(&track("a")).unwrap();
        h.script.lock().position_ms = 95_000;

        h.coordinator.tick(Instant::now());
        h.coordinator.tick(Instant::now());

        assert_eq!(
            h.preferences.get::<u64>(keys::LAST_POSITION).unwrap(),
            Some(95_000)
        );
        let reopened = PreferenceStore::open(&path).unwrap();
        assert_eq!(SessionPreferences::load(&reopened).last_position_ms, 95_000);
    }

    #[test]
    fn test_equalizer_changes_reach_engine_and_store() {
        let mut h = harness();
        let mut receiver = h.app_state.subscribe();

        h.coordinator.apply_equalizer_preset("Bass Boost").unwrap();
        h.coordinator.set_equalizer_band(4, 25.0).unwrap();

        assert_eq!(h.coordinator.equalizer().preset, "Custom");
        assert_eq!(h.script.lock().equalizer, [5.0, 3.0, 0.0, -2.0, 10.0]);
        assert_eq!(
            h.preferences.get_raw(keys::EQUALIZER_BANDS).as_deref(),
            Some("5,3,0,-2,10")
        );
        assert!(matches!(
            receiver.try_recv(),
            Ok(AppStateEvent::EqualizerChanged(_))
        ));

        let error = h.coordinator.apply_equalizer_preset("Dubstep").unwrap_err();
        assert_eq!(error.to_string(), "Equalizer error: Unknown preset: Dubstep");

        h.coordinator.reset_equalizer().unwrap();
        assert_eq!(h.script.lock().equalizer, [0.0; BAND_COUNT]);
        assert_eq!(
            h.preferences.get_raw(keys::EQUALIZER_PRESET).as_deref(),
            Some("Normal")
        );
    }
}
