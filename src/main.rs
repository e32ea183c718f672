//! Melodeck - local music player core
//!
//! Headless entry point. Imports the configured library directories (plus
//! any directories given on the command line), restores the last session
//! and runs the playback service until interrupted.

use std::{env::args, path::PathBuf, sync::Arc};

use {
    anyhow::Result,
    rand::{SeedableRng, rngs::StdRng},
    tokio::{
        signal::ctrl_c,
        sync::broadcast::{Receiver, error::RecvError},
    },
    tracing::{debug, info},
    tracing_subscriber::EnvFilter,
};

use melodeck::{
    audio::{
        ClockEngine, CoordinatorParts, LoftyInspector, PlaybackCoordinator, PlaybackService,
        ServiceParts,
    },
    config::{PreferenceStore, SessionPreferences, SettingsManager},
    error::ResultExt,
    library::{LibraryDatabase, LibraryScanner, MusicRepository, SidecarPaths},
    lyrics::LyricTimeline,
    online::{MetadataClient, MetadataEnricher},
    state::{AppState, AppStateEvent, CatalogView},
};

/// Main entry point for the Melodeck player.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("melodeck=info")),
        )
        .init();

    let settings = SettingsManager::new()
        .add_context("Loading settings")?
        .get_settings()
        .clone();
    let data_dir = settings.resolve_data_dir();

    let sidecars = SidecarPaths::new(&data_dir);
    sidecars
        .ensure_dirs()
        .add_contextf(format!("Creating cache directories under {data_dir:?}"))?;
    let database = LibraryDatabase::open(&data_dir.join("library.db"))
        .await
        .add_context("Opening library database")?;
    let preferences = Arc::new(
        PreferenceStore::open(data_dir.join("preferences.json"))
            .add_context("Opening preferences")?,
    );
    let repository = MusicRepository::new(database, LibraryScanner::default(), sidecars);

    let directories: Vec<PathBuf> = settings
        .library_directories
        .iter()
        .cloned()
        .chain(args().skip(1))
        .map(PathBuf::from)
        .collect();
    let imported = repository
        .import_directories(directories)
        .await
        .add_context("Importing library")?;
    let saved = SessionPreferences::load(&preferences);
    let catalog = CatalogView::new(
        repository.all_tracks().await.add_context("Loading catalog")?,
        saved.sort_order,
    );
    info!(
        imported,
        tracks = catalog.catalog_len(),
        sort = ?saved.sort_order,
        "Library ready"
    );

    let (event_tx, event_rx) = async_channel::unbounded();
    let app_state = Arc::new(AppState::new());
    let coordinator = PlaybackCoordinator::new(CoordinatorParts {
        engine: ClockEngine::new(event_tx),
        preferences: preferences.clone(),
        app_state: app_state.clone(),
        inspector: Arc::new(LoftyInspector),
        rng: StdRng::from_entropy(),
        scrub_settle: settings.scrub_settle(),
    });

    let enricher = Arc::new(MetadataEnricher::new(
        MetadataClient::from_settings(&settings).add_context("Building HTTP client")?,
        repository.clone(),
        settings.search_limit,
        settings.candidate_count,
    ));
    let follower = tokio::spawn(follow_now_playing(app_state.subscribe(), enricher));

    let service = PlaybackService::spawn(ServiceParts {
        coordinator,
        engine_events: event_rx,
        catalog,
        repository,
        preferences,
        poll_interval: settings.poll_interval(),
        restore: Some(saved),
    });
    info!("Playback service running, press Ctrl-C to quit");

    ctrl_c().await.add_context("Waiting for shutdown signal")?;
    info!("Shutting down");
    service.shutdown().await;
    follower.abort();
    Ok(())
}

/// Fetches lyrics and artwork whenever the current track changes and logs
/// the lyric line under the playhead.
async fn follow_now_playing(
    mut events: Receiver<AppStateEvent>,
    enricher: Arc<MetadataEnricher<MetadataClient>>,
) {
    let mut current_id: Option<String> = None;
    let mut timeline = LyricTimeline::default();

    loop {
        match events.recv().await {
            Ok(AppStateEvent::SessionChanged(snapshot)) => {
                let Some(track) = snapshot.current_track else {
                    current_id = None;
                    timeline = LyricTimeline::default();
                    continue;
                };
                if current_id.as_deref() == Some(track.id.as_str()) {
                    continue;
                }
                current_id = Some(track.id.clone());
                info!("Now playing {} - {}", track.title, track.artist);

                let (lyrics, artwork) =
                    tokio::join!(enricher.lyrics_for(&track), enricher.artwork_for(&track));
                timeline = lyrics
                    .as_deref()
                    .map(LyricTimeline::from_text)
                    .unwrap_or_default();
                debug!(lines = timeline.lines().len(), artwork = ?artwork, "Track enriched");
            }
            Ok(AppStateEvent::PositionChanged(position)) => {
                let position_ms = i64::try_from(position.position_ms).unwrap_or(i64::MAX);
                if timeline.advance(position_ms).is_some()
                    && let Some(line) = timeline.current_line()
                {
                    info!("♪ {}", line.text);
                }
            }
            Ok(AppStateEvent::EqualizerChanged(_)) => {}
            Err(RecvError::Lagged(skipped)) => debug!("Now-playing follower skipped {} events", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}
