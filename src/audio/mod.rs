//! Playback system.
//!
//! The coordinator drives a `PlaybackEngine` through transport decisions
//! made in `navigation`, keeps the session in `session` and publishes every
//! change. `service` runs it on a single task. Tag reading, diagnostics,
//! equalizer settings and seek-bar scrubbing live alongside.

pub mod coordinator;
pub mod diagnostics;
pub mod engine;
pub mod equalizer;
pub mod metadata;
pub mod navigation;
pub mod scrub;
pub mod service;
pub mod session;

mod coordinator_tests;

pub use {
    coordinator::{CoordinatorParts, PlaybackCoordinator},
    diagnostics::{AudioFileInfo, FileInspector, LoftyInspector},
    engine::{ClockEngine, EngineError, EngineEvent, PlaybackEngine},
    equalizer::{EqualizerError, EqualizerState},
    service::{PlaybackCommand, PlaybackService, ServiceParts},
    session::{SessionSnapshot, SessionState},
};
