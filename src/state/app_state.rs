//! Observable playback state.
//!
//! The coordinator publishes every session change here. Observers read
//! the latest values through the getters or subscribe to the broadcast
//! channel for change events.

use std::sync::Arc;

use {
    parking_lot::RwLock,
    tokio::sync::broadcast::{Receiver, Sender, channel},
};

use crate::audio::{equalizer::EqualizerState, session::SessionSnapshot};

/// Latest published position of the current track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionState {
    /// Position shown on the seek bar.
    pub position_ms: u64,
    /// Duration of the current track.
    pub duration_ms: u64,
}

/// Central state container with thread-safe access.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Latest session snapshot.
    pub session: Arc<RwLock<SessionSnapshot>>,
    /// Latest seek-bar position.
    pub position: Arc<RwLock<PositionState>>,
    /// Current equalizer settings.
    pub equalizer: Arc<RwLock<EqualizerState>>,
    /// Broadcast channel for state change notifications.
    state_tx: Sender<AppStateEvent>,
}

/// Application state change events.
#[derive(Debug, Clone)]
pub enum AppStateEvent {
    /// Current track, play flag or mode changed.
    SessionChanged(SessionSnapshot),
    /// Position sampled.
    PositionChanged(PositionState),
    /// Equalizer gains or preset changed.
    EqualizerChanged(EqualizerState),
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Creates a new application state instance.
    ///
    /// # Returns
    ///
    /// A new `AppState` instance.
    #[must_use]
    pub fn new() -> Self {
        let (state_tx, _) = channel(16);

        Self {
            session: Arc::new(RwLock::new(SessionSnapshot::default())),
            position: Arc::new(RwLock::new(PositionState::default())),
            equalizer: Arc::new(RwLock::new(EqualizerState::default())),
            state_tx,
        }
    }

    /// Updates the session snapshot and notifies subscribers.
    ///
    /// # Arguments
    ///
    /// * `snapshot` - New session snapshot.
    pub fn update_session(&self, snapshot: SessionSnapshot) {
        *self.session.write() = snapshot.clone();
        let _ = self.state_tx.send(AppStateEvent::SessionChanged(snapshot));
    }

    /// Updates the seek-bar position and notifies subscribers when it changed.
    ///
    /// # Arguments
    ///
    /// * `position` - New position.
    pub fn update_position(&self, position: PositionState) {
        {
            let mut current = self.position.write();
            if *current == position {
                return;
            }
            *current = position;
        }
        let _ = self.state_tx.send(AppStateEvent::PositionChanged(position));
    }

    /// Updates the equalizer settings and notifies subscribers.
    ///
    /// # Arguments
    ///
    /// * `equalizer` - New equalizer settings.
    pub fn update_equalizer(&self, equalizer: EqualizerState) {
        *self.equalizer.write() = equalizer.clone();
        let _ = self
            .state_tx
            .send(AppStateEvent::EqualizerChanged(equalizer));
    }

    /// Subscribes to application state changes.
    ///
    /// # Returns
    ///
    /// A broadcast receiver for state change events.
    pub fn subscribe(&self) -> Receiver<AppStateEvent> {
        self.state_tx.subscribe()
    }

    /// Gets the current session snapshot.
    pub fn get_session(&self) -> SessionSnapshot {
        self.session.read().clone()
    }

    /// Gets the current position.
    pub fn get_position(&self) -> PositionState {
        *self.position.read()
    }

    /// Gets the current equalizer settings.
    pub fn get_equalizer(&self) -> EqualizerState {
        self.equalizer.read().clone()
    }
}
