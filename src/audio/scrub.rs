//! Optimistic seek-bar position during interactive scrubbing.
//!
//! While the user drags, the seek bar shows the drag position. After the
//! drag is committed the engine needs a moment to report the new position,
//! so the drag position keeps showing for a short settle window.

use std::time::{Duration, Instant};

/// Tracks a drag on the seek bar.
#[derive(Debug, Clone)]
pub struct SeekScrubber {
    settle: Duration,
    dragging: bool,
    drag_position_ms: u64,
    committed_at: Option<Instant>,
}

impl SeekScrubber {
    /// Creates a scrubber with the given settle window.
    #[must_use]
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            dragging: false,
            drag_position_ms: 0,
            committed_at: None,
        }
    }

    /// Whether a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Starts or continues a drag at `position_ms`.
    pub fn drag_to(&mut self, position_ms: u64) {
        self.dragging = true;
        self.drag_position_ms = position_ms;
        self.committed_at = None;
    }

    /// Ends the drag and returns the position to seek to.
    pub fn commit(&mut self, now: Instant) -> Option<u64> {
        if !self.dragging {
            return None;
        }
        self.dragging = false;
        self.committed_at = Some(now);
        Some(self.drag_position_ms)
    }

    /// Abandons the drag without seeking.
    pub fn cancel(&mut self) {
        self.dragging = false;
        self.committed_at = None;
    }

    /// Position the seek bar should show.
    pub fn displayed_position(&self, engine_position_ms: u64, now: Instant) -> u64 {
        let settling = self
            .committed_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.settle);
        if self.dragging || settling {
            self.drag_position_ms
        } else {
            engine_position_ms
        }
    }
}
