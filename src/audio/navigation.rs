//! Pure transport decisions.
//!
//! These functions decide *where* to go next from the play mode, the current
//! index and the list length. They do no I/O. The randomness source is passed
//! in, so shuffle can be tested deterministically.

use rand::Rng;

use crate::library::models::PlayMode::{self, RepeatOne, Sequential, Shuffle};

/// What to do when the current track plays to its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfTrack {
    /// Start the entry at this index.
    Advance(usize),
    /// Rewind the current track to zero and play it again.
    Restart,
    /// Nothing to play.
    Idle,
}

/// Index an explicit "next" moves to.
///
/// Sequential and repeat-one wrap forward; with no current index they start
/// at 0. Shuffle picks uniformly among the other entries, independently on
/// every call, so repeats across calls are possible.
pub fn next_index<R: Rng + ?Sized>(
    mode: PlayMode,
    current: Option<usize>,
    len: usize,
    rng: &mut R,
) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match mode {
        Shuffle => random_other(current, len, rng),
        Sequential | RepeatOne => current.map_or(0, |index| (index + 1) % len),
    })
}

/// Index an explicit "previous" moves to.
///
/// Wraps from the first entry to the last; with no current index it goes to
/// the last entry. Shuffle behaves as in [`next_index`].
pub fn previous_index<R: Rng + ?Sized>(
    mode: PlayMode,
    current: Option<usize>,
    len: usize,
    rng: &mut R,
) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match mode {
        Shuffle => random_other(current, len, rng),
        Sequential | RepeatOne => current
            .and_then(|index| index.checked_sub(1))
            .filter(|index| *index < len)
            .unwrap_or(len - 1),
    })
}

/// Natural end-of-track transition.
///
/// Repeat-one restarts the same track; the other modes advance as an
/// explicit "next" would.
pub fn on_track_ended<R: Rng + ?Sized>(
    mode: PlayMode,
    current: Option<usize>,
    len: usize,
    rng: &mut R,
) -> EndOfTrack {
    match mode {
        RepeatOne => EndOfTrack::Restart,
        Sequential | Shuffle => {
            next_index(mode, current, len, rng).map_or(EndOfTrack::Idle, EndOfTrack::Advance)
        }
    }
}

/// Uniform pick over `0..len` excluding `current` (when `len > 1`).
fn random_other<R: Rng + ?Sized>(current: Option<usize>, len: usize, rng: &mut R) -> usize {
    match current {
        Some(current) if len > 1 && current < len => {
            let pick = rng.gen_range(0..len - 1);
            if pick >= current { pick + 1 } else { pick }
        }
        _ => rng.gen_range(0..len),
    }
}
