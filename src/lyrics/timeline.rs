//! Follows playback position through a parsed lyric sheet.

use crate::lyrics::parser::{LyricLine, current_line_index, parse_lyrics};

/// Current-line transition reported by [`LyricTimeline::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineChange {
    /// Line that was current before.
    pub previous: Option<usize>,
    /// Line that is current now.
    pub current: Option<usize>,
}

/// Parsed lyrics for one track plus the line currently highlighted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricTimeline {
    lines: Vec<LyricLine>,
    current: Option<usize>,
}

impl LyricTimeline {
    /// Parses `text` into a timeline positioned before the first line.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: parse_lyrics(text),
            current: None,
        }
    }

    /// All lines in time order.
    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    /// Whether the sheet had no timed lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Index of the current line.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// The current line.
    pub fn current_line(&self) -> Option<&LyricLine> {
        self.current.and_then(|i| self.lines.get(i))
    }

    /// Moves to `position_ms`; returns the transition if the current line changed.
    ///
    /// Works for seeks in either direction.
    pub fn advance(&mut self, position_ms: i64) -> Option<LineChange> {
        let current = current_line_index(&self.lines, position_ms);
        if current == self.current {
            return None;
        }
        let change = LineChange {
            previous: self.current,
            current,
        };
        self.current = current;
        Some(change)
    }
}
