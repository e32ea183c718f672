//! Time-synced lyrics.
//!
//! Lyrics arrive as line-oriented timed text (`[mm:ss.cc]text`). The parser
//! turns that into sorted lines, and the timeline follows the playback
//! position to report which line is current.

pub mod parser;
pub mod timeline;

pub use {
    parser::{LyricLine, current_line_index, parse_lyrics},
    timeline::{LineChange, LyricTimeline},
};
