//! Timed-text lyric parsing.

use std::sync::LazyLock;

use {
    regex::Regex,
    serde::{Deserialize, Serialize},
};

/// Leading `[mm:ss]` or `[mm:ss.cc]` tag followed by the line text.
static TIME_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(\d{2}):(\d{2})(?:\.(\d{2}))?\](.*)$").expect("lyric tag pattern is valid")
});

/// One timed lyric line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricLine {
    /// Offset from the start of the track, in milliseconds.
    pub time_ms: i64,
    /// Line text, trimmed.
    pub text: String,
}

/// Parses timed-text lyrics.
///
/// Lines without a leading tag, and lines whose text is empty after the
/// tag, are skipped. A malformed line never fails the whole parse. The
/// result is sorted by time; lines sharing a timestamp keep source order.
///
/// # Examples
///
/// ```
/// use melodeck::lyrics::parse_lyrics;
///
/// let lines = parse_lyrics("[00:05.50]second\n[00:01]first\nno tag");
/// assert_eq!(lines.len(), 2);
/// assert_eq!(lines[0].time_ms, 1000);
/// assert_eq!(lines[1].time_ms, 5500);
/// ```
#[must_use]
pub fn parse_lyrics(text: &str) -> Vec<LyricLine> {
    let mut lines: Vec<LyricLine> = text.lines().filter_map(parse_line).collect();
    lines.sort_by_key(|line| line.time_ms);
    lines
}

fn parse_line(raw: &str) -> Option<LyricLine> {
    let captures = TIME_TAG.captures(raw.trim())?;

    let minutes: i64 = captures.get(1)?.as_str().parse().ok()?;
    let seconds: i64 = captures.get(2)?.as_str().parse().ok()?;
    let centis: i64 = match captures.get(3) {
        Some(c) => c.as_str().parse().ok()?,
        None => 0,
    };

    let text = captures.get(4)?.as_str().trim();
    if text.is_empty() {
        return None;
    }

    Some(LyricLine {
        time_ms: (minutes * 60 + seconds) * 1000 + centis * 10,
        text: text.to_string(),
    })
}

/// Index of the last line whose time is at or before `position_ms`.
///
/// Returns `None` when the position precedes the first line or there are
/// no lines. `lines` must be sorted, as `parse_lyrics` returns them.
#[must_use]
pub fn current_line_index(lines: &[LyricLine], position_ms: i64) -> Option<usize> {
    lines
        .partition_point(|line| line.time_ms <= position_ms)
        .checked_sub(1)
}

#[cfg(test)]
mod tests {
    use crate::lyrics::parser::{LyricLine, current_line_index, parse_lyrics};

    fn line(time_ms: i64, text: &str) -> LyricLine {
        LyricLine {
            time_ms,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_timestamp_arithmetic() {
        let lines = parse_lyrics("[01:02.03]a\n[10:00]b\n[00:00.99]c");
        assert_eq!(
            lines,
            vec![line(990, "c"), line(62_030, "a"), line(600_000, "b")]
        );
    }

    #[test]
    fn test_untagged_and_empty_lines_are_dropped() {
        let text = "[ti:Some Title]\nplain text\n[00:01.00]   \n\n  [00:02.00]  kept  \n[0:03]short";
        assert_eq!(parse_lyrics(text), vec![line(2000, "kept")]);
    }

    #[test]
    fn test_tag_must_lead_the_line() {
        assert!(parse_lyrics("intro [00:01.00]late tag").is_empty());
        assert!(parse_lyrics("[00:01.234]three digit centis").is_empty());
    }

    #[test]
    fn test_output_is_sorted_regardless_of_input_order() {
        let lines = parse_lyrics("[00:30]c\n[00:10]a\n[00:20]b\n[00:10]a2");
        let times: Vec<_> = lines.iter().map(|l| l.time_ms).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["a", "a2", "b", "c"]);
    }

    #[test]
    fn test_current_line_resolution() {
        let lines = vec![line(0, "one"), line(5000, "two"), line(12_000, "three")];
        assert_eq!(current_line_index(&lines, 6000), Some(1));
        assert_eq!(current_line_index(&lines, -1), None);
        assert_eq!(current_line_index(&lines, 12_000), Some(2));
        assert_eq!(current_line_index(&lines, 0), Some(0));
        assert_eq!(current_line_index(&lines, 4999), Some(0));
        assert_eq!(current_line_index(&[], 1000), None);
    }

    #[test]
    fn test_crlf_input() {
        let lines = parse_lyrics("[00:01.00]one\r\n[00:02.00]two\r\n");
        assert_eq!(lines, vec![line(1000, "one"), line(2000, "two")]);
    }
}
