//! Source ranges and byte-offset to line/column conversion

use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open byte range `[start, end)` into an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: usize,
    pub end: usize,
}

impl SourceRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest range covering both `self` and `other`
    pub fn cover(self, other: SourceRange) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Number of bytes in the range (0 when `end < start`)
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check the range is well-formed for a text of `text_len` bytes
    pub fn fits(&self, text_len: usize) -> bool {
        self.start <= self.end && self.end <= text_len
    }
}

impl From<(usize, usize)> for SourceRange {
    fn from((start, end): (usize, usize)) -> Self {
        Self { start, end }
    }
}

/// Line/column view of a range start.
///
/// `line` is 1-based. `column` counts the characters consumed on the
/// line before the target offset, so the first character of a line is
/// column 0. The renderer aligns its markers on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position2d {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position2d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{})", self.line, self.column)
    }
}

/// Map the start of `range` onto a line/column pair within `text`.
///
/// An offset sitting on a newline belongs to the line the newline ends.
/// Offsets past the end of the text yield the position after the last
/// character.
pub fn to_2d(text: &str, range: SourceRange) -> Position2d {
    let mut lines_seen = 0;
    let mut column = 0;

    for (idx, c) in text.char_indices() {
        if idx >= range.start {
            break;
        }

        if c == '\n' {
            lines_seen += 1;
            column = 0;
        } else {
            column += 1;
        }
    }

    Position2d {
        line: lines_seen + 1,
        column,
    }
}

/// Byte offset at which the 1-based `line` begins
pub fn line_start_offset(text: &str, line: usize) -> usize {
    if line <= 1 {
        return 0;
    }

    text.match_indices('\n')
        .nth(line - 2)
        .map(|(i, _)| i + 1)
        .unwrap_or(text.len())
}

/// Text of the 1-based `line`, without its trailing newline
pub fn line_text(text: &str, line: usize) -> &str {
    text.split('\n').nth(line.saturating_sub(1)).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let pos = to_2d("    abcde", SourceRange::new(4, 8));
        assert_eq!(pos, Position2d { line: 1, column: 4 });
    }

    #[test]
    fn test_multi_line() {
        let pos = to_2d("\n    abcde", SourceRange::new(5, 9));
        assert_eq!(pos, Position2d { line: 2, column: 4 });
    }

    #[test]
    fn test_start_of_text() {
        let pos = to_2d("abc", SourceRange::new(0, 1));
        assert_eq!(pos, Position2d { line: 1, column: 0 });
    }

    #[test]
    fn test_offset_on_newline_belongs_to_previous_line() {
        let pos = to_2d("ab\ncd", SourceRange::new(2, 3));
        assert_eq!(pos, Position2d { line: 1, column: 2 });

        let pos = to_2d("ab\ncd", SourceRange::new(3, 4));
        assert_eq!(pos, Position2d { line: 2, column: 0 });
    }

    #[test]
    fn test_offset_beyond_text_does_not_panic() {
        // Boundary case: the scan runs off the end and reports the final counters.
        let pos = to_2d("ab\ncd", SourceRange::new(42, 43));
        assert_eq!(pos, Position2d { line: 2, column: 2 });

        let pos = to_2d("", SourceRange::new(3, 3));
        assert_eq!(pos, Position2d { line: 1, column: 0 });
    }

    #[test]
    fn test_multibyte_counts_characters() {
        // "é" is two bytes
        let pos = to_2d("é{a=\"b\"}", SourceRange::new(2, 9));
        assert_eq!(pos, Position2d { line: 1, column: 1 });
    }

    #[test]
    fn test_display() {
        assert_eq!(Position2d { line: 3, column: 7 }.to_string(), "(3:7)");
    }

    #[test]
    fn test_line_helpers() {
        let text = "first\nsecond\nthird";
        assert_eq!(line_start_offset(text, 1), 0);
        assert_eq!(line_start_offset(text, 2), 6);
        assert_eq!(line_start_offset(text, 3), 13);
        assert_eq!(line_text(text, 2), "second");
        assert_eq!(line_text(text, 9), "");
    }

    #[test]
    fn test_range_helpers() {
        let r = SourceRange::new(2, 5).cover(SourceRange::new(4, 9));
        assert_eq!(r, SourceRange::new(2, 9));
        assert_eq!(r.len(), 7);
        assert!(r.fits(9));
        assert!(!r.fits(8));
        assert!(!SourceRange::new(5, 2).fits(10));
        assert!(SourceRange::new(5, 2).is_empty());
    }
}
