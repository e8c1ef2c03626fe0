//! Word-boundary arithmetic over a single line.
//!
//! Columns are 1-based characters, matching the rest of the core. A "word"
//! is any Unicode word-bound segment containing a non-whitespace character,
//! so punctuation runs count as words the way desktop editors treat them.

use unicode_segmentation::UnicodeSegmentation;

/// Column of the first word start strictly after `x`; past end of line
/// (`len + 1`) when no further word exists.
pub fn next_start(line: &str, x: u32) -> u32 {
    let mut col = 1u32;
    for seg in line.split_word_bounds() {
        let is_word = seg.chars().any(|c| !c.is_whitespace());
        if is_word && col > x {
            return col;
        }
        col += seg.chars().count() as u32;
    }
    line.chars().count() as u32 + 1
}

/// Column of the last word start strictly before `x`; column 1 when none.
pub fn prev_start(line: &str, x: u32) -> u32 {
    let mut col = 1u32;
    let mut best = 1u32;
    for seg in line.split_word_bounds() {
        let is_word = seg.chars().any(|c| !c.is_whitespace());
        if is_word && col < x {
            best = col;
        }
        col += seg.chars().count() as u32;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_jumps_land_on_word_starts() {
        let line = "foo bar baz";
        assert_eq!(next_start(line, 1), 5);
        assert_eq!(next_start(line, 5), 9);
        assert_eq!(next_start(line, 9), 12);
        assert_eq!(next_start(line, 12), 12);
    }

    #[test]
    fn backward_jumps_land_on_word_starts() {
        let line = "foo bar baz";
        assert_eq!(prev_start(line, 12), 9);
        assert_eq!(prev_start(line, 9), 5);
        assert_eq!(prev_start(line, 5), 1);
        assert_eq!(prev_start(line, 1), 1);
    }

    #[test]
    fn punctuation_and_wide_text_segment() {
        let line = "a,b 漢字x";
        // "," is its own bound; every non-whitespace segment is a stop.
        assert_eq!(next_start(line, 1), 2);
        assert_eq!(next_start(line, 2), 3);
        assert_eq!(next_start(line, 3), 5);
        assert_eq!(prev_start(line, 5), 3);
    }

    #[test]
    fn empty_and_blank_lines() {
        assert_eq!(next_start("", 1), 1);
        assert_eq!(next_start("   ", 1), 4);
        assert_eq!(prev_start("   ", 3), 1);
    }
}
