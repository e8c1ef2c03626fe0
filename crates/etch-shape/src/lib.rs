//! Display-line shaping.
//!
//! A stored line and the line a user sees are different sequences: tabs
//! expand to the next tab stop, control characters render as hex escapes,
//! spaces and line ends can be swapped for visible glyphs, and one extra
//! display slot always exists past the end so a caret can sit there. The
//! [`LineInfo`] built here is the transient unit the colorize pass fills in
//! and the paint pass consumes; it is rebuilt from scratch on every draw of
//! its line.
//!
//! Invariants:
//! * All parallel arrays (`text`, `pos`, `style`, `token`, `start`,
//!   `width`, `deco`) are always the same length and resized together.
//! * `pos` is non-decreasing, and `pos[last] >=` the logical line length.
//!   One logical column may span several display units (tab fill, control
//!   escapes); no display unit maps to more than one column.
//! * [`LineInfo::expand`] only grows, never shrinks.
//! * Shaping is deterministic: identical input text and options yield
//!   identical `text`/`pos` arrays.

use bitflags::bitflags;
use etch_style::Style;

mod metrics;

pub use metrics::{CellMetrics, FontMetrics};

/// Display columns per tab stop. Fixed; the options surface deliberately
/// does not expose it.
pub const TAB_STOP: usize = 8;

/// Glyph substituted for a space when spaces are visualized.
pub const SPACE_GLYPH: char = '\u{00B7}';
/// Glyph appended for a visualized line terminator.
pub const EOL_GLYPH: char = '\u{00B6}';

bitflags! {
    /// Per-unit decoration marks layered over the text styling.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Decoration: u8 {
        /// Primary caret sits on this unit.
        const CURSOR = 1 << 0;
        /// Block cursor outline covers this unit.
        const BLOCK = 1 << 1;
    }
}

/// Tokenizer output slice covering a run of logical columns. Stored per
/// line; display units refer to entries by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub style: etch_style::StyleId,
    /// Consumed length in logical characters; never zero once stored.
    pub len: u32,
}

/// Shaping toggles, sourced from the widget options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeOptions {
    pub show_space: bool,
    pub show_eol: bool,
}

/// One logical line's display form: parallel arrays indexed by display unit.
#[derive(Debug, Clone)]
pub struct LineInfo {
    /// The logical characters the display was derived from (terminator
    /// excluded).
    pub orig: Vec<char>,
    /// Display characters, one per unit.
    pub text: Vec<char>,
    /// 1-based origin column per unit; non-decreasing.
    pub pos: Vec<u32>,
    /// Resolved style per unit.
    pub style: Vec<Style>,
    /// Index into `tokens` for the token covering the unit, if any.
    pub token: Vec<Option<u32>>,
    /// True only on the first display unit of a token span.
    pub start: Vec<bool>,
    /// Measured pixel width per unit; filled by the colorize pass.
    pub width: Vec<u16>,
    /// Decoration bits per unit.
    pub deco: Vec<Decoration>,
    /// Token storage referenced by `token`.
    pub tokens: Vec<Token>,
    /// The logical line carried a trailing newline.
    pub terminated: bool,
    /// Default style applied to freshly pushed units.
    normal: Style,
}

impl LineInfo {
    fn empty(normal: Style, capacity: usize) -> Self {
        Self {
            orig: Vec::new(),
            text: Vec::with_capacity(capacity),
            pos: Vec::with_capacity(capacity),
            style: Vec::with_capacity(capacity),
            token: Vec::with_capacity(capacity),
            start: Vec::with_capacity(capacity),
            width: Vec::with_capacity(capacity),
            deco: Vec::with_capacity(capacity),
            tokens: Vec::new(),
            terminated: false,
            normal,
        }
    }

    /// Number of display units.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Highest origin column currently represented.
    pub fn last_col(&self) -> u32 {
        self.pos.last().copied().unwrap_or(0)
    }

    /// Display text as an owned string (paint-run assembly, tests).
    pub fn text_string(&self) -> String {
        self.text.iter().collect()
    }

    fn push_unit(&mut self, ch: char, col: u32) {
        self.text.push(ch);
        self.pos.push(col);
        self.style.push(self.normal);
        self.token.push(None);
        self.start.push(false);
        self.width.push(0);
        self.deco.push(Decoration::empty());
    }

    /// First display-unit index whose origin column is `>= x`.
    pub fn first_unit_at(&self, x: u32) -> usize {
        self.pos.partition_point(|&p| p < x)
    }

    /// Grow the line with space units so column `to_col` is representable.
    /// Synthesized columns map one-to-one. Never shrinks.
    pub fn expand(&mut self, to_col: u32) {
        while self.last_col() < to_col {
            let col = self.last_col() + 1;
            self.push_unit(' ', col);
        }
    }

    /// Overwrite the style of every unit with `x1 <= pos <= x2`.
    pub fn set_area(&mut self, x1: u32, x2: u32, style: Style) {
        debug_assert!(x1 >= 1, "columns are 1-based");
        if x2 < x1 {
            return;
        }
        self.expand(x2);
        let mut i = self.first_unit_at(x1);
        while i < self.len() && self.pos[i] <= x2 {
            self.style[i] = style;
            i += 1;
        }
    }

    /// Within `x1..=x2`, swap in `replacement`'s background on units whose
    /// current background equals `normal`'s. Token and selection
    /// backgrounds are left alone.
    pub fn set_background(&mut self, x1: u32, x2: u32, normal: Style, replacement: Style) {
        debug_assert!(x1 >= 1, "columns are 1-based");
        if x2 < x1 {
            return;
        }
        self.expand(x2);
        let mut i = self.first_unit_at(x1);
        while i < self.len() && self.pos[i] <= x2 {
            if self.style[i].bg == normal.bg {
                self.style[i].bg = replacement.bg;
            }
            i += 1;
        }
    }

    /// OR a decoration bit into the first display unit of column `x`.
    pub fn set_decoration(&mut self, x: u32, deco: Decoration) {
        debug_assert!(x >= 1, "columns are 1-based");
        self.expand(x);
        let i = self.first_unit_at(x);
        if i < self.len() {
            self.deco[i] |= deco;
        }
    }
}

/// Build the display form of one logical line.
///
/// `line` is the stored text without its terminator; `terminated` records
/// whether one followed. Column rules, in order over the input:
/// * space: a literal space, or [`SPACE_GLYPH`] under `show_space`.
/// * tab: space units up to the next multiple of [`TAB_STOP`] display
///   columns, every unit mapped to the tab's own column.
/// * control character (0..=31): `\` plus two lowercase hex digits, all
///   three units mapped to the character's column.
/// * anything else: one identity unit.
///
/// A synthetic final unit at column `len + 1` is always appended —
/// [`EOL_GLYPH`] when the line was terminated and `show_eol` is on, a space
/// otherwise — so "caret past end of line" always has a display slot.
///
/// Styles initialize to `normal`; token, width, and decoration data stay at
/// their defaults for the colorize pass to fill.
pub fn shape_line(line: &str, terminated: bool, opts: ShapeOptions, normal: Style) -> LineInfo {
    let mut info = LineInfo::empty(normal, line.len() + 1);
    info.orig = line.chars().collect();
    info.terminated = terminated;

    let mut col: u32 = 1;
    for i in 0..info.orig.len() {
        let ch = info.orig[i];
        match ch {
            ' ' => {
                let glyph = if opts.show_space { SPACE_GLYPH } else { ' ' };
                info.push_unit(glyph, col);
            }
            '\t' => {
                let fill = TAB_STOP - (info.text.len() % TAB_STOP);
                for _ in 0..fill {
                    info.push_unit(' ', col);
                }
            }
            c if (c as u32) < 32 => {
                let n = c as u32 as u8;
                const HEX: &[u8; 16] = b"0123456789abcdef";
                info.push_unit('\\', col);
                info.push_unit(HEX[(n >> 4) as usize] as char, col);
                info.push_unit(HEX[(n & 0x0f) as usize] as char, col);
            }
            c => info.push_unit(c, col),
        }
        col += 1;
    }

    let eol = if terminated && opts.show_eol { EOL_GLYPH } else { ' ' };
    info.push_unit(eol, col);
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use etch_style::{Color, FontVariant};

    fn plain() -> Style {
        Style::plain()
    }

    fn shaped(line: &str) -> LineInfo {
        shape_line(line, false, ShapeOptions::default(), plain())
    }

    #[test]
    fn tab_expands_to_next_stop_sharing_one_column() {
        let info = shaped("a\tb");
        assert_eq!(info.text_string(), "a       b ");
        assert_eq!(info.pos, vec![1, 2, 2, 2, 2, 2, 2, 2, 3, 4]);
        assert_eq!(info.last_col(), 4);
    }

    #[test]
    fn tab_at_stop_boundary_fills_a_whole_stop() {
        let info = shaped("12345678\tx");
        // Display column 8 is already a stop boundary, so the tab jumps a
        // full stop.
        assert_eq!(info.text.len(), 8 + 8 + 1 + 1);
        assert!(info.pos.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn control_characters_shape_to_three_hex_units() {
        let info = shaped("\u{1b}");
        assert_eq!(info.text_string(), "\\1b ");
        assert_eq!(info.pos, vec![1, 1, 1, 2]);
        let info = shaped("\u{0}");
        assert_eq!(info.text_string(), "\\00 ");
    }

    #[test]
    fn space_and_eol_glyph_substitution() {
        let opts = ShapeOptions {
            show_space: true,
            show_eol: true,
        };
        let info = shape_line("a b", true, opts, plain());
        assert_eq!(info.text, vec!['a', SPACE_GLYPH, 'b', EOL_GLYPH]);
        assert_eq!(info.pos, vec![1, 2, 3, 4]);

        // Unterminated lines never show the EOL glyph.
        let info = shape_line("a b", false, opts, plain());
        assert_eq!(info.text, vec!['a', SPACE_GLYPH, 'b', ' ']);
    }

    #[test]
    fn empty_line_still_gets_the_end_slot() {
        let info = shaped("");
        assert_eq!(info.len(), 1);
        assert_eq!(info.pos, vec![1]);
    }

    #[test]
    fn expand_grows_one_to_one_and_never_shrinks() {
        let mut info = shaped("ab");
        let before = info.len();
        info.expand(7);
        assert_eq!(info.pos.last().copied(), Some(7));
        assert_eq!(info.len(), before + 4);
        info.expand(2);
        assert_eq!(info.pos.last().copied(), Some(7));
        // Parallel arrays stay in lockstep.
        assert_eq!(info.style.len(), info.len());
        assert_eq!(info.width.len(), info.len());
        assert_eq!(info.deco.len(), info.len());
    }

    #[test]
    fn set_area_touches_only_the_column_range() {
        let sel = Style::new(Color::WHITE, Color::BLACK, FontVariant::Regular);
        let mut info = shaped("a\tbc");
        info.set_area(2, 3, sel);
        for (i, &p) in info.pos.iter().enumerate() {
            if (2..=3).contains(&p) {
                assert_eq!(info.style[i], sel, "unit {i} inside range");
            } else {
                assert_eq!(info.style[i], plain(), "unit {i} outside range");
            }
        }
    }

    #[test]
    fn set_area_past_line_end_expands_first() {
        let sel = Style::new(Color::WHITE, Color::BLACK, FontVariant::Regular);
        let mut info = shaped("ab");
        info.set_area(5, 6, sel);
        assert_eq!(info.last_col(), 6);
        let i = info.first_unit_at(5);
        assert_eq!(info.style[i], sel);
    }

    #[test]
    fn set_background_preserves_non_normal_backgrounds() {
        let normal = plain();
        let sel = Style::new(Color::WHITE, Color::BLACK, FontVariant::Regular);
        let wash = Style::new(Color::BLACK, Color::new(230, 230, 210), FontVariant::Regular);
        let mut info = shaped("abcd");
        info.set_area(2, 3, sel);
        info.set_background(1, info.last_col(), normal, wash);
        assert_eq!(info.style[0].bg, wash.bg);
        assert_eq!(info.style[1].bg, sel.bg, "selection background survives");
        assert_eq!(info.style[3].bg, wash.bg);
    }

    #[test]
    fn set_decoration_marks_only_the_first_unit_of_a_column() {
        let mut info = shaped("a\tb");
        info.set_decoration(2, Decoration::CURSOR);
        let i = info.first_unit_at(2);
        assert_eq!(info.deco[i], Decoration::CURSOR);
        assert!(info.deco[i + 1].is_empty(), "tab fill units stay unmarked");
    }

    #[test]
    fn decoration_past_end_of_line_is_representable() {
        let mut info = shaped("ab");
        info.set_decoration(9, Decoration::BLOCK);
        assert_eq!(info.last_col(), 9);
        let i = info.first_unit_at(9);
        assert!(info.deco[i].contains(Decoration::BLOCK));
    }
}

