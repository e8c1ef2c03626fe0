//! Style primitives shared by every display-facing crate.
//!
//! Three layers, all immutable once built:
//! * `Style` — a resolved (foreground, background, font variant) triple.
//! * `StyleTable` — index-addressed style storage; tokenizers hand out
//!   `StyleId`s, the colorize pass resolves them here exactly once per unit.
//! * `ColorScheme` — the closed set of named roles the widget itself styles
//!   with (normal text, selection, current line, tab highlight, caret).
//!
//! Invariants:
//! * `StyleTable` never changes after construction; scheme swaps happen by
//!   replacing the shared `Arc<ColorScheme>`, never by mutating one in place.
//! * An out-of-range `StyleId` resolves to the table's first entry rather
//!   than panicking; the miss is logged at TRACE.

use serde::Deserialize;
use std::sync::Arc;
use tracing::trace;

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "[u8; 3]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);
}

impl From<[u8; 3]> for Color {
    fn from(v: [u8; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Font rendering variant for a display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontVariant {
    #[default]
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

/// A fully resolved display style. Cheap to copy; stored per display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    #[serde(default)]
    pub variant: FontVariant,
}

impl Style {
    pub const fn new(fg: Color, bg: Color, variant: FontVariant) -> Self {
        Self { fg, bg, variant }
    }

    /// Plain black-on-white regular text.
    pub const fn plain() -> Self {
        Self::new(Color::BLACK, Color::WHITE, FontVariant::Regular)
    }
}

/// Index into a [`StyleTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StyleId(pub u16);

/// Immutable mapping from [`StyleId`] to [`Style`].
///
/// Index 0 doubles as the fallback entry for unknown ids, so a table always
/// holds at least one style.
#[derive(Debug, Clone)]
pub struct StyleTable {
    styles: Vec<Style>,
}

impl StyleTable {
    pub fn new(styles: Vec<Style>) -> Self {
        debug_assert!(!styles.is_empty(), "style table requires a fallback entry");
        let styles = if styles.is_empty() {
            vec![Style::plain()]
        } else {
            styles
        };
        Self { styles }
    }

    /// Single-entry table resolving every id to `style`.
    pub fn uniform(style: Style) -> Self {
        Self::new(vec![style])
    }

    pub fn get(&self, id: StyleId) -> Style {
        match self.styles.get(id.0 as usize) {
            Some(s) => *s,
            None => {
                trace!(target: "style.table", id = id.0, len = self.styles.len(), "style_id_out_of_range");
                self.styles[0]
            }
        }
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

/// The closed set of style roles the widget assigns on its own authority.
///
/// Token styles come from the tokenizer through the [`StyleTable`]; these
/// roles cover everything else the editor paints: untokenized text, the
/// selection overlay, the current-line wash, highlighted tabs, and the caret.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColorScheme {
    pub normal: Style,
    pub selection: Style,
    pub current_line: Style,
    pub special: Style,
    pub cursor: Style,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            normal: Style::plain(),
            selection: Style::new(Color::WHITE, Color::new(48, 96, 192), FontVariant::Regular),
            current_line: Style::new(Color::BLACK, Color::new(235, 235, 220), FontVariant::Regular),
            special: Style::new(Color::new(160, 48, 48), Color::WHITE, FontVariant::Regular),
            cursor: Style::new(Color::new(192, 32, 32), Color::WHITE, FontVariant::Regular),
        }
    }
}

impl ColorScheme {
    pub fn into_shared(self) -> Arc<ColorScheme> {
        Arc::new(self)
    }
}
