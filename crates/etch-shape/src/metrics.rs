//! Font measurement seam.
//!
//! The core never talks to a font engine; hosts implement [`FontMetrics`]
//! over whatever text stack they render with. [`CellMetrics`] is the
//! monospace reference implementation used by tests and terminal-like
//! hosts: one cell per `unicode-width` column at a fixed pixel advance.

use etch_style::Style;
use unicode_width::UnicodeWidthChar;

pub trait FontMetrics {
    /// Pixel advance of `ch` rendered in `style`.
    fn char_width(&self, ch: char, style: &Style) -> u16;

    /// Pixel height of one display row.
    fn line_height(&self) -> u16;

    /// Advance of a plain space; the unit for horizontal scroll margins and
    /// past-end-of-line extrapolation.
    fn space_width(&self, style: &Style) -> u16 {
        self.char_width(' ', style)
    }
}

/// Fixed-cell metrics: every character occupies its `unicode-width` column
/// count times a constant advance.
#[derive(Debug, Clone, Copy)]
pub struct CellMetrics {
    pub cell_width: u16,
    pub cell_height: u16,
}

impl Default for CellMetrics {
    fn default() -> Self {
        Self {
            cell_width: 8,
            cell_height: 16,
        }
    }
}

impl FontMetrics for CellMetrics {
    fn char_width(&self, ch: char, _style: &Style) -> u16 {
        let cells = ch.width().unwrap_or(1).max(1) as u16;
        cells * self.cell_width
    }

    fn line_height(&self) -> u16 {
        self.cell_height
    }
}
