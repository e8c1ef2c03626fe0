//! Selection state and per-widget display options.
//!
//! The selection is two optional marks, each a named cursor owned by the
//! buffer's registry — the model holds handles, never positions. Ordering
//! is recomputed from the live cursor positions on every query, so a drag
//! that crosses back over its anchor needs no special casing.
//!
//! States: unselected (no marks) → mark-set (anchor only) → selected (both)
//! → unselected again on clear or when a drag releases over an empty range.
//! Clearing never touches buffer content; deleting does, then clears.

use etch_shape::ShapeOptions;
use etch_text::{CursorFlags, CursorId, Position, TextModel};
use tracing::debug;

const MARK_A: &str = "etch.mark.a";
const MARK_B: &str = "etch.mark.b";

/// Two ordered mark handles defining an inclusive-exclusive range.
#[derive(Debug, Default)]
pub struct SelectionModel {
    mark_a: Option<CursorId>,
    mark_b: Option<CursorId>,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor a pending selection at `pos`, discarding any previous range.
    pub fn set_start_mark<M: TextModel>(&mut self, model: &mut M, pos: Position) {
        if let Some(b) = self.mark_b.take() {
            model.free_cursor(b);
        }
        let a = model.get_or_create_cursor(MARK_A, CursorFlags::TRACK_EDITS);
        model.cursor_goto(a, pos);
        self.mark_a = Some(a);
        debug!(target: "state.selection", y = pos.y, x = pos.x, "anchor_set");
    }

    /// Place or move the second endpoint. Requires an anchor.
    pub fn set_end_mark<M: TextModel>(&mut self, model: &mut M, pos: Position) {
        debug_assert!(self.mark_a.is_some(), "end mark without an anchor");
        if self.mark_a.is_none() {
            return;
        }
        let b = model.get_or_create_cursor(MARK_B, CursorFlags::TRACK_EDITS);
        model.cursor_goto(b, pos);
        self.mark_b = Some(b);
    }

    /// Both marks placed. A zero-width range still counts until the drag
    /// releases.
    pub fn is_selected(&self) -> bool {
        self.mark_a.is_some() && self.mark_b.is_some()
    }

    /// An anchor exists (with or without a second endpoint yet).
    pub fn is_anchored(&self) -> bool {
        self.mark_a.is_some()
    }

    /// Ordered `(start, end)` positions; `None` unless both marks exist.
    /// Ordering reflects current buffer positions, not placement order.
    pub fn range<M: TextModel>(&self, model: &M) -> Option<(Position, Position)> {
        let a = model.cursor_pos(self.mark_a?)?;
        let b = model.cursor_pos(self.mark_b?)?;
        Some(if b < a { (b, a) } else { (a, b) })
    }

    pub fn start_mark<M: TextModel>(&self, model: &M) -> Position {
        let r = self.range(model);
        debug_assert!(r.is_some(), "start_mark without a selection");
        r.map(|(s, _)| s).unwrap_or(Position::origin())
    }

    pub fn end_mark<M: TextModel>(&self, model: &M) -> Position {
        let r = self.range(model);
        debug_assert!(r.is_some(), "end_mark without a selection");
        r.map(|(_, e)| e).unwrap_or(Position::origin())
    }

    /// Drop both marks. Buffer content is untouched.
    pub fn clear<M: TextModel>(&mut self, model: &mut M) {
        if let Some(a) = self.mark_a.take() {
            model.free_cursor(a);
        }
        if let Some(b) = self.mark_b.take() {
            model.free_cursor(b);
        }
    }

    /// Mouse-up: an empty range is no selection at all.
    pub fn release_drag<M: TextModel>(&mut self, model: &mut M) {
        if let Some((s, e)) = self.range(model)
            && s == e
        {
            debug!(target: "state.selection", "empty_drag_cleared");
            self.clear(model);
        }
    }

    /// Remove the selected span from the buffer, then clear. Returns false
    /// when there is nothing to delete.
    pub fn delete<M: TextModel>(&mut self, model: &mut M) -> bool {
        let Some((s, e)) = self.range(model) else {
            return false;
        };
        if s == e {
            self.clear(model);
            return false;
        }
        let deleted = model.delete_area(s, e);
        self.clear(model);
        deleted
    }

    /// Intersection of the selection with line `y` as inclusive display
    /// columns, where `line_end` is the line's last selectable column
    /// (length + 1). Lines strictly between the mark rows select fully;
    /// endpoint rows select from the anchor-side column inclusive up to one
    /// column before the end mark.
    pub fn span_on_line<M: TextModel>(&self, model: &M, y: u32, line_end: u32) -> Option<(u32, u32)> {
        let (s, e) = self.range(model)?;
        span_on_line(s, e, y, line_end)
    }
}

/// Line-intersection arithmetic behind [`SelectionModel::span_on_line`],
/// split out so the view layer can reuse it with an already-fetched range.
pub fn span_on_line(s: Position, e: Position, y: u32, line_end: u32) -> Option<(u32, u32)> {
    if s == e || y < s.y || y > e.y {
        return None;
    }
    let (x1, x2) = if s.y == e.y {
        (s.x, e.x.checked_sub(1)?)
    } else if y == s.y {
        (s.x, line_end)
    } else if y == e.y {
        (1, e.x.checked_sub(1)?)
    } else {
        (1, line_end)
    };
    if x2 < x1 { None } else { Some((x1, x2)) }
}

/// Runtime display toggles, applied per widget.
#[derive(Debug, Clone, Copy)]
pub struct EditorOptions {
    pub show_space: bool,
    pub show_eol: bool,
    pub highlight_tabs: bool,
    pub show_current_line: bool,
    /// Horizontal scroll margin, in multiples of the space advance.
    pub h_scroll_offset: u16,
    /// Decorate the caret column with a block outline as well.
    pub block_cursor: bool,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            show_space: false,
            show_eol: false,
            highlight_tabs: false,
            show_current_line: false,
            h_scroll_offset: 2,
            block_cursor: false,
        }
    }
}

impl EditorOptions {
    pub fn shape(&self) -> ShapeOptions {
        ShapeOptions {
            show_space: self.show_space,
            show_eol: self.show_eol,
        }
    }
}
