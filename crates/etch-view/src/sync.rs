//! The draw/update state machine.
//!
//! Three refresh grades, cheapest wins:
//! * line-granular — only explicitly dirtied rows rebuild;
//! * scrolled — surviving rows block-copy on the surface, row caches shift
//!   in place, and only the entering fringe rebuilds;
//! * full — the whole viewport rebuilds (size change, origin change, or a
//!   scroll of a screenful or more).
//!
//! `update` walks display rows in order. Each not-drawn row is reshaped and
//! recolorized; if its rebuilt content hashes identically to what is on
//! screen the surface writes are skipped. A row whose lexical end state
//! differs from the cached value flags the next row, which is how
//! multi-line constructs (an opened block comment) propagate without ever
//! recoloring more than the rows that can actually change.

use crate::cache::RowSnapshot;
use crate::dirty::DirtyRows;
use crate::surface::{HostWindow, Rect, RenderSurface};
use etch_shape::{Decoration, FontMetrics, LineInfo, shape_line};
use etch_state::{EditorOptions, span_on_line};
use etch_style::{ColorScheme, StyleTable};
use etch_syntax::{ColorizeContext, ColorizeHook, Lexer, colorize};
use etch_text::{Position, TextModel};
use tracing::{debug, trace};

/// Everything a draw pass borrows from the widget for the duration of one
/// dispatch turn.
pub struct PaintEnv<'a, M: TextModel, L: Lexer> {
    pub model: &'a M,
    pub lexer: &'a mut L,
    pub hooks: &'a mut [Box<dyn ColorizeHook>],
    pub table: &'a StyleTable,
    pub scheme: &'a ColorScheme,
    pub metrics: &'a dyn FontMetrics,
    pub opts: EditorOptions,
    /// Primary caret position.
    pub cursor: Position,
    /// Ordered selection range, if one exists.
    pub selection: Option<(Position, Position)>,
}

/// Per-widget viewport state: scroll origin, row caches, dirty flags.
pub struct ViewSync<L: Lexer> {
    width_px: u32,
    height_px: u32,
    top_line: u32,
    x_origin: u32,
    rows: usize,
    drawn: Vec<bool>,
    states: Vec<Option<L::State>>,
    snaps: Vec<Option<RowSnapshot>>,
    refresh_full: bool,
    /// Top line at the moment the first un-drawn scroll happened.
    refresh_move: Option<u32>,
    dirty: DirtyRows,
    // Repaint introspection for tests and diagnostics.
    last_paint_kind: Option<&'static str>,
    last_painted: Vec<u32>,
}

impl<L: Lexer> Default for ViewSync<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Lexer> ViewSync<L> {
    pub fn new() -> Self {
        Self {
            width_px: 0,
            height_px: 0,
            top_line: 0,
            x_origin: 0,
            rows: 0,
            drawn: Vec::new(),
            states: Vec::new(),
            snaps: Vec::new(),
            refresh_full: true,
            refresh_move: None,
            dirty: DirtyRows::new(),
            last_paint_kind: None,
            last_painted: Vec::new(),
        }
    }

    pub fn top_line(&self) -> u32 {
        self.top_line
    }

    pub fn x_origin(&self) -> u32 {
        self.x_origin
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Resize the widget extent. Row-capacity changes are detected at draw
    /// time against the current font metrics.
    pub fn set_size(&mut self, width_px: u32, height_px: u32) {
        if width_px != self.width_px || height_px != self.height_px {
            self.width_px = width_px;
            self.height_px = height_px;
            self.refresh_full = true;
        }
    }

    /// Force a full repaint on the next draw.
    pub fn invalidate_all(&mut self) {
        self.refresh_full = true;
    }

    pub fn invalidate_line(&mut self, y: u32) {
        self.dirty.mark(y);
    }

    pub fn invalidate_range(&mut self, from: u32, to: u32) {
        self.dirty.mark_range(from, to);
    }

    /// Invalidate `y` and everything below (line count changed).
    pub fn invalidate_from(&mut self, y: u32) {
        self.dirty.mark_from(y);
    }

    /// Scroll the viewport top. The pre-scroll top is remembered so the
    /// next draw can block-copy the surviving rows.
    pub fn scroll_to(&mut self, top: u32) {
        if top == self.top_line {
            return;
        }
        if self.refresh_move.is_none() {
            self.refresh_move = Some(self.top_line);
        }
        self.top_line = top;
    }

    /// Move the horizontal pixel origin. Any change is a full repaint.
    pub fn set_x_origin(&mut self, origin: u32) {
        if origin != self.x_origin {
            self.x_origin = origin;
            self.refresh_full = true;
        }
    }

    /// Which repaint grade the last draw used: "full", "scroll", "lines",
    /// or "none".
    pub fn last_paint_kind(&self) -> Option<&'static str> {
        self.last_paint_kind
    }

    /// Buffer lines whose pixels were rewritten during the last draw.
    pub fn last_painted_lines(&self) -> &[u32] {
        &self.last_painted
    }

    /// Run one redraw: settle the refresh grade, then rebuild and paint
    /// every row that needs it.
    pub fn draw<M: TextModel, S: RenderSurface + ?Sized>(
        &mut self,
        env: &mut PaintEnv<'_, M, L>,
        surface: &mut S,
    ) {
        let line_height = env.metrics.line_height() as u32;
        if line_height == 0 || self.width_px == 0 {
            return;
        }
        let rows = (self.height_px / line_height) as usize;
        if rows != self.rows {
            self.rows = rows;
            self.drawn = vec![false; rows];
            self.states = vec![None; rows];
            self.snaps = vec![None; rows];
            self.refresh_full = true;
        }

        let mut kind = "none";
        if let Some(old_top) = self.refresh_move.take()
            && !self.refresh_full
        {
            let delta = self.top_line as i64 - old_top as i64;
            if delta != 0 {
                if delta.unsigned_abs() as usize >= rows {
                    debug!(target: "view.sync", delta, rows, "scroll_promoted_full");
                    self.refresh_full = true;
                } else {
                    self.shift_rows(delta, line_height, surface);
                    kind = "scroll";
                }
            }
        }

        if self.refresh_full {
            kind = "full";
            self.refresh_full = false;
            self.refresh_move = None;
            self.dirty.clear();
            for row in 0..self.rows {
                self.drawn[row] = false;
                self.states[row] = None;
                self.snaps[row] = None;
            }
        } else {
            let dirty = self.dirty.take_in_view(self.top_line, self.rows as u32);
            if !dirty.is_empty() && kind == "none" {
                kind = "lines";
            }
            for y in dirty {
                let row = (y - self.top_line) as usize;
                self.drawn[row] = false;
            }
        }
        self.last_paint_kind = Some(kind);
        trace!(target: "view.sync", kind, top = self.top_line, "draw");

        self.update(env, surface);
    }

    /// Rebuild and paint every not-drawn row, in display order.
    pub fn update<M: TextModel, S: RenderSurface + ?Sized>(
        &mut self,
        env: &mut PaintEnv<'_, M, L>,
        surface: &mut S,
    ) {
        let line_height = env.metrics.line_height() as u32;
        self.last_painted.clear();
        let line_count = env.model.line_count();
        for row in 0..self.rows {
            if self.drawn[row] {
                continue;
            }
            let y = self.top_line + row as u32;
            let row_y = (row as u32 * line_height) as i32;
            if y >= line_count {
                // Below-content area: plain background.
                surface.fill_rect(
                    Rect::new(0, row_y, self.width_px, line_height),
                    env.scheme.normal.bg,
                );
                self.drawn[row] = true;
                self.states[row] = None;
                self.snaps[row] = None;
                continue;
            }
            let (info, end_state) = Self::rebuild(env, y);
            let snap = RowSnapshot::of(&info);
            if self.snaps[row] != Some(snap) {
                self.paint_row(env, surface, &info, row_y, line_height);
                self.snaps[row] = Some(snap);
                self.last_painted.push(y);
            }
            self.drawn[row] = true;
            if self.states[row].as_ref() != Some(&end_state) {
                self.states[row] = Some(end_state);
                // The next line's highlighting may depend on this line's
                // end state.
                if row + 1 < self.rows {
                    self.drawn[row + 1] = false;
                }
            }
        }
    }

    /// Shape and colorize one line under the current options and cursor/
    /// selection state.
    fn rebuild<M: TextModel>(env: &mut PaintEnv<'_, M, L>, y: u32) -> (LineInfo, L::State) {
        let text = env.model.line(y).unwrap_or_default();
        let terminated = env.model.line_terminated(y);
        let mut info = shape_line(&text, terminated, env.opts.shape(), env.scheme.normal);
        let line_end = env.model.line_len(y) + 1;
        let selection = env
            .selection
            .and_then(|(s, e)| span_on_line(s, e, y, line_end));
        let cursor_col = (env.cursor.y == y).then_some(env.cursor.x);
        let block_col = if env.opts.block_cursor { cursor_col } else { None };
        let ctx = ColorizeContext {
            table: env.table,
            scheme: env.scheme,
            metrics: env.metrics,
            selection,
            cursor_col,
            block_col,
            highlight_tabs: env.opts.highlight_tabs,
            current_line: env.opts.show_current_line,
        };
        let end = colorize(&mut info, y, env.lexer, env.hooks, &ctx);
        (info, end)
    }

    /// Block-copy the surviving band and shift the row caches in place.
    /// `delta` is positive when the viewport moved down.
    fn shift_rows<S: RenderSurface + ?Sized>(&mut self, delta: i64, line_height: u32, surface: &mut S) {
        let rows = self.rows;
        let entering = delta.unsigned_abs() as usize;
        debug_assert!(entering > 0 && entering < rows, "degenerate shift escalates to full");
        let keep = rows - entering;
        if delta > 0 {
            // Content moves up; rows enter at the bottom.
            surface.copy_area(
                Rect::new(0, (entering as u32 * line_height) as i32, self.width_px, keep as u32 * line_height),
                0,
                0,
            );
            for i in 0..keep {
                self.drawn[i] = self.drawn[i + entering];
                self.states[i] = self.states[i + entering].take();
                self.snaps[i] = self.snaps[i + entering].take();
            }
            for i in keep..rows {
                self.drawn[i] = false;
                self.states[i] = None;
                self.snaps[i] = None;
            }
        } else {
            // Content moves down; rows enter at the top.
            surface.copy_area(
                Rect::new(0, 0, self.width_px, keep as u32 * line_height),
                0,
                (entering as u32 * line_height) as i32,
            );
            for i in (0..keep).rev() {
                self.drawn[i + entering] = self.drawn[i];
                self.states[i + entering] = self.states[i].take();
                self.snaps[i + entering] = self.snaps[i].take();
            }
            for i in 0..entering {
                self.drawn[i] = false;
                self.states[i] = None;
                self.snaps[i] = None;
            }
        }
        trace!(target: "view.sync", delta, entering, "scroll_shift");
    }

    /// Paint one rebuilt row: background-filled style runs, text, trailing
    /// fill, then decorations.
    fn paint_row<M: TextModel, S: RenderSurface + ?Sized>(
        &self,
        env: &PaintEnv<'_, M, L>,
        surface: &mut S,
        info: &LineInfo,
        row_y: i32,
        line_height: u32,
    ) {
        let width = self.width_px as i64;
        surface.push_clip(Rect::new(0, row_y, self.width_px, line_height));

        let mut x = -(self.x_origin as i64);
        let mut i = 0;
        while i < info.len() {
            let style = info.style[i];
            let mut j = i;
            let mut run_w: i64 = 0;
            let mut text = String::new();
            while j < info.len() && info.style[j] == style {
                run_w += info.width[j] as i64;
                text.push(info.text[j]);
                j += 1;
            }
            if x + run_w > 0 && x < width {
                surface.fill_rect(
                    Rect::new(x as i32, row_y, run_w as u32, line_height),
                    style.bg,
                );
                surface.push_color(style.fg);
                surface.push_variant(style.variant);
                surface.draw_text(x as i32, row_y, &text);
                surface.pop_variant();
                surface.pop_color();
            }
            x += run_w;
            i = j;
        }
        if x < width {
            let fill_x = x.max(0);
            surface.fill_rect(
                Rect::new(fill_x as i32, row_y, (width - fill_x) as u32, line_height),
                env.scheme.normal.bg,
            );
        }

        let mut dx = -(self.x_origin as i64);
        for i in 0..info.len() {
            let w = info.width[i] as i64;
            let deco = info.deco[i];
            if !deco.is_empty() && dx + w > 0 && dx < width {
                if deco.contains(Decoration::BLOCK) {
                    surface.draw_rect(
                        Rect::new(dx as i32, row_y, w.max(1) as u32, line_height),
                        env.scheme.cursor.fg,
                    );
                }
                if deco.contains(Decoration::CURSOR) {
                    surface.draw_line(
                        dx as i32,
                        row_y,
                        dx as i32,
                        row_y + line_height as i32 - 1,
                        env.scheme.cursor.fg,
                    );
                }
            }
            dx += w;
        }
        surface.pop_clip();
    }

    /// Map widget pixels to the nearest logical position. `None` when the
    /// point is outside the viewport's populated rows.
    pub fn coords_to_text_pos<M: TextModel>(
        &self,
        env: &mut PaintEnv<'_, M, L>,
        px: i32,
        py: i32,
    ) -> Option<Position> {
        let line_height = env.metrics.line_height() as i32;
        if line_height == 0 || py < 0 {
            return None;
        }
        let row = (py / line_height) as usize;
        if row >= self.rows {
            return None;
        }
        let y = self.top_line + row as u32;
        if y >= env.model.line_count() {
            return None;
        }
        let px = px.clamp(0, self.width_px.saturating_sub(1) as i32);
        let target = px as i64 + self.x_origin as i64;
        let (info, _) = Self::rebuild(env, y);
        let mut acc: i64 = 0;
        for i in 0..info.len() {
            let w = info.width[i] as i64;
            if acc + w > target {
                return Some(Position::new(y, info.pos[i]));
            }
            acc += w;
        }
        // Past the shaped units: extrapolate whole space-width steps.
        let space = env.metrics.space_width(&env.scheme.normal).max(1) as i64;
        let extra = ((target - acc) / space) as u32;
        Some(Position::new(y, info.last_col() + extra))
    }

    /// Map a logical position to widget pixels. `None` when its row is not
    /// currently visible.
    pub fn text_pos_to_coords<M: TextModel>(
        &self,
        env: &mut PaintEnv<'_, M, L>,
        pos: Position,
    ) -> Option<(i32, i32)> {
        let line_height = env.metrics.line_height() as u32;
        if pos.y < self.top_line {
            return None;
        }
        let row = (pos.y - self.top_line) as usize;
        if row >= self.rows {
            return None;
        }
        let py = (row as u32 * line_height) as i32;
        let abs = Self::column_px(env, pos).0;
        Some(((abs - self.x_origin as i64) as i32, py))
    }

    /// Absolute pixel offset of a column's left edge, plus the width of the
    /// display unit there (a space width past end of line).
    fn column_px<M: TextModel>(env: &mut PaintEnv<'_, M, L>, pos: Position) -> (i64, i64) {
        let space = env.metrics.space_width(&env.scheme.normal).max(1) as i64;
        let (info, _) = Self::rebuild(env, pos.y);
        let mut acc: i64 = 0;
        for i in 0..info.len() {
            if info.pos[i] >= pos.x {
                return (acc, info.width[i].max(1) as i64);
            }
            acc += info.width[i] as i64;
        }
        let extra = (pos.x - info.last_col()) as i64 * space;
        (acc + extra, space)
    }

    /// Bring the caret into view.
    ///
    /// Vertically: a caret more than one screen height outside the viewport
    /// centers it; anything nearer scrolls the minimal amount onto the near
    /// edge. Horizontally: keep an `h_scroll_offset × space-width` margin
    /// from either edge, and snap the origin back to zero only when the
    /// caret fits without any offset at all.
    pub fn make_cursor_visible<M: TextModel, H: HostWindow + ?Sized>(
        &mut self,
        env: &mut PaintEnv<'_, M, L>,
        host: &mut H,
    ) -> bool {
        let pos = env.cursor;
        let rows = self.rows.max(1) as u32;
        let mut changed = false;

        let top = self.top_line;
        let new_top = if pos.y < top {
            if top - pos.y > rows {
                pos.y.saturating_sub(rows / 2)
            } else {
                pos.y
            }
        } else if pos.y >= top + rows {
            let overshoot = pos.y - (top + rows - 1);
            if overshoot > rows {
                pos.y.saturating_sub(rows / 2)
            } else {
                pos.y + 1 - rows
            }
        } else {
            top
        };
        if new_top != top {
            self.scroll_to(new_top);
            changed = true;
        }

        let width = self.width_px as i64;
        if width > 0 {
            let space = env.metrics.space_width(&env.scheme.normal).max(1) as i64;
            let margin = env.opts.h_scroll_offset as i64 * space;
            let (caret_px, unit_w) = Self::column_px(env, pos);
            let old_origin = self.x_origin as i64;
            let mut origin = old_origin;
            if caret_px + unit_w + margin <= width {
                origin = 0;
            } else {
                if caret_px - margin < origin {
                    origin = (caret_px - margin).max(0);
                }
                if caret_px + unit_w + margin > origin + width {
                    origin = caret_px + unit_w + margin - width;
                }
            }
            if origin != old_origin {
                self.set_x_origin(origin as u32);
                let total = (caret_px + unit_w).max(origin + width) as u32;
                host.set_scroll_cols(total, width as u32, origin as u32);
                changed = true;
            }
        }

        host.set_scroll_rows(env.model.line_count(), rows, self.top_line);
        if changed {
            debug!(target: "view.scroll", y = pos.y, x = pos.x, top = self.top_line, origin = self.x_origin, "cursor_into_view");
            host.request_redraw();
        }
        changed
    }
}
