//! The embeddable editor core.
//!
//! [`Editor`] wires the pieces together: a text model, a tokenizer, font
//! metrics, the selection, the viewport, and the binding table. Hosts feed
//! it keys, mouse points, and a drawing surface; it decides what changed
//! and repaints only that.
//!
//! Invariants that hold after every public call:
//! * Buffer change messages produced during the call have been drained into
//!   viewport dirty state; no stale rows survive into the next draw.
//! * The primary caret is inside the buffer (clamped by the model) and,
//!   after any caret-moving call, inside the viewport.
//! * Key dispatch is undo-group-atomic: one keystroke, one undo boundary.
//!
//! The crate re-exports the member surfaces so embedders depend on `etch`
//! alone.

pub use etch_config as config;
pub use etch_keymap::{Bindings, Key, KeyInput, KeymapError, Mods, Op};
pub use etch_shape::{
    CellMetrics, Decoration, EOL_GLYPH, FontMetrics, LineInfo, SPACE_GLYPH, ShapeOptions, TAB_STOP,
    Token, shape_line,
};
pub use etch_state::{EditorOptions, SelectionModel};
pub use etch_style::{Color, ColorScheme, FontVariant, Style, StyleId, StyleTable};
pub use etch_syntax::{ColorizeContext, ColorizeHook, Lexer, PlainLexer, colorize};
pub use etch_text::{ChangeMsg, CursorFlags, CursorId, Position, RopeBuffer, TextModel, words};
pub use etch_view::{HostWindow, NullHost, PaintEnv, Rect, RenderSurface, ViewSync};

use std::sync::Arc;
use tracing::{debug, trace};

const CURSOR_NAME: &str = "etch.cursor";
const TOP_NAME: &str = "etch.top";

/// Observer events emitted to the embedder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditNotice {
    /// A display option or scheme changed.
    PropertyChanged,
    /// A bound operation executed.
    FunctionExecuted,
    /// The editor asks the embedder to (re)apply binding customizations.
    ResolveBindings,
}

/// The editor widget core.
pub struct Editor<M: TextModel, L: Lexer, F: FontMetrics> {
    model: M,
    lexer: L,
    metrics: F,
    table: StyleTable,
    scheme: Arc<ColorScheme>,
    options: EditorOptions,
    bindings: Bindings,
    view: ViewSync<L>,
    selection: SelectionModel,
    cursor: CursorId,
    top: CursorId,
    hooks: Vec<Box<dyn ColorizeHook>>,
    observers: Vec<Box<dyn FnMut(EditNotice)>>,
    host: Box<dyn HostWindow>,
}

impl<M: TextModel, L: Lexer, F: FontMetrics> Editor<M, L, F> {
    pub fn new(
        mut model: M,
        lexer: L,
        metrics: F,
        table: StyleTable,
        scheme: ColorScheme,
        host: Box<dyn HostWindow>,
    ) -> Self {
        let cursor = model.get_or_create_cursor(CURSOR_NAME, CursorFlags::TRACK_EDITS);
        let top = model.get_or_create_cursor(TOP_NAME, CursorFlags::TRACK_EDITS);
        model.take_changes();
        Self {
            model,
            lexer,
            metrics,
            table,
            scheme: scheme.into_shared(),
            options: EditorOptions::default(),
            bindings: Bindings::standard(),
            view: ViewSync::new(),
            selection: SelectionModel::new(),
            cursor,
            top,
            hooks: Vec::new(),
            observers: Vec::new(),
            host,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn options(&self) -> EditorOptions {
        self.options
    }

    pub fn cursor_pos(&self) -> Position {
        self.model.cursor_pos(self.cursor).unwrap_or(Position::origin())
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn selection_range(&self) -> Option<(Position, Position)> {
        self.selection.range(&self.model)
    }

    /// The selected text, for the host's clipboard integration. `None`
    /// when nothing (or a zero-width range) is selected.
    pub fn selected_text(&self) -> Option<String> {
        let (s, e) = self.selection.range(&self.model)?;
        if s == e {
            return None;
        }
        Some(self.model.copy_area(s, e))
    }

    pub fn view(&self) -> &ViewSync<L> {
        &self.view
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Replace the binding table (usually an [`Bindings::inherit`] clone
    /// with embedder customizations applied).
    pub fn set_bindings(&mut self, bindings: Bindings) {
        self.bindings = bindings;
    }

    /// Ask observers to contribute binding customizations.
    pub fn resolve_bindings(&mut self) {
        self.notify(EditNotice::ResolveBindings);
    }

    pub fn observe(&mut self, observer: Box<dyn FnMut(EditNotice)>) {
        self.observers.push(observer);
    }

    pub fn add_colorize_hook(&mut self, hook: Box<dyn ColorizeHook>) {
        self.hooks.push(hook);
        self.view.invalidate_all();
        self.host.request_redraw();
    }

    /// Swap the color scheme; the whole viewport restyles.
    pub fn set_scheme(&mut self, scheme: ColorScheme) {
        self.scheme = scheme.into_shared();
        self.view.invalidate_all();
        self.notify(EditNotice::PropertyChanged);
        self.host.request_redraw();
    }

    pub fn set_options(&mut self, options: EditorOptions) {
        self.options = options;
        self.view.invalidate_all();
        self.notify(EditNotice::PropertyChanged);
        self.host.request_redraw();
    }

    pub fn set_show_space(&mut self, on: bool) {
        let mut o = self.options;
        o.show_space = on;
        self.set_options(o);
    }

    pub fn set_show_eol(&mut self, on: bool) {
        let mut o = self.options;
        o.show_eol = on;
        self.set_options(o);
    }

    pub fn set_highlight_tabs(&mut self, on: bool) {
        let mut o = self.options;
        o.highlight_tabs = on;
        self.set_options(o);
    }

    pub fn set_show_current_line(&mut self, on: bool) {
        let mut o = self.options;
        o.show_current_line = on;
        self.set_options(o);
    }

    /// Host resize notification, widget-local pixels.
    pub fn set_size(&mut self, width_px: u32, height_px: u32) {
        self.view.set_size(width_px, height_px);
        self.host.request_redraw();
    }

    /// Tear down every cursor this editor registered and hand the model
    /// back.
    pub fn detach_model(mut self) -> M {
        self.selection.clear(&mut self.model);
        self.model.free_cursor(self.cursor);
        self.model.free_cursor(self.top);
        self.model
    }

    // ------------------------------------------------------------------
    // Input dispatch
    // ------------------------------------------------------------------

    /// Dispatch one keystroke. A bound operation runs inside its own undo
    /// group and emits [`EditNotice::FunctionExecuted`]; an unbound
    /// printable character (no control/alt) inserts literally. Returns
    /// false when the key was ignored entirely.
    pub fn handle_key(&mut self, input: KeyInput) -> bool {
        if let Some(op) = self.bindings.lookup(&input) {
            debug!(target: "edit.dispatch", key = %input, ?op, "op");
            self.model.new_undo_group();
            self.apply_op(op);
            self.notify(EditNotice::FunctionExecuted);
            self.sync_changes();
            return true;
        }
        if let Key::Char(c) = input.key
            && !input.mods.intersects(Mods::CONTROL | Mods::ALT)
            && !c.is_control()
        {
            trace!(target: "edit.dispatch", ch = %c, "literal");
            self.model.new_undo_group();
            self.replace_selection_with(&c.to_string());
            self.sync_changes();
            return true;
        }
        false
    }

    /// Insert clipboard or drop payload at the caret, replacing any
    /// selection. A missing or empty payload is an illegal target: beep.
    pub fn paste(&mut self, text: Option<&str>) -> bool {
        match text {
            Some(t) if !t.is_empty() => {
                self.model.new_undo_group();
                self.replace_selection_with(t);
                self.sync_changes();
                true
            }
            _ => {
                debug!(target: "edit.dispatch", "illegal_paste");
                self.host.beep();
                false
            }
        }
    }

    fn replace_selection_with(&mut self, text: &str) {
        if self.selection.is_selected() {
            let range = self.selection.range(&self.model);
            self.selection.delete(&mut self.model);
            self.invalidate_ranges(range, None);
        }
        self.model.insert(self.cursor, text);
    }

    fn apply_op(&mut self, op: Op) {
        let pos = self.cursor_pos();
        if op.selects() && !self.selection.is_anchored() {
            self.selection.set_start_mark(&mut self.model, pos);
        }
        match op {
            Op::MoveLeft | Op::SelectLeft => {
                let target = self.left_of(pos);
                self.motion(op, target);
            }
            Op::MoveRight | Op::SelectRight => {
                let target = self.right_of(pos);
                self.motion(op, target);
            }
            Op::MoveWordLeft | Op::SelectWordLeft => {
                let target = if pos.x == 1 && pos.y > 0 {
                    Position::new(pos.y - 1, self.model.line_len(pos.y - 1) + 1)
                } else {
                    let line = self.model.line(pos.y).unwrap_or_default();
                    Position::new(pos.y, words::prev_start(&line, pos.x))
                };
                self.motion(op, target);
            }
            Op::MoveWordRight | Op::SelectWordRight => {
                let len = self.model.line_len(pos.y);
                let target = if pos.x > len && pos.y + 1 < self.model.line_count() {
                    Position::new(pos.y + 1, 1)
                } else {
                    let line = self.model.line(pos.y).unwrap_or_default();
                    Position::new(pos.y, words::next_start(&line, pos.x))
                };
                self.motion(op, target);
            }
            Op::MoveUp | Op::SelectUp => {
                let target = Position::new(pos.y.saturating_sub(1), pos.x);
                self.motion(op, target);
            }
            Op::MoveDown | Op::SelectDown => {
                let target = Position::new(pos.y + 1, pos.x);
                self.motion(op, target);
            }
            Op::MoveLineStart | Op::SelectLineStart => {
                self.motion(op, Position::new(pos.y, 1));
            }
            Op::MoveLineEnd | Op::SelectLineEnd => {
                let end = self.model.line_len(pos.y) + 1;
                self.motion(op, Position::new(pos.y, end));
            }
            Op::MovePageUp | Op::SelectPageUp => {
                let rows = self.view.rows().max(1) as u32;
                self.motion(op, Position::new(pos.y.saturating_sub(rows), pos.x));
            }
            Op::MovePageDown | Op::SelectPageDown => {
                let rows = self.view.rows().max(1) as u32;
                self.motion(op, Position::new(pos.y + rows, pos.x));
            }
            Op::SelectAll => {
                let old = self.selection.range(&self.model);
                let last = self.model.line_count().saturating_sub(1);
                let end = Position::new(last, self.model.line_len(last) + 1);
                self.selection.set_start_mark(&mut self.model, Position::origin());
                self.selection.set_end_mark(&mut self.model, end);
                self.model.cursor_goto(self.cursor, end);
                self.invalidate_ranges(old, self.selection.range(&self.model));
            }
            Op::ClearSelection => {
                let old = self.selection.range(&self.model);
                self.selection.clear(&mut self.model);
                self.invalidate_ranges(old, None);
            }
            Op::DeleteBack => {
                if self.selection.is_selected() {
                    self.delete_selection();
                } else if let Some(target) = self.left_pos(pos) {
                    self.model.delete_area(target, pos);
                }
                // At buffer start this is a no-op, by clamping.
            }
            Op::DeleteForward => {
                if self.selection.is_selected() {
                    self.delete_selection();
                } else if let Some(target) = self.right_pos(pos) {
                    self.model.delete_area(pos, target);
                }
            }
            Op::DeleteSelection => {
                self.delete_selection();
            }
            Op::InsertNewline => {
                self.replace_selection_with("\n");
            }
            Op::Undo => {
                if !self.model.undo() {
                    trace!(target: "edit.dispatch", "undo_exhausted");
                }
            }
        }
    }

    /// Shared tail of every motion op: move the caret, then either extend
    /// the selection to it or drop the selection.
    fn motion(&mut self, op: Op, target: Position) {
        let old = self.selection.range(&self.model);
        self.model.cursor_goto(self.cursor, target);
        if op.selects() {
            let landed = self.cursor_pos();
            self.selection.set_end_mark(&mut self.model, landed);
            self.invalidate_ranges(old, self.selection.range(&self.model));
        } else if old.is_some() {
            self.selection.clear(&mut self.model);
            self.invalidate_ranges(old, None);
        }
    }

    fn delete_selection(&mut self) {
        let old = self.selection.range(&self.model);
        if self.selection.delete(&mut self.model) {
            self.invalidate_ranges(old, None);
        }
    }

    /// Position one step left of `pos`, wrapping to the previous line end.
    fn left_of(&self, pos: Position) -> Position {
        self.left_pos(pos).unwrap_or(pos)
    }

    fn left_pos(&self, pos: Position) -> Option<Position> {
        if pos.x > 1 {
            Some(Position::new(pos.y, pos.x - 1))
        } else if pos.y > 0 {
            Some(Position::new(pos.y - 1, self.model.line_len(pos.y - 1) + 1))
        } else {
            None
        }
    }

    /// Position one step right of `pos`, wrapping to the next line start.
    fn right_of(&self, pos: Position) -> Position {
        self.right_pos(pos).unwrap_or(pos)
    }

    fn right_pos(&self, pos: Position) -> Option<Position> {
        if pos.x <= self.model.line_len(pos.y) {
            Some(Position::new(pos.y, pos.x + 1))
        } else if pos.y + 1 < self.model.line_count() {
            Some(Position::new(pos.y + 1, 1))
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Mouse
    // ------------------------------------------------------------------

    /// Button press: place the caret and anchor a pending selection.
    pub fn mouse_press(&mut self, px: i32, py: i32) -> bool {
        let Some(pos) = self.hit_test(px, py) else {
            return false;
        };
        let old = self.selection.range(&self.model);
        self.selection.clear(&mut self.model);
        self.invalidate_ranges(old, None);
        self.model.cursor_goto(self.cursor, pos);
        let landed = self.cursor_pos();
        self.selection.set_start_mark(&mut self.model, landed);
        self.sync_changes();
        true
    }

    /// Drag: move the caret and the selection's second endpoint with it.
    pub fn mouse_drag(&mut self, px: i32, py: i32) -> bool {
        let Some(pos) = self.hit_test(px, py) else {
            return false;
        };
        let old = self.selection.range(&self.model);
        self.model.cursor_goto(self.cursor, pos);
        let landed = self.cursor_pos();
        self.selection.set_end_mark(&mut self.model, landed);
        self.invalidate_ranges(old, self.selection.range(&self.model));
        self.sync_changes();
        true
    }

    /// Button release: an empty drag leaves no selection behind.
    pub fn mouse_release(&mut self) {
        self.selection.release_drag(&mut self.model);
        self.sync_changes();
    }

    /// Map widget pixels to a buffer position.
    pub fn hit_test(&mut self, px: i32, py: i32) -> Option<Position> {
        let cursor = self.cursor_pos();
        let selection = self.selection.range(&self.model);
        let Self {
            model,
            lexer,
            hooks,
            table,
            scheme,
            metrics,
            options,
            view,
            ..
        } = self;
        let mut env = PaintEnv {
            model: &*model,
            lexer,
            hooks: hooks.as_mut_slice(),
            table: &*table,
            scheme: scheme.as_ref(),
            metrics: &*metrics,
            opts: *options,
            cursor,
            selection,
        };
        view.coords_to_text_pos(&mut env, px, py)
    }

    /// Pixel location of a buffer position, when its row is visible.
    pub fn position_px(&mut self, pos: Position) -> Option<(i32, i32)> {
        let cursor = self.cursor_pos();
        let selection = self.selection.range(&self.model);
        let Self {
            model,
            lexer,
            hooks,
            table,
            scheme,
            metrics,
            options,
            view,
            ..
        } = self;
        let mut env = PaintEnv {
            model: &*model,
            lexer,
            hooks: hooks.as_mut_slice(),
            table: &*table,
            scheme: scheme.as_ref(),
            metrics: &*metrics,
            opts: *options,
            cursor,
            selection,
        };
        view.text_pos_to_coords(&mut env, pos)
    }

    // ------------------------------------------------------------------
    // Painting
    // ------------------------------------------------------------------

    /// Paint into the host's surface. Call from the host's draw callback.
    pub fn draw(&mut self, surface: &mut dyn RenderSurface) {
        self.resync_top();
        let cursor = self.cursor_pos();
        let selection = self.selection.range(&self.model);
        let Self {
            model,
            lexer,
            hooks,
            table,
            scheme,
            metrics,
            options,
            view,
            ..
        } = self;
        let mut env = PaintEnv {
            model: &*model,
            lexer,
            hooks: hooks.as_mut_slice(),
            table: &*table,
            scheme: scheme.as_ref(),
            metrics: &*metrics,
            opts: *options,
            cursor,
            selection,
        };
        view.draw(&mut env, surface);
        self.model.take_changes();
    }

    /// Walk the top-of-viewport cursor to the requested scroll top, one
    /// row at a time — line access is sequential, there is no jump.
    fn resync_top(&mut self) {
        let target = self.view.top_line();
        loop {
            let pos = self
                .model
                .cursor_pos(self.top)
                .unwrap_or(Position::origin());
            if pos.y < target {
                if !self.model.cursor_down(self.top) {
                    break;
                }
            } else if pos.y > target {
                if !self.model.cursor_up(self.top) {
                    break;
                }
            } else {
                break;
            }
        }
        let reached = self
            .model
            .cursor_pos(self.top)
            .map(|p| p.y)
            .unwrap_or(0);
        if reached != target {
            // Requested top ran past the buffer end: clamp the viewport.
            self.view.scroll_to(reached);
        }
    }

    // ------------------------------------------------------------------
    // Change plumbing
    // ------------------------------------------------------------------

    /// Drain buffer change messages into viewport dirty state, keep the
    /// caret visible, and schedule a repaint.
    fn sync_changes(&mut self) {
        let mut caret_moved = false;
        for msg in self.model.take_changes() {
            match msg {
                ChangeMsg::Redraw { from, to } => self.view.invalidate_range(from, to),
                ChangeMsg::Inserted { at, to } | ChangeMsg::Deleted { from: at, to } => {
                    if at.y == to.y {
                        self.view.invalidate_line(at.y);
                    } else {
                        // Line count changed below `at`.
                        self.view.invalidate_from(at.y);
                    }
                    caret_moved = true;
                }
                ChangeMsg::CursorMoved { id, old } => {
                    if id == self.cursor {
                        self.view.invalidate_line(old.y);
                        self.view.invalidate_line(self.cursor_pos().y);
                        caret_moved = true;
                    }
                }
            }
        }
        if caret_moved {
            self.view.invalidate_line(self.cursor_pos().y);
            self.scroll_caret_into_view();
        }
        self.host.request_redraw();
    }

    fn scroll_caret_into_view(&mut self) {
        let cursor = self.cursor_pos();
        let selection = self.selection.range(&self.model);
        let Self {
            model,
            lexer,
            hooks,
            table,
            scheme,
            metrics,
            options,
            view,
            host,
            ..
        } = self;
        let mut env = PaintEnv {
            model: &*model,
            lexer,
            hooks: hooks.as_mut_slice(),
            table: &*table,
            scheme: scheme.as_ref(),
            metrics: &*metrics,
            opts: *options,
            cursor,
            selection,
        };
        view.make_cursor_visible(&mut env, host.as_mut());
    }

    /// Dirty every row either range touches (old and new selection shapes).
    fn invalidate_ranges(
        &mut self,
        a: Option<(Position, Position)>,
        b: Option<(Position, Position)>,
    ) {
        for range in [a, b].into_iter().flatten() {
            self.view.invalidate_range(range.0.y, range.1.y);
        }
    }

    fn notify(&mut self, notice: EditNotice) {
        trace!(target: "edit.notify", ?notice, "notice");
        for obs in &mut self.observers {
            obs(notice);
        }
    }
}
