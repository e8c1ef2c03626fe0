//! Text-model seam and the rope-backed reference buffer.
//!
//! The display core never owns text storage. Everything it needs from the
//! hosting application's document model is expressed by the [`TextModel`]
//! trait: line access, area edits, undo grouping, a named-cursor registry,
//! and a drained queue of change messages. [`RopeBuffer`] is the reference
//! implementation used by the facade and by tests.
//!
//! Invariants:
//! * Columns are 1-based character offsets; line indices are 0-based. A
//!   [`Position`] orders by `(y, x)`.
//! * Cursors are arena slots addressed by [`CursorId`] (slot + generation).
//!   Freeing a slot bumps its generation, so stale handles resolve to `None`
//!   instead of aliasing a recycled cursor.
//! * Edits never leave a live cursor out of range; cursors flagged
//!   [`CursorFlags::TRACK_EDITS`] shift with insertions and deletions that
//!   land before them, others are clamped only.
//! * Change messages accumulate in order and are consumed in one shot by
//!   [`TextModel::take_changes`]; no observer callbacks run inside an edit.

use anyhow::Result;
use ropey::Rope;
use std::collections::HashMap;
use tracing::{debug, trace};

mod cursor;
mod undo;
pub mod words;

pub use cursor::{CursorArena, CursorFlags, CursorId};
use undo::UndoLog;

/// A buffer location: 0-based line, 1-based character column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub y: u32,
    pub x: u32,
}

impl Position {
    pub fn new(y: u32, x: u32) -> Self {
        debug_assert!(x >= 1, "columns are 1-based");
        Self { y, x: x.max(1) }
    }

    pub fn origin() -> Self {
        Self { y: 0, x: 1 }
    }
}

/// Buffer change notification, drained by the owning widget after each edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeMsg {
    /// Lines `from..=to` need repainting for a reason other than an edit.
    Redraw { from: u32, to: u32 },
    /// Text was inserted; `at` is where it began, `to` where it ended.
    Inserted { at: Position, to: Position },
    /// Text spanning `from..to` was removed.
    Deleted { from: Position, to: Position },
    /// A registered cursor moved.
    CursorMoved { id: CursorId, old: Position },
}

/// The document collaborator contract consumed by the display core.
pub trait TextModel {
    fn line_count(&self) -> u32;
    /// Line content without its terminator. `None` past the last line.
    fn line(&self, y: u32) -> Option<String>;
    /// Character length of the line, terminator excluded.
    fn line_len(&self, y: u32) -> u32;
    /// Whether a newline follows the line (false only for a final fragment).
    fn line_terminated(&self, y: u32) -> bool;

    /// Insert at the named cursor; the cursor advances past the new text.
    fn insert(&mut self, cursor: CursorId, text: &str) -> bool;
    /// Remove `[from, to)`. Returns false for an empty or invalid range.
    fn delete_area(&mut self, from: Position, to: Position) -> bool;
    /// Copy `[from, to)` without mutating.
    fn copy_area(&self, from: Position, to: Position) -> String;

    /// Open an undo boundary; subsequent edits revert as one step.
    fn new_undo_group(&mut self);
    /// Revert the most recent undo group. False when nothing to revert.
    fn undo(&mut self) -> bool;

    fn get_or_create_cursor(&mut self, name: &str, flags: CursorFlags) -> CursorId;
    fn get_cursor(&self, name: &str) -> Option<CursorId>;
    fn free_cursor(&mut self, id: CursorId);
    fn cursor_pos(&self, id: CursorId) -> Option<Position>;
    /// Clamped move; returns whether the position changed.
    fn cursor_goto(&mut self, id: CursorId, pos: Position) -> bool;
    fn cursor_up(&mut self, id: CursorId) -> bool;
    fn cursor_down(&mut self, id: CursorId) -> bool;

    /// Drain accumulated change messages in arrival order.
    fn take_changes(&mut self) -> Vec<ChangeMsg>;
}

/// `ropey`-backed reference implementation of [`TextModel`].
pub struct RopeBuffer {
    rope: Rope,
    cursors: CursorArena,
    names: HashMap<String, CursorId>,
    changes: Vec<ChangeMsg>,
    undo: UndoLog,
}

impl RopeBuffer {
    pub fn from_str(content: &str) -> Result<Self> {
        Ok(Self {
            rope: Rope::from_str(content),
            cursors: CursorArena::default(),
            names: HashMap::new(),
            changes: Vec::new(),
            undo: UndoLog::default(),
        })
    }

    fn clamp(&self, pos: Position) -> Position {
        let y = pos.y.min(self.line_count().saturating_sub(1));
        let x = pos.x.clamp(1, self.line_len(y) + 1);
        Position { y, x }
    }

    /// Absolute character index of a (clamped) position.
    fn to_char(&self, pos: Position) -> usize {
        let pos = self.clamp(pos);
        self.rope.line_to_char(pos.y as usize) + (pos.x - 1) as usize
    }

    fn from_char(&self, idx: usize) -> Position {
        let idx = idx.min(self.rope.len_chars());
        let y = self.rope.char_to_line(idx);
        let x = idx - self.rope.line_to_char(y) + 1;
        Position::new(y as u32, x as u32)
    }

    /// Absolute character index of every live cursor, captured before an
    /// edit invalidates (line, column) coordinates.
    fn snapshot_cursors(&self) -> Vec<(CursorId, usize, bool)> {
        self.cursors
            .iter_live()
            .map(|(id, slot)| {
                (
                    id,
                    self.to_char(slot.pos),
                    slot.flags.contains(CursorFlags::TRACK_EDITS),
                )
            })
            .collect()
    }

    /// Reposition cursors after an insertion of `len` chars at `at`.
    fn cursors_after_insert(&mut self, snapshot: Vec<(CursorId, usize, bool)>, at: usize, len: usize) {
        for (id, abs, tracked) in snapshot {
            let abs = if tracked && abs >= at { abs + len } else { abs };
            let new = self.from_char(abs);
            self.cursors.set_pos(id, self.clamp(new));
        }
    }

    /// Reposition cursors after a deletion of `[from, to)` char indices.
    fn cursors_after_delete(&mut self, snapshot: Vec<(CursorId, usize, bool)>, from: usize, to: usize) {
        for (id, abs, _) in snapshot {
            let shifted = if abs >= to {
                abs - (to - from)
            } else if abs > from {
                from
            } else {
                abs
            };
            let new = self.from_char(shifted);
            self.cursors.set_pos(id, self.clamp(new));
        }
    }

    fn push_change(&mut self, msg: ChangeMsg) {
        trace!(target: "text.change", ?msg, "queued");
        self.changes.push(msg);
    }

    /// Queue an out-of-band redraw request for lines `from..=to` — used
    /// when something other than this widget mutated shared state the
    /// display depends on (another view of the buffer, an external
    /// annotation source).
    pub fn request_redraw(&mut self, from: u32, to: u32) {
        self.push_change(ChangeMsg::Redraw { from, to });
    }
}

impl TextModel for RopeBuffer {
    fn line_count(&self) -> u32 {
        self.rope.len_lines() as u32
    }

    fn line(&self, y: u32) -> Option<String> {
        if y >= self.line_count() {
            return None;
        }
        let mut s = self.rope.line(y as usize).to_string();
        while s.ends_with(['\n', '\r']) {
            s.pop();
        }
        Some(s)
    }

    fn line_len(&self, y: u32) -> u32 {
        self.line(y).map(|s| s.chars().count() as u32).unwrap_or(0)
    }

    fn line_terminated(&self, y: u32) -> bool {
        if y >= self.line_count() {
            return false;
        }
        self.rope.line(y as usize).to_string().ends_with('\n')
    }

    fn insert(&mut self, cursor: CursorId, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let at_pos = match self.cursor_pos(cursor) {
            Some(p) => p,
            None => return false,
        };
        let at = self.to_char(at_pos);
        let snapshot = self.snapshot_cursors();
        self.rope.insert(at, text);
        let len = text.chars().count();
        self.undo.record_insert(at, len);
        self.cursors_after_insert(snapshot, at, len);
        // The inserting cursor always lands after the new text, tracked or not.
        let end = self.from_char(at + len);
        self.cursors.set_pos(cursor, end);
        debug!(target: "text.edit", y = at_pos.y, x = at_pos.x, chars = len, "insert");
        self.push_change(ChangeMsg::Inserted { at: at_pos, to: end });
        true
    }

    fn delete_area(&mut self, from: Position, to: Position) -> bool {
        let (from, to) = if to < from { (to, from) } else { (from, to) };
        let a = self.to_char(from);
        let b = self.to_char(to);
        if a >= b {
            return false;
        }
        let removed = self.rope.slice(a..b).to_string();
        let snapshot = self.snapshot_cursors();
        self.rope.remove(a..b);
        self.undo.record_delete(a, removed);
        self.cursors_after_delete(snapshot, a, b);
        debug!(target: "text.edit", from_y = from.y, to_y = to.y, chars = b - a, "delete_area");
        self.push_change(ChangeMsg::Deleted { from, to });
        true
    }

    fn copy_area(&self, from: Position, to: Position) -> String {
        let (from, to) = if to < from { (to, from) } else { (from, to) };
        let a = self.to_char(from);
        let b = self.to_char(to);
        if a >= b {
            return String::new();
        }
        self.rope.slice(a..b).to_string()
    }

    fn new_undo_group(&mut self) {
        self.undo.new_group();
    }

    fn undo(&mut self) -> bool {
        let Some(group) = self.undo.pop_group() else {
            return false;
        };
        let mut touched_from = u32::MAX;
        for edit in group.revert_order() {
            match edit {
                undo::Edit::Inserted { at, len } => {
                    let from = self.from_char(*at);
                    let to = self.from_char(at + len);
                    let snapshot = self.snapshot_cursors();
                    self.rope.remove(*at..at + len);
                    self.cursors_after_delete(snapshot, *at, at + len);
                    touched_from = touched_from.min(from.y);
                    self.push_change(ChangeMsg::Deleted { from, to });
                }
                undo::Edit::Deleted { at, text } => {
                    let from = self.from_char(*at);
                    let snapshot = self.snapshot_cursors();
                    self.rope.insert(*at, text);
                    let len = text.chars().count();
                    self.cursors_after_insert(snapshot, *at, len);
                    let to = self.from_char(at + len);
                    touched_from = touched_from.min(from.y);
                    self.push_change(ChangeMsg::Inserted { at: from, to });
                }
            }
        }
        debug!(target: "text.undo", from_line = touched_from, "undo_group_reverted");
        true
    }

    fn get_or_create_cursor(&mut self, name: &str, flags: CursorFlags) -> CursorId {
        if let Some(id) = self.names.get(name)
            && self.cursors.get(*id).is_some()
        {
            return *id;
        }
        let id = self.cursors.alloc(Position::origin(), flags);
        trace!(target: "text.cursor", name, ?id, "created");
        self.names.insert(name.to_string(), id);
        id
    }

    fn get_cursor(&self, name: &str) -> Option<CursorId> {
        self.names.get(name).copied()
    }

    fn free_cursor(&mut self, id: CursorId) {
        self.names.retain(|_, v| *v != id);
        self.cursors.free(id);
    }

    fn cursor_pos(&self, id: CursorId) -> Option<Position> {
        self.cursors.get(id).map(|s| s.pos)
    }

    fn cursor_goto(&mut self, id: CursorId, pos: Position) -> bool {
        let Some(slot) = self.cursors.get(id) else {
            debug_assert!(false, "goto on a stale cursor handle");
            return false;
        };
        let old = slot.pos;
        let new = self.clamp(pos);
        if new == old {
            return false;
        }
        self.cursors.set_pos(id, new);
        self.push_change(ChangeMsg::CursorMoved { id, old });
        true
    }

    fn cursor_up(&mut self, id: CursorId) -> bool {
        let Some(pos) = self.cursor_pos(id) else {
            return false;
        };
        if pos.y == 0 {
            return false;
        }
        self.cursor_goto(id, Position::new(pos.y - 1, pos.x))
    }

    fn cursor_down(&mut self, id: CursorId) -> bool {
        let Some(pos) = self.cursor_pos(id) else {
            return false;
        };
        if pos.y + 1 >= self.line_count() {
            return false;
        }
        self.cursor_goto(id, Position::new(pos.y + 1, pos.x))
    }

    fn take_changes(&mut self) -> Vec<ChangeMsg> {
        std::mem::take(&mut self.changes)
    }
}
