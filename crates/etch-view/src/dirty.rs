//! Dirty-line bookkeeping.
//!
//! Records which buffer lines need their display row rebuilt. Marks are
//! cheap appends; deduplication happens once, at consumption. An edit that
//! changes the line count taints everything from its line downward, which
//! is recorded as an open-ended watermark instead of enumerating lines.
//!
//! Invariants:
//! * `take_in_view` returns ascending, unique line numbers intersected
//!   with the viewport, and leaves the tracker empty.
//! * Not thread-safe; owned by the widget and touched only from its
//!   dispatch callback.

#[derive(Debug, Default)]
pub struct DirtyRows {
    lines: Vec<u32>,
    from: Option<u32>,
}

impl DirtyRows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a single line.
    pub fn mark(&mut self, y: u32) {
        self.lines.push(y);
    }

    /// Mark an inclusive range.
    pub fn mark_range(&mut self, from: u32, to: u32) {
        for y in from..=to {
            self.lines.push(y);
        }
    }

    /// Mark `y` and everything below it (line-count change).
    pub fn mark_from(&mut self, y: u32) {
        self.from = Some(self.from.map_or(y, |f| f.min(y)));
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.from.is_none()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.from = None;
    }

    /// Consume and return the marked lines visible in `[top, top + rows)`,
    /// sorted and deduplicated.
    pub fn take_in_view(&mut self, top: u32, rows: u32) -> Vec<u32> {
        let end = top.saturating_add(rows);
        let mut v: Vec<u32> = self
            .lines
            .drain(..)
            .filter(|y| *y >= top && *y < end)
            .collect();
        if let Some(from) = self.from.take() {
            for y in from.max(top)..end {
                v.push(y);
            }
        }
        v.sort_unstable();
        v.dedup();
        v
    }
}
