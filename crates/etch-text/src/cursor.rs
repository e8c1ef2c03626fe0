//! Buffer-owned cursor arena.
//!
//! The widget layer refers to cursors only through [`CursorId`] handles.
//! Slots are recycled; each reuse bumps the slot's generation so a handle
//! kept across `free` resolves to `None` instead of an unrelated cursor.

use crate::Position;
use bitflags::bitflags;

bitflags! {
    /// Per-cursor behavior flags supplied at creation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CursorFlags: u8 {
        /// Shift with insertions and deletions that land before the cursor.
        const TRACK_EDITS = 1 << 0;
    }
}

/// Stable cursor handle: arena slot plus generation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorId {
    slot: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
pub struct CursorSlot {
    pub pos: Position,
    pub flags: CursorFlags,
    generation: u32,
    live: bool,
}

/// Slot arena backing every cursor a buffer hands out.
#[derive(Debug, Default)]
pub struct CursorArena {
    slots: Vec<CursorSlot>,
    free: Vec<u32>,
}

impl CursorArena {
    pub fn alloc(&mut self, pos: Position, flags: CursorFlags) -> CursorId {
        if let Some(slot) = self.free.pop() {
            let s = &mut self.slots[slot as usize];
            debug_assert!(!s.live, "free list held a live slot");
            s.pos = pos;
            s.flags = flags;
            s.live = true;
            return CursorId {
                slot,
                generation: s.generation,
            };
        }
        let slot = self.slots.len() as u32;
        self.slots.push(CursorSlot {
            pos,
            flags,
            generation: 0,
            live: true,
        });
        CursorId {
            slot,
            generation: 0,
        }
    }

    pub fn free(&mut self, id: CursorId) {
        let Some(s) = self.slots.get_mut(id.slot as usize) else {
            return;
        };
        if !s.live || s.generation != id.generation {
            return;
        }
        s.live = false;
        s.generation = s.generation.wrapping_add(1);
        self.free.push(id.slot);
    }

    pub fn get(&self, id: CursorId) -> Option<&CursorSlot> {
        self.slots
            .get(id.slot as usize)
            .filter(|s| s.live && s.generation == id.generation)
    }

    pub fn set_pos(&mut self, id: CursorId, pos: Position) {
        if let Some(s) = self
            .slots
            .get_mut(id.slot as usize)
            .filter(|s| s.live && s.generation == id.generation)
        {
            s.pos = pos;
        }
    }

    pub fn iter_live(&self) -> impl Iterator<Item = (CursorId, &CursorSlot)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.live.then_some((
                CursorId {
                    slot: i as u32,
                    generation: s.generation,
                },
                s,
            ))
        })
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.live).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_reuse_bumps_generation() {
        let mut a = CursorArena::default();
        let first = a.alloc(Position::origin(), CursorFlags::empty());
        a.free(first);
        let second = a.alloc(Position::new(1, 2), CursorFlags::empty());
        assert!(a.get(first).is_none());
        assert_eq!(a.get(second).unwrap().pos, Position::new(1, 2));
    }

    #[test]
    fn double_free_is_inert() {
        let mut a = CursorArena::default();
        let id = a.alloc(Position::origin(), CursorFlags::empty());
        a.free(id);
        a.free(id);
        let next = a.alloc(Position::origin(), CursorFlags::empty());
        assert_eq!(a.live_count(), 1);
        assert!(a.get(next).is_some());
    }
}
