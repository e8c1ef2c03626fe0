//! Painted-row content snapshots.
//!
//! A cheap hash of everything that affects a row's pixels: display text,
//! resolved styles, decorations, and measured widths. When a rebuilt row
//! hashes identically to what is already on screen, the paint pass skips
//! the surface writes entirely. Length rides along to shrink the collision
//! window further.

use ahash::AHasher;
use etch_shape::LineInfo;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSnapshot {
    pub hash: u64,
    pub len: usize,
}

impl RowSnapshot {
    pub fn of(info: &LineInfo) -> Self {
        let mut h = AHasher::default();
        info.text.hash(&mut h);
        info.style.hash(&mut h);
        info.width.hash(&mut h);
        for d in &info.deco {
            d.bits().hash(&mut h);
        }
        Self {
            hash: h.finish(),
            len: info.len(),
        }
    }
}
