//! Viewport synchronization and coordinate mapping.
//!
//! This crate decides, on every redraw request, how little work the widget
//! can get away with: a full repaint, a pixel block-copy plus fringe
//! repaint after a scroll, or a handful of line-granular repaints — and
//! then drives shaping and colorizing for exactly the rows that need it.
//! It also owns the bidirectional pixel ↔ (column, row) mapping and the
//! scroll-into-view policy.
//!
//! Everything here runs synchronously inside the host's dispatch callback;
//! dirty-state mutation and the following draw pass never interleave.

mod cache;
mod dirty;
mod surface;
mod sync;

pub use cache::RowSnapshot;
pub use dirty::DirtyRows;
pub use surface::{HostWindow, NullHost, Rect, RenderSurface};
pub use sync::{PaintEnv, ViewSync};
