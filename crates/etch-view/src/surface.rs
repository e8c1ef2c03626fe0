//! Rendering and host-window seams.
//!
//! The core consumes these traits, never implements them: the embedder
//! wraps whatever surface its toolkit hands out. All coordinates are widget
//! local pixels; a clip is always pushed before a row is painted, so
//! implementations may ignore out-of-rect spill from text runs.

use etch_style::{Color, FontVariant};

/// Axis-aligned pixel rectangle, widget-local.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}

/// Pixel drawing primitives the paint pass emits against.
pub trait RenderSurface {
    fn push_color(&mut self, color: Color);
    fn pop_color(&mut self);
    fn push_variant(&mut self, variant: FontVariant);
    fn pop_variant(&mut self);
    fn fill_rect(&mut self, rect: Rect, color: Color);
    /// Outline only.
    fn draw_rect(&mut self, rect: Rect, color: Color);
    fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, color: Color);
    /// Draw `text` at the baseline-box origin using the pushed color and
    /// variant.
    fn draw_text(&mut self, x: i32, y: i32, text: &str);
    fn push_clip(&mut self, rect: Rect);
    fn pop_clip(&mut self);
    /// Block-copy `src` so its top-left lands at `(dst_x, dst_y)`.
    fn copy_area(&mut self, src: Rect, dst_x: i32, dst_y: i32);
}

/// Scheduling and chrome services provided by the hosting window.
pub trait HostWindow {
    /// Ask the host to schedule a paint callback.
    fn request_redraw(&mut self);
    /// Publish the vertical scroll model (rows).
    fn set_scroll_rows(&mut self, total: u32, visible: u32, top: u32);
    /// Publish the horizontal scroll model (pixels).
    fn set_scroll_cols(&mut self, total: u32, visible: u32, origin: u32);
    /// The only user-audible failure signal the core emits.
    fn beep(&mut self);
}

/// Host that swallows every request; embeddings without chrome, and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl HostWindow for NullHost {
    fn request_redraw(&mut self) {}
    fn set_scroll_rows(&mut self, _total: u32, _visible: u32, _top: u32) {}
    fn set_scroll_cols(&mut self, _total: u32, _visible: u32, _origin: u32) {}
    fn beep(&mut self) {}
}
