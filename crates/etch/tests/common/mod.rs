//! Shared fixtures for the facade tests.

use etch::{
    CellMetrics, Color, ColorScheme, Editor, FontVariant, HostWindow, PlainLexer, Rect,
    RenderSurface, RopeBuffer, Style, StyleTable,
};
use std::cell::Cell;
use std::rc::Rc;

/// Records every primitive call for assertions.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub ops: Vec<String>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }

    pub fn count(&self, needle: &str) -> usize {
        self.ops.iter().filter(|o| o.contains(needle)).count()
    }
}

impl RenderSurface for RecordingSurface {
    fn push_color(&mut self, color: Color) {
        self.ops.push(format!("push_color {},{},{}", color.r, color.g, color.b));
    }
    fn pop_color(&mut self) {
        self.ops.push("pop_color".into());
    }
    fn push_variant(&mut self, variant: FontVariant) {
        self.ops.push(format!("push_variant {variant:?}"));
    }
    fn pop_variant(&mut self) {
        self.ops.push("pop_variant".into());
    }
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ops.push(format!(
            "fill_rect {},{} {}x{} {},{},{}",
            rect.x, rect.y, rect.w, rect.h, color.r, color.g, color.b
        ));
    }
    fn draw_rect(&mut self, rect: Rect, _color: Color) {
        self.ops
            .push(format!("draw_rect {},{} {}x{}", rect.x, rect.y, rect.w, rect.h));
    }
    fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, _color: Color) {
        self.ops.push(format!("draw_line {x1},{y1} {x2},{y2}"));
    }
    fn draw_text(&mut self, x: i32, y: i32, text: &str) {
        self.ops.push(format!("draw_text {x},{y} {text}"));
    }
    fn push_clip(&mut self, _rect: Rect) {
        self.ops.push("push_clip".into());
    }
    fn pop_clip(&mut self) {
        self.ops.push("pop_clip".into());
    }
    fn copy_area(&mut self, src: Rect, dst_x: i32, dst_y: i32) {
        self.ops.push(format!(
            "copy_area {},{} {}x{} -> {},{}",
            src.x, src.y, src.w, src.h, dst_x, dst_y
        ));
    }
}

/// Host whose counters stay visible after the editor takes ownership.
pub struct CountingHost {
    pub redraws: Rc<Cell<usize>>,
    pub beeps: Rc<Cell<usize>>,
}

impl HostWindow for CountingHost {
    fn request_redraw(&mut self) {
        self.redraws.set(self.redraws.get() + 1);
    }
    fn set_scroll_rows(&mut self, _total: u32, _visible: u32, _top: u32) {}
    fn set_scroll_cols(&mut self, _total: u32, _visible: u32, _origin: u32) {}
    fn beep(&mut self) {
        self.beeps.set(self.beeps.get() + 1);
    }
}

pub struct HostProbe {
    pub redraws: Rc<Cell<usize>>,
    pub beeps: Rc<Cell<usize>>,
}

pub type TestEditor = Editor<RopeBuffer, PlainLexer, CellMetrics>;

/// 320x80 widget over 8x16 cells: 5 visible rows, already drawn once.
pub fn editor(text: &str) -> (TestEditor, HostProbe, RecordingSurface) {
    let redraws = Rc::new(Cell::new(0));
    let beeps = Rc::new(Cell::new(0));
    let host = CountingHost {
        redraws: redraws.clone(),
        beeps: beeps.clone(),
    };
    let model = RopeBuffer::from_str(text).unwrap();
    let table = StyleTable::uniform(Style::plain());
    let mut ed = Editor::new(
        model,
        PlainLexer::default(),
        CellMetrics::default(),
        table,
        ColorScheme::default(),
        Box::new(host),
    );
    ed.set_size(320, 80);
    let mut surface = RecordingSurface::new();
    ed.draw(&mut surface);
    surface.clear();
    (ed, HostProbe { redraws, beeps }, surface)
}
