//! Shared fixtures: a recording surface, a quiet host, and a lexer with
//! multi-line state.

use etch_shape::Token;
use etch_style::{Color, FontVariant, Style, StyleId, StyleTable};
use etch_syntax::Lexer;
use etch_view::{HostWindow, Rect, RenderSurface};

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

    pub fn count(&self, prefix: &str) -> usize {
        self.ops.iter().filter(|o| o.starts_with(prefix)).count()
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
        self.ops.push(format!("draw_text {x},{y} {text:?}"));
    }
    fn push_clip(&mut self, rect: Rect) {
        self.ops
            .push(format!("push_clip {},{} {}x{}", rect.x, rect.y, rect.w, rect.h));
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

/// Counts scheduling calls; never beeps in these tests.
#[derive(Debug, Default)]
pub struct QuietHost {
    pub redraws: usize,
    pub beeps: usize,
}

impl HostWindow for QuietHost {
    fn request_redraw(&mut self) {
        self.redraws += 1;
    }
    fn set_scroll_rows(&mut self, _total: u32, _visible: u32, _top: u32) {}
    fn set_scroll_cols(&mut self, _total: u32, _visible: u32, _origin: u32) {}
    fn beep(&mut self) {
        self.beeps += 1;
    }
}

pub const NORMAL: StyleId = StyleId(0);
pub const FENCE: StyleId = StyleId(1);

/// `[...]` fences are tokens that may span lines; everything else falls
/// through untokenized. Line-start states are derived lazily so edits to
/// earlier lines change later resume states, as a real tokenizer would.
pub struct FenceLexer {
    /// Full document snapshot the lexer scans; tests refresh it after edits.
    pub lines: Vec<String>,
}

impl FenceLexer {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    fn start_state(&self, y: u32) -> bool {
        let mut inside = false;
        for line in self.lines.iter().take(y as usize) {
            for c in line.chars() {
                match c {
                    '[' if !inside => inside = true,
                    ']' if inside => inside = false,
                    _ => {}
                }
            }
        }
        inside
    }
}

impl Lexer for FenceLexer {
    type State = bool;

    fn move_to_line(&mut self, y: u32) -> bool {
        self.start_state(y)
    }

    fn state_style(&self, state: &bool) -> StyleId {
        if *state { FENCE } else { NORMAL }
    }

    fn next_token(&mut self, text: &[char], offset: usize, state: &mut bool) -> Option<Token> {
        let rest = &text[offset..];
        let first = *rest.first()?;
        if *state || first == '[' {
            let mut len = 0u32;
            let mut closed = false;
            for (i, &c) in rest.iter().enumerate() {
                len += 1;
                if c == ']' && (*state || i > 0) {
                    closed = true;
                    break;
                }
            }
            *state = !closed;
            return Some(Token { style: FENCE, len });
        }
        None
    }
}

pub fn table() -> StyleTable {
    StyleTable::new(vec![
        Style::plain(),
        Style::new(Color::new(0, 128, 0), Color::WHITE, FontVariant::Italic),
    ])
}

use etch_shape::CellMetrics;
use etch_state::EditorOptions;
use etch_style::ColorScheme;
use etch_syntax::ColorizeHook;
use etch_text::{Position, RopeBuffer, TextModel};
use etch_view::PaintEnv;

/// Bundles a buffer, lexer, and styling inputs so tests can borrow a
/// [`PaintEnv`] in one line.
pub struct Fixture {
    pub model: RopeBuffer,
    pub lexer: FenceLexer,
    pub table: StyleTable,
    pub scheme: ColorScheme,
    pub metrics: CellMetrics,
    pub opts: EditorOptions,
    pub cursor: Position,
    pub selection: Option<(Position, Position)>,
    pub hooks: Vec<Box<dyn ColorizeHook>>,
}

impl Fixture {
    pub fn new(text: &str) -> Self {
        Self {
            model: RopeBuffer::from_str(text).unwrap(),
            lexer: FenceLexer::new(text),
            table: table(),
            scheme: ColorScheme::default(),
            metrics: CellMetrics::default(),
            opts: EditorOptions::default(),
            cursor: Position::origin(),
            selection: None,
            hooks: Vec::new(),
        }
    }

    pub fn env(&mut self) -> PaintEnv<'_, RopeBuffer, FenceLexer> {
        PaintEnv {
            model: &self.model,
            lexer: &mut self.lexer,
            hooks: &mut self.hooks,
            table: &self.table,
            scheme: &self.scheme,
            metrics: &self.metrics,
            opts: self.opts,
            cursor: self.cursor,
            selection: self.selection,
        }
    }

    /// Re-sync the lexer's document snapshot after a buffer edit.
    pub fn resync_lexer(&mut self) {
        let mut lines = Vec::new();
        for y in 0..self.model.line_count() {
            lines.push(self.model.line(y).unwrap_or_default());
        }
        self.lexer.lines = lines;
    }
}
