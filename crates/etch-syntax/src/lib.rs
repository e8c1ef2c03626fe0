//! Line colorizing over an external tokenizer.
//!
//! Three independent coloring sources merge into one per-unit style array:
//! lexical tokens from the host's [`Lexer`], the selection range, and
//! cursor/decoration marks. The merge happens in a fixed order inside
//! [`colorize`] so repeated passes over unchanged input produce identical
//! results — the paint layer depends on that to skip redundant repaints.
//!
//! The tokenizer is a collaborator, never owned here: it resumes from an
//! opaque per-line state snapshot so a line can be colorized without
//! rescanning the document, and the end-of-line state this pass returns is
//! what lets the view layer detect multi-line constructs (an opened block
//! comment changes the next line's start state, which flags it for
//! recoloring).

use etch_shape::{Decoration, FontMetrics, LineInfo, Token};
use etch_style::{ColorScheme, StyleId, StyleTable};
use tracing::trace;

/// External lexical-analysis collaborator.
///
/// `State` is an opaque snapshot of the tokenizer at a line boundary.
/// Equality is the propagation signal: when a line's end state compares
/// unequal to the cached value, the following line must be recolorized.
pub trait Lexer {
    type State: Clone + PartialEq;

    /// Position the tokenizer at the start of line `y` and return the
    /// resumed state.
    fn move_to_line(&mut self, y: u32) -> Self::State;

    /// Style for text carrying `state` outside any token.
    fn state_style(&self, state: &Self::State) -> StyleId;

    /// Produce the token starting at `offset` (0-based chars), advancing
    /// `state` past it. `None` means no token starts here; the caller moves
    /// one character forward under the active style.
    fn next_token(&mut self, text: &[char], offset: usize, state: &mut Self::State)
    -> Option<Token>;
}

/// Tokenizer-less fallback: a single style for everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainLexer {
    pub style: StyleId,
}

impl Lexer for PlainLexer {
    type State = ();

    fn move_to_line(&mut self, _y: u32) -> Self::State {}

    fn state_style(&self, _state: &Self::State) -> StyleId {
        self.style
    }

    fn next_token(
        &mut self,
        _text: &[char],
        _offset: usize,
        _state: &mut Self::State,
    ) -> Option<Token> {
        None
    }
}

/// Embedder-defined highlight pass with full access to the shaped line.
/// Hooks run after token styling and before the selection overlay, in
/// registration order.
pub trait ColorizeHook {
    fn colorize(&mut self, info: &mut LineInfo, y: u32);
}

/// Everything the colorize pass needs besides the lexer: resolved scheme
/// roles, the token style table, measurement, and this line's slice of the
/// cursor/selection state.
pub struct ColorizeContext<'a> {
    pub table: &'a StyleTable,
    pub scheme: &'a ColorScheme,
    pub metrics: &'a dyn FontMetrics,
    /// Intersection of the selection with this line, as an inclusive
    /// column range. `None` when the line is outside the selection.
    pub selection: Option<(u32, u32)>,
    /// Primary caret column when the caret is on this line.
    pub cursor_col: Option<u32>,
    /// Block cursor column when one is shown on this line.
    pub block_col: Option<u32>,
    /// Restamp units originating from tabs with the `special` style.
    pub highlight_tabs: bool,
    /// Wash the line background when the caret is on it.
    pub current_line: bool,
}

/// Fill `style`/`token`/`start`/`deco`/`width` for a shaped line and
/// return the tokenizer's end-of-line state.
pub fn colorize<L: Lexer>(
    info: &mut LineInfo,
    y: u32,
    lexer: &mut L,
    hooks: &mut [Box<dyn ColorizeHook>],
    ctx: &ColorizeContext<'_>,
) -> L::State {
    let mut state = lexer.move_to_line(y);
    let mut active = ctx.table.get(lexer.state_style(&state));

    // Token walk in logical-column order. `unit` only moves forward: `pos`
    // is non-decreasing, and offsets advance monotonically.
    let line_len = info.orig.len() as u32;
    let mut offset: u32 = 0;
    let mut unit = 0usize;
    while offset < line_len {
        let tok = lexer.next_token(&info.orig, offset as usize, &mut state);
        match tok {
            Some(tok) => {
                let len = tok.len.max(1);
                let first_col = offset + 1;
                let last_col = offset + len;
                let style = ctx.table.get(tok.style);
                let index = info.tokens.len() as u32;
                info.tokens.push(Token { style: tok.style, len });
                while unit < info.len() && info.pos[unit] < first_col {
                    unit += 1;
                }
                let mut first = true;
                while unit < info.len() && info.pos[unit] <= last_col {
                    info.style[unit] = style;
                    info.token[unit] = Some(index);
                    info.start[unit] = first && info.pos[unit] == first_col;
                    first = false;
                    unit += 1;
                }
                active = style;
                offset += len;
            }
            None => {
                // No token here: stamp this column with the active state
                // style and move one character on.
                let col = offset + 1;
                while unit < info.len() && info.pos[unit] <= col {
                    if info.pos[unit] == col {
                        info.style[unit] = active;
                        info.token[unit] = None;
                        info.start[unit] = false;
                    }
                    unit += 1;
                }
                offset += 1;
            }
        }
    }
    // Trailing units (always at least the synthetic end slot).
    while unit < info.len() {
        info.style[unit] = active;
        info.token[unit] = None;
        info.start[unit] = false;
        unit += 1;
    }

    if ctx.highlight_tabs {
        for i in 0..info.len() {
            let col = info.pos[i];
            if col >= 1
                && let Some(&ch) = info.orig.get((col - 1) as usize)
                && ch == '\t'
            {
                info.style[i] = ctx.scheme.special;
            }
        }
    }

    for hook in hooks.iter_mut() {
        hook.colorize(info, y);
    }

    if let Some((x1, x2)) = ctx.selection {
        trace!(target: "syntax.colorize", y, x1, x2, "selection_overlay");
        info.set_area(x1, x2, ctx.scheme.selection);
    }

    if let Some(x) = ctx.block_col {
        info.set_decoration(x, Decoration::BLOCK);
    }
    if let Some(x) = ctx.cursor_col {
        info.set_decoration(x, Decoration::CURSOR);
    }

    if ctx.current_line && ctx.cursor_col.is_some() {
        let end = info.last_col();
        info.set_background(1, end, ctx.scheme.normal, ctx.scheme.current_line);
    }

    for i in 0..info.len() {
        info.width[i] = ctx.metrics.char_width(info.text[i], &info.style[i]);
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use etch_shape::{CellMetrics, ShapeOptions, shape_line};
    use etch_style::{Color, FontVariant, Style};

    const NORMAL: StyleId = StyleId(0);
    const NUMBER: StyleId = StyleId(1);
    const FENCE: StyleId = StyleId(2);

    /// Digit runs are tokens; `[...]` fences are tokens that may span
    /// lines, tracked through a boolean resume state.
    struct FenceLexer {
        starts: Vec<bool>,
    }

    impl FenceLexer {
        fn new(starts: Vec<bool>) -> Self {
            Self { starts }
        }
    }

    impl Lexer for FenceLexer {
        type State = bool;

        fn move_to_line(&mut self, y: u32) -> bool {
            self.starts.get(y as usize).copied().unwrap_or(false)
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
                for &c in rest {
                    len += 1;
                    if c == ']' && !(len == 1 && first == '[' && !*state) {
                        closed = true;
                        break;
                    }
                }
                *state = !closed;
                return Some(Token { style: FENCE, len });
            }
            if first.is_ascii_digit() {
                let len = rest.iter().take_while(|c| c.is_ascii_digit()).count() as u32;
                return Some(Token { style: NUMBER, len });
            }
            if first.is_whitespace() {
                return None;
            }
            let len = rest
                .iter()
                .take_while(|c| !c.is_whitespace() && !c.is_ascii_digit() && **c != '[')
                .count()
                .max(1) as u32;
            Some(Token { style: NORMAL, len })
        }
    }

    fn table() -> StyleTable {
        StyleTable::new(vec![
            Style::plain(),
            Style::new(Color::new(0, 0, 160), Color::WHITE, FontVariant::Regular),
            Style::new(Color::new(0, 128, 0), Color::WHITE, FontVariant::Italic),
        ])
    }

    fn ctx<'a>(
        table: &'a StyleTable,
        scheme: &'a ColorScheme,
        metrics: &'a CellMetrics,
    ) -> ColorizeContext<'a> {
        ColorizeContext {
            table,
            scheme,
            metrics,
            selection: None,
            cursor_col: None,
            block_col: None,
            highlight_tabs: false,
            current_line: false,
        }
    }

    fn run(line: &str, lexer: &mut FenceLexer, y: u32, ctx: &ColorizeContext<'_>) -> (LineInfo, bool) {
        let mut info = shape_line(line, true, ShapeOptions::default(), ctx.scheme.normal);
        let end = colorize(&mut info, y, lexer, &mut [], ctx);
        (info, end)
    }

    #[test]
    fn tokens_stamp_start_flag_once_and_propagate() {
        let t = table();
        let scheme = ColorScheme::default();
        let m = CellMetrics::default();
        let ctx = ctx(&t, &scheme, &m);
        let mut lexer = FenceLexer::new(vec![false]);
        let (info, end) = run("ab 12 cd", &mut lexer, 0, &ctx);
        assert!(!end);
        let number = t.get(NUMBER);
        // "12" covers columns 4..=5.
        assert_eq!(info.style[3], number);
        assert_eq!(info.style[4], number);
        assert!(info.start[3]);
        assert!(!info.start[4]);
        assert_eq!(info.token[3], info.token[4]);
        assert!(info.token[3].is_some());
        // Whitespace yields no token and inherits the active style.
        assert_eq!(info.style[2], t.get(NORMAL));
        assert!(info.token[2].is_none());
    }

    #[test]
    fn token_span_covers_every_unit_of_an_expanded_tab() {
        let t = table();
        let scheme = ColorScheme::default();
        let m = CellMetrics::default();
        let ctx = ctx(&t, &scheme, &m);
        let mut lexer = FenceLexer::new(vec![false]);
        // Fence token spans the tab between the brackets.
        let (info, _) = run("[\t]", &mut lexer, 0, &ctx);
        let fence = t.get(FENCE);
        for i in 0..info.len() - 1 {
            assert_eq!(info.style[i], fence, "unit {i}");
        }
        // Exactly one start unit.
        assert_eq!(info.start.iter().filter(|s| **s).count(), 1);
    }

    #[test]
    fn unclosed_fence_changes_the_end_state() {
        let t = table();
        let scheme = ColorScheme::default();
        let m = CellMetrics::default();
        let ctx = ctx(&t, &scheme, &m);
        let mut lexer = FenceLexer::new(vec![false, true]);
        let (_, end) = run("a [open", &mut lexer, 0, &ctx);
        assert!(end, "fence left open at end of line");
        // Next line resumes inside the fence: leading text styled as fence.
        let (info, end) = run("still] z", &mut lexer, 1, &ctx);
        assert!(!end);
        let fence = t.get(FENCE);
        assert_eq!(info.style[0], fence);
        assert_eq!(info.style[5], fence); // ']'
        assert_eq!(info.style[7], t.get(NORMAL)); // 'z'
    }

    #[test]
    fn trailing_end_slot_takes_the_last_active_style() {
        let t = table();
        let scheme = ColorScheme::default();
        let m = CellMetrics::default();
        let ctx = ctx(&t, &scheme, &m);
        let mut lexer = FenceLexer::new(vec![false]);
        let (info, _) = run("12", &mut lexer, 0, &ctx);
        let last = info.len() - 1;
        assert_eq!(info.style[last], t.get(NUMBER));
        assert!(info.token[last].is_none());
    }

    #[test]
    fn tab_highlight_overrides_token_styling() {
        let t = table();
        let scheme = ColorScheme::default();
        let m = CellMetrics::default();
        let mut c = ctx(&t, &scheme, &m);
        c.highlight_tabs = true;
        let mut lexer = FenceLexer::new(vec![false]);
        let mut info = shape_line("[\t]", true, ShapeOptions::default(), scheme.normal);
        colorize(&mut info, 0, &mut lexer, &mut [], &c);
        for i in 0..info.len() {
            if info.pos[i] == 2 {
                assert_eq!(info.style[i], scheme.special, "tab unit {i}");
            }
        }
    }

    #[test]
    fn selection_overlay_beats_tokens_and_hooks_run_in_order() {
        struct Tag(u8, std::rc::Rc<std::cell::RefCell<Vec<u8>>>);
        impl ColorizeHook for Tag {
            fn colorize(&mut self, _info: &mut LineInfo, _y: u32) {
                self.1.borrow_mut().push(self.0);
            }
        }
        let order = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut hooks: Vec<Box<dyn ColorizeHook>> = vec![
            Box::new(Tag(1, order.clone())),
            Box::new(Tag(2, order.clone())),
        ];
        let t = table();
        let scheme = ColorScheme::default();
        let m = CellMetrics::default();
        let mut c = ctx(&t, &scheme, &m);
        c.selection = Some((2, 3));
        let mut lexer = FenceLexer::new(vec![false]);
        let mut info = shape_line("1234", true, ShapeOptions::default(), scheme.normal);
        colorize(&mut info, 0, &mut lexer, &mut hooks, &c);
        assert_eq!(*order.borrow(), vec![1, 2]);
        assert_eq!(info.style[0], t.get(NUMBER));
        assert_eq!(info.style[1], scheme.selection);
        assert_eq!(info.style[2], scheme.selection);
        assert_eq!(info.style[3], t.get(NUMBER));
    }

    #[test]
    fn current_line_wash_spares_selection_background() {
        let t = StyleTable::uniform(Style::plain());
        let scheme = ColorScheme::default();
        let m = CellMetrics::default();
        let mut c = ctx(&t, &scheme, &m);
        c.selection = Some((2, 2));
        c.cursor_col = Some(4);
        c.current_line = true;
        let mut lexer = FenceLexer::new(vec![false]);
        let mut info = shape_line("abcd", true, ShapeOptions::default(), scheme.normal);
        colorize(&mut info, 0, &mut lexer, &mut [], &c);
        assert_eq!(info.style[0].bg, scheme.current_line.bg);
        assert_eq!(info.style[1].bg, scheme.selection.bg, "selection wins");
        assert_eq!(info.style[2].bg, scheme.current_line.bg);
    }

    #[test]
    fn cursor_and_block_decorations_land_on_their_columns() {
        let t = table();
        let scheme = ColorScheme::default();
        let m = CellMetrics::default();
        let mut c = ctx(&t, &scheme, &m);
        c.cursor_col = Some(3);
        c.block_col = Some(3);
        let mut lexer = FenceLexer::new(vec![false]);
        let mut info = shape_line("ab", true, ShapeOptions::default(), scheme.normal);
        colorize(&mut info, 0, &mut lexer, &mut [], &c);
        let i = info.first_unit_at(3);
        assert!(info.deco[i].contains(Decoration::CURSOR));
        assert!(info.deco[i].contains(Decoration::BLOCK));
    }

    #[test]
    fn widths_are_measured_for_every_unit() {
        let t = table();
        let scheme = ColorScheme::default();
        let m = CellMetrics::default();
        let ctx = ctx(&t, &scheme, &m);
        let mut lexer = FenceLexer::new(vec![false]);
        let (info, _) = run("a漢", &mut lexer, 0, &ctx);
        assert_eq!(info.width[0], 8);
        assert_eq!(info.width[1], 16);
        assert_eq!(info.width[2], 8); // end slot space
    }
}

