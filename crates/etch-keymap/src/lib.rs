//! Input descriptors and the binding table.
//!
//! Mapping is pure and deterministic: a [`KeyInput`] either resolves to one
//! closed [`Op`] or it does not; a miss is not an error, it falls through to
//! literal insertion at the dispatch layer. Tables are cloned for
//! specialization ([`Bindings::inherit`]) rather than mutated in place, so
//! an embedder can derive a variant keymap without disturbing the stock one.
//!
//! Descriptor syntax is the classic `"C+S+Home"` form: zero or more
//! single-letter modifier prefixes (`S`, `C`, `A`) joined by `+`, ending in
//! a key name or a single character. Parsing round-trips through `Display`.

use bitflags::bitflags;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::trace;

bitflags! {
    /// Modifier keys held with an input.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Mods: u8 {
        const SHIFT = 1 << 0;
        const CONTROL = 1 << 1;
        const ALT = 1 << 2;
    }
}

/// Physical key identity, independent of modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    Backspace,
    Delete,
    Enter,
    Tab,
    Escape,
}

impl Key {
    fn name(&self) -> Option<&'static str> {
        Some(match self {
            Key::Left => "Left",
            Key::Right => "Right",
            Key::Up => "Up",
            Key::Down => "Down",
            Key::Home => "Home",
            Key::End => "End",
            Key::PageUp => "PageUp",
            Key::PageDown => "PageDown",
            Key::Backspace => "Backspace",
            Key::Delete => "Delete",
            Key::Enter => "Enter",
            Key::Tab => "Tab",
            Key::Escape => "Escape",
            Key::Char(_) => return None,
        })
    }

    fn from_name(name: &str) -> Option<Key> {
        Some(match name {
            "Left" => Key::Left,
            "Right" => Key::Right,
            "Up" => Key::Up,
            "Down" => Key::Down,
            "Home" => Key::Home,
            "End" => Key::End,
            "PageUp" => Key::PageUp,
            "PageDown" => Key::PageDown,
            "Backspace" => Key::Backspace,
            "Delete" => Key::Delete,
            "Enter" => Key::Enter,
            "Tab" => Key::Tab,
            "Escape" => Key::Escape,
            _ => return None,
        })
    }
}

/// One keystroke as delivered by the host: key plus modifier set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyInput {
    pub key: Key,
    pub mods: Mods,
}

impl KeyInput {
    pub fn new(key: Key, mods: Mods) -> Self {
        Self { key, mods }
    }

    pub fn plain(key: Key) -> Self {
        Self::new(key, Mods::empty())
    }

    pub fn ch(c: char) -> Self {
        Self::plain(Key::Char(c))
    }

    /// Parse a `"C+S+Home"` / `"C+y"` style descriptor.
    pub fn parse(desc: &str) -> Result<Self, KeymapError> {
        if desc.is_empty() {
            return Err(KeymapError::Empty);
        }
        if desc == "+" {
            return Ok(Self::ch('+'));
        }
        let mut parts: SmallVec<[&str; 4]> = desc.split('+').collect();
        // A trailing '+' means the key itself is the plus character.
        let key_part = match parts.pop() {
            Some("") => "+",
            Some(p) => p,
            None => return Err(KeymapError::Empty),
        };
        let mut mods = Mods::empty();
        for p in &parts {
            match *p {
                "S" => mods |= Mods::SHIFT,
                "C" => mods |= Mods::CONTROL,
                "A" => mods |= Mods::ALT,
                "" => return Err(KeymapError::UnknownModifier(desc.to_string())),
                other => return Err(KeymapError::UnknownModifier(other.to_string())),
            }
        }
        let key = if let Some(k) = Key::from_name(key_part) {
            k
        } else {
            let mut chars = key_part.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Char(c),
                _ => return Err(KeymapError::UnknownKey(key_part.to_string())),
            }
        };
        Ok(Self { key, mods })
    }
}

impl fmt::Display for KeyInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mods.contains(Mods::CONTROL) {
            write!(f, "C+")?;
        }
        if self.mods.contains(Mods::SHIFT) {
            write!(f, "S+")?;
        }
        if self.mods.contains(Mods::ALT) {
            write!(f, "A+")?;
        }
        match self.key {
            Key::Char(c) => write!(f, "{c}"),
            k => write!(f, "{}", k.name().expect("named key")),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeymapError {
    #[error("empty key descriptor")]
    Empty,
    #[error("unknown modifier in `{0}`")]
    UnknownModifier(String),
    #[error("unknown key `{0}`")]
    UnknownKey(String),
}

/// The closed set of editing operations a binding can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    MoveLeft,
    MoveRight,
    MoveWordLeft,
    MoveWordRight,
    MoveUp,
    MoveDown,
    MoveLineStart,
    MoveLineEnd,
    MovePageUp,
    MovePageDown,
    SelectLeft,
    SelectRight,
    SelectWordLeft,
    SelectWordRight,
    SelectUp,
    SelectDown,
    SelectLineStart,
    SelectLineEnd,
    SelectPageUp,
    SelectPageDown,
    SelectAll,
    ClearSelection,
    DeleteBack,
    DeleteForward,
    DeleteSelection,
    InsertNewline,
    Undo,
}

impl Op {
    /// Whether the operation extends (or begins) a selection.
    pub fn selects(&self) -> bool {
        matches!(
            self,
            Op::SelectLeft
                | Op::SelectRight
                | Op::SelectWordLeft
                | Op::SelectWordRight
                | Op::SelectUp
                | Op::SelectDown
                | Op::SelectLineStart
                | Op::SelectLineEnd
                | Op::SelectPageUp
                | Op::SelectPageDown
                | Op::SelectAll
        )
    }
}

/// Descriptor-to-operation table.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    map: HashMap<KeyInput, Op>,
}

impl Bindings {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The stock table.
    pub fn standard() -> Self {
        let mut b = Self::empty();
        let table: &[(&str, Op)] = &[
            ("Left", Op::MoveLeft),
            ("Right", Op::MoveRight),
            ("Up", Op::MoveUp),
            ("Down", Op::MoveDown),
            ("Home", Op::MoveLineStart),
            ("End", Op::MoveLineEnd),
            ("PageUp", Op::MovePageUp),
            ("PageDown", Op::MovePageDown),
            ("C+Left", Op::MoveWordLeft),
            ("C+Right", Op::MoveWordRight),
            ("S+Left", Op::SelectLeft),
            ("S+Right", Op::SelectRight),
            ("C+S+Left", Op::SelectWordLeft),
            ("C+S+Right", Op::SelectWordRight),
            ("S+Up", Op::SelectUp),
            ("S+Down", Op::SelectDown),
            ("S+Home", Op::SelectLineStart),
            ("S+End", Op::SelectLineEnd),
            ("S+PageUp", Op::SelectPageUp),
            ("S+PageDown", Op::SelectPageDown),
            ("C+a", Op::SelectAll),
            ("Escape", Op::ClearSelection),
            ("Backspace", Op::DeleteBack),
            ("Delete", Op::DeleteForward),
            ("Enter", Op::InsertNewline),
            ("C+z", Op::Undo),
        ];
        for (desc, op) in table {
            b.bind(desc, *op).expect("stock descriptor parses");
        }
        b
    }

    /// Clone for specialization; the receiver stays untouched.
    pub fn inherit(&self) -> Self {
        self.clone()
    }

    pub fn bind(&mut self, desc: &str, op: Op) -> Result<(), KeymapError> {
        let input = KeyInput::parse(desc)?;
        trace!(target: "input.bindings", %input, ?op, "bound");
        self.map.insert(input, op);
        Ok(())
    }

    pub fn unbind(&mut self, desc: &str) -> Result<(), KeymapError> {
        let input = KeyInput::parse(desc)?;
        self.map.remove(&input);
        Ok(())
    }

    /// A miss is a normal outcome: the dispatch layer falls through to
    /// literal insertion.
    pub fn lookup(&self, input: &KeyInput) -> Option<Op> {
        self.map.get(input).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
