//! Key descriptors sent by the host.
//!
//! Hosts describe keys either as text (`"a"`, `"BackSpace"`,
//! `"Control+Shift+a"`) or as a single UTF-16 code unit. Both forms are
//! parsed on the calling thread into an owned `Key`, which is what gets
//! captured by the scheduled work item.

use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

bitflags! {
    /// Modifier state attached to a key.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyStates: u32 {
        const SHIFT = 1 << 0;
        const CAPS_LOCK = 1 << 1;
        const CTRL = 1 << 2;
        const ALT = 1 << 3;
        const SUPER = 1 << 6;
        const HYPER = 1 << 7;
        const META = 1 << 8;
    }
}

/// Named, non-printable keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    BackSpace,
    Tab,
    Return,
    Escape,
    Delete,
    Home,
    End,
    Left,
    Up,
    Right,
    Down,
    PageUp,
    PageDown,
    Insert,
}

/// Canonical spelling of each named key, plus accepted aliases.
const NAMED_KEYS: &[(&str, NamedKey)] = &[
    ("BackSpace", NamedKey::BackSpace),
    ("Tab", NamedKey::Tab),
    ("Return", NamedKey::Return),
    ("Escape", NamedKey::Escape),
    ("Delete", NamedKey::Delete),
    ("Home", NamedKey::Home),
    ("End", NamedKey::End),
    ("Left", NamedKey::Left),
    ("Up", NamedKey::Up),
    ("Right", NamedKey::Right),
    ("Down", NamedKey::Down),
    ("Page_Up", NamedKey::PageUp),
    ("Page_Down", NamedKey::PageDown),
    ("Insert", NamedKey::Insert),
    ("Enter", NamedKey::Return),
    ("KP_Enter", NamedKey::Return),
    ("Esc", NamedKey::Escape),
    ("Prior", NamedKey::PageUp),
    ("Next", NamedKey::PageDown),
];

/// Named keys that stand for printable characters.
const CHAR_KEYS: &[(&str, char)] = &[
    ("space", ' '),
    ("comma", ','),
    ("period", '.'),
    ("minus", '-'),
    ("equal", '='),
    ("slash", '/'),
    ("semicolon", ';'),
    ("apostrophe", '\''),
    ("grave", '`'),
    ("backslash", '\\'),
    ("bracketleft", '['),
    ("bracketright", ']'),
];

const MODIFIERS: &[(&str, KeyStates)] = &[
    ("Control", KeyStates::CTRL),
    ("Ctrl", KeyStates::CTRL),
    ("Shift", KeyStates::SHIFT),
    ("Alt", KeyStates::ALT),
    ("Super", KeyStates::SUPER),
    ("Hyper", KeyStates::HYPER),
    ("Meta", KeyStates::META),
    ("CapsLock", KeyStates::CAPS_LOCK),
];

/// The symbol part of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySym {
    /// A printable character.
    Char(char),
    /// A non-printable key.
    Named(NamedKey),
}

impl KeySym {
    /// The character this symbol produces, if printable.
    pub fn as_char(&self) -> Option<char> {
        match self {
            KeySym::Char(c) => Some(*c),
            KeySym::Named(_) => None,
        }
    }
}

/// A key with its modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    pub sym: KeySym,
    pub states: KeyStates,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    #[error("empty key descriptor")]
    Empty,
    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),
    #[error("unknown key name `{0}`")]
    UnknownKey(String),
    #[error("code unit {0:#06x} is not a character")]
    InvalidCodeUnit(u16),
}

impl Key {
    pub fn new(sym: KeySym, states: KeyStates) -> Self {
        Self { sym, states }
    }

    /// A key for a single printable character without modifiers.
    pub fn from_char(c: char) -> Self {
        Self::new(KeySym::Char(c), KeyStates::empty())
    }

    /// A key for one UTF-16 code unit as delivered by the host.
    ///
    /// Surrogate halves cannot stand alone and are rejected.
    pub fn from_utf16(unit: u16) -> Result<Self, KeyParseError> {
        char::from_u32(unit as u32)
            .map(Self::from_char)
            .ok_or(KeyParseError::InvalidCodeUnit(unit))
    }

    /// Parse a textual descriptor such as `"Control+Shift+a"`.
    pub fn parse(descriptor: &str) -> Result<Self, KeyParseError> {
        if descriptor.is_empty() {
            return Err(KeyParseError::Empty);
        }

        // A trailing "+" is the plus key itself ("Control++", "+").
        let (modifiers, name) = match descriptor.strip_suffix('+') {
            Some(rest) if rest.is_empty() || rest.ends_with('+') => {
                (rest.strip_suffix('+').unwrap_or(rest), "+")
            }
            _ => match descriptor.rsplit_once('+') {
                Some((mods, name)) => (mods, name),
                None => ("", descriptor),
            },
        };

        let mut states = KeyStates::empty();
        for part in modifiers.split('+').filter(|p| !p.is_empty()) {
            let state = MODIFIERS
                .iter()
                .find(|(n, _)| *n == part)
                .map(|(_, s)| *s)
                .ok_or_else(|| KeyParseError::UnknownModifier(part.to_string()))?;
            states |= state;
        }

        Ok(Self::new(parse_sym(name)?, states))
    }

    /// Whether any modifier other than shift/caps lock is held.
    pub fn has_command_modifier(&self) -> bool {
        self.states
            .intersects(KeyStates::CTRL | KeyStates::ALT | KeyStates::SUPER | KeyStates::HYPER | KeyStates::META)
    }
}

fn parse_sym(name: &str) -> Result<KeySym, KeyParseError> {
    if name.is_empty() {
        return Err(KeyParseError::Empty);
    }

    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(KeySym::Char(c));
    }

    if let Some((_, named)) = NAMED_KEYS.iter().find(|(n, _)| *n == name) {
        return Ok(KeySym::Named(*named));
    }
    if let Some((_, c)) = CHAR_KEYS.iter().find(|(n, _)| *n == name) {
        return Ok(KeySym::Char(*c));
    }

    Err(KeyParseError::UnknownKey(name.to_string()))
}

impl FromStr for Key {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::parse(s)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, state) in MODIFIERS.iter().filter(|(n, _)| *n != "Ctrl") {
            if self.states.contains(*state) {
                write!(f, "{}+", name)?;
            }
        }
        match self.sym {
            KeySym::Char(' ') => f.write_str("space"),
            KeySym::Char(c) => write!(f, "{}", c),
            KeySym::Named(named) => {
                let name = NAMED_KEYS
                    .iter()
                    .find(|(_, k)| *k == named)
                    .map(|(n, _)| *n)
                    .unwrap_or("Unknown");
                f.write_str(name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_character() {
        let key = Key::parse("a").unwrap();
        assert_eq!(key.sym, KeySym::Char('a'));
        assert!(key.states.is_empty());
    }

    #[test]
    fn test_parse_named_keys() {
        assert_eq!(Key::parse("BackSpace").unwrap().sym, KeySym::Named(NamedKey::BackSpace));
        assert_eq!(Key::parse("Return").unwrap().sym, KeySym::Named(NamedKey::Return));
        assert_eq!(Key::parse("Page_Down").unwrap().sym, KeySym::Named(NamedKey::PageDown));
        assert_eq!(Key::parse("space").unwrap().sym, KeySym::Char(' '));
    }

    #[test]
    fn test_parse_modifiers() {
        let key = Key::parse("Control+Shift+a").unwrap();
        assert_eq!(key.sym, KeySym::Char('a'));
        assert_eq!(key.states, KeyStates::CTRL | KeyStates::SHIFT);
        assert!(key.has_command_modifier());

        let shifted = Key::parse("Shift+b").unwrap();
        assert!(!shifted.has_command_modifier());
    }

    #[test]
    fn test_parse_plus_key() {
        assert_eq!(Key::parse("+").unwrap().sym, KeySym::Char('+'));

        let key = Key::parse("Control++").unwrap();
        assert_eq!(key.sym, KeySym::Char('+'));
        assert_eq!(key.states, KeyStates::CTRL);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Key::parse(""), Err(KeyParseError::Empty));
        assert_eq!(
            Key::parse("Bogus+a"),
            Err(KeyParseError::UnknownModifier("Bogus".into()))
        );
        assert_eq!(
            Key::parse("NotAKey"),
            Err(KeyParseError::UnknownKey("NotAKey".into()))
        );
    }

    #[test]
    fn test_from_utf16() {
        assert_eq!(Key::from_utf16(b'x' as u16).unwrap(), Key::from_char('x'));
        assert_eq!(Key::from_utf16(0x4f60).unwrap().sym, KeySym::Char('你'));
        assert_eq!(
            Key::from_utf16(0xd800),
            Err(KeyParseError::InvalidCodeUnit(0xd800))
        );
    }

    #[test]
    fn test_display_uses_canonical_names() {
        assert_eq!(Key::parse("Ctrl+space").unwrap().to_string(), "Control+space");
        assert_eq!(Key::parse("Enter").unwrap().to_string(), "Return");
        assert_eq!(Key::from_char('你').to_string(), "你");
    }
}
