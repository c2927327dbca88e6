//! Keyboard intents and their chords.
//!
//! Chords are written as `+`-separated tokens, modifiers first: `"ctrl+e"`, `"meta+delete"`,
//! `"escape"`. Matching is exact on the modifier set.

use std::fmt;
use std::str::FromStr;

use crate::config::KeysConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    EditLast,
    DeleteLast,
    RewindToLast,
    /// Close the sheet or cancel the edit in progress.
    Dismiss,
    Clear,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };

    pub const META: Modifiers = Modifiers {
        meta: true,
        ..Modifiers::NONE
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyChord {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeymapError {
    InvalidKey(String),
    /// One chord bound to two different intents.
    Conflict(String),
}

impl fmt::Display for KeymapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeymapError::InvalidKey(k) => write!(f, "Invalid key: {k}"),
            KeymapError::Conflict(k) => write!(f, "Key bound twice: {k}"),
        }
    }
}

impl std::error::Error for KeymapError {}

impl FromStr for KeyChord {
    type Err = KeymapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut modifiers = Modifiers::NONE;
        let mut key = None;

        for part in s.split('+').map(str::trim) {
            match part.to_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" | "option" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "meta" | "cmd" | "super" => modifiers.meta = true,
                other => {
                    if key.is_some() {
                        return Err(KeymapError::InvalidKey(format!(
                            "Multiple keys in binding: {s}"
                        )));
                    }
                    let parsed =
                        parse_key(other).ok_or_else(|| KeymapError::InvalidKey(s.to_string()))?;
                    key = Some(parsed);
                }
            }
        }

        let key =
            key.ok_or_else(|| KeymapError::InvalidKey(format!("No key found in binding: {s}")))?;
        Ok(KeyChord::new(key, modifiers))
    }
}

fn parse_key(token: &str) -> Option<Key> {
    let mut chars = token.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(Key::Char(c));
    }
    match token {
        "enter" | "return" => Some(Key::Enter),
        "escape" | "esc" => Some(Key::Escape),
        "tab" => Some(Key::Tab),
        "backspace" => Some(Key::Backspace),
        "delete" | "del" => Some(Key::Delete),
        _ => None,
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.modifiers;
        for (on, name) in [
            (m.ctrl, "ctrl+"),
            (m.alt, "alt+"),
            (m.shift, "shift+"),
            (m.meta, "meta+"),
        ] {
            if on {
                f.write_str(name)?;
            }
        }
        match self.key {
            Key::Char(c) => write!(f, "{c}"),
            Key::Enter => f.write_str("enter"),
            Key::Escape => f.write_str("escape"),
            Key::Tab => f.write_str("tab"),
            Key::Backspace => f.write_str("backspace"),
            Key::Delete => f.write_str("delete"),
        }
    }
}

/// Chord to intent resolution.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: Vec<(KeyChord, Intent)>,
}

impl Keymap {
    pub fn from_config(keys: &KeysConfig) -> Result<Self, KeymapError> {
        let groups = [
            (&keys.edit_last, Intent::EditLast),
            (&keys.delete_last, Intent::DeleteLast),
            (&keys.rewind_to_last, Intent::RewindToLast),
            (&keys.dismiss, Intent::Dismiss),
            (&keys.clear, Intent::Clear),
        ];

        let mut keymap = Keymap::default();
        for (chords, intent) in groups {
            for chord in chords {
                keymap.bind(chord.parse()?, intent)?;
            }
        }
        Ok(keymap)
    }

    pub fn bind(&mut self, chord: KeyChord, intent: Intent) -> Result<(), KeymapError> {
        match self.resolve(chord) {
            Some(existing) if existing != intent => Err(KeymapError::Conflict(chord.to_string())),
            Some(_) => Ok(()),
            None => {
                self.bindings.push((chord, intent));
                Ok(())
            }
        }
    }

    pub fn resolve(&self, chord: KeyChord) -> Option<Intent> {
        self.bindings
            .iter()
            .find(|(bound, _)| *bound == chord)
            .map(|(_, intent)| *intent)
    }
}
