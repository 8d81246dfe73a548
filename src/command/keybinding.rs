//! Keyboard shortcut parsing and normalization

use crate::error::{ProxyError, Result};
use std::fmt;
use std::str::FromStr;

/// Modifier keys, in canonical display order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    /// Control
    pub ctrl: bool,
    /// Alt / Option
    pub alt: bool,
    /// Shift
    pub shift: bool,
    /// Meta / Command / Super
    pub meta: bool,
}

impl Modifiers {
    fn set(&mut self, name: &str) -> bool {
        let flag = match name {
            "ctrl" | "control" => &mut self.ctrl,
            "alt" | "option" => &mut self.alt,
            "shift" => &mut self.shift,
            "meta" | "cmd" | "command" | "super" | "win" => &mut self.meta,
            _ => return false,
        };
        *flag = true;
        true
    }
}

/// A normalized key combination such as `ctrl+shift+p`.
///
/// Two bindings written differently (`Shift+Ctrl+P`, `control+shift+p`)
/// parse to equal values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    modifiers: Modifiers,
    key: String,
}

impl KeyBinding {
    /// Parse a `+` separated combination. The plus key itself is written
    /// as a trailing `++` (`ctrl++`) or a lone `+`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let (body, plus_key) = if trimmed == "+" {
            ("", true)
        } else if let Some(body) = trimmed.strip_suffix("++") {
            (body, true)
        } else {
            (trimmed, false)
        };

        let mut modifiers = Modifiers::default();
        let mut key = plus_key.then(|| "+".to_string());

        if !body.is_empty() || !plus_key {
            for part in body.split('+').map(str::trim) {
                if part.is_empty() {
                    return Err(ProxyError::Command(format!("invalid key binding '{}'", input)));
                }

                let lower = part.to_lowercase();
                if modifiers.set(&lower) {
                    continue;
                }
                if key.is_some() {
                    return Err(ProxyError::Command(format!(
                        "key binding '{}' names more than one key",
                        input
                    )));
                }
                key = Some(lower);
            }
        }

        let key = key.ok_or_else(|| ProxyError::Command(format!("key binding '{}' has no key", input)))?;
        Ok(Self { modifiers, key })
    }

    /// Unmodified single key
    pub fn key(key: &str) -> Self {
        Self {
            modifiers: Modifiers::default(),
            key: key.to_lowercase(),
        }
    }

    /// Modifier state
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Key name, lowercased
    pub fn key_name(&self) -> &str {
        &self.key
    }
}

impl FromStr for KeyBinding {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.modifiers;
        for (on, name) in [(m.ctrl, "ctrl"), (m.alt, "alt"), (m.shift, "shift"), (m.meta, "meta")] {
            if on {
                write!(f, "{}+", name)?;
            }
        }
        write!(f, "{}", self.key)
    }
}
