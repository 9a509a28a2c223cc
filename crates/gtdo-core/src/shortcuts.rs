use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use tracing::debug;

use crate::store::Action;
use crate::store::filter::StatusFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Ctrl,
    Cmd,
}

/// A key pressed with an optional modifier, written `ctrl+1` or `cmd+/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    pub modifier: Option<Modifier>,
    pub key: String,
}

impl FromStr for KeyChord {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow!("empty key chord"));
        }

        let (modifier, key) = match s.rsplit_once('+') {
            // "ctrl++" names the plus key itself
            Some((prefix, "")) => (Some(prefix.trim_end_matches('+')), "+"),
            Some((prefix, key)) => (Some(prefix), key),
            None => (None, s),
        };

        let modifier = match modifier.map(str::to_ascii_lowercase).as_deref() {
            None => None,
            Some("ctrl" | "control") => Some(Modifier::Ctrl),
            Some("cmd" | "meta" | "super") => Some(Modifier::Cmd),
            Some(other) => return Err(anyhow!("unknown modifier: {other}")),
        };

        Ok(Self {
            modifier,
            key: key.to_string(),
        })
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.modifier {
            Some(Modifier::Ctrl) => write!(f, "ctrl+{}", self.key),
            Some(Modifier::Cmd) => write!(f, "cmd+{}", self.key),
            None => f.write_str(&self.key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    ShowStatus(StatusFilter),
    FocusEntry,
}

impl Shortcut {
    /// Store action for the shortcut; focusing the entry field is a UI
    /// concern with no state change.
    pub fn action(self) -> Option<Action> {
        match self {
            Shortcut::ShowStatus(status) => Some(Action::SetStatusFilter(status)),
            Shortcut::FocusEntry => None,
        }
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shortcut::ShowStatus(status) => write!(f, "show {status} tasks"),
            Shortcut::FocusEntry => f.write_str("focus task entry"),
        }
    }
}

/// Global shortcuts fire only outside text inputs and only with a
/// modifier held.
pub fn resolve(chord: &KeyChord, typing: bool) -> Option<Shortcut> {
    if typing {
        debug!(%chord, "shortcut suppressed while typing");
        return None;
    }
    chord.modifier?;

    match chord.key.as_str() {
        "1" => Some(Shortcut::ShowStatus(StatusFilter::All)),
        "2" => Some(Shortcut::ShowStatus(StatusFilter::Active)),
        "3" => Some(Shortcut::ShowStatus(StatusFilter::Completed)),
        "/" => Some(Shortcut::FocusEntry),
        _ => None,
    }
}
