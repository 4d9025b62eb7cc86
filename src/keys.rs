//! Key enum for type-safe synthetic input across deskremote.
//!
//! Centralizes virtual key codes and modifier chords to avoid scattered
//! magic values. These are the HID codes the host backend posts as a
//! down+up pair.

/// Modifier keys held while a key is posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Control,
    Command,
}

/// Keys the control API can synthesize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    PlayPause,
    NextTrack,
    PrevTrack,
    VolumeUp,
    VolumeDown,
    Mute,
    ArrowUp,
    ArrowDown,
    Space,
    /// Q with Control+Command: the session lock chord
    LockScreen,
}

impl Key {
    /// Virtual key code posted to the OS event system
    pub fn code(&self) -> i32 {
        match self {
            Key::PlayPause => 16,
            Key::NextTrack => 17,
            Key::PrevTrack => 18,
            Key::VolumeUp => 0,
            Key::VolumeDown => 1,
            Key::Mute => 7,
            Key::ArrowUp => 126,
            Key::ArrowDown => 125,
            Key::Space => 49,
            Key::LockScreen => 12,
        }
    }

    /// Modifier chord held around the key press
    pub fn modifiers(&self) -> &'static [Modifier] {
        match self {
            Key::LockScreen => &[Modifier::Control, Modifier::Command],
            _ => &[],
        }
    }

    /// Get the key name as a string (lowercase)
    ///
    /// Use this for log output and external interfaces.
    pub fn as_str(&self) -> &'static str {
        match self {
            Key::PlayPause => "playpause",
            Key::NextTrack => "next",
            Key::PrevTrack => "prev",
            Key::VolumeUp => "volumeup",
            Key::VolumeDown => "volumedown",
            Key::Mute => "mute",
            Key::ArrowUp => "arrowup",
            Key::ArrowDown => "arrowdown",
            Key::Space => "space",
            Key::LockScreen => "lock",
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
