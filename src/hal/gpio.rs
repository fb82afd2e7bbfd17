//! GPIO configuration for the telegraph key and the binary outputs.

/// Input pull resistor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    Up,
    Down,
    Floating,
}

/// Telegraph key input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyConfig {
    pub id: &'static str,
    pub name: &'static str,
    pub pin: u8,
    pub pull: Pull,
    /// Debounce window, microseconds
    pub debounce_us: u64,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            id: "key",
            name: "Telegraph Key",
            pin: 4,
            pull: Pull::Down,
            debounce_us: crate::debounce::DEFAULT_DEBOUNCE_US,
        }
    }
}

/// Binary output (sounder, LED).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputPinConfig {
    pub id: &'static str,
    pub name: &'static str,
    pub pin: u8,
}

impl OutputPinConfig {
    pub const fn new(id: &'static str, name: &'static str, pin: u8) -> Self {
        Self {
            id,
            name,
            pin,
        }
    }
}
