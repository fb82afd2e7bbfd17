//! Module: sample
//!
//! Purpose: Raw key readings and the logical ON/OFF state derived from them.
//!
//! Architecture:
//! - `RawSample` is what the key producer pushes: one boolean level plus the
//!   monotonic time it was read
//! - `LogicalState` is what the debouncer emits and what outputs are driven to
//! - Both are `Copy`, produced once and never mutated
//!
//! Safety: Safe. No unsafe blocks. Copy types only.

/// Semantic state of the key and of every output bound to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogicalState {
    /// Key released, outputs off
    Off,
    /// Key pressed, outputs on
    On,
}

impl LogicalState {
    /// Map a physical level to a logical state (`true` = ON).
    #[inline]
    pub const fn from_level(level: bool) -> Self {
        if level {
            LogicalState::On
        } else {
            LogicalState::Off
        }
    }

    /// Physical level for this state.
    #[inline]
    pub const fn is_on(self) -> bool {
        matches!(self, LogicalState::On)
    }

    /// Short label for logs and console output.
    pub const fn as_str(self) -> &'static str {
        match self {
            LogicalState::Off => "OFF",
            LogicalState::On => "ON",
        }
    }
}

impl From<bool> for LogicalState {
    fn from(level: bool) -> Self {
        Self::from_level(level)
    }
}

impl From<LogicalState> for bool {
    fn from(state: LogicalState) -> Self {
        state.is_on()
    }
}

impl core::fmt::Display for LogicalState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single physical reading of the key input.
///
/// Memory layout:
/// ```text
/// [timestamp_us:8][level:1] + padding
/// ```
///
/// Timestamps are monotonic microseconds (e.g. `esp_timer_get_time()`).
/// Only the debouncer looks at them; samples are never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawSample {
    /// Pin level as read (true = high)
    pub level: bool,

    /// Monotonic time of the reading, microseconds
    pub timestamp_us: u64,
}

impl RawSample {
    /// Placeholder used to fill empty ring slots.
    pub const EMPTY: Self = Self {
        level: false,
        timestamp_us: 0,
    };

    /// Create a sample.
    #[inline]
    pub const fn new(level: bool, timestamp_us: u64) -> Self {
        Self {
            level,
            timestamp_us,
        }
    }

    /// Logical state the raw level stands for.
    #[inline]
    pub const fn state(&self) -> LogicalState {
        LogicalState::from_level(self.level)
    }
}
