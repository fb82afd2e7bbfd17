//! Level-based key debouncer
//!
//! A new level is accepted only once it has been held for the whole
//! debounce window. Contact bounce shorter than the window never reaches
//! the outputs.
//!
//! ```text
//! raw:      ‾‾|_|‾|_|‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾
//! pending:      ^ reset on every edge
//! accepted:                 ^ held >= window → ON
//! ```

use crate::error::ConfigError;
use crate::sample::{LogicalState, RawSample};

/// Default window: 3 ms, as configured for the telegraph key.
pub const DEFAULT_DEBOUNCE_US: u64 = 3000;

/// Minimum time a raw level must persist before it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DebounceWindow(u64);

impl DebounceWindow {
    /// Create a window of `us` microseconds.
    ///
    /// Fails with `ZeroDebounceWindow` for 0.
    pub const fn from_micros(us: u64) -> Result<Self, ConfigError> {
        if us == 0 {
            Err(ConfigError::ZeroDebounceWindow)
        } else {
            Ok(Self(us))
        }
    }

    /// Create a window of `ms` milliseconds.
    pub const fn from_millis(ms: u32) -> Result<Self, ConfigError> {
        Self::from_micros(ms as u64 * 1000)
    }

    /// Window length in microseconds.
    #[inline]
    pub const fn as_micros(&self) -> u64 {
        self.0
    }
}

impl Default for DebounceWindow {
    fn default() -> Self {
        Self(DEFAULT_DEBOUNCE_US)
    }
}

/// Level currently being timed
#[derive(Debug, Clone, Copy)]
struct Pending {
    level: bool,
    since_us: u64,
}

/// Debouncer
///
/// Pure function of its input history. Not thread-safe: feed it from one
/// path only, in timestamp order.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: DebounceWindow,
    /// None until the first sample
    pending: Option<Pending>,
    /// Last state handed out (or seeded by the first sample)
    accepted: Option<LogicalState>,
}

impl Debouncer {
    /// Create a fresh debouncer.
    pub const fn new(window: DebounceWindow) -> Self {
        Self {
            window,
            pending: None,
            accepted: None,
        }
    }

    /// Feed one raw sample.
    ///
    /// Returns the new state when a level has been held for at least the
    /// window and differs from the last accepted state. The very first
    /// sample only seeds the state and never emits.
    pub fn accept(&mut self, sample: RawSample) -> Option<LogicalState> {
        let pending = match self.pending {
            None => {
                self.pending = Some(Pending {
                    level: sample.level,
                    since_us: sample.timestamp_us,
                });
                self.accepted = Some(sample.state());
                return None;
            }
            Some(p) => p,
        };

        if sample.level != pending.level {
            self.pending = Some(Pending {
                level: sample.level,
                since_us: sample.timestamp_us,
            });
            return None;
        }

        let held = sample.timestamp_us.saturating_sub(pending.since_us);
        let candidate = sample.state();
        if held >= self.window.as_micros() && self.accepted != Some(candidate) {
            self.accepted = Some(candidate);
            return Some(candidate);
        }

        None
    }

    /// Last accepted state (None before the first sample).
    #[inline]
    pub fn state(&self) -> Option<LogicalState> {
        self.accepted
    }

    /// Configured window.
    #[inline]
    pub fn window(&self) -> DebounceWindow {
        self.window
    }

    /// Forget all history; the next sample seeds again.
    pub fn reset(&mut self) {
        self.pending = None;
        self.accepted = None;
    }
}
