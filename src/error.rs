//! Construction-time error types

/// Misuse detected while building sinks, groups or bindings.
///
/// Always fatal to the offending constructor, never defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// C01: Output group built from zero sinks
    EmptyGroup,
    /// C02: More sinks than a group can hold
    GroupTooLarge,
    /// C03: Leveled output preset outside 0..=100
    LevelOutOfRange { level: u8 },
    /// C04: Input source already has a consumer
    SourceAlreadyBound,
    /// C05: Debounce window of zero
    ZeroDebounceWindow,
}

impl ConfigError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyGroup => "C01",
            Self::GroupTooLarge => "C02",
            Self::LevelOutOfRange { .. } => "C03",
            Self::SourceAlreadyBound => "C04",
            Self::ZeroDebounceWindow => "C05",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::EmptyGroup => "output group is empty",
            Self::GroupTooLarge => "too many outputs in group",
            Self::LevelOutOfRange { .. } => "level out of range (0-100)",
            Self::SourceAlreadyBound => "input source already bound",
            Self::ZeroDebounceWindow => "debounce window must be > 0",
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::LevelOutOfRange { level } => {
                write!(f, "{}: {}, got {}", self.code(), self.message(), level)
            }
            _ => write!(f, "{}: {}", self.code(), self.message()),
        }
    }
}
