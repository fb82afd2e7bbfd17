//! Module: sink
//!
//! Purpose: Controllable outputs driven by the key.
//!
//! Architecture:
//! - `OutputSink` is the object-safe seam a group fans out over
//! - Two implementers, one per capability:
//!   - `BinarySink` over `embedded_hal::digital::OutputPin` (sounder, LED)
//!   - `LeveledSink` over `embedded_hal::pwm::SetDutyCycle` (audio tone)
//! - Each sink owns its physical handle; its state changes only via `set`
//!
//! Safety: Safe. No unsafe blocks.

use embedded_hal::digital::{self, OutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};

use crate::error::ConfigError;
use crate::sample::LogicalState;

/// Highest valid level for a leveled output (duty cycle, percent).
pub const MAX_LEVEL: u8 = 100;

/// What kind of physical output a sink drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Boolean line
    Binary,
    /// Duty-cycle output with ON/OFF presets
    Leveled,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Binary => "binary",
            Capability::Leveled => "leveled",
        }
    }
}

/// Underlying HAL error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFault {
    Digital(digital::ErrorKind),
    Pwm(pwm::ErrorKind),
}

impl core::fmt::Display for DeviceFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DeviceFault::Digital(kind) => write!(f, "gpio: {}", kind),
            DeviceFault::Pwm(kind) => write!(f, "pwm: {}", kind),
        }
    }
}

/// Runtime actuation failure of one output.
///
/// Reported once per failed `set`, never retried by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    /// The physical resource could not be actuated
    DeviceUnavailable(DeviceFault),
}

impl core::fmt::Display for SinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SinkError::DeviceUnavailable(fault) => write!(f, "device unavailable ({})", fault),
        }
    }
}

/// A controllable output.
pub trait OutputSink {
    /// Identity used in diagnostics.
    fn name(&self) -> &'static str;

    /// Capability tag.
    fn capability(&self) -> Capability;

    /// Last state successfully applied.
    fn state(&self) -> LogicalState;

    /// Drive the output to `state`.
    ///
    /// Setting the current state again re-asserts the line; it is not an
    /// error. On failure `state()` keeps its previous value.
    fn set(&mut self, state: LogicalState) -> Result<(), SinkError>;
}

/// Boolean output: ON drives the pin high, OFF drives it low.
pub struct BinarySink<P> {
    name: &'static str,
    pin: P,
    state: LogicalState,
}

impl<P: OutputPin> BinarySink<P> {
    /// Wrap `pin`. The line is assumed to start low (OFF).
    pub fn new(name: &'static str, pin: P) -> Self {
        Self {
            name,
            pin,
            state: LogicalState::Off,
        }
    }

    /// Borrow the wrapped pin.
    pub fn pin(&self) -> &P {
        &self.pin
    }

    /// Release the wrapped pin.
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> OutputSink for BinarySink<P> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn capability(&self) -> Capability {
        Capability::Binary
    }

    fn state(&self) -> LogicalState {
        self.state
    }

    fn set(&mut self, state: LogicalState) -> Result<(), SinkError> {
        let result = match state {
            LogicalState::On => self.pin.set_high(),
            LogicalState::Off => self.pin.set_low(),
        };
        result.map_err(|e| {
            SinkError::DeviceUnavailable(DeviceFault::Digital(digital::Error::kind(&e)))
        })?;
        self.state = state;
        Ok(())
    }
}

/// Duty-cycle output with fixed ON/OFF presets (percent).
pub struct LeveledSink<P> {
    name: &'static str,
    pwm: P,
    on_level: u8,
    off_level: u8,
    state: LogicalState,
}

impl<P: SetDutyCycle> LeveledSink<P> {
    /// Wrap `pwm` with its ON/OFF duty presets.
    ///
    /// Both levels must be within `0..=MAX_LEVEL`.
    pub fn new(
        name: &'static str,
        pwm: P,
        on_level: u8,
        off_level: u8,
    ) -> Result<Self, ConfigError> {
        for level in [on_level, off_level] {
            if level > MAX_LEVEL {
                return Err(ConfigError::LevelOutOfRange { level });
            }
        }
        Ok(Self {
            name,
            pwm,
            on_level,
            off_level,
            state: LogicalState::Off,
        })
    }

    /// Level applied for ON.
    pub fn on_level(&self) -> u8 {
        self.on_level
    }

    /// Level applied for OFF.
    pub fn off_level(&self) -> u8 {
        self.off_level
    }

    /// Level for a given state.
    pub fn level_for(&self, state: LogicalState) -> u8 {
        match state {
            LogicalState::On => self.on_level,
            LogicalState::Off => self.off_level,
        }
    }

    /// Borrow the wrapped channel.
    pub fn pwm(&self) -> &P {
        &self.pwm
    }

    /// Release the wrapped channel.
    pub fn into_inner(self) -> P {
        self.pwm
    }
}

impl<P: SetDutyCycle> OutputSink for LeveledSink<P> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn capability(&self) -> Capability {
        Capability::Leveled
    }

    fn state(&self) -> LogicalState {
        self.state
    }

    fn set(&mut self, state: LogicalState) -> Result<(), SinkError> {
        let level = self.level_for(state);
        self.pwm
            .set_duty_cycle_percent(level)
            .map_err(|e| SinkError::DeviceUnavailable(DeviceFault::Pwm(pwm::Error::kind(&e))))?;
        self.state = state;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::sim::{SimPin, SimPwm};

    #[test]
    fn test_binary_sink_drives_pin() {
        let mut sounder = BinarySink::new("sounder", SimPin::new());
        assert_eq!(sounder.state(), LogicalState::Off);

        sounder.set(LogicalState::On).unwrap();
        assert!(sounder.pin().is_high());
        assert_eq!(sounder.state(), LogicalState::On);

        sounder.set(LogicalState::Off).unwrap();
        assert!(!sounder.pin().is_high());
        assert_eq!(sounder.capability(), Capability::Binary);
    }

    #[test]
    fn test_binary_sink_repeated_state_is_ok() {
        let mut led = BinarySink::new("led", SimPin::new());
        led.set(LogicalState::On).unwrap();
        led.set(LogicalState::On).unwrap();
        assert_eq!(led.state(), LogicalState::On);
        assert_eq!(led.pin().writes(), 2);
    }

    #[test]
    fn test_binary_sink_failure_keeps_state() {
        let pin = SimPin::new();
        pin.set_failing(true);
        let mut led = BinarySink::new("led", pin);

        let err = led.set(LogicalState::On).unwrap_err();
        assert_eq!(
            err,
            SinkError::DeviceUnavailable(DeviceFault::Digital(digital::ErrorKind::Other))
        );
        assert_eq!(led.state(), LogicalState::Off);
    }

    #[test]
    fn test_leveled_sink_round_trip() {
        let mut tone = LeveledSink::new("left", SimPwm::new(100), 75, 0).unwrap();

        tone.set(LogicalState::On).unwrap();
        tone.set(LogicalState::Off).unwrap();
        tone.set(LogicalState::On).unwrap();

        let levels: Vec<u16> = tone.pwm().history().collect();
        assert_eq!(levels, vec![75, 0, 75]);
        assert_eq!(tone.state(), LogicalState::On);
        assert_eq!(tone.capability(), Capability::Leveled);
    }

    #[test]
    fn test_leveled_sink_rejects_out_of_range() {
        let err = LeveledSink::new("left", SimPwm::new(100), 101, 0).err();
        assert_eq!(err, Some(ConfigError::LevelOutOfRange { level: 101 }));

        let err = LeveledSink::new("left", SimPwm::new(100), 50, 200).err();
        assert_eq!(err, Some(ConfigError::LevelOutOfRange { level: 200 }));

        assert!(LeveledSink::new("left", SimPwm::new(100), 100, 0).is_ok());
    }

    #[test]
    fn test_leveled_sink_scales_to_max_duty() {
        let mut tone = LeveledSink::new("right", SimPwm::new(1000), 50, 0).unwrap();
        tone.set(LogicalState::On).unwrap();
        assert_eq!(tone.pwm().duty(), 500);
    }
}
