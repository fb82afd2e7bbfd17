//! Simulated pins for host builds and tests.
//!
//! Implements the `embedded-hal` 1.0 output traits, records every write and
//! can be told to fail so fan-out error paths can be exercised off-target.

use core::cell::Cell;

use embedded_hal::{digital, pwm};
use heapless::HistoryBuffer;

/// Writes remembered per simulated output.
pub const SIM_HISTORY_LEN: usize = 32;

/// Error returned by a simulated output told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimError;

impl digital::Error for SimError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

impl pwm::Error for SimError {
    fn kind(&self) -> pwm::ErrorKind {
        pwm::ErrorKind::Other
    }
}

/// When a simulated output refuses writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailMode {
    Never,
    Always,
    /// Fail this many more writes, then recover
    Next(u32),
}

#[derive(Debug)]
struct FaultSwitch(Cell<FailMode>);

impl FaultSwitch {
    const fn new() -> Self {
        Self(Cell::new(FailMode::Never))
    }

    /// Consume one write; true if it must fail.
    fn trip(&self) -> bool {
        match self.0.get() {
            FailMode::Never => false,
            FailMode::Always => true,
            FailMode::Next(0) => false,
            FailMode::Next(n) => {
                self.0.set(if n == 1 { FailMode::Never } else { FailMode::Next(n - 1) });
                true
            }
        }
    }
}

/// Simulated digital output.
#[derive(Debug)]
pub struct SimPin {
    high: bool,
    writes: u32,
    history: HistoryBuffer<bool, SIM_HISTORY_LEN>,
    fault: FaultSwitch,
}

impl SimPin {
    /// New pin, low, never failing.
    pub fn new() -> Self {
        Self {
            high: false,
            writes: 0,
            history: HistoryBuffer::new(),
            fault: FaultSwitch::new(),
        }
    }

    /// Make every following write fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.fault
            .0
            .set(if failing { FailMode::Always } else { FailMode::Never });
    }

    /// Fail the next `count` writes, then recover.
    pub fn fail_next(&self, count: u32) {
        self.fault.0.set(FailMode::Next(count));
    }

    /// Current line level.
    pub fn is_high(&self) -> bool {
        self.high
    }

    /// Successful writes so far.
    pub fn writes(&self) -> u32 {
        self.writes
    }

    /// Levels written, oldest first.
    pub fn history(&self) -> impl Iterator<Item = bool> + '_ {
        self.history.oldest_ordered().copied()
    }

    fn write(&mut self, high: bool) -> Result<(), SimError> {
        if self.fault.trip() {
            return Err(SimError);
        }
        self.high = high;
        self.writes += 1;
        self.history.write(high);
        Ok(())
    }
}

impl Default for SimPin {
    fn default() -> Self {
        Self::new()
    }
}

impl digital::ErrorType for SimPin {
    type Error = SimError;
}

impl digital::OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

/// Simulated PWM channel.
#[derive(Debug)]
pub struct SimPwm {
    max_duty: u16,
    duty: u16,
    history: HistoryBuffer<u16, SIM_HISTORY_LEN>,
    fault: FaultSwitch,
}

impl SimPwm {
    /// New channel at 0 duty. `max_duty` is the counter resolution.
    pub fn new(max_duty: u16) -> Self {
        Self {
            max_duty: max_duty.max(1),
            duty: 0,
            history: HistoryBuffer::new(),
            fault: FaultSwitch::new(),
        }
    }

    /// Make every following write fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.fault
            .0
            .set(if failing { FailMode::Always } else { FailMode::Never });
    }

    /// Fail the next `count` writes, then recover.
    pub fn fail_next(&self, count: u32) {
        self.fault.0.set(FailMode::Next(count));
    }

    /// Current raw duty.
    pub fn duty(&self) -> u16 {
        self.duty
    }

    /// Raw duty values written, oldest first.
    pub fn history(&self) -> impl Iterator<Item = u16> + '_ {
        self.history.oldest_ordered().copied()
    }
}

impl pwm::ErrorType for SimPwm {
    type Error = SimError;
}

impl pwm::SetDutyCycle for SimPwm {
    fn max_duty_cycle(&self) -> u16 {
        self.max_duty
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        if self.fault.trip() {
            return Err(SimError);
        }
        self.duty = duty.min(self.max_duty);
        self.history.write(self.duty);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::OutputPin;
    use embedded_hal::pwm::SetDutyCycle;

    #[test]
    fn test_sim_pin_records_writes() {
        let mut pin = SimPin::new();
        pin.set_high().unwrap();
        pin.set_low().unwrap();
        pin.set_high().unwrap();

        assert!(pin.is_high());
        assert_eq!(pin.writes(), 3);
        assert_eq!(pin.history().collect::<Vec<_>>(), vec![true, false, true]);
    }

    #[test]
    fn test_sim_pin_fail_next_recovers() {
        let mut pin = SimPin::new();
        pin.fail_next(2);
        assert!(pin.set_high().is_err());
        assert!(pin.set_high().is_err());
        assert!(pin.set_high().is_ok());
        assert_eq!(pin.writes(), 1);
    }

    #[test]
    fn test_sim_pwm_percent() {
        let mut pwm = SimPwm::new(200);
        pwm.set_duty_cycle_percent(50).unwrap();
        assert_eq!(pwm.duty(), 100);

        pwm.set_failing(true);
        assert!(pwm.set_duty_cycle_percent(10).is_err());
        assert_eq!(pwm.duty(), 100);
    }
}
