//! Output fault latch.
//!
//! A failing output never stops the key: the group keeps driving the other
//! members. The latch remembers that a fan-out failed, which members failed
//! and where they were being driven, so the main loop can report it (fault
//! LED, console line) without owning the binding.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::binding::BindingObserver;
use crate::group::GroupError;
use crate::sample::LogicalState;

/// Kind of the last latched fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FaultCode {
    /// Nothing latched
    None = 0,
    /// One or more outputs failed to follow the key
    OutputFault = 1,
}

impl FaultCode {
    /// Decode a stored code; unknown values read as `None`.
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => FaultCode::OutputFault,
            _ => FaultCode::None,
        }
    }
}

/// Lock-free fault latch, shared by reference.
///
/// ```ignore
/// static FAULT: FaultState = FaultState::new();
///
/// let binding = Binding::new(&KEY_STREAM, group, window, &FAULT)?;
///
/// // main loop
/// if FAULT.is_active() {
///     println!("{}", FAULT.snapshot());
///     FAULT.acknowledge();
/// }
/// ```
pub struct FaultState {
    active: AtomicBool,
    code: AtomicU8,
    /// Bit n = group member n, for the last faulty fan-out
    failed_mask: AtomicU32,
    /// `LogicalState` that fan-out was driving to (0 = OFF, 1 = ON)
    target: AtomicU8,
    /// Faulty fan-outs since boot, survives `acknowledge`
    count: AtomicU32,
}

impl FaultState {
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            code: AtomicU8::new(FaultCode::None as u8),
            failed_mask: AtomicU32::new(0),
            target: AtomicU8::new(0),
            count: AtomicU32::new(0),
        }
    }

    /// Latch a failed fan-out.
    pub fn record(&self, error: &GroupError) {
        self.failed_mask.store(error.failed_mask(), Ordering::Release);
        self.target.store(error.state.is_on() as u8, Ordering::Release);
        self.code.store(FaultCode::OutputFault as u8, Ordering::Release);
        self.count.fetch_add(1, Ordering::Relaxed);
        // Last: readers that see `active` see the fields above.
        self.active.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Latched code; stays readable after `acknowledge`.
    #[inline]
    pub fn code(&self) -> FaultCode {
        FaultCode::from_raw(self.code.load(Ordering::Acquire))
    }

    /// Failed members of the last faulty fan-out.
    #[inline]
    pub fn failed_mask(&self) -> u32 {
        self.failed_mask.load(Ordering::Acquire)
    }

    /// State the last faulty fan-out was driving to.
    #[inline]
    pub fn target(&self) -> LogicalState {
        LogicalState::from_level(self.target.load(Ordering::Acquire) != 0)
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Drop the active flag once the fault was reported. The count stays.
    #[inline]
    pub fn acknowledge(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub fn snapshot(&self) -> FaultSnapshot {
        FaultSnapshot {
            active: self.is_active(),
            code: self.code(),
            failed_mask: self.failed_mask(),
            target: self.target(),
            count: self.count(),
        }
    }
}

impl Default for FaultState {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingObserver for &FaultState {
    fn on_group_error(&mut self, error: &GroupError) {
        self.record(error);
    }
}

/// Copy of the latch at one point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaultSnapshot {
    pub active: bool,
    pub code: FaultCode,
    pub failed_mask: u32,
    pub target: LogicalState,
    pub count: u32,
}

impl core::fmt::Display for FaultSnapshot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.code {
            FaultCode::None => write!(f, "no output faults"),
            FaultCode::OutputFault => write!(
                f,
                "output fault going {} (members {:#b}), {} since boot",
                self.target, self.failed_mask, self.count
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::SinkFailure;
    use crate::sink::{DeviceFault, SinkError};
    use embedded_hal::digital::ErrorKind;

    fn group_error(state: LogicalState, members: &[usize]) -> GroupError {
        let mut failed = heapless::Vec::new();
        for &index in members {
            failed
                .push(SinkFailure {
                    index,
                    name: "out",
                    error: SinkError::DeviceUnavailable(DeviceFault::Digital(ErrorKind::Other)),
                })
                .unwrap();
        }
        GroupError { state, failed }
    }

    #[test]
    fn test_fresh_latch_is_clear() {
        let fault = FaultState::new();
        let snap = fault.snapshot();
        assert!(!snap.active);
        assert_eq!(snap.code, FaultCode::None);
        assert_eq!(snap.count, 0);
        assert_eq!(snap.to_string(), "no output faults");
    }

    #[test]
    fn test_observer_latches_members_and_target() {
        let fault = FaultState::new();

        let mut observer = &fault;
        observer.on_group_error(&group_error(LogicalState::On, &[1, 3]));

        assert!(fault.is_active());
        assert_eq!(fault.code(), FaultCode::OutputFault);
        assert_eq!(fault.failed_mask(), 0b1010);
        assert_eq!(fault.target(), LogicalState::On);
        assert_eq!(
            fault.snapshot().to_string(),
            "output fault going ON (members 0b1010), 1 since boot"
        );
    }

    #[test]
    fn test_acknowledge_keeps_count() {
        let fault = FaultState::new();

        fault.record(&group_error(LogicalState::On, &[0]));
        fault.acknowledge();
        fault.record(&group_error(LogicalState::Off, &[2]));
        fault.acknowledge();

        assert!(!fault.is_active());
        assert_eq!(fault.count(), 2);
        // Last fault still readable for a late report
        assert_eq!(fault.failed_mask(), 0b100);
        assert_eq!(fault.target(), LogicalState::Off);
    }

    #[test]
    fn test_unknown_raw_code_reads_none() {
        assert_eq!(FaultCode::from_raw(1), FaultCode::OutputFault);
        assert_eq!(FaultCode::from_raw(7), FaultCode::None);
    }
}
