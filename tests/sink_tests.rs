//! Binary and leveled sink tests

use telegraph_binding::hal::{SimPin, SimPwm};
use telegraph_binding::sink::MAX_LEVEL;
use telegraph_binding::{
    BinarySink, Capability, ConfigError, DeviceFault, LeveledSink, LogicalState, OutputSink,
    SinkError,
};

use embedded_hal::digital::ErrorKind as DigitalErrorKind;
use embedded_hal::pwm::ErrorKind as PwmErrorKind;

#[test]
fn test_leveled_round_trip() {
    let mut tone = LeveledSink::new("left-audio-channel", SimPwm::new(100), 75, 0).unwrap();

    tone.set(LogicalState::On).unwrap();
    tone.set(LogicalState::Off).unwrap();
    tone.set(LogicalState::On).unwrap();

    let levels: Vec<u16> = tone.pwm().history().collect();
    assert_eq!(levels, vec![75, 0, 75]);
    assert_eq!(tone.state(), LogicalState::On);
}

#[test]
fn test_leveled_scales_to_counter() {
    // 10-bit LEDC-style counter
    let mut tone = LeveledSink::new("right-audio-channel", SimPwm::new(1000), 50, 0).unwrap();
    tone.set(LogicalState::On).unwrap();
    assert_eq!(tone.pwm().duty(), 500);
}

#[test]
fn test_leveled_range_checked() {
    let err = LeveledSink::new("tone", SimPwm::new(100), MAX_LEVEL + 1, 0).err();
    assert_eq!(err.map(|e| e.code()), Some("C03"));
    assert!(matches!(
        LeveledSink::new("tone", SimPwm::new(100), 50, 200).err(),
        Some(ConfigError::LevelOutOfRange { level: 200 })
    ));
    assert!(LeveledSink::new("tone", SimPwm::new(100), MAX_LEVEL, MAX_LEVEL).is_ok());
}

#[test]
fn test_binary_idempotent_set() {
    let mut led = BinarySink::new("led", SimPin::new());

    led.set(LogicalState::On).unwrap();
    led.set(LogicalState::On).unwrap();

    assert!(led.pin().is_high());
    assert_eq!(led.state(), LogicalState::On);
    assert_eq!(led.capability(), Capability::Binary);
}

#[test]
fn test_binary_failure_reports_device_unavailable() {
    let mut sounder = BinarySink::new("sounder", SimPin::new());
    sounder.pin().set_failing(true);

    assert_eq!(
        sounder.set(LogicalState::On),
        Err(SinkError::DeviceUnavailable(DeviceFault::Digital(
            DigitalErrorKind::Other
        )))
    );
    assert_eq!(sounder.state(), LogicalState::Off);
}

#[test]
fn test_leveled_failure_reports_device_unavailable() {
    let mut tone = LeveledSink::new("tone", SimPwm::new(100), 50, 0).unwrap();
    tone.pwm().fail_next(1);

    assert_eq!(
        tone.set(LogicalState::On),
        Err(SinkError::DeviceUnavailable(DeviceFault::Pwm(PwmErrorKind::Other)))
    );
    assert_eq!(tone.state(), LogicalState::Off);
    assert_eq!(tone.capability(), Capability::Leveled);

    // Not retried by the sink; the next call goes through
    tone.set(LogicalState::On).unwrap();
    assert_eq!(tone.pwm().history().collect::<Vec<_>>(), vec![50]);
}

#[test]
fn test_into_inner_returns_handle() {
    let mut sounder = BinarySink::new("sounder", SimPin::new());
    sounder.set(LogicalState::On).unwrap();
    let pin = sounder.into_inner();
    assert_eq!(pin.history().collect::<Vec<_>>(), vec![true]);
}
