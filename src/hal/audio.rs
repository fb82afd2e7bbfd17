//! PWM tone channels (left/right audio) for the sounder beep.

/// Hardware PWM channel producing the key tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmConfig {
    pub id: &'static str,
    pub pin: u8,
    /// Tone frequency
    pub frequency_hz: u32,
    /// Duty applied while the key is down (percent)
    pub duty_percent: u8,
    /// Duty applied while the key is up (percent)
    pub off_percent: u8,
}

impl PwmConfig {
    pub const fn new(id: &'static str, pin: u8) -> Self {
        Self {
            id,
            pin,
            frequency_hz: 800,
            duty_percent: 50,
            off_percent: 0,
        }
    }
}
