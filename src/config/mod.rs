//! Module: config
//!
//! Purpose: Wiring of the telegraph demo as plain values.
//!
//! Architecture:
//! - One `TelegraphConfig` aggregates the key, two binary outputs and two
//!   PWM tone channels
//! - `Default` is the Raspberry Pi header layout the demo was built for,
//!   `esp32s3()` the ESP32-S3 board layout
//! - No parsing: the caller builds or tweaks the struct
//!
//! Safety: Safe. No unsafe blocks.

use crate::debounce::DebounceWindow;
use crate::error::ConfigError;
use crate::hal::{KeyConfig, OutputPinConfig, PwmConfig};
use crate::sample::LogicalState;

/// ESP32-S3 devkit GPIO numbers (GPIO 22-25 do not exist on the S3).
pub mod esp32s3 {
    pub const KEY: u8 = 4;
    pub const SOUNDER: u8 = 5;
    pub const LED: u8 = 7;
    pub const LEFT: u8 = 15;
    pub const RIGHT: u8 = 16;
}

/// Complete demo wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelegraphConfig {
    pub key: KeyConfig,
    pub sounder: OutputPinConfig,
    pub led: OutputPinConfig,
    pub left: PwmConfig,
    pub right: PwmConfig,
    /// State every output is driven to right after binding; shutdown is always OFF
    pub initial: LogicalState,
}

impl TelegraphConfig {
    /// ESP32-S3 devkit layout.
    pub fn esp32s3() -> Self {
        let mut config = Self::default();
        config.key.pin = esp32s3::KEY;
        config.sounder.pin = esp32s3::SOUNDER;
        config.led.pin = esp32s3::LED;
        config.left.pin = esp32s3::LEFT;
        config.right.pin = esp32s3::RIGHT;
        config
    }

    /// Debounce window for the key.
    pub fn debounce_window(&self) -> Result<DebounceWindow, ConfigError> {
        DebounceWindow::from_micros(self.key.debounce_us)
    }
}

impl Default for TelegraphConfig {
    fn default() -> Self {
        Self {
            key: KeyConfig::default(),
            sounder: OutputPinConfig::new("sounder", "Telegraph Sounder", 23),
            led: OutputPinConfig::new("led", "Telegraph LED Flasher", 25),
            left: PwmConfig::new("left-audio-channel", 19),
            right: PwmConfig::new("right-audio-channel", 18),
            initial: LogicalState::Off,
        }
    }
}
