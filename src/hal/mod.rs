//! Hardware Abstraction Layer for the telegraph binding.
//!
//! Pin and PWM configuration plus simulated `embedded-hal` outputs.
//! Business logic stays in core modules, HAL is just I/O.

pub mod gpio;
pub mod audio;
pub mod sim;

pub use audio::PwmConfig;
pub use gpio::{KeyConfig, OutputPinConfig, Pull};
pub use sim::{SimError, SimPin, SimPwm};
