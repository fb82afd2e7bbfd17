//! # Telegraph Binding
//!
//! A debounced telegraph key driving a sounder, an LED and a stereo PWM
//! tone as one unit.
//!
//! ## Architecture
//!
//! All key readings flow through a [`SampleStream`] to a single [`Binding`]:
//! - The key sampler pushes raw readings, it doesn't know who reads
//! - The binding debounces them and fans each transition out to its
//!   [`OutputGroup`], in group order
//! - A failing output is reported to the [`BindingObserver`], never
//!   allowed to silence the others
//!
//! No global state in the library; the application owns the statics.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod sample;
pub mod error;
pub mod debounce;
pub mod sink;
pub mod group;
pub mod stream;
pub mod binding;
pub mod logging;
pub mod fault;
pub mod hal;

pub use binding::{Binding, BindingObserver, BindingState, Tee};
pub use config::TelegraphConfig;
pub use debounce::{DebounceWindow, Debouncer};
pub use error::ConfigError;
pub use fault::{FaultCode, FaultSnapshot, FaultState};
pub use group::{GroupError, OutputGroup, SinkFailure, MAX_GROUP_SINKS};
pub use logging::{LogObserver, LogStream};
pub use sample::{LogicalState, RawSample};
pub use sink::{BinarySink, Capability, DeviceFault, LeveledSink, OutputSink, SinkError};
pub use stream::{InputSource, SampleStream};
