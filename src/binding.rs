//! Binding of one input source to one output group.
//!
//! # Architecture
//!
//! ```text
//! SampleStream ──▶ Debouncer ──▶ OutputGroup::apply ──▶ sinks (in order)
//!                       │                │
//!                       └── observer ◀───┘ (transitions, group errors)
//! ```
//!
//! # Rules
//!
//! - Exactly one binding per source (`attach` claims it)
//! - Driven from one path only: samples are processed in arrival order
//! - A fan-out runs to completion before the next sample is looked at
//! - A failed fan-out reaches the observer once and never stops the binding
//! - `Bound → Unbound` is terminal; rebind by building a new binding

use crate::debounce::{DebounceWindow, Debouncer};
use crate::error::ConfigError;
use crate::group::{GroupError, OutputGroup};
use crate::sample::{LogicalState, RawSample};
use crate::stream::InputSource;

/// Receives what a binding cannot handle itself.
///
/// The library never prints or logs; the application decides what a
/// failure means by implementing this.
pub trait BindingObserver {
    /// One or more outputs failed during a fan-out.
    fn on_group_error(&mut self, error: &GroupError);

    /// The key settled in a new state. Called before the fan-out.
    fn on_transition(&mut self, _state: LogicalState, _timestamp_us: u64) {}

    /// The binding is being torn down. Called before outputs are driven to
    /// their shutdown state; the observer is released right after.
    ///
    /// `last_sample_us` is the timestamp of the last sample processed (0 if
    /// none was), not the time of the teardown itself.
    fn on_unbind(&mut self, _last_sample_us: u64) {}
}

impl<F> BindingObserver for F
where
    F: FnMut(&GroupError),
{
    fn on_group_error(&mut self, error: &GroupError) {
        self(error)
    }
}

/// Forwards every notification to two observers, first `A` then `B`.
pub struct Tee<A, B>(pub A, pub B);

impl<A: BindingObserver, B: BindingObserver> BindingObserver for Tee<A, B> {
    fn on_group_error(&mut self, error: &GroupError) {
        self.0.on_group_error(error);
        self.1.on_group_error(error);
    }

    fn on_transition(&mut self, state: LogicalState, timestamp_us: u64) {
        self.0.on_transition(state, timestamp_us);
        self.1.on_transition(state, timestamp_us);
    }

    fn on_unbind(&mut self, last_sample_us: u64) {
        self.0.on_unbind(last_sample_us);
        self.1.on_unbind(last_sample_us);
    }
}

/// Binding lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    /// Consuming samples
    Bound,
    /// Torn down, terminal
    Unbound,
}

/// Debounced key driving an output group.
///
/// Dropping a bound binding unbinds it.
pub struct Binding<'s, 'g, S, O>
where
    S: InputSource + ?Sized,
    O: BindingObserver,
{
    source: &'s S,
    group: OutputGroup<'g>,
    debouncer: Debouncer,
    observer: Option<O>,
    state: BindingState,
    last_sample_us: u64,
}

impl<'s, 'g, S, O> Binding<'s, 'g, S, O>
where
    S: InputSource + ?Sized,
    O: BindingObserver,
{
    /// Bind `source` to `group`.
    ///
    /// Claims the source as its sole consumer; fails with
    /// `SourceAlreadyBound` if another binding holds it.
    pub fn new(
        source: &'s S,
        group: OutputGroup<'g>,
        window: DebounceWindow,
        observer: O,
    ) -> Result<Self, ConfigError> {
        source.attach()?;
        Ok(Self {
            source,
            group,
            debouncer: Debouncer::new(window),
            observer: Some(observer),
            state: BindingState::Bound,
            last_sample_us: 0,
        })
    }

    /// Process one raw sample.
    ///
    /// Returns the transition applied to the group, if the sample completed
    /// one. Does nothing once unbound.
    pub fn on_sample(&mut self, sample: RawSample) -> Option<LogicalState> {
        if self.state == BindingState::Unbound {
            return None;
        }

        self.last_sample_us = sample.timestamp_us;
        let transition = self.debouncer.accept(sample)?;

        if let Some(observer) = self.observer.as_mut() {
            observer.on_transition(transition, sample.timestamp_us);
        }
        self.fan_out(transition);

        Some(transition)
    }

    /// Drive every output to `state` outside the key path, e.g. to put
    /// them in their initial state right after binding.
    ///
    /// Failures reach the observer like any fan-out failure. The debounced
    /// key state is untouched. Does nothing once unbound.
    pub fn drive(&mut self, state: LogicalState) {
        if self.state == BindingState::Bound {
            self.fan_out(state);
        }
    }

    /// Drain every pending sample from the source.
    ///
    /// Returns the number of transitions applied.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while self.state == BindingState::Bound {
            let Some(sample) = self.source.next_sample() else {
                break;
            };
            if self.on_sample(sample).is_some() {
                applied += 1;
            }
        }
        applied
    }

    /// Tear down: stop and release the source, drive outputs to their
    /// shutdown state (OFF), release the observer.
    ///
    /// Idempotent; only the first call has any effect.
    pub fn unbind(&mut self) {
        if self.state == BindingState::Unbound {
            return;
        }
        self.state = BindingState::Unbound;

        self.source.stop();
        self.source.detach();
        if let Some(observer) = self.observer.as_mut() {
            observer.on_unbind(self.last_sample_us);
        }
        self.fan_out(LogicalState::Off);
        self.observer = None;
    }

    fn fan_out(&mut self, state: LogicalState) {
        if let Err(error) = self.group.apply(state) {
            if let Some(observer) = self.observer.as_mut() {
                observer.on_group_error(&error);
            }
        }
    }

    /// Lifecycle state.
    #[inline]
    pub fn state(&self) -> BindingState {
        self.state
    }

    /// True until `unbind`.
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.state == BindingState::Bound
    }

    /// Last state accepted by the debouncer.
    #[inline]
    pub fn key_state(&self) -> Option<LogicalState> {
        self.debouncer.state()
    }

    /// The bound outputs.
    #[inline]
    pub fn group(&self) -> &OutputGroup<'g> {
        &self.group
    }

    /// The observer, while bound.
    #[inline]
    pub fn observer(&self) -> Option<&O> {
        self.observer.as_ref()
    }
}

impl<S, O> Drop for Binding<'_, '_, S, O>
where
    S: InputSource + ?Sized,
    O: BindingObserver,
{
    fn drop(&mut self) {
        self.unbind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::sim::SimPin;
    use crate::sink::{BinarySink, OutputSink};
    use crate::stream::SampleStream;
    use core::cell::Cell;

    fn window(us: u64) -> DebounceWindow {
        DebounceWindow::from_micros(us).unwrap()
    }

    #[test]
    fn test_binding_drives_group_on_transition() {
        let stream = SampleStream::<16>::new();
        let mut sounder = BinarySink::new("sounder", SimPin::new());
        let group = OutputGroup::new([&mut sounder as &mut dyn OutputSink]).unwrap();
        let mut binding = Binding::new(&stream, group, window(100), |_: &GroupError| {}).unwrap();

        assert_eq!(binding.on_sample(RawSample::new(false, 0)), None);
        assert_eq!(binding.on_sample(RawSample::new(true, 10)), None);
        assert_eq!(
            binding.on_sample(RawSample::new(true, 110)),
            Some(LogicalState::On)
        );
        assert!(binding.group().all_in(LogicalState::On));
        assert_eq!(binding.key_state(), Some(LogicalState::On));
    }

    #[test]
    fn test_poll_drains_source() {
        let stream = SampleStream::<16>::new();
        let mut led = BinarySink::new("led", SimPin::new());
        let group = OutputGroup::new([&mut led as &mut dyn OutputSink]).unwrap();
        let mut binding = Binding::new(&stream, group, window(100), |_: &GroupError| {}).unwrap();

        stream.push(RawSample::new(false, 0));
        stream.push(RawSample::new(true, 50));
        stream.push(RawSample::new(true, 200));
        stream.push(RawSample::new(false, 300));
        stream.push(RawSample::new(false, 450));

        assert_eq!(binding.poll(), 2);
        assert_eq!(stream.pending(), 0);
        assert!(binding.group().all_in(LogicalState::Off));
    }

    #[test]
    fn test_unbind_is_idempotent() {
        let stream = SampleStream::<16>::new();
        let mut led = BinarySink::new("led", SimPin::new());
        {
            let group = OutputGroup::new([&mut led as &mut dyn OutputSink]).unwrap();
            let mut binding =
                Binding::new(&stream, group, window(100), |_: &GroupError| {}).unwrap();

            binding.unbind();
            assert_eq!(binding.state(), BindingState::Unbound);
            assert!(binding.observer().is_none());
            binding.unbind();
            assert_eq!(binding.on_sample(RawSample::new(true, 0)), None);
        }
        // One shutdown write from the first unbind, none from the second
        // call nor from drop.
        assert_eq!(led.pin().writes(), 1);
        assert!(stream.is_stopped());
        assert!(!stream.is_attached());
    }

    #[test]
    fn test_drive_reports_failures_and_keeps_key_state() {
        let stream = SampleStream::<16>::new();
        let mut led = BinarySink::new("led", SimPin::new());
        led.pin().fail_next(1);
        let failures = Cell::new(0);
        {
            let group = OutputGroup::new([&mut led as &mut dyn OutputSink]).unwrap();
            let mut binding = Binding::new(&stream, group, window(100), |_: &GroupError| {
                failures.set(failures.get() + 1)
            })
            .unwrap();

            binding.drive(LogicalState::Off);
            assert_eq!(failures.get(), 1);
            assert_eq!(binding.key_state(), None);

            binding.drive(LogicalState::Off);
            assert_eq!(failures.get(), 1);
        }
        // Second drive, then the shutdown drive
        assert_eq!(led.pin().writes(), 2);
    }

    #[test]
    fn test_observer_sees_transitions() {
        let stream = SampleStream::<16>::new();
        let mut led = BinarySink::new("led", SimPin::new());
        let group = OutputGroup::new([&mut led as &mut dyn OutputSink]).unwrap();

        struct Counter<'a>(&'a Cell<u32>);
        impl BindingObserver for Counter<'_> {
            fn on_group_error(&mut self, _error: &GroupError) {}
            fn on_transition(&mut self, _state: LogicalState, _timestamp_us: u64) {
                self.0.set(self.0.get() + 1);
            }
        }

        let transitions = Cell::new(0);
        let mut binding =
            Binding::new(&stream, group, window(10), Counter(&transitions)).unwrap();
        binding.on_sample(RawSample::new(false, 0));
        binding.on_sample(RawSample::new(true, 1));
        binding.on_sample(RawSample::new(true, 20));
        binding.on_sample(RawSample::new(false, 21));
        binding.on_sample(RawSample::new(false, 40));

        assert_eq!(transitions.get(), 2);
    }
}
