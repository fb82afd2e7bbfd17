//! Output groups: several sinks driven together as one unit.
//!
//! # Rules
//!
//! - Membership is fixed at construction, order is construction order
//! - `apply` drives every member, even after a failure
//! - Every failure is reported, none is merged or dropped

use heapless::Vec;

use crate::error::ConfigError;
use crate::sample::LogicalState;
use crate::sink::{Capability, OutputSink, SinkError};

/// Maximum sinks in one group.
pub const MAX_GROUP_SINKS: usize = 8;

/// One member that failed during `apply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkFailure {
    /// Position in the group
    pub index: usize,
    /// Sink identity
    pub name: &'static str,
    /// What went wrong
    pub error: SinkError,
}

/// One or more sinks failed while applying a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupError {
    /// State the group was being driven to
    pub state: LogicalState,
    /// Failed members, in group order
    pub failed: Vec<SinkFailure, MAX_GROUP_SINKS>,
}

impl GroupError {
    /// Bitmask of failed member indices (bit n = member n).
    pub fn failed_mask(&self) -> u32 {
        self.failed.iter().fold(0, |mask, f| mask | (1 << f.index))
    }

    /// True if member `index` is among the failures.
    pub fn contains(&self, index: usize) -> bool {
        self.failed.iter().any(|f| f.index == index)
    }
}

impl core::fmt::Display for GroupError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} output(s) failed to go {}:", self.failed.len(), self.state)?;
        for failure in &self.failed {
            write!(f, " [{}] {}: {};", failure.index, failure.name, failure.error)?;
        }
        Ok(())
    }
}

/// Ordered, fixed set of outputs.
///
/// Borrows its sinks mutably: whoever created them keeps ownership, and no
/// other group can reach them while this one lives.
pub struct OutputGroup<'a> {
    sinks: Vec<&'a mut dyn OutputSink, MAX_GROUP_SINKS>,
}

impl<'a> OutputGroup<'a> {
    /// Build a group from sinks, in the order given.
    ///
    /// Fails with `EmptyGroup` for no sinks and `GroupTooLarge` beyond
    /// `MAX_GROUP_SINKS`.
    pub fn new<I>(sinks: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = &'a mut dyn OutputSink>,
    {
        let mut members = Vec::new();
        for sink in sinks {
            members
                .push(sink)
                .map_err(|_| ConfigError::GroupTooLarge)?;
        }
        if members.is_empty() {
            return Err(ConfigError::EmptyGroup);
        }
        Ok(Self { sinks: members })
    }

    /// Drive every member to `state`, in group order.
    ///
    /// Best effort: a failing member does not stop the others.
    pub fn apply(&mut self, state: LogicalState) -> Result<(), GroupError> {
        let mut failed = Vec::new();
        for (index, sink) in self.sinks.iter_mut().enumerate() {
            if let Err(error) = sink.set(state) {
                // Cannot overflow: at most one failure per member.
                let _ = failed.push(SinkFailure {
                    index,
                    name: sink.name(),
                    error,
                });
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(GroupError { state, failed })
        }
    }

    /// Number of members.
    #[inline]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Member names, in group order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + use<'_, 'a> {
        self.sinks.iter().map(|s| s.name())
    }

    /// Current state of every member, in group order.
    pub fn states(&self) -> impl Iterator<Item = LogicalState> + use<'_, 'a> {
        self.sinks.iter().map(|s| s.state())
    }

    /// True if every member reports `state`.
    pub fn all_in(&self, state: LogicalState) -> bool {
        self.states().all(|s| s == state)
    }

    /// Capability of member `index`.
    pub fn capability(&self, index: usize) -> Option<Capability> {
        self.sinks.get(index).map(|s| s.capability())
    }
}

impl core::fmt::Display for OutputGroup<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "OUTPUT GROUP ({} members)", self.sinks.len())?;
        for (index, sink) in self.sinks.iter().enumerate() {
            writeln!(
                f,
                "  [{}] {:<24} {:<8} {}",
                index,
                sink.name(),
                sink.capability().as_str(),
                sink.state()
            )?;
        }
        Ok(())
    }
}
