//! Lock-free SPSC (Single Producer, Single Consumer) key sample stream.
//!
//! Every raw key reading flows through here on its way to a binding.
//!
//! # Architecture
//!
//! ```text
//! Key sampler ──────▶ SampleStream ──────▶ Binding
//! (ISR / RT loop)     (lock-free)          (one consumer, claimed)
//! ```
//!
//! # Rules
//!
//! - One producer per stream, one attached consumer at a time
//! - Only atomic operations for synchronization
//! - No operation blocks; a full or stopped stream drops and counts
//! - Samples come out in the order they went in

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::error::ConfigError;
use crate::sample::RawSample;

/// Default stream size: 256 samples.
/// At a 10 kHz sampling rate, this is ~25ms of buffer.
pub const DEFAULT_STREAM_SIZE: usize = 256;

/// Where a binding gets its raw samples from.
///
/// A source has at most one consumer. `attach` claims it, `detach`
/// releases it, `stop` quiesces delivery.
pub trait InputSource {
    /// Claim the single consumer slot.
    ///
    /// Fails with `SourceAlreadyBound` if another consumer holds it.
    fn attach(&self) -> Result<(), ConfigError>;

    /// Next sample for the attached consumer, oldest first.
    fn next_sample(&self) -> Option<RawSample>;

    /// Stop delivering samples.
    fn stop(&self);

    /// Release the consumer slot.
    fn detach(&self);
}

/// Lock-free ring buffer of raw key samples.
///
/// # Safety
///
/// Uses `UnsafeCell` internally, safe under these rules:
/// - Single producer writes slots, then publishes `write_idx`
/// - Single consumer reads slots, then publishes `read_idx`
/// - Producer never writes a slot the consumer has not released
///
/// # Memory Ordering
///
/// - Producer stores `write_idx` with `Release` after writing the slot
/// - Consumer loads `write_idx` with `Acquire` before reading the slot
/// - The same pairing applies to `read_idx` in the other direction
pub struct SampleStream<const N: usize = DEFAULT_STREAM_SIZE> {
    slots: UnsafeCell<[RawSample; N]>,
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    dropped: AtomicU32,
    attached: AtomicBool,
    stopped: AtomicBool,
}

// SAFETY: Single producer, single consumer, atomic coordination.
unsafe impl<const N: usize> Sync for SampleStream<N> {}
unsafe impl<const N: usize> Send for SampleStream<N> {}

impl<const N: usize> SampleStream<N> {
    /// Mask for wrapping index to buffer size.
    const MASK: usize = N - 1;

    /// Create a new empty, unattached stream.
    ///
    /// # Panics
    ///
    /// Panics at compile time if N is not a power of 2.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Stream size must be power of 2");

        Self {
            slots: UnsafeCell::new([RawSample::EMPTY; N]),
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            attached: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Push a sample (producer side).
    ///
    /// Returns `false` if the sample was dropped: stream stopped or full.
    ///
    /// # Timing
    ///
    /// O(1), never blocks, never allocates.
    #[inline]
    pub fn push(&self, sample: RawSample) -> bool {
        if self.stopped.load(Ordering::Acquire) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let write = self.write_idx.load(Ordering::Relaxed);
        let read = self.read_idx.load(Ordering::Acquire);
        if write.wrapping_sub(read) >= N as u32 {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        // SAFETY: Single producer; slot is free (consumer is behind read_idx).
        unsafe {
            (*self.slots.get())[(write as usize) & Self::MASK] = sample;
        }
        self.write_idx.store(write.wrapping_add(1), Ordering::Release);
        true
    }

    /// Pop the oldest sample (consumer side).
    #[inline]
    pub fn pop(&self) -> Option<RawSample> {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);
        if read == write {
            return None;
        }

        // SAFETY: Single consumer; slot was published by the producer.
        let sample = unsafe { (*self.slots.get())[(read as usize) & Self::MASK] };
        self.read_idx.store(read.wrapping_add(1), Ordering::Release);
        Some(sample)
    }

    /// Samples waiting for the consumer.
    #[inline]
    pub fn pending(&self) -> u32 {
        let read = self.read_idx.load(Ordering::Acquire);
        let write = self.write_idx.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }

    /// Samples dropped since creation (stream full or stopped).
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Reset dropped counter (e.g., after reporting).
    #[inline]
    pub fn reset_dropped(&self) {
        self.dropped.store(0, Ordering::Relaxed);
    }

    /// True once `stop` was called and no consumer re-armed the stream.
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// True while a consumer holds the stream.
    #[inline]
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// Get the buffer capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> InputSource for SampleStream<N> {
    fn attach(&self) -> Result<(), ConfigError> {
        self.attached
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ConfigError::SourceAlreadyBound)?;

        // Samples queued while nobody listened are stale.
        let write = self.write_idx.load(Ordering::Acquire);
        self.read_idx.store(write, Ordering::Release);
        self.stopped.store(false, Ordering::Release);
        Ok(())
    }

    fn next_sample(&self) -> Option<RawSample> {
        if self.is_stopped() {
            return None;
        }
        self.pop()
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }
}

impl<const N: usize> Default for SampleStream<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_fifo_order() {
        let stream = SampleStream::<16>::new();
        stream.attach().unwrap();

        assert!(stream.push(RawSample::new(false, 1)));
        assert!(stream.push(RawSample::new(true, 2)));
        assert_eq!(stream.pending(), 2);

        assert_eq!(stream.next_sample(), Some(RawSample::new(false, 1)));
        assert_eq!(stream.next_sample(), Some(RawSample::new(true, 2)));
        assert_eq!(stream.next_sample(), None);
    }

    #[test]
    fn test_stream_full_drops_newest() {
        let stream = SampleStream::<4>::new();
        for t in 0..4 {
            assert!(stream.push(RawSample::new(true, t)));
        }
        assert!(!stream.push(RawSample::new(true, 99)));
        assert_eq!(stream.dropped(), 1);

        assert_eq!(stream.pop().map(|s| s.timestamp_us), Some(0));
        assert!(stream.push(RawSample::new(true, 100)));
    }

    #[test]
    fn test_stream_single_consumer() {
        let stream = SampleStream::<8>::new();
        assert!(stream.attach().is_ok());
        assert_eq!(stream.attach(), Err(ConfigError::SourceAlreadyBound));

        stream.detach();
        assert!(!stream.is_attached());
        assert!(stream.attach().is_ok());
    }

    #[test]
    fn test_stream_stop_quiesces() {
        let stream = SampleStream::<8>::new();
        stream.attach().unwrap();
        stream.push(RawSample::new(true, 1));

        stream.stop();
        assert!(stream.is_stopped());
        assert_eq!(stream.next_sample(), None);
        assert!(!stream.push(RawSample::new(true, 2)));
        assert_eq!(stream.dropped(), 1);
    }

    #[test]
    fn test_stream_attach_rearms_and_discards_stale() {
        let stream = SampleStream::<8>::new();
        stream.attach().unwrap();
        stream.push(RawSample::new(true, 1));
        stream.stop();
        stream.detach();

        stream.attach().unwrap();
        assert!(!stream.is_stopped());
        assert_eq!(stream.next_sample(), None);

        stream.push(RawSample::new(false, 2));
        assert_eq!(stream.next_sample(), Some(RawSample::new(false, 2)));
    }

    #[test]
    fn test_spsc_threaded_order() {
        use std::sync::Arc;
        use std::thread;

        let stream = Arc::new(SampleStream::<64>::new());
        stream.attach().unwrap();

        let producer = {
            let stream = Arc::clone(&stream);
            thread::spawn(move || {
                let mut t = 0u64;
                while t < 1000 {
                    if stream.push(RawSample::new(t % 2 == 0, t)) {
                        t += 1;
                    } else {
                        thread::yield_now();
                    }
                }
            })
        };

        let mut expected = 0u64;
        while expected < 1000 {
            match stream.next_sample() {
                Some(sample) => {
                    assert_eq!(sample.timestamp_us, expected);
                    expected += 1;
                }
                None => thread::yield_now(),
            }
        }

        producer.join().unwrap();
        assert_eq!(stream.pending(), 0);
    }
}
