//! Non-blocking log ring for the binding path.
//!
//! # Architecture
//!
//! ```text
//! binding path              LogStream<N>             drain side
//! ────────────              ────────────             ──────────
//! LogObserver ─┐
//!              ├─ push_fmt ─▶ [e0][e1]..[eN-1] ─▶ drain() ─▶ stdout / UART
//! rt_info!() ──┘   no alloc     lock-free ring      may block
//!                  no block     drops when full
//! ```
//!
//! # Rules
//!
//! - Formatting happens into a stack buffer; long messages are cut, never
//!   split
//! - A full ring drops the new entry and counts it
//! - Only the drain side prints

use core::cell::UnsafeCell;
use core::fmt::{self, Write};
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::binding::BindingObserver;
use crate::group::GroupError;
use crate::sample::LogicalState;

/// Longest message kept per entry, bytes.
pub const MAX_MSG_LEN: usize = 120;

/// Default ring size, entries.
pub const LOG_BUFFER_SIZE: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

/// Fixed-size message buffer, `fmt::Write` target.
///
/// Cuts at the last whole character that fits, so the stored bytes are
/// always valid UTF-8.
#[derive(Clone, Copy)]
pub struct MsgBuf {
    bytes: [u8; MAX_MSG_LEN],
    len: u8,
}

impl MsgBuf {
    pub const EMPTY: Self = Self {
        bytes: [0; MAX_MSG_LEN],
        len: 0,
    };

    pub fn as_str(&self) -> &str {
        // Only whole `str` pieces are ever copied in.
        core::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }

    pub fn is_full(&self) -> bool {
        self.len as usize == MAX_MSG_LEN
    }
}

impl Write for MsgBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let start = self.len as usize;
        let room = MAX_MSG_LEN - start;
        let mut take = s.len().min(room);
        while !s.is_char_boundary(take) {
            take -= 1;
        }
        self.bytes[start..start + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len = (start + take) as u8;
        Ok(())
    }
}

/// One log line as stored in the ring.
#[derive(Clone, Copy)]
pub struct LogEntry {
    /// Monotonic time of the event, microseconds
    pub timestamp_us: u64,
    pub level: LogLevel,
    msg: MsgBuf,
}

impl LogEntry {
    const EMPTY: Self = Self {
        timestamp_us: 0,
        level: LogLevel::Info,
        msg: MsgBuf::EMPTY,
    };

    pub fn text(&self) -> &str {
        self.msg.as_str()
    }
}

impl fmt::Display for LogEntry {
    /// `[timestamp_us] LEVEL: text`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:10}] {}: {}", self.timestamp_us, self.level.as_str(), self.text())
    }
}

/// Multi-producer, single-drain log ring.
///
/// Producers claim a slot by bumping `head`, fill it, then flag it
/// `ready`. The drain side only reads flagged slots, in claim order.
pub struct LogStream<const N: usize = LOG_BUFFER_SIZE> {
    slots: UnsafeCell<[LogEntry; N]>,
    ready: [AtomicBool; N],
    head: AtomicU32,
    tail: AtomicU32,
    dropped: AtomicU32,
}

// SAFETY: a producer has exclusive access to its slot from a successful
// claim until it sets `ready`; the drain side from seeing `ready` until it
// advances `tail`.
unsafe impl<const N: usize> Sync for LogStream<N> {}
unsafe impl<const N: usize> Send for LogStream<N> {}

impl<const N: usize> LogStream<N> {
    const MASK: u32 = (N as u32).wrapping_sub(1);

    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "LogStream size must be a power of 2");

        #[allow(clippy::declare_interior_mutable_const)]
        const EMPTY_SLOT: AtomicBool = AtomicBool::new(false);

        Self {
            slots: UnsafeCell::new([LogEntry::EMPTY; N]),
            ready: [EMPTY_SLOT; N],
            head: AtomicU32::new(0),
            tail: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Claim the next free slot, or `None` when the ring is full.
    fn claim(&self) -> Option<usize> {
        let mut head = self.head.load(Ordering::Acquire);
        loop {
            if head.wrapping_sub(self.tail.load(Ordering::Acquire)) >= N as u32 {
                return None;
            }
            match self.head.compare_exchange_weak(
                head,
                head.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some((head & Self::MASK) as usize),
                Err(now) => head = now,
            }
        }
    }

    /// Format and queue one entry. Never blocks, never allocates.
    ///
    /// Returns false if the ring was full and the entry was dropped.
    pub fn push_fmt(&self, timestamp_us: u64, level: LogLevel, args: fmt::Arguments<'_>) -> bool {
        let Some(idx) = self.claim() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        // SAFETY: `claim` handed out `idx` to this producer only, and the
        // drain side skips it until `ready` is set below.
        let slot = unsafe { &mut (*self.slots.get())[idx] };
        slot.timestamp_us = timestamp_us;
        slot.level = level;
        slot.msg = MsgBuf::EMPTY;
        let _ = slot.msg.write_fmt(args);

        self.ready[idx].store(true, Ordering::Release);
        true
    }

    /// Queue a plain message.
    pub fn push(&self, timestamp_us: u64, level: LogLevel, msg: &str) -> bool {
        self.push_fmt(timestamp_us, level, format_args!("{}", msg))
    }

    /// Oldest entry, if it is complete.
    ///
    /// Single drain side only.
    pub fn drain(&self) -> Option<LogEntry> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }

        let idx = (tail & Self::MASK) as usize;
        if !self.ready[idx].load(Ordering::Acquire) {
            // Claimed but still being written
            return None;
        }

        // SAFETY: slot published via `ready`, producers stay off it until
        // `tail` moves past.
        let entry = unsafe { (*self.slots.get())[idx] };
        self.ready[idx].store(false, Ordering::Relaxed);
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(entry)
    }

    /// Entries dropped on a full ring since the last reset.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn reset_dropped(&self) {
        self.dropped.store(0, Ordering::Relaxed);
    }

    /// Claimed entries not yet drained.
    pub fn pending(&self) -> u32 {
        self.head
            .load(Ordering::Acquire)
            .wrapping_sub(self.tail.load(Ordering::Relaxed))
    }
}

impl<const N: usize> Default for LogStream<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Log through a `LogStream` with `format!` syntax.
///
/// ```ignore
/// rt_log!(LogLevel::Info, LOG_STREAM, now_us, "key {}", state);
/// ```
#[macro_export]
macro_rules! rt_log {
    ($level:expr, $stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $stream.push_fmt($timestamp, $level, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! rt_info {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Info, $stream, $timestamp, $($arg)*)
    };
}

#[macro_export]
macro_rules! rt_warn {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Warn, $stream, $timestamp, $($arg)*)
    };
}

#[macro_export]
macro_rules! rt_error {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Error, $stream, $timestamp, $($arg)*)
    };
}

#[macro_export]
macro_rules! rt_debug {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Debug, $stream, $timestamp, $($arg)*)
    };
}

/// Binding observer writing to a `LogStream`.
///
/// - Transition → INFO `key ON` / `key OFF`
/// - Group error → one ERROR entry per failed output
/// - Unbind → INFO `binding released`
///
/// Group errors carry no time of their own; they are stamped with the
/// transition that caused them. The release entry is stamped with the last
/// sample the binding processed.
pub struct LogObserver<'a, const N: usize = LOG_BUFFER_SIZE> {
    stream: &'a LogStream<N>,
    last_timestamp_us: u64,
}

impl<'a, const N: usize> LogObserver<'a, N> {
    pub fn new(stream: &'a LogStream<N>) -> Self {
        Self {
            stream,
            last_timestamp_us: 0,
        }
    }
}

impl<const N: usize> BindingObserver for LogObserver<'_, N> {
    fn on_transition(&mut self, state: LogicalState, timestamp_us: u64) {
        self.last_timestamp_us = timestamp_us;
        rt_info!(self.stream, timestamp_us, "key {}", state);
    }

    fn on_group_error(&mut self, error: &GroupError) {
        for failure in &error.failed {
            rt_error!(
                self.stream,
                self.last_timestamp_us,
                "output [{}] {} failed going {}: {}",
                failure.index,
                failure.name,
                error.state,
                failure.error
            );
        }
    }

    fn on_unbind(&mut self, last_sample_us: u64) {
        self.last_timestamp_us = last_sample_us;
        rt_info!(self.stream, last_sample_us, "binding released, outputs to shutdown state");
    }
}
