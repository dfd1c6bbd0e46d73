//! Tracer health counters.
//!
//! # RT Safety
//!
//! Every `inc_*`/`add_*` method is a single relaxed `fetch_add`. Snapshots
//! are taken off the hot path.

use core::sync::atomic::{AtomicU64, Ordering};

/// Counter snapshot returned by [`TracerCounters::snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TracerSnapshot {
    /// Records handed to the sink
    pub records_emitted: u64,
    /// fcall records (start, done, pause, resume)
    pub call_transitions: u64,
    /// Text fields cut to fit 31 bytes
    pub text_truncations: u64,
    /// Protocol violations that halted tracing
    pub faults: u64,
    /// Records the sink refused
    pub records_dropped: u64,
}

/// Atomic tracer counters.
///
/// # Example
///
/// ```rust
/// use guesttrace_core::TracerCounters;
///
/// let counters = TracerCounters::new();
/// counters.inc_records_emitted();
/// counters.inc_fault();
///
/// let snapshot = counters.snapshot_and_reset();
/// assert_eq!(snapshot.records_emitted, 1);
/// assert_eq!(counters.snapshot().faults, 0);
/// ```
#[derive(Debug)]
pub struct TracerCounters {
    records_emitted: AtomicU64,
    call_transitions: AtomicU64,
    text_truncations: AtomicU64,
    faults: AtomicU64,
    records_dropped: AtomicU64,
}

impl Default for TracerCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl TracerCounters {
    /// Create counters initialized to zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records_emitted: AtomicU64::new(0),
            call_transitions: AtomicU64::new(0),
            text_truncations: AtomicU64::new(0),
            faults: AtomicU64::new(0),
            records_dropped: AtomicU64::new(0),
        }
    }

    /// Count one record handed to the sink.
    #[inline]
    pub fn inc_records_emitted(&self) {
        self.records_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one fcall record.
    #[inline]
    pub fn inc_call_transition(&self) {
        self.call_transitions.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one truncated text field.
    #[inline]
    pub fn inc_text_truncation(&self) {
        self.text_truncations.fetch_add(1, Ordering::Relaxed);
    }

    /// Count truncations only when `truncated` is set.
    #[inline]
    pub fn record_truncation(&self, truncated: bool) {
        if truncated {
            self.inc_text_truncation();
        }
    }

    /// Count one halting fault.
    #[inline]
    pub fn inc_fault(&self) {
        self.faults.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one record the sink dropped.
    #[inline]
    pub fn inc_records_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters.
    #[must_use]
    pub fn snapshot(&self) -> TracerSnapshot {
        TracerSnapshot {
            records_emitted: self.records_emitted.load(Ordering::Relaxed),
            call_transitions: self.call_transitions.load(Ordering::Relaxed),
            text_truncations: self.text_truncations.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
        }
    }

    /// Read all counters and reset them to zero.
    #[must_use]
    pub fn snapshot_and_reset(&self) -> TracerSnapshot {
        TracerSnapshot {
            records_emitted: self.records_emitted.swap(0, Ordering::Relaxed),
            call_transitions: self.call_transitions.swap(0, Ordering::Relaxed),
            text_truncations: self.text_truncations.swap(0, Ordering::Relaxed),
            faults: self.faults.swap(0, Ordering::Relaxed),
            records_dropped: self.records_dropped.swap(0, Ordering::Relaxed),
        }
    }
}
