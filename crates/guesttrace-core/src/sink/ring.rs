//! Bounded lock-free ring for a co-resident observer.
//!
//! # Overflow Behavior
//!
//! When the ring is full, new records are dropped and counted. The access
//! counter in each header lets the observer find the gap.

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam::queue::ArrayQueue;
use guesttrace_record::{EncodedRecord, Record, RecordError};

use super::{CoreScope, TransportSink};

/// Default ring capacity in records.
pub const DEFAULT_RING_CAPACITY: usize = 4096;

/// One delivered record and the scope it was emitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingEntry {
    /// Encoded record
    pub record: EncodedRecord,
    /// Scope passed with the record
    pub scope: CoreScope,
}

/// Lock-free MPMC record ring.
///
/// # Example
///
/// ```rust
/// use guesttrace_core::{CoreScope, RingSink, TransportSink};
/// use guesttrace_record::{Payload, SchedRecord};
///
/// let ring = RingSink::with_capacity(1);
/// let record = Payload::Sched(SchedRecord { tid: 9 }).encode(0, 0);
///
/// assert!(ring.emit(&record, CoreScope::AllCores));
/// assert!(!ring.emit(&record, CoreScope::AllCores));
/// assert_eq!(ring.dropped(), 1);
/// assert_eq!(ring.drain().len(), 1);
/// ```
#[derive(Debug)]
pub struct RingSink {
    queue: ArrayQueue<RingEntry>,
    dropped: AtomicU64,
    overflow_reported: AtomicBool,
}

impl Default for RingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RingSink {
    /// Create a ring with [`DEFAULT_RING_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_RING_CAPACITY)
    }

    /// Create a ring holding up to `capacity` records (at least one).
    ///
    /// This is the only allocation the ring ever makes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            dropped: AtomicU64::new(0),
            overflow_reported: AtomicBool::new(false),
        }
    }

    /// Take the oldest record.
    #[must_use]
    pub fn pop(&self) -> Option<RingEntry> {
        self.queue.pop()
    }

    /// Take every queued record, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<RingEntry> {
        let mut out = Vec::with_capacity(self.queue.len());
        while let Some(entry) = self.queue.pop() {
            out.push(entry);
        }
        out
    }

    /// Take and decode every queued record.
    ///
    /// # Errors
    ///
    /// Returns the first decode failure; records before it are lost.
    pub fn drain_decoded(&self) -> Result<Vec<Record>, RecordError> {
        self.drain()
            .iter()
            .map(|entry| entry.record.decode())
            .collect()
    }

    /// Records currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Maximum number of queued records.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Records dropped because the ring was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl TransportSink for RingSink {
    fn emit(&self, record: &EncodedRecord, scope: CoreScope) -> bool {
        let entry = RingEntry {
            record: *record,
            scope,
        };
        if self.queue.push(entry).is_ok() {
            return true;
        }

        self.dropped.fetch_add(1, Ordering::Relaxed);
        if !self.overflow_reported.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                capacity = self.queue.capacity(),
                "Record ring full, dropping records"
            );
        }
        false
    }
}
