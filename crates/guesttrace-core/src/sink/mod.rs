//! Transport sinks
//!
//! A sink hands one encoded record to whatever observes the trace:
//! - [`TrapSink`]: the x86_64 magic trap (feature `trap`)
//! - [`RingSink`]: a bounded lock-free queue drained by a co-resident observer
//! - [`LogSink`]: structured logging fallback
//! - [`NullSink`]: discards everything

mod log;
mod ring;

#[cfg(all(feature = "trap", target_arch = "x86_64"))]
mod trap;

pub use self::log::LogSink;
pub use ring::{DEFAULT_RING_CAPACITY, RingEntry, RingSink};

#[cfg(all(feature = "trap", target_arch = "x86_64"))]
pub use trap::TrapSink;

use guesttrace_record::EncodedRecord;

/// Cores a record applies to, passed alongside it to the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreScope {
    /// Applies to every core.
    AllCores,
    /// Applies to one core.
    Core(u16),
    /// Scope is not meaningful for this kind.
    Unscoped,
}

impl CoreScope {
    /// Value passed in the trap's scope register.
    #[must_use]
    pub const fn raw(self) -> u64 {
        match self {
            CoreScope::AllCores => u64::MAX,
            CoreScope::Core(core) => core as u64,
            CoreScope::Unscoped => 0,
        }
    }
}

/// Record transport.
///
/// # RT Safety
///
/// [`emit`](TransportSink::emit) may run in interrupt context with
/// interrupts disabled. It must not allocate, block, or take a lock that an
/// interrupted thread on the same core could hold.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; every core emits through the same
/// sink concurrently.
pub trait TransportSink: Send + Sync {
    /// Hand `record` to the observer.
    ///
    /// Returns `false` only when the sink discarded the record itself (for
    /// example a full ring). `true` means handed on, not acknowledged.
    fn emit(&self, record: &EncodedRecord, scope: CoreScope) -> bool;

    /// True if records can reach an observer at all.
    fn is_available(&self) -> bool {
        true
    }
}

impl<S: TransportSink + ?Sized> TransportSink for &S {
    #[inline]
    fn emit(&self, record: &EncodedRecord, scope: CoreScope) -> bool {
        (**self).emit(record, scope)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

impl<S: TransportSink + ?Sized> TransportSink for std::sync::Arc<S> {
    #[inline]
    fn emit(&self, record: &EncodedRecord, scope: CoreScope) -> bool {
        (**self).emit(record, scope)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

/// Sink that discards every record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullSink;

impl TransportSink for NullSink {
    #[inline]
    fn emit(&self, _record: &EncodedRecord, _scope: CoreScope) -> bool {
        true
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guesttrace_record::{Payload, SchedRecord};

    #[test]
    fn test_scope_raw_values() {
        assert_eq!(CoreScope::AllCores.raw(), u64::MAX);
        assert_eq!(CoreScope::Core(3).raw(), 3);
        assert_eq!(CoreScope::Unscoped.raw(), 0);
    }

    #[test]
    fn test_null_sink() {
        let record = Payload::Sched(SchedRecord { tid: 1 }).encode(0, 0);
        assert!(NullSink.emit(&record, CoreScope::AllCores));
        assert!(!NullSink.is_available());
    }

    #[test]
    fn test_arc_sink_forwards() {
        let ring = std::sync::Arc::new(RingSink::with_capacity(4));
        let record = Payload::Sched(SchedRecord { tid: 1 }).encode(0, 0);
        assert!(ring.clone().emit(&record, CoreScope::AllCores));
        assert_eq!(ring.len(), 1);
    }
}
