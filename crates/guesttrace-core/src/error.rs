//! Tracer error types.
//!
//! [`TraceFault`] is the hot-path error: `Copy`, coded, and raised only for
//! protocol violations and for operations refused because tracing on the core
//! (or everywhere) has already been halted. [`TracerError`] covers setup.

use core::fmt;

use thiserror::Error;

/// Hot-path tracer fault.
///
/// The first three variants are protocol violations. Raising one halts
/// tracing on the offending core (or the whole tracer, per
/// [`FaultPolicy`](crate::FaultPolicy)) so a defect in the hook glue can
/// never corrupt call-stack state.
///
/// # Examples
///
/// ```
/// use guesttrace_core::TraceFault;
///
/// let fault = TraceFault::StackUnderflow;
/// assert_eq!(fault.code(), 2);
/// assert!(fault.is_protocol_violation());
/// assert_eq!(TraceFault::from_code(2), Some(TraceFault::StackUnderflow));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TraceFault {
    /// Push onto a full call stack
    StackOverflow = 1,
    /// Pop from an empty call stack
    StackUnderflow = 2,
    /// A core's tag sequence reached the core-id bits
    TagSpaceExhausted = 3,
    /// Core id outside the configured range
    CoreOutOfRange = 4,
    /// Tracing on this core was halted by an earlier fault
    CoreHalted = 5,
    /// Tracing was halted everywhere by an earlier fault
    TracerHalted = 6,
}

impl TraceFault {
    /// Numeric fault code.
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Look a fault up by code.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(TraceFault::StackOverflow),
            2 => Some(TraceFault::StackUnderflow),
            3 => Some(TraceFault::TagSpaceExhausted),
            4 => Some(TraceFault::CoreOutOfRange),
            5 => Some(TraceFault::CoreHalted),
            6 => Some(TraceFault::TracerHalted),
            _ => None,
        }
    }

    /// True for faults that halt tracing when raised.
    #[must_use]
    pub fn is_protocol_violation(self) -> bool {
        matches!(
            self,
            TraceFault::StackOverflow
                | TraceFault::StackUnderflow
                | TraceFault::TagSpaceExhausted
                | TraceFault::CoreOutOfRange
        )
    }

    /// True if the fault reports an earlier halt rather than a new defect.
    #[must_use]
    pub fn is_halt(self) -> bool {
        matches!(self, TraceFault::CoreHalted | TraceFault::TracerHalted)
    }
}

impl fmt::Display for TraceFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceFault::StackOverflow => write!(f, "call stack depth exceeded"),
            TraceFault::StackUnderflow => write!(f, "pop from empty call stack"),
            TraceFault::TagSpaceExhausted => write!(f, "call tag space exhausted"),
            TraceFault::CoreOutOfRange => write!(f, "core id out of range"),
            TraceFault::CoreHalted => write!(f, "tracing halted on this core"),
            TraceFault::TracerHalted => write!(f, "tracing halted"),
        }
    }
}

impl std::error::Error for TraceFault {}

/// Tracer setup errors.
#[derive(Debug, Clone, Error)]
pub enum TracerError {
    /// Invalid configuration provided.
    #[error("Invalid tracer configuration: {0}")]
    InvalidConfiguration(String),

    /// Core id not covered by the configuration.
    #[error("Core {core} out of range (max_cores = {max_cores})")]
    CoreOutOfRange {
        /// Requested core
        core: u16,
        /// Configured number of cores
        max_cores: u16,
    },

    /// Context for this core was already handed out.
    #[error("Core {core} already has a context")]
    CoreAlreadyClaimed {
        /// Requested core
        core: u16,
    },
}

impl TracerError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }
}

/// Result of a hot-path tracer operation.
pub type TraceResult<T = ()> = Result<T, TraceFault>;

/// Result of a tracer setup operation.
pub type TracerResult<T> = Result<T, TracerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_codes_round_trip() {
        for code in 1..=6 {
            let fault = TraceFault::from_code(code);
            assert_eq!(fault.map(TraceFault::code), Some(code));
        }
        assert_eq!(TraceFault::from_code(0), None);
        assert_eq!(TraceFault::from_code(7), None);
    }

    #[test]
    fn test_protocol_violations() {
        assert!(TraceFault::StackOverflow.is_protocol_violation());
        assert!(TraceFault::TagSpaceExhausted.is_protocol_violation());
        assert!(!TraceFault::CoreHalted.is_protocol_violation());
        assert!(TraceFault::TracerHalted.is_halt());
        assert!(!TraceFault::StackUnderflow.is_halt());
    }

    #[test]
    fn test_fault_display() {
        assert_eq!(
            TraceFault::StackUnderflow.to_string(),
            "pop from empty call stack"
        );
    }

    #[test]
    fn test_tracer_error_display() {
        let e = TracerError::CoreOutOfRange {
            core: 20,
            max_cores: 16,
        };
        assert!(e.to_string().contains("20"));

        let e = TracerError::invalid_configuration("max_cores must be at least 1");
        assert!(matches!(e, TracerError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_fault_copy() {
        fn assert_copy<T: Copy>() {}
        assert_copy::<TraceFault>();
    }
}
