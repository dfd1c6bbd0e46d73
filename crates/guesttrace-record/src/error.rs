//! Record decoding errors.
//!
//! Encoding never fails; only bytes coming back from an observer or a test
//! capture can be malformed.

use thiserror::Error;

/// Errors raised while decoding a record from raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Fewer bytes than the header or the declared size require
    #[error("record truncated: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required
        needed: usize,
        /// Bytes available
        available: usize,
    },

    /// Header kind is not a known record kind
    #[error("unknown record kind {0}")]
    UnknownKind(u32),

    /// Header size disagrees with the fixed size of its kind
    #[error("size mismatch for {kind} record: header says {declared}, layout is {expected}")]
    SizeMismatch {
        /// Kind named in the header
        kind: crate::RecordKind,
        /// Size written in the header
        declared: u16,
        /// Fixed size of the kind
        expected: usize,
    },

    /// A payload enumeration field holds an unknown code
    #[error("invalid {field} code {code}")]
    InvalidCode {
        /// Field name
        field: &'static str,
        /// Offending value
        code: u32,
    },
}

impl RecordError {
    /// Create an invalid-code error for `field`.
    #[must_use]
    pub const fn invalid_code(field: &'static str, code: u32) -> Self {
        RecordError::InvalidCode { field, code }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = RecordError::Truncated {
            needed: 46,
            available: 10,
        };
        assert!(e.to_string().contains("46"));

        let e = RecordError::invalid_code("call state", 9);
        assert_eq!(e.to_string(), "invalid call state code 9");
    }

    #[test]
    fn test_error_copy() {
        fn assert_copy<T: Copy>() {}
        assert_copy::<RecordError>();
    }
}
