//! Fixed binary record layouts for guesttrace
//!
//! Every record the tracer hands to its observer is a packed, little-endian
//! blob: a 16-byte [`RecordHeader`] followed by one kind-specific payload.
//! Layouts never depend on pointer width, and each record stores its own
//! size in the header.
//!
//! # Encoding
//!
//! Encoding is infallible and allocation-free. A [`Payload`] variant is
//! turned into an [`EncodedRecord`], a stack buffer sized for the largest
//! kind:
//!
//! ```rust
//! use guesttrace_record::{CallState, FcallRecord, Payload, RecordKind};
//!
//! let payload = Payload::Fcall(FcallRecord {
//!     tid: 1,
//!     pc: 0x1000,
//!     tag: 1,
//!     depth: 0,
//!     state: CallState::Start,
//! });
//! let encoded = payload.encode(0, 0);
//! assert_eq!(encoded.kind(), RecordKind::Fcall);
//! assert_eq!(encoded.as_bytes().len(), 46);
//! ```
//!
//! # Text fields
//!
//! Descriptions, lock names and scopes are stored in 32-byte nul-terminated
//! [`FixedText`] fields. Longer strings are truncated to 31 bytes; truncation
//! is never an error.

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod kind;
pub mod layout;
pub mod prelude;
pub mod record;
pub mod text;
mod wire;

pub use error::RecordError;
pub use kind::{AccessType, CallState, EnableType, LabelType, RecordKind, TaskEvent};
pub use layout::{HEADER_SIZE, MAX_RECORD_SIZE, TEXT_CAPACITY};
pub use record::{
    AccessRecord, CallRecord, EnableRecord, EncodedRecord, FcallRecord, LabelRecord, LockRecord,
    Payload, Record, RecordHeader, SchedRecord, SegmentRecord, TaskRecord,
};
pub use text::FixedText;
