//! Prelude for guesttrace-record.
//!
//! ```rust
//! use guesttrace_record::prelude::*;
//!
//! let text = FixedText::new("kmalloc-64");
//! assert_eq!(text.as_str(), "kmalloc-64");
//! ```

pub use crate::error::RecordError;
pub use crate::kind::{AccessType, CallState, EnableType, LabelType, RecordKind, TaskEvent};
pub use crate::record::{
    AccessRecord, CallRecord, EnableRecord, EncodedRecord, FcallRecord, LabelRecord, LockRecord,
    Payload, Record, RecordHeader, SchedRecord, SegmentRecord, TaskRecord,
};
pub use crate::text::FixedText;
