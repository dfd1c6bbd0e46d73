//! Byte offsets and sizes of the packed wire layouts.
//!
//! Offsets are from the start of the record, header included. Integers are
//! little-endian; nothing is padded.

/// Size of the common header.
pub const HEADER_SIZE: usize = 16;

/// Capacity of every fixed text field, terminator included.
pub const TEXT_CAPACITY: usize = 32;

/// Header: kind (`u32`).
pub const HEADER_KIND: usize = 0;
/// Header: total size (`u16`).
pub const HEADER_SIZE_FIELD: usize = 4;
/// Header: core id (`u16`).
pub const HEADER_CORE: usize = 6;
/// Header: per-core access counter (`u64`).
pub const HEADER_ACCESS_COUNT: usize = 8;

/// Label record size.
pub const LABEL_SIZE: usize = HEADER_SIZE + 8 + 4 + TEXT_CAPACITY + 8 + 8 + 8;
/// Access record size.
pub const ACCESS_SIZE: usize = HEADER_SIZE + 4 + 8 + 8 + 8;
/// Enable record size; the payload union is sized by its larger arm.
pub const ENABLE_SIZE: usize = HEADER_SIZE + 4 + ENABLE_UNION_SIZE;
/// Fcall record size.
pub const FCALL_SIZE: usize = HEADER_SIZE + 8 + 8 + 8 + 2 + 4;
/// Segment record size.
pub const SEGMENT_SIZE: usize = HEADER_SIZE + 8 + 8 + 4;
/// Call record size.
pub const CALL_SIZE: usize = HEADER_SIZE + 8 + 8 + 4;
/// Lock record size.
pub const LOCK_SIZE: usize = HEADER_SIZE + 8 + 8 + TEXT_CAPACITY + 1 + 1;
/// Task record size.
pub const TASK_SIZE: usize = HEADER_SIZE + 8 + 8 + 4 + TEXT_CAPACITY;
/// Sched record size.
pub const SCHED_SIZE: usize = HEADER_SIZE + 8;

/// Enable payload union: `{ value: u64, text: [u8; 32] }` or `{ core: u64 }`.
pub const ENABLE_UNION_SIZE: usize = 8 + TEXT_CAPACITY;

/// Largest record of any kind; sizes the encode buffer.
pub const MAX_RECORD_SIZE: usize = LABEL_SIZE;
