//! Record payloads and the encode/decode entry points.
//!
//! A record is a [`RecordHeader`] followed by exactly one [`Payload`] variant.
//! The variant decides the kind written into the header, so a header can never
//! disagree with the payload that follows it.

use core::fmt;

use crate::error::RecordError;
use crate::kind::{AccessType, CallState, EnableType, LabelType, RecordKind, TaskEvent};
use crate::layout::{ENABLE_UNION_SIZE, HEADER_SIZE, MAX_RECORD_SIZE, TEXT_CAPACITY};
use crate::text::FixedText;
use crate::wire::{Reader, Writer};

/// Common header at the start of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordHeader {
    /// Record kind
    pub kind: RecordKind,
    /// Total record size in bytes, header included
    pub size: u16,
    /// Core that emitted the record
    pub core_id: u16,
    /// Per-core monotonic record counter
    pub access_count: u64,
}

impl RecordHeader {
    /// Decode just the header from the front of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than [`HEADER_SIZE`] bytes are available or
    /// the kind is unknown.
    pub fn decode(bytes: &[u8]) -> Result<Self, RecordError> {
        let mut r = Reader::new(bytes, 0);
        let code = r.u32()?;
        let kind = RecordKind::from_code(code).ok_or(RecordError::UnknownKind(code))?;
        Ok(Self {
            kind,
            size: r.u16()?,
            core_id: r.u16()?,
            access_count: r.u64()?,
        })
    }

    fn encode(&self, w: &mut Writer<'_>) {
        w.u32(self.kind.code());
        w.u16(self.size);
        w.u16(self.core_id);
        w.u64(self.access_count);
    }
}

/// Label payload: associates `[guest_addr, guest_addr + bytes)` with a type.
///
/// A release is encoded as a label with `bytes == 0` and empty text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelRecord {
    /// Filled in by the observer
    pub host_addr: u64,
    /// Object-type category
    pub label_type: LabelType,
    /// Free-text description
    pub text: FixedText,
    /// Start of the labelled range
    pub guest_addr: u64,
    /// Length of the range
    pub bytes: u64,
    /// Call site that produced the label
    pub pc: u64,
}

/// Access payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRecord {
    /// Load, store or I/O write
    pub access_type: AccessType,
    /// Program counter of the access
    pub pc: u64,
    /// Filled in by the observer
    pub host_addr: u64,
    /// Accessed address
    pub guest_addr: u64,
}

/// Enable payload.
///
/// The wire union holds either `{ value, text }` for the all-cores switch or
/// `{ core }` for the per-core switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableRecord {
    /// Access recording for every core, with a scope description
    AccessAllCores {
        /// New state
        enabled: bool,
        /// What the switch applies to
        scope: FixedText,
    },
    /// Access recording for one core
    AccessCore {
        /// New state
        enabled: bool,
        /// Target core
        core: u64,
    },
    /// Call window for one core
    CallCore {
        /// New state
        enabled: bool,
        /// Target core
        core: u64,
    },
}

impl EnableRecord {
    /// Wire sub-kind.
    #[must_use]
    pub const fn enable_type(&self) -> EnableType {
        match self {
            EnableRecord::AccessAllCores { .. } => EnableType::AccessAllCores,
            EnableRecord::AccessCore { enabled: true, .. } => EnableType::AccessSetCore,
            EnableRecord::AccessCore { enabled: false, .. } => EnableType::AccessClearCore,
            EnableRecord::CallCore { enabled: true, .. } => EnableType::CallSetCore,
            EnableRecord::CallCore { enabled: false, .. } => EnableType::CallClearCore,
        }
    }

    /// New state carried by the record.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        match self {
            EnableRecord::AccessAllCores { enabled, .. }
            | EnableRecord::AccessCore { enabled, .. }
            | EnableRecord::CallCore { enabled, .. } => *enabled,
        }
    }
}

/// Call extent transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FcallRecord {
    /// Thread id, 0 outside a thread context
    pub tid: u64,
    /// Entry program counter of the extent
    pub pc: u64,
    /// Globally unique call tag
    pub tag: u64,
    /// Stack slot of the frame, 0 for the outermost
    pub depth: u16,
    /// Transition
    pub state: CallState,
}

/// Segment payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRecord {
    /// First address of the range
    pub base: u64,
    /// End address of the range
    pub end: u64,
    /// Object-type category of everything in the range
    pub object_type: LabelType,
}

/// Direct call payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallRecord {
    /// Call target
    pub target_pc: u64,
    /// Return address
    pub return_pc: u64,
    /// Return value or marker chosen by the caller
    pub ret: i32,
}

/// Lock payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockRecord {
    /// Call site of the acquire or release
    pub pc: u64,
    /// Lock identity (its address)
    pub lock: u64,
    /// Lock name
    pub name: FixedText,
    /// True for a release, false for an acquire
    pub release: bool,
    /// True for a shared (read) acquire
    pub read: bool,
}

/// Task payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRecord {
    /// Thread id
    pub tid: u64,
    /// Thread-group id
    pub tgid: u64,
    /// Lifecycle event
    pub event: TaskEvent,
    /// Descriptive string, usually the command line
    pub description: FixedText,
}

/// Scheduling marker: `tid` is now running on the emitting core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedRecord {
    /// Thread now running
    pub tid: u64,
}

/// Kind-specific record payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// See [`LabelRecord`]
    Label(LabelRecord),
    /// See [`AccessRecord`]
    Access(AccessRecord),
    /// See [`EnableRecord`]
    Enable(EnableRecord),
    /// See [`FcallRecord`]
    Fcall(FcallRecord),
    /// See [`SegmentRecord`]
    Segment(SegmentRecord),
    /// See [`CallRecord`]
    Call(CallRecord),
    /// See [`LockRecord`]
    Lock(LockRecord),
    /// See [`TaskRecord`]
    Task(TaskRecord),
    /// See [`SchedRecord`]
    Sched(SchedRecord),
}

impl Payload {
    /// Record kind this payload encodes as.
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Payload::Label(_) => RecordKind::Label,
            Payload::Access(_) => RecordKind::Access,
            Payload::Enable(_) => RecordKind::Enable,
            Payload::Fcall(_) => RecordKind::Fcall,
            Payload::Segment(_) => RecordKind::Segment,
            Payload::Call(_) => RecordKind::Call,
            Payload::Lock(_) => RecordKind::Lock,
            Payload::Task(_) => RecordKind::Task,
            Payload::Sched(_) => RecordKind::Sched,
        }
    }

    /// Encode the payload behind a header stamped with `core_id` and
    /// `access_count`.
    #[must_use]
    pub fn encode(&self, core_id: u16, access_count: u64) -> EncodedRecord {
        let kind = self.kind();
        let header = RecordHeader {
            kind,
            size: u16::try_from(kind.wire_size()).unwrap_or(u16::MAX),
            core_id,
            access_count,
        };

        let mut bytes = [0u8; MAX_RECORD_SIZE];
        let mut w = Writer::new(&mut bytes, 0);
        header.encode(&mut w);
        self.encode_body(&mut w);
        debug_assert_eq!(w.position(), kind.wire_size());

        EncodedRecord { bytes, header }
    }

    fn encode_body(&self, w: &mut Writer<'_>) {
        match self {
            Payload::Label(p) => {
                w.u64(p.host_addr);
                w.u32(p.label_type.code());
                w.text(&p.text);
                w.u64(p.guest_addr);
                w.u64(p.bytes);
                w.u64(p.pc);
            }
            Payload::Access(p) => {
                w.u32(p.access_type.code());
                w.u64(p.pc);
                w.u64(p.host_addr);
                w.u64(p.guest_addr);
            }
            Payload::Enable(p) => {
                w.u32(p.enable_type().code());
                match p {
                    EnableRecord::AccessAllCores { enabled, scope } => {
                        w.u64(if *enabled { u64::MAX } else { 0 });
                        w.text(scope);
                    }
                    EnableRecord::AccessCore { core, .. } | EnableRecord::CallCore { core, .. } => {
                        w.u64(*core);
                        w.zeros(ENABLE_UNION_SIZE - 8);
                    }
                }
            }
            Payload::Fcall(p) => {
                w.u64(p.tid);
                w.u64(p.pc);
                w.u64(p.tag);
                w.u16(p.depth);
                w.u32(p.state.code());
            }
            Payload::Segment(p) => {
                w.u64(p.base);
                w.u64(p.end);
                w.u32(p.object_type.code());
            }
            Payload::Call(p) => {
                w.u64(p.target_pc);
                w.u64(p.return_pc);
                w.i32(p.ret);
            }
            Payload::Lock(p) => {
                w.u64(p.pc);
                w.u64(p.lock);
                w.text(&p.name);
                w.u8(u8::from(p.release));
                w.u8(u8::from(p.read));
            }
            Payload::Task(p) => {
                w.u64(p.tid);
                w.u64(p.tgid);
                w.u32(p.event.code());
                w.text(&p.description);
            }
            Payload::Sched(p) => {
                w.u64(p.tid);
            }
        }
    }

    fn decode_body(kind: RecordKind, r: &mut Reader<'_>) -> Result<Self, RecordError> {
        let payload = match kind {
            RecordKind::Label => {
                let host_addr = r.u64()?;
                let code = r.u32()?;
                Payload::Label(LabelRecord {
                    host_addr,
                    label_type: LabelType::from_code(code)
                        .ok_or(RecordError::invalid_code("label type", code))?,
                    text: r.text()?,
                    guest_addr: r.u64()?,
                    bytes: r.u64()?,
                    pc: r.u64()?,
                })
            }
            RecordKind::Access => {
                let code = r.u32()?;
                Payload::Access(AccessRecord {
                    access_type: AccessType::from_code(code)
                        .ok_or(RecordError::invalid_code("access type", code))?,
                    pc: r.u64()?,
                    host_addr: r.u64()?,
                    guest_addr: r.u64()?,
                })
            }
            RecordKind::Enable => {
                let code = r.u32()?;
                let enable_type = EnableType::from_code(code)
                    .ok_or(RecordError::invalid_code("enable type", code))?;
                let value = r.u64()?;
                let record = match enable_type {
                    EnableType::AccessAllCores => EnableRecord::AccessAllCores {
                        enabled: value != 0,
                        scope: r.text()?,
                    },
                    EnableType::AccessSetCore | EnableType::AccessClearCore => {
                        r.skip(TEXT_CAPACITY)?;
                        EnableRecord::AccessCore {
                            enabled: enable_type == EnableType::AccessSetCore,
                            core: value,
                        }
                    }
                    EnableType::CallSetCore | EnableType::CallClearCore => {
                        r.skip(TEXT_CAPACITY)?;
                        EnableRecord::CallCore {
                            enabled: enable_type == EnableType::CallSetCore,
                            core: value,
                        }
                    }
                };
                Payload::Enable(record)
            }
            RecordKind::Fcall => {
                let tid = r.u64()?;
                let pc = r.u64()?;
                let tag = r.u64()?;
                let depth = r.u16()?;
                let code = r.u32()?;
                Payload::Fcall(FcallRecord {
                    tid,
                    pc,
                    tag,
                    depth,
                    state: CallState::from_code(code)
                        .ok_or(RecordError::invalid_code("call state", code))?,
                })
            }
            RecordKind::Segment => {
                let base = r.u64()?;
                let end = r.u64()?;
                let code = r.u32()?;
                Payload::Segment(SegmentRecord {
                    base,
                    end,
                    object_type: LabelType::from_code(code)
                        .ok_or(RecordError::invalid_code("label type", code))?,
                })
            }
            RecordKind::Call => Payload::Call(CallRecord {
                target_pc: r.u64()?,
                return_pc: r.u64()?,
                ret: r.i32()?,
            }),
            RecordKind::Lock => Payload::Lock(LockRecord {
                pc: r.u64()?,
                lock: r.u64()?,
                name: r.text()?,
                release: r.u8()? != 0,
                read: r.u8()? != 0,
            }),
            RecordKind::Task => {
                let tid = r.u64()?;
                let tgid = r.u64()?;
                let code = r.u32()?;
                Payload::Task(TaskRecord {
                    tid,
                    tgid,
                    event: TaskEvent::from_code(code)
                        .ok_or(RecordError::invalid_code("task event", code))?,
                    description: r.text()?,
                })
            }
            RecordKind::Sched => Payload::Sched(SchedRecord { tid: r.u64()? }),
        };
        Ok(payload)
    }
}

/// A fully decoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    /// Common header
    pub header: RecordHeader,
    /// Kind-specific payload
    pub payload: Payload,
}

impl Record {
    /// Decode one record from the front of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns an error for short buffers, unknown kinds, a header size that
    /// disagrees with the kind's layout, or unknown enumeration codes.
    pub fn decode(bytes: &[u8]) -> Result<Self, RecordError> {
        let header = RecordHeader::decode(bytes)?;
        let expected = header.kind.wire_size();
        if usize::from(header.size) != expected {
            return Err(RecordError::SizeMismatch {
                kind: header.kind,
                declared: header.size,
                expected,
            });
        }
        if bytes.len() < expected {
            return Err(RecordError::Truncated {
                needed: expected,
                available: bytes.len(),
            });
        }

        let mut r = Reader::new(bytes, HEADER_SIZE);
        let payload = Payload::decode_body(header.kind, &mut r)?;
        Ok(Self { header, payload })
    }

    /// Borrow the payload as an fcall record, if it is one.
    #[must_use]
    pub const fn as_fcall(&self) -> Option<&FcallRecord> {
        match &self.payload {
            Payload::Fcall(f) => Some(f),
            _ => None,
        }
    }
}

/// An encoded record ready for the transport.
///
/// The buffer is sized for the largest kind; only the first
/// [`len`](EncodedRecord::len) bytes belong to the record.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EncodedRecord {
    bytes: [u8; MAX_RECORD_SIZE],
    header: RecordHeader,
}

impl EncodedRecord {
    /// Header written at the front of the buffer.
    #[inline]
    #[must_use]
    pub const fn header(&self) -> &RecordHeader {
        &self.header
    }

    /// Record kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        self.header.kind
    }

    /// Encoded length in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> u16 {
        self.header.size
    }

    /// Always false: every record carries at least a header.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// The encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes
            .get(..usize::from(self.header.size))
            .unwrap_or(&self.bytes)
    }

    /// Decode the record back into typed form.
    ///
    /// # Errors
    ///
    /// Never fails for buffers produced by [`Payload::encode`]; the `Result`
    /// mirrors [`Record::decode`].
    pub fn decode(&self) -> Result<Record, RecordError> {
        Record::decode(self.as_bytes())
    }
}

impl fmt::Debug for EncodedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedRecord")
            .field("header", &self.header)
            .field("len", &self.as_bytes().len())
            .finish()
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Label(p) => write!(
                f,
                "label {} {:?} addr={:#x} bytes={} pc={:#x}",
                p.label_type,
                p.text.as_str(),
                p.guest_addr,
                p.bytes,
                p.pc
            ),
            Payload::Access(p) => write!(
                f,
                "access {} pc={:#x} addr={:#x}",
                p.access_type, p.pc, p.guest_addr
            ),
            Payload::Enable(EnableRecord::AccessAllCores { enabled, scope }) => write!(
                f,
                "enable access all {} scope={:?}",
                on_off(*enabled),
                scope.as_str()
            ),
            Payload::Enable(EnableRecord::AccessCore { enabled, core }) => {
                write!(f, "enable access core={} {}", core, on_off(*enabled))
            }
            Payload::Enable(EnableRecord::CallCore { enabled, core }) => {
                write!(f, "enable call core={} {}", core, on_off(*enabled))
            }
            Payload::Fcall(p) => write!(
                f,
                "fcall {} tid={} pc={:#x} tag={:#x} depth={}",
                p.state, p.tid, p.pc, p.tag, p.depth
            ),
            Payload::Segment(p) => write!(
                f,
                "segment {} {:#x}..{:#x}",
                p.object_type, p.base, p.end
            ),
            Payload::Call(p) => write!(
                f,
                "call target={:#x} return={:#x} ret={}",
                p.target_pc, p.return_pc, p.ret
            ),
            Payload::Lock(p) => {
                let action = match (p.release, p.read) {
                    (true, _) => "release",
                    (false, true) => "acquire read",
                    (false, false) => "acquire write",
                };
                write!(
                    f,
                    "lock {} {:?} lock={:#x} pc={:#x}",
                    action,
                    p.name.as_str(),
                    p.lock,
                    p.pc
                )
            }
            Payload::Task(p) => write!(
                f,
                "task {} tid={} tgid={} {:?}",
                p.event,
                p.tid,
                p.tgid,
                p.description.as_str()
            ),
            Payload::Sched(p) => write!(f, "sched tid={}", p.tid),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[core {} #{}] {}",
            self.header.core_id, self.header.access_count, self.payload
        )
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
