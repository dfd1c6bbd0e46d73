//! Wire enumerations shared by the record layouts.
//!
//! Every enumeration is written as a 4-byte little-endian integer, matching the
//! packed C enums observers already parse. Codes start at 1 so an all-zero
//! buffer never decodes as a valid value.

use core::fmt;

use crate::layout;

/// Record kind stored in the first header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RecordKind {
    /// Byte range labelled with an object type and description
    Label = 1,
    /// Load, store or I/O write issued at a program counter
    Access = 2,
    /// Access or call class switched on or off
    Enable = 3,
    /// Call extent transition (start, done, resume, pause)
    Fcall = 4,
    /// Address range registered for an object-type category
    Segment = 5,
    /// Direct call target and return address
    Call = 6,
    /// Lock acquire or release
    Lock = 7,
    /// Thread create, update or exit
    Task = 8,
    /// Scheduling marker naming the thread now running
    Sched = 9,
}

impl RecordKind {
    /// All kinds, in code order.
    pub const ALL: [RecordKind; 9] = [
        RecordKind::Label,
        RecordKind::Access,
        RecordKind::Enable,
        RecordKind::Fcall,
        RecordKind::Segment,
        RecordKind::Call,
        RecordKind::Lock,
        RecordKind::Task,
        RecordKind::Sched,
    ];

    /// Numeric wire code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Look a kind up by wire code.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(RecordKind::Label),
            2 => Some(RecordKind::Access),
            3 => Some(RecordKind::Enable),
            4 => Some(RecordKind::Fcall),
            5 => Some(RecordKind::Segment),
            6 => Some(RecordKind::Call),
            7 => Some(RecordKind::Lock),
            8 => Some(RecordKind::Task),
            9 => Some(RecordKind::Sched),
            _ => None,
        }
    }

    /// Total encoded size (header plus payload) of records of this kind.
    #[inline]
    #[must_use]
    pub const fn wire_size(self) -> usize {
        match self {
            RecordKind::Label => layout::LABEL_SIZE,
            RecordKind::Access => layout::ACCESS_SIZE,
            RecordKind::Enable => layout::ENABLE_SIZE,
            RecordKind::Fcall => layout::FCALL_SIZE,
            RecordKind::Segment => layout::SEGMENT_SIZE,
            RecordKind::Call => layout::CALL_SIZE,
            RecordKind::Lock => layout::LOCK_SIZE,
            RecordKind::Task => layout::TASK_SIZE,
            RecordKind::Sched => layout::SCHED_SIZE,
        }
    }

    /// Short lowercase name used in rendered records.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            RecordKind::Label => "label",
            RecordKind::Access => "access",
            RecordKind::Enable => "enable",
            RecordKind::Fcall => "fcall",
            RecordKind::Segment => "segment",
            RecordKind::Call => "call",
            RecordKind::Lock => "lock",
            RecordKind::Task => "task",
            RecordKind::Sched => "sched",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Object-type category attached to labels and segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum LabelType {
    /// General-purpose heap objects
    Heap = 1,
    /// Page-granular blocks
    Block = 2,
    /// Statically allocated data
    Static = 3,
    /// Per-core data whose base is fixed at runtime
    PerCore = 4,
}

impl LabelType {
    /// Numeric wire code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Look a label type up by wire code.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(LabelType::Heap),
            2 => Some(LabelType::Block),
            3 => Some(LabelType::Static),
            4 => Some(LabelType::PerCore),
            _ => None,
        }
    }
}

impl fmt::Display for LabelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelType::Heap => f.write_str("heap"),
            LabelType::Block => f.write_str("block"),
            LabelType::Static => f.write_str("static"),
            LabelType::PerCore => f.write_str("percore"),
        }
    }
}

/// Kind of memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AccessType {
    /// Load
    Load = 1,
    /// Store
    Store = 2,
    /// I/O write that lands in RAM
    IoWrite = 3,
}

impl AccessType {
    /// Numeric wire code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Look an access type up by wire code.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(AccessType::Load),
            2 => Some(AccessType::Store),
            3 => Some(AccessType::IoWrite),
            _ => None,
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessType::Load => f.write_str("ld"),
            AccessType::Store => f.write_str("st"),
            AccessType::IoWrite => f.write_str("iw"),
        }
    }
}

/// Sub-kind of an enable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum EnableType {
    /// Stop recording accesses on one core
    AccessClearCore = 1,
    /// Start recording accesses on one core
    AccessSetCore = 2,
    /// Switch access recording for every core, with a scope string
    AccessAllCores = 3,
    /// Close the call window on one core
    CallClearCore = 4,
    /// Open the call window on one core
    CallSetCore = 5,
}

impl EnableType {
    /// Numeric wire code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Look an enable type up by wire code.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(EnableType::AccessClearCore),
            2 => Some(EnableType::AccessSetCore),
            3 => Some(EnableType::AccessAllCores),
            4 => Some(EnableType::CallClearCore),
            5 => Some(EnableType::CallSetCore),
            _ => None,
        }
    }
}

/// Call extent transition carried by an fcall record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CallState {
    /// Extent pushed
    Start = 1,
    /// Extent popped; terminal
    Done = 2,
    /// Paused extent running again
    Resume = 3,
    /// Extent stopped running without ending
    Pause = 4,
}

impl CallState {
    /// Numeric wire code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Look a call state up by wire code.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(CallState::Start),
            2 => Some(CallState::Done),
            3 => Some(CallState::Resume),
            4 => Some(CallState::Pause),
            _ => None,
        }
    }

    /// True for the states after which the extent is the core's running one.
    #[inline]
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, CallState::Start | CallState::Resume)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallState::Start => f.write_str("start"),
            CallState::Done => f.write_str("done"),
            CallState::Resume => f.write_str("resume"),
            CallState::Pause => f.write_str("pause"),
        }
    }
}

/// Thread lifecycle event carried by a task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TaskEvent {
    /// Thread created
    Init = 1,
    /// Thread metadata changed
    Update = 2,
    /// Thread exited
    Exit = 3,
}

impl TaskEvent {
    /// Numeric wire code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Look a task event up by wire code.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(TaskEvent::Init),
            2 => Some(TaskEvent::Update),
            3 => Some(TaskEvent::Exit),
            _ => None,
        }
    }
}

impl fmt::Display for TaskEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskEvent::Init => f.write_str("init"),
            TaskEvent::Update => f.write_str("update"),
            TaskEvent::Exit => f.write_str("exit"),
        }
    }
}
