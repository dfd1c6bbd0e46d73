//! Bounded call stacks.
//!
//! A [`CallStack`] holds at most [`CALL_STACK_DEPTH`] frames. It knows
//! nothing about records; the tracker in [`crate::tracker`] drives it and
//! emits the transitions.

use crate::error::{TraceFault, TraceResult};
use crate::tag::CallTag;

/// Frames per call stack.
pub const CALL_STACK_DEPTH: usize = 16;

/// One open call extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CallFrame {
    /// Entry program counter
    pub pc: u64,
    /// Tag issued on entry
    pub tag: CallTag,
}

/// Fixed-capacity LIFO of [`CallFrame`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallStack {
    frames: [CallFrame; CALL_STACK_DEPTH],
    len: usize,
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new()
    }
}

impl CallStack {
    /// Create an empty stack.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frames: [CallFrame {
                pc: 0,
                tag: CallTag::from_raw(0),
            }; CALL_STACK_DEPTH],
            len: 0,
        }
    }

    /// Number of open frames.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True if no frame is open.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True if another push would overflow.
    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.len == CALL_STACK_DEPTH
    }

    /// Slot index of the top frame, `None` when empty.
    #[inline]
    #[must_use]
    pub const fn depth(&self) -> Option<usize> {
        self.len.checked_sub(1)
    }

    /// Top frame, if any.
    #[must_use]
    pub fn top(&self) -> Option<&CallFrame> {
        self.depth().and_then(|d| self.frames.get(d))
    }

    /// Open frames, outermost first.
    #[must_use]
    pub fn frames(&self) -> &[CallFrame] {
        self.frames.get(..self.len).unwrap_or(&[])
    }

    pub(crate) fn push(&mut self, frame: CallFrame) -> TraceResult<usize> {
        let depth = self.len;
        let slot = self
            .frames
            .get_mut(depth)
            .ok_or(TraceFault::StackOverflow)?;
        *slot = frame;
        self.len += 1;
        Ok(depth)
    }

    /// Clear the top slot and return what it held.
    pub(crate) fn pop(&mut self) -> TraceResult<CallFrame> {
        let depth = self.depth().ok_or(TraceFault::StackUnderflow)?;
        let slot = self
            .frames
            .get_mut(depth)
            .ok_or(TraceFault::StackUnderflow)?;
        let frame = core::mem::take(slot);
        self.len = depth;
        Ok(frame)
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::new();
    }
}
