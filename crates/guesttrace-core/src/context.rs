//! Per-core and per-thread tracer state.
//!
//! Nothing here is shared between cores. A [`CoreContext`] is owned by the
//! core it describes and a [`ThreadContext`] by the thread control block it
//! belongs to; both are passed by `&mut` into every tracer call, so the
//! borrow checker provides the "only the owning core touches it" rule.

use guesttrace_record::FixedText;

use crate::stack::CallStack;

/// Which execution context currently holds a core.
///
/// Threads are identified by tid, so two live contexts must not share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunningContext {
    /// The core's interrupt/exception stack
    Interrupt,
    /// The thread with this tid
    Thread(u64),
}

impl RunningContext {
    /// Thread id carried by start/resume records.
    #[inline]
    #[must_use]
    pub const fn tid(self) -> u64 {
        match self {
            RunningContext::Interrupt => 0,
            RunningContext::Thread(tid) => tid,
        }
    }
}

/// State owned by one core.
///
/// Not `Clone`: each core has exactly one, handed out once by
/// [`Tracer::core_context`](crate::Tracer::core_context).
#[derive(Debug, PartialEq, Eq)]
pub struct CoreContext {
    id: u16,
    sequence: u64,
    irq_stack: CallStack,
    running: Option<RunningContext>,
    halted: bool,
}

impl CoreContext {
    /// Fresh context for core `id`.
    ///
    /// Obtain one through [`Tracer::core_context`](crate::Tracer::core_context)
    /// so the id is checked against the configuration.
    pub(crate) const fn new(id: u16) -> Self {
        Self {
            id,
            sequence: 0,
            irq_stack: CallStack::new(),
            running: None,
            halted: false,
        }
    }

    /// Core id stamped into every record emitted from this context.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> u16 {
        self.id
    }

    /// Number of records emitted on this core so far.
    ///
    /// The next record carries this value as its `access_count`.
    #[inline]
    #[must_use]
    pub const fn records_emitted(&self) -> u64 {
        self.sequence
    }

    /// The core's interrupt/exception call stack.
    #[inline]
    #[must_use]
    pub const fn irq_stack(&self) -> &CallStack {
        &self.irq_stack
    }

    /// The context that owns the core's call window, if known.
    ///
    /// Set by push, resume and the router; cleared when the owner is paused.
    /// Closing extents of any other context leaves the window alone.
    #[inline]
    #[must_use]
    pub const fn running(&self) -> Option<RunningContext> {
        self.running
    }

    /// True once a fault stopped tracing on this core.
    #[inline]
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    pub(crate) fn halt(&mut self) {
        self.halted = true;
    }

    /// Split into the record stamp and the interrupt stack.
    pub(crate) fn split(&mut self) -> (Stamp<'_>, &mut CallStack) {
        (
            Stamp {
                core: self.id,
                sequence: &mut self.sequence,
                running: &mut self.running,
            },
            &mut self.irq_stack,
        )
    }

    pub(crate) fn stamp(&mut self) -> Stamp<'_> {
        self.split().0
    }
}

/// Core id, record counter and running marker, borrowed for one operation.
#[derive(Debug)]
pub(crate) struct Stamp<'a> {
    pub(crate) core: u16,
    sequence: &'a mut u64,
    running: &'a mut Option<RunningContext>,
}

impl Stamp<'_> {
    /// Take the next `access_count`.
    pub(crate) fn advance(&mut self) -> u64 {
        let current = *self.sequence;
        *self.sequence = current.wrapping_add(1);
        current
    }

    /// True if `ctx` runs on the core, or nothing is known to.
    pub(crate) fn owns_core(&self, ctx: RunningContext) -> bool {
        self.running.is_none_or(|running| running == ctx)
    }

    pub(crate) fn set_running(&mut self, ctx: Option<RunningContext>) {
        *self.running = ctx;
    }
}

/// State owned by one schedulable thread.
///
/// Lives in the thread's control block from creation to termination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadContext {
    tid: u64,
    tgid: u64,
    description: FixedText,
    truncated: bool,
    stack: CallStack,
}

impl ThreadContext {
    /// Create a context with an empty call stack.
    ///
    /// Descriptions longer than 31 bytes are truncated.
    #[must_use]
    pub fn new(tid: u64, tgid: u64, description: &str) -> Self {
        let (description, truncated) = FixedText::truncating(description);
        Self {
            tid,
            tgid,
            description,
            truncated,
            stack: CallStack::new(),
        }
    }

    /// Thread id.
    #[inline]
    #[must_use]
    pub const fn tid(&self) -> u64 {
        self.tid
    }

    /// The running marker for this thread.
    #[inline]
    #[must_use]
    pub const fn running(&self) -> RunningContext {
        RunningContext::Thread(self.tid)
    }

    /// Thread-group id.
    #[inline]
    #[must_use]
    pub const fn tgid(&self) -> u64 {
        self.tgid
    }

    /// Description, usually the command line.
    #[inline]
    #[must_use]
    pub const fn description(&self) -> &FixedText {
        &self.description
    }

    /// The thread's call stack.
    #[inline]
    #[must_use]
    pub const fn stack(&self) -> &CallStack {
        &self.stack
    }

    /// True if the current description was cut to fit.
    #[inline]
    #[must_use]
    pub const fn description_truncated(&self) -> bool {
        self.truncated
    }

    pub(crate) fn set_identity(&mut self, tgid: u64, description: &str) {
        let (description, truncated) = FixedText::truncating(description);
        self.tgid = tgid;
        self.description = description;
        self.truncated = truncated;
    }

    pub(crate) fn stack_mut(&mut self) -> &mut CallStack {
        &mut self.stack
    }
}

/// Which stack a tracker operation applies to.
#[derive(Debug)]
pub enum ExecutionContext<'a> {
    /// The core's interrupt/exception stack; records carry tid 0.
    Interrupt,
    /// A thread's stack; start and resume records carry its tid.
    Thread(&'a mut ThreadContext),
}

impl ExecutionContext<'_> {
    /// Thread id carried by start/resume records.
    #[must_use]
    pub fn tid(&self) -> u64 {
        self.running().tid()
    }

    /// The running marker this context sets when it takes the core.
    #[must_use]
    pub fn running(&self) -> RunningContext {
        match self {
            ExecutionContext::Interrupt => RunningContext::Interrupt,
            ExecutionContext::Thread(thread) => RunningContext::Thread(thread.tid),
        }
    }
}


impl<'a> From<&'a mut ThreadContext> for ExecutionContext<'a> {
    fn from(thread: &'a mut ThreadContext) -> Self {
        ExecutionContext::Thread(thread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_counts_up_from_zero() {
        let mut core = CoreContext::new(3);
        {
            let mut stamp = core.stamp();
            assert_eq!(stamp.core, 3);
            assert_eq!(stamp.advance(), 0);
            assert_eq!(stamp.advance(), 1);
        }
        assert_eq!(core.records_emitted(), 2);
    }

    #[test]
    fn test_thread_context_truncates_description() {
        let thread = ThreadContext::new(7, 7, "/usr/lib/very/long/path/to/some/daemon");
        assert_eq!(thread.description().len(), 31);
        assert!(thread.description_truncated());
        assert!(thread.stack().is_empty());
    }

    #[test]
    fn test_execution_context_tid() {
        let mut thread = ThreadContext::new(42, 1, "worker");
        assert_eq!(ExecutionContext::Interrupt.tid(), 0);
        assert_eq!(ExecutionContext::from(&mut thread).tid(), 42);
    }

    #[test]
    fn test_running_marker_ownership() {
        let mut core = CoreContext::new(1);
        assert_eq!(core.running(), None);
        {
            let mut stamp = core.stamp();
            assert!(stamp.owns_core(RunningContext::Thread(4)));
            stamp.set_running(Some(RunningContext::Thread(4)));
            assert!(stamp.owns_core(RunningContext::Thread(4)));
            assert!(!stamp.owns_core(RunningContext::Thread(5)));
            assert!(!stamp.owns_core(RunningContext::Interrupt));
        }
        assert_eq!(core.running(), Some(RunningContext::Thread(4)));
        assert_eq!(RunningContext::Interrupt.tid(), 0);
    }

    #[test]
    fn test_halt_latches() {
        let mut core = CoreContext::new(0);
        assert!(!core.is_halted());
        core.halt();
        assert!(core.is_halted());
    }
}
