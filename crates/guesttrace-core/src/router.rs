//! Context router.
//!
//! Keeps exactly one frame per core running across interrupt entry/exit,
//! context switches and page faults by pausing whichever stack loses the
//! core and resuming whichever one gets it back.

use guesttrace_record::{Payload, SchedRecord};

use crate::context::{CoreContext, RunningContext, ThreadContext};
use crate::error::TraceResult;
use crate::irq::InterruptMask;
use crate::sink::{CoreScope, TransportSink};
use crate::stack::CallFrame;
use crate::tag::CallTag;
use crate::tracer::Tracer;

impl<S: TransportSink, M: InterruptMask> Tracer<S, M> {
    /// Interrupt or exception entry at handler `pc`.
    ///
    /// Pauses the interrupted extent (an outer interrupt's frame if one is
    /// open, otherwise `current`'s top frame) and opens a frame for the
    /// handler on the core's interrupt stack.
    ///
    /// # Errors
    ///
    /// As [`push`](Tracer::push) on the interrupt stack.
    pub fn irq_enter(
        &self,
        core: &mut CoreContext,
        current: Option<&ThreadContext>,
        pc: u64,
    ) -> TraceResult<CallTag> {
        self.run(core, |core| {
            let (mut stamp, irq) = core.split();
            if !self.pause_top(&mut stamp, RunningContext::Interrupt, irq)
                && let Some(thread) = current
            {
                self.pause_top(&mut stamp, thread.running(), thread.stack());
            }
            self.push_frame(&mut stamp, RunningContext::Interrupt, irq, pc)
        })
    }

    /// Interrupt or exception exit.
    ///
    /// Closes the handler's frame, then resumes the outer interrupt's frame
    /// if one is still open, otherwise `current`'s top frame.
    ///
    /// # Errors
    ///
    /// [`TraceFault::StackUnderflow`](crate::TraceFault::StackUnderflow)
    /// without a matching [`irq_enter`](Tracer::irq_enter).
    pub fn irq_exit(
        &self,
        core: &mut CoreContext,
        current: Option<&ThreadContext>,
    ) -> TraceResult<CallFrame> {
        self.run(core, |core| {
            let (mut stamp, irq) = core.split();
            let frame = self.pop_frame(&mut stamp, RunningContext::Interrupt, irq)?;
            if !self.resume_top(&mut stamp, RunningContext::Interrupt, irq) {
                stamp.set_running(current.map(ThreadContext::running));
                if let Some(thread) = current {
                    self.resume_top(&mut stamp, thread.running(), thread.stack());
                }
            }
            Ok(frame)
        })
    }

    /// Scheduler switch from `prev` to `next`.
    ///
    /// `prev` is `None` when the core was idle. Emits, in order: pause of
    /// `prev`'s top frame, a sched record for `next` (unless
    /// `record_scheduling` is off), resume of `next`'s top frame.
    ///
    /// # Errors
    ///
    /// Only halt faults from an earlier violation.
    pub fn context_switch(
        &self,
        core: &mut CoreContext,
        prev: Option<&ThreadContext>,
        next: &ThreadContext,
    ) -> TraceResult {
        self.run(core, |core| {
            let mut stamp = core.stamp();
            if let Some(prev) = prev {
                self.pause_top(&mut stamp, prev.running(), prev.stack());
            }
            if self.config().record_scheduling {
                self.emit(
                    &mut stamp,
                    Payload::Sched(SchedRecord { tid: next.tid() }),
                    CoreScope::AllCores,
                );
            }
            stamp.set_running(Some(next.running()));
            self.resume_top(&mut stamp, next.running(), next.stack());
            Ok(())
        })
    }

    /// Page-fault handler entry at `pc`.
    ///
    /// Opens a frame on `thread`'s stack only while its depth is below
    /// `fault_depth_cap`; returns `None` when the cap suppressed it.
    ///
    /// # Errors
    ///
    /// As [`push`](Tracer::push).
    pub fn fault_enter(
        &self,
        core: &mut CoreContext,
        thread: &mut ThreadContext,
        pc: u64,
    ) -> TraceResult<Option<CallTag>> {
        let cap = self.config().fault_depth_cap;
        self.run(core, |core| {
            if thread.stack().len() >= cap {
                return Ok(None);
            }
            let running = thread.running();
            let mut stamp = core.stamp();
            self.push_frame(&mut stamp, running, thread.stack_mut(), pc)
                .map(Some)
        })
    }

    /// Page-fault handler exit.
    ///
    /// Closes the top frame only if it was opened at `handler_pc`, so a
    /// suppressed [`fault_enter`](Tracer::fault_enter) never closes someone
    /// else's extent.
    ///
    /// # Errors
    ///
    /// Only halt faults from an earlier violation.
    pub fn fault_exit(
        &self,
        core: &mut CoreContext,
        thread: &mut ThreadContext,
        handler_pc: u64,
    ) -> TraceResult<Option<CallFrame>> {
        self.run(core, |core| {
            if thread.stack().top().is_none_or(|top| top.pc != handler_pc) {
                return Ok(None);
            }
            let running = thread.running();
            let mut stamp = core.stamp();
            self.pop_frame(&mut stamp, running, thread.stack_mut())
                .map(Some)
        })
    }

    /// Tracing start-up on a core: record which thread is running and make it
    /// the owner of the core's call window.
    ///
    /// # Errors
    ///
    /// Only halt faults from an earlier violation.
    pub fn start(&self, core: &mut CoreContext, current: Option<&ThreadContext>) -> TraceResult {
        self.run(core, |core| {
            let mut stamp = core.stamp();
            stamp.set_running(current.map(ThreadContext::running));
            if let Some(thread) = current {
                self.emit(
                    &mut stamp,
                    Payload::Sched(SchedRecord { tid: thread.tid() }),
                    CoreScope::AllCores,
                );
            }
            Ok(())
        })
    }
}
