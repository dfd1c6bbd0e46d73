//! Call-stack tracker.
//!
//! Per-slot state machine: `absent -> started -> {paused <-> resumed} -> done`.
//! A slot is reclaimed as soon as its frame is done; frame identity lives in
//! the tag, not the slot.
//!
//! Record rules:
//! - start and resume carry the thread's tid (0 on the interrupt stack)
//! - pause and done carry tid 0
//! - every fcall is followed by an enable record for the core's call
//!   window: open after start/resume, closed after pause, and after done
//!   open only while the stack still holds frames
//! - start and resume make their context the core's running one; pause and
//!   done on any other context repeat the window state unchanged
//! - done is emitted before the slot is cleared, with the frame's own tag
//!   and pc

use guesttrace_record::CallState;

use crate::context::{CoreContext, ExecutionContext, RunningContext, Stamp, ThreadContext};
use crate::error::{TraceFault, TraceResult};
use crate::irq::InterruptMask;
use crate::sink::TransportSink;
use crate::stack::{CallFrame, CallStack};
use crate::tag::CallTag;
use crate::tracer::Tracer;

impl<S: TransportSink, M: InterruptMask> Tracer<S, M> {
    /// Open a call extent at `pc` on the stack selected by `ctx`.
    ///
    /// # Errors
    ///
    /// - [`TraceFault::StackOverflow`] if the stack is full
    /// - [`TraceFault::TagSpaceExhausted`] if the core ran out of tags
    /// - [`TraceFault::CoreHalted`]/[`TraceFault::TracerHalted`] after an
    ///   earlier fault
    ///
    /// The first two halt tracing; nothing is emitted and the stack is left
    /// unchanged.
    pub fn push(
        &self,
        core: &mut CoreContext,
        ctx: ExecutionContext<'_>,
        pc: u64,
    ) -> TraceResult<CallTag> {
        self.run(core, |core| {
            let (mut stamp, irq) = core.split();
            let running = ctx.running();
            match ctx {
                ExecutionContext::Interrupt => self.push_frame(&mut stamp, running, irq, pc),
                ExecutionContext::Thread(thread) => {
                    self.push_frame(&mut stamp, running, thread.stack_mut(), pc)
                }
            }
        })
    }

    /// Close the innermost call extent on the stack selected by `ctx`.
    ///
    /// Returns the frame that was closed.
    ///
    /// # Errors
    ///
    /// [`TraceFault::StackUnderflow`] if the stack is empty (halts tracing),
    /// or a halt fault after an earlier one.
    pub fn pop(&self, core: &mut CoreContext, ctx: ExecutionContext<'_>) -> TraceResult<CallFrame> {
        self.run(core, |core| {
            let (mut stamp, irq) = core.split();
            let running = ctx.running();
            match ctx {
                ExecutionContext::Interrupt => self.pop_frame(&mut stamp, running, irq),
                ExecutionContext::Thread(thread) => {
                    self.pop_frame(&mut stamp, running, thread.stack_mut())
                }
            }
        })
    }

    /// Pause the top frame of the stack selected by `ctx`.
    ///
    /// Returns `false` without emitting anything if the stack is empty.
    ///
    /// # Errors
    ///
    /// Only halt faults from an earlier violation.
    pub fn pause(&self, core: &mut CoreContext, ctx: ExecutionContext<'_>) -> TraceResult<bool> {
        self.run(core, |core| {
            let (mut stamp, irq) = core.split();
            let stack = match &ctx {
                ExecutionContext::Interrupt => &*irq,
                ExecutionContext::Thread(thread) => thread.stack(),
            };
            Ok(self.pause_top(&mut stamp, ctx.running(), stack))
        })
    }

    /// Resume the top frame of the stack selected by `ctx`.
    ///
    /// Returns `false` without emitting anything if the stack is empty.
    ///
    /// # Errors
    ///
    /// Only halt faults from an earlier violation.
    pub fn resume(&self, core: &mut CoreContext, ctx: ExecutionContext<'_>) -> TraceResult<bool> {
        self.run(core, |core| {
            let (mut stamp, irq) = core.split();
            let stack = match &ctx {
                ExecutionContext::Interrupt => &*irq,
                ExecutionContext::Thread(thread) => thread.stack(),
            };
            Ok(self.resume_top(&mut stamp, ctx.running(), stack))
        })
    }

    /// Close every open extent on the stack selected by `ctx`, innermost
    /// first.
    ///
    /// Returns the number of frames closed.
    ///
    /// # Errors
    ///
    /// Only halt faults from an earlier violation.
    pub fn unwind_all(&self, core: &mut CoreContext, ctx: ExecutionContext<'_>) -> TraceResult<usize> {
        self.run(core, |core| {
            let (mut stamp, irq) = core.split();
            let running = ctx.running();
            match ctx {
                ExecutionContext::Interrupt => self.unwind_stack(&mut stamp, running, irq),
                ExecutionContext::Thread(thread) => {
                    self.unwind_stack(&mut stamp, running, thread.stack_mut())
                }
            }
        })
    }

    /// Open a call extent on `thread`'s stack.
    ///
    /// # Errors
    ///
    /// As [`push`](Tracer::push).
    pub fn enter(
        &self,
        core: &mut CoreContext,
        thread: &mut ThreadContext,
        pc: u64,
    ) -> TraceResult<CallTag> {
        self.push(core, ExecutionContext::Thread(thread), pc)
    }

    /// Close the innermost call extent on `thread`'s stack.
    ///
    /// # Errors
    ///
    /// As [`pop`](Tracer::pop).
    pub fn exit(&self, core: &mut CoreContext, thread: &mut ThreadContext) -> TraceResult<CallFrame> {
        self.pop(core, ExecutionContext::Thread(thread))
    }

    pub(crate) fn push_frame(
        &self,
        stamp: &mut Stamp<'_>,
        running: RunningContext,
        stack: &mut CallStack,
        pc: u64,
    ) -> TraceResult<CallTag> {
        // Checked before a tag is spent so an overflow leaves no trace.
        if stack.is_full() {
            return Err(TraceFault::StackOverflow);
        }
        let tag = self.tags().next_tag(stamp.core)?;
        let frame = CallFrame { pc, tag };
        let depth = stack.push(frame)?;

        stamp.set_running(Some(running));
        self.emit_fcall(stamp, running.tid(), &frame, depth, CallState::Start);
        self.set_call_window(stamp, true);
        Ok(tag)
    }

    pub(crate) fn pop_frame(
        &self,
        stamp: &mut Stamp<'_>,
        running: RunningContext,
        stack: &mut CallStack,
    ) -> TraceResult<CallFrame> {
        let depth = stack.depth().ok_or(TraceFault::StackUnderflow)?;
        let top = *stack.top().ok_or(TraceFault::StackUnderflow)?;

        self.emit_fcall(stamp, 0, &top, depth, CallState::Done);
        let frame = stack.pop()?;
        if stamp.owns_core(running) {
            self.set_call_window(stamp, !stack.is_empty());
        } else {
            self.repeat_call_window(stamp);
        }
        Ok(frame)
    }

    pub(crate) fn pause_top(
        &self,
        stamp: &mut Stamp<'_>,
        running: RunningContext,
        stack: &CallStack,
    ) -> bool {
        let (Some(depth), Some(top)) = (stack.depth(), stack.top()) else {
            return false;
        };
        self.emit_fcall(stamp, 0, top, depth, CallState::Pause);
        if stamp.owns_core(running) {
            stamp.set_running(None);
            self.set_call_window(stamp, false);
        } else {
            self.repeat_call_window(stamp);
        }
        true
    }

    pub(crate) fn resume_top(
        &self,
        stamp: &mut Stamp<'_>,
        running: RunningContext,
        stack: &CallStack,
    ) -> bool {
        let (Some(depth), Some(top)) = (stack.depth(), stack.top()) else {
            return false;
        };
        stamp.set_running(Some(running));
        self.emit_fcall(stamp, running.tid(), top, depth, CallState::Resume);
        self.set_call_window(stamp, true);
        true
    }

    pub(crate) fn unwind_stack(
        &self,
        stamp: &mut Stamp<'_>,
        running: RunningContext,
        stack: &mut CallStack,
    ) -> TraceResult<usize> {
        let mut closed = 0;
        while !stack.is_empty() {
            self.pop_frame(stamp, running, stack)?;
            closed += 1;
        }
        Ok(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TracerConfig;
    use crate::sink::RingSink;
    use crate::stack::CALL_STACK_DEPTH;
    use guesttrace_record::{EnableRecord, FcallRecord, Payload, Record};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn tracer() -> Result<Tracer<RingSink>, crate::TracerError> {
        Tracer::new(TracerConfig::default(), RingSink::new())
    }

    fn fcalls(records: &[Record]) -> Vec<FcallRecord> {
        records.iter().filter_map(|r| r.as_fcall().copied()).collect()
    }

    #[test]
    fn test_push_emits_start_then_window() -> TestResult {
        let tracer = tracer()?;
        let mut core = tracer.core_context(1)?;
        let mut thread = ThreadContext::new(10, 10, "t");

        let tag = tracer.enter(&mut core, &mut thread, 0x1000)?;

        let records = tracer.sink().drain_decoded()?;
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].payload,
            Payload::Fcall(FcallRecord {
                tid: 10,
                pc: 0x1000,
                tag: tag.raw(),
                depth: 0,
                state: CallState::Start,
            })
        );
        assert_eq!(
            records[1].payload,
            Payload::Enable(EnableRecord::CallCore {
                enabled: true,
                core: 1
            })
        );
        assert!(tracer.enable_state().call_window(1));
        Ok(())
    }

    #[test]
    fn test_done_keeps_window_open_while_frames_remain() -> TestResult {
        let tracer = tracer()?;
        let mut core = tracer.core_context(0)?;
        let mut thread = ThreadContext::new(1, 1, "t");

        tracer.enter(&mut core, &mut thread, 0x1000)?;
        tracer.enter(&mut core, &mut thread, 0x2000)?;
        tracer.exit(&mut core, &mut thread)?;
        assert!(tracer.enable_state().call_window(0));
        tracer.exit(&mut core, &mut thread)?;
        assert!(!tracer.enable_state().call_window(0));
        Ok(())
    }

    #[test]
    fn test_done_carries_tid_zero() -> TestResult {
        let tracer = tracer()?;
        let mut core = tracer.core_context(0)?;
        let mut thread = ThreadContext::new(77, 1, "t");

        tracer.enter(&mut core, &mut thread, 0x1000)?;
        let frame = tracer.exit(&mut core, &mut thread)?;
        assert_eq!(frame.pc, 0x1000);

        let calls = fcalls(&tracer.sink().drain_decoded()?);
        assert_eq!(calls[0].tid, 77);
        assert_eq!(calls[1].tid, 0);
        assert_eq!(calls[1].state, CallState::Done);
        assert_eq!(calls[1].tag, calls[0].tag);
        Ok(())
    }

    #[test]
    fn test_pause_resume_leave_depth_alone() -> TestResult {
        let tracer = tracer()?;
        let mut core = tracer.core_context(0)?;
        let mut thread = ThreadContext::new(5, 5, "t");

        tracer.enter(&mut core, &mut thread, 0x1000)?;
        assert!(tracer.pause(&mut core, ExecutionContext::Thread(&mut thread))?);
        assert!(!tracer.enable_state().call_window(0));
        assert!(tracer.resume(&mut core, ExecutionContext::Thread(&mut thread))?);
        assert!(tracer.enable_state().call_window(0));
        assert_eq!(thread.stack().depth(), Some(0));

        let calls = fcalls(&tracer.sink().drain_decoded()?);
        let states: Vec<CallState> = calls.iter().map(|c| c.state).collect();
        assert_eq!(
            states,
            vec![CallState::Start, CallState::Pause, CallState::Resume]
        );
        assert_eq!(calls[1].tid, 0);
        assert_eq!(calls[2].tid, 5);
        Ok(())
    }

    #[test]
    fn test_pause_on_empty_stack_is_noop() -> TestResult {
        let tracer = tracer()?;
        let mut core = tracer.core_context(0)?;
        assert!(!tracer.pause(&mut core, ExecutionContext::Interrupt)?);
        assert!(!tracer.resume(&mut core, ExecutionContext::Interrupt)?);
        assert!(tracer.sink().is_empty());
        Ok(())
    }

    #[test]
    fn test_interrupt_stack_uses_tid_zero() -> TestResult {
        let tracer = tracer()?;
        let mut core = tracer.core_context(2)?;
        tracer.push(&mut core, ExecutionContext::Interrupt, 0xfee0)?;
        assert_eq!(core.irq_stack().len(), 1);

        let calls = fcalls(&tracer.sink().drain_decoded()?);
        assert_eq!(calls[0].tid, 0);
        Ok(())
    }

    #[test]
    fn test_overflow_halts_core_without_emitting() -> TestResult {
        let tracer = tracer()?;
        let mut core = tracer.core_context(0)?;
        let mut thread = ThreadContext::new(1, 1, "t");

        for pc in 0..CALL_STACK_DEPTH as u64 {
            tracer.enter(&mut core, &mut thread, pc)?;
        }
        let before = tracer.sink().len();

        assert_eq!(
            tracer.enter(&mut core, &mut thread, 0xdead),
            Err(TraceFault::StackOverflow)
        );
        assert_eq!(tracer.sink().len(), before);
        assert_eq!(thread.stack().len(), CALL_STACK_DEPTH);
        assert!(core.is_halted());
        assert_eq!(
            tracer.exit(&mut core, &mut thread),
            Err(TraceFault::CoreHalted)
        );
        Ok(())
    }

    #[test]
    fn test_underflow_halts_core() -> TestResult {
        let tracer = tracer()?;
        let mut core = tracer.core_context(0)?;
        let mut thread = ThreadContext::new(1, 1, "t");

        assert_eq!(
            tracer.exit(&mut core, &mut thread),
            Err(TraceFault::StackUnderflow)
        );
        assert!(core.is_halted());
        assert!(tracer.sink().is_empty());
        assert_eq!(tracer.metrics().faults, 1);
        Ok(())
    }

    #[test]
    fn test_unwind_all_closes_innermost_first() -> TestResult {
        let tracer = tracer()?;
        let mut core = tracer.core_context(0)?;
        let mut thread = ThreadContext::new(1, 1, "t");

        for pc in [0x1000, 0x2000, 0x3000] {
            tracer.enter(&mut core, &mut thread, pc)?;
        }
        assert_eq!(tracer.sink().drain().len(), 6);

        let closed = tracer.unwind_all(&mut core, ExecutionContext::Thread(&mut thread))?;
        assert_eq!(closed, 3);
        assert!(thread.stack().is_empty());

        let calls = fcalls(&tracer.sink().drain_decoded()?);
        let pcs: Vec<u64> = calls.iter().map(|c| c.pc).collect();
        assert_eq!(pcs, vec![0x3000, 0x2000, 0x1000]);
        assert!(calls.iter().all(|c| c.state == CallState::Done));
        Ok(())
    }

    #[test]
    fn test_pop_on_parked_stack_keeps_running_window() -> TestResult {
        let tracer = tracer()?;
        let mut core = tracer.core_context(0)?;
        let mut parked = ThreadContext::new(1, 1, "parked");
        let mut running = ThreadContext::new(2, 2, "running");

        tracer.enter(&mut core, &mut parked, 0x1000)?;
        tracer.pause(&mut core, ExecutionContext::Thread(&mut parked))?;
        tracer.enter(&mut core, &mut running, 0x2000)?;
        assert_eq!(core.running(), Some(RunningContext::Thread(2)));
        assert_eq!(tracer.sink().drain().len(), 6);

        tracer.pop(&mut core, ExecutionContext::Thread(&mut parked))?;
        assert!(tracer.enable_state().call_window(0));
        assert_eq!(core.running(), Some(RunningContext::Thread(2)));

        // The done is still followed by a window record, repeating the state.
        let records = tracer.sink().drain_decoded()?;
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[1].payload,
            Payload::Enable(EnableRecord::CallCore {
                enabled: true,
                core: 0
            })
        );
        Ok(())
    }

    #[test]
    fn test_pause_clears_running_marker() -> TestResult {
        let tracer = tracer()?;
        let mut core = tracer.core_context(0)?;
        let mut thread = ThreadContext::new(3, 3, "t");

        tracer.enter(&mut core, &mut thread, 0x1000)?;
        assert_eq!(core.running(), Some(thread.running()));
        tracer.pause(&mut core, ExecutionContext::Thread(&mut thread))?;
        assert_eq!(core.running(), None);
        tracer.resume(&mut core, ExecutionContext::Thread(&mut thread))?;
        assert_eq!(core.running(), Some(thread.running()));
        Ok(())
    }
}
