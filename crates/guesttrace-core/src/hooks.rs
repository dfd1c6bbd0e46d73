//! Notifications from instrumentation glue.
//!
//! Each method emits at most a handful of records and runs with local
//! interrupts masked, like the tracker operations. Text arguments longer
//! than 31 bytes are truncated and counted, never rejected.

use guesttrace_record::{
    AccessRecord, AccessType, CallRecord, EnableRecord, FixedText, LabelRecord, LabelType,
    LockRecord, Payload, SegmentRecord, TaskEvent, TaskRecord,
};

use crate::context::{CoreContext, Stamp, ThreadContext};
use crate::enable::EnableScope;
use crate::error::TraceResult;
use crate::irq::InterruptMask;
use crate::sink::{CoreScope, TransportSink};
use crate::tracer::Tracer;

impl<S: TransportSink, M: InterruptMask> Tracer<S, M> {
    /// A new thread was created: reset its stack and emit a task init.
    ///
    /// # Errors
    ///
    /// Only halt faults from an earlier violation.
    pub fn thread_init(&self, core: &mut CoreContext, thread: &mut ThreadContext) -> TraceResult {
        self.run(core, |core| {
            thread.stack_mut().clear();
            self.counters()
                .record_truncation(thread.description_truncated());
            self.emit_task(&mut core.stamp(), thread, TaskEvent::Init);
            Ok(())
        })
    }

    /// A thread's identity changed (e.g. exec): store it and emit a task
    /// update.
    ///
    /// # Errors
    ///
    /// Only halt faults from an earlier violation.
    pub fn thread_update(
        &self,
        core: &mut CoreContext,
        thread: &mut ThreadContext,
        tgid: u64,
        description: &str,
    ) -> TraceResult {
        self.run(core, |core| {
            thread.set_identity(tgid, description);
            self.counters()
                .record_truncation(thread.description_truncated());
            self.emit_task(&mut core.stamp(), thread, TaskEvent::Update);
            Ok(())
        })
    }

    /// A thread is terminating: close every open extent, then emit a task
    /// exit.
    ///
    /// Returns the number of extents closed.
    ///
    /// # Errors
    ///
    /// Only halt faults from an earlier violation.
    pub fn thread_exit(&self, core: &mut CoreContext, thread: &mut ThreadContext) -> TraceResult<usize> {
        self.run(core, |core| {
            let running = thread.running();
            let mut stamp = core.stamp();
            let closed = self.unwind_stack(&mut stamp, running, thread.stack_mut())?;
            self.emit_task(&mut stamp, thread, TaskEvent::Exit);
            Ok(closed)
        })
    }

    /// Label `[addr, addr + bytes)` as an object of `label_type`, allocated
    /// at call site `pc`.
    ///
    /// # Errors
    ///
    /// Only halt faults from an earlier violation.
    pub fn label_register(
        &self,
        core: &mut CoreContext,
        label_type: LabelType,
        addr: u64,
        bytes: u64,
        description: &str,
        pc: u64,
    ) -> TraceResult {
        self.run(core, |core| {
            let text = self.text(description);
            self.emit_label(&mut core.stamp(), label_type, addr, bytes, text, pc);
            Ok(())
        })
    }

    /// The object labelled at `addr` was freed.
    ///
    /// # Errors
    ///
    /// Only halt faults from an earlier violation.
    pub fn label_release(
        &self,
        core: &mut CoreContext,
        label_type: LabelType,
        addr: u64,
    ) -> TraceResult {
        self.run(core, |core| {
            self.emit_label(&mut core.stamp(), label_type, addr, 0, FixedText::EMPTY, 0);
            Ok(())
        })
    }

    /// Register `[base, end)` as holding objects of `object_type`.
    ///
    /// `scope` is [`CoreScope::Core`] for a per-core segment or
    /// [`CoreScope::AllCores`] for a global one.
    ///
    /// # Errors
    ///
    /// Only halt faults from an earlier violation.
    pub fn segment_register(
        &self,
        core: &mut CoreContext,
        base: u64,
        end: u64,
        object_type: LabelType,
        scope: CoreScope,
    ) -> TraceResult {
        self.run(core, |core| {
            self.emit(
                &mut core.stamp(),
                Payload::Segment(SegmentRecord {
                    base,
                    end,
                    object_type,
                }),
                scope,
            );
            Ok(())
        })
    }

    /// Lock `lock` named `name` was acquired at `pc`, shared if `read`.
    ///
    /// # Errors
    ///
    /// Only halt faults from an earlier violation.
    pub fn lock_acquire(
        &self,
        core: &mut CoreContext,
        pc: u64,
        lock: u64,
        name: &str,
        read: bool,
    ) -> TraceResult {
        self.run(core, |core| {
            self.emit_lock(&mut core.stamp(), pc, lock, name, false, read);
            Ok(())
        })
    }

    /// Lock `lock` named `name` was released at `pc`.
    ///
    /// # Errors
    ///
    /// Only halt faults from an earlier violation.
    pub fn lock_release(&self, core: &mut CoreContext, pc: u64, lock: u64, name: &str) -> TraceResult {
        self.run(core, |core| {
            self.emit_lock(&mut core.stamp(), pc, lock, name, true, false);
            Ok(())
        })
    }

    /// A direct call from `return_pc` to `target_pc`.
    ///
    /// # Errors
    ///
    /// Only halt faults from an earlier violation.
    pub fn record_call(
        &self,
        core: &mut CoreContext,
        target_pc: u64,
        return_pc: u64,
        ret: i32,
    ) -> TraceResult {
        self.run(core, |core| {
            self.emit(
                &mut core.stamp(),
                Payload::Call(CallRecord {
                    target_pc,
                    return_pc,
                    ret,
                }),
                CoreScope::AllCores,
            );
            Ok(())
        })
    }

    /// A memory access at `addr` from `pc`.
    ///
    /// Emitted only while [`should_record_access`](Tracer::should_record_access)
    /// holds for the core; returns whether a record was emitted.
    ///
    /// # Errors
    ///
    /// Only halt faults from an earlier violation.
    pub fn record_access(
        &self,
        core: &mut CoreContext,
        access_type: AccessType,
        pc: u64,
        addr: u64,
    ) -> TraceResult<bool> {
        self.run(core, |core| {
            if !self.should_record_access(core.id()) {
                return Ok(false);
            }
            self.emit(
                &mut core.stamp(),
                Payload::Access(AccessRecord {
                    access_type,
                    pc,
                    host_addr: 0,
                    guest_addr: addr,
                }),
                CoreScope::AllCores,
            );
            Ok(true)
        })
    }

    /// Turn a switch class on or off and announce it.
    ///
    /// The flag change and its record happen under the owning lock, so
    /// concurrent requests from different cores are recorded in the order
    /// they took effect.
    ///
    /// # Errors
    ///
    /// Only halt faults from an earlier violation.
    pub fn set_enabled(
        &self,
        core: &mut CoreContext,
        scope: EnableScope<'_>,
        enabled: bool,
    ) -> TraceResult {
        self.run(core, |core| {
            let _owner = self.enable_state().lock();
            let mut stamp = core.stamp();
            match scope {
                EnableScope::AllCores(description) => {
                    let scope = self.text(description);
                    self.enable_state().set_access_all(enabled);
                    self.emit(
                        &mut stamp,
                        Payload::Enable(EnableRecord::AccessAllCores { enabled, scope }),
                        CoreScope::AllCores,
                    );
                }
                EnableScope::ThisCore => {
                    let this_core = stamp.core;
                    self.enable_state().set_access_core(this_core, enabled);
                    self.emit(
                        &mut stamp,
                        Payload::Enable(EnableRecord::AccessCore {
                            enabled,
                            core: u64::from(this_core),
                        }),
                        CoreScope::AllCores,
                    );
                }
                EnableScope::CallClass => self.set_call_window(&mut stamp, enabled),
            }
            Ok(())
        })
    }

    /// True if hook glue should record memory accesses on `core` now.
    ///
    /// False on a halted tracer or core. Does not mask interrupts; the answer
    /// may be stale by the time the caller acts on it, which only costs one
    /// access record either way.
    pub fn should_record_access(&self, core: u16) -> bool {
        !self.is_halted()
            && !self.is_core_halted(core)
            && self
                .enable_state()
                .should_record_access(core, self.config().require_call_window)
    }

    fn text(&self, s: &str) -> FixedText {
        let (text, truncated) = FixedText::truncating(s);
        self.counters().record_truncation(truncated);
        text
    }

    fn emit_task(&self, stamp: &mut Stamp<'_>, thread: &ThreadContext, event: TaskEvent) {
        self.emit(
            stamp,
            Payload::Task(TaskRecord {
                tid: thread.tid(),
                tgid: thread.tgid(),
                event,
                description: *thread.description(),
            }),
            CoreScope::AllCores,
        );
    }

    fn emit_label(
        &self,
        stamp: &mut Stamp<'_>,
        label_type: LabelType,
        addr: u64,
        bytes: u64,
        text: FixedText,
        pc: u64,
    ) {
        self.emit(
            stamp,
            Payload::Label(LabelRecord {
                host_addr: 0,
                label_type,
                text,
                guest_addr: addr,
                bytes,
                pc,
            }),
            CoreScope::Unscoped,
        );
    }

    fn emit_lock(
        &self,
        stamp: &mut Stamp<'_>,
        pc: u64,
        lock: u64,
        name: &str,
        release: bool,
        read: bool,
    ) {
        let name = self.text(name);
        self.emit(
            stamp,
            Payload::Lock(LockRecord {
                pc,
                lock,
                name,
                release,
                read,
            }),
            CoreScope::AllCores,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TracerConfig;
    use crate::sink::RingSink;
    use crate::{ExecutionContext, TraceFault};
    use guesttrace_record::Record;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn setup() -> Result<(Tracer<RingSink>, CoreContext), crate::TracerError> {
        let tracer = Tracer::new(TracerConfig::default(), RingSink::new())?;
        let core = tracer.core_context(0)?;
        Ok((tracer, core))
    }

    fn drain(tracer: &Tracer<RingSink>) -> Result<Vec<Record>, guesttrace_record::RecordError> {
        tracer.sink().drain_decoded()
    }

    #[test]
    fn test_thread_lifecycle_records() -> TestResult {
        let (tracer, mut core) = setup()?;
        let mut thread = ThreadContext::new(100, 100, "sh");

        tracer.thread_init(&mut core, &mut thread)?;
        tracer.thread_update(&mut core, &mut thread, 100, "/bin/ls -l")?;
        tracer.enter(&mut core, &mut thread, 0x1000)?;
        tracer.enter(&mut core, &mut thread, 0x2000)?;
        let closed = tracer.thread_exit(&mut core, &mut thread)?;
        assert_eq!(closed, 2);
        assert!(thread.stack().is_empty());

        let records = drain(&tracer)?;
        let tasks: Vec<(TaskEvent, String)> = records
            .iter()
            .filter_map(|r| match r.payload {
                Payload::Task(t) => Some((t.event, t.description.as_str().to_string())),
                _ => None,
            })
            .collect();
        assert_eq!(
            tasks,
            vec![
                (TaskEvent::Init, "sh".to_string()),
                (TaskEvent::Update, "/bin/ls -l".to_string()),
                (TaskEvent::Exit, "/bin/ls -l".to_string()),
            ]
        );

        // The exit record comes after both done records.
        let last = records.last().map(|r| r.payload);
        assert!(matches!(
            last,
            Some(Payload::Task(TaskRecord {
                event: TaskEvent::Exit,
                ..
            }))
        ));
        Ok(())
    }

    #[test]
    fn test_thread_init_resets_stack() -> TestResult {
        let (tracer, mut core) = setup()?;
        let mut thread = ThreadContext::new(1, 1, "t");
        tracer.enter(&mut core, &mut thread, 0x1000)?;
        tracer.thread_init(&mut core, &mut thread)?;
        assert!(thread.stack().is_empty());
        Ok(())
    }

    #[test]
    fn test_label_register_and_release() -> TestResult {
        let (tracer, mut core) = setup()?;
        tracer.label_register(&mut core, LabelType::Heap, 0x8000, 64, "kmalloc-64", 0x4242)?;
        tracer.label_release(&mut core, LabelType::Heap, 0x8000)?;

        let entries = tracer.sink().drain();
        assert_eq!(entries[0].scope, CoreScope::Unscoped);
        let labels: Vec<LabelRecord> = entries
            .iter()
            .filter_map(|e| match e.record.decode().ok()?.payload {
                Payload::Label(l) => Some(l),
                _ => None,
            })
            .collect();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].bytes, 64);
        assert_eq!(labels[0].text.as_str(), "kmalloc-64");
        assert_eq!(labels[0].pc, 0x4242);
        assert_eq!(labels[1].bytes, 0);
        assert!(labels[1].text.is_empty());
        Ok(())
    }

    #[test]
    fn test_long_lock_name_truncated_and_counted() -> TestResult {
        let (tracer, mut core) = setup()?;
        let name = "a-forty-character-lock-name-for-testing!";
        assert_eq!(name.len(), 40);

        tracer.lock_acquire(&mut core, 0x10, 0x20, name, true)?;
        tracer.lock_release(&mut core, 0x11, 0x20, name)?;

        let records = drain(&tracer)?;
        let Payload::Lock(acquire) = records[0].payload else {
            return Err("expected lock record".into());
        };
        assert_eq!(acquire.name.as_str(), &name[..31]);
        assert!(acquire.read);
        assert!(!acquire.release);
        let Payload::Lock(release) = records[1].payload else {
            return Err("expected lock record".into());
        };
        assert!(release.release);
        assert!(!release.read);
        assert_eq!(tracer.metrics().text_truncations, 2);
        Ok(())
    }

    #[test]
    fn test_segment_scope_is_passed_through() -> TestResult {
        let (tracer, mut core) = setup()?;
        tracer.segment_register(&mut core, 0x1000, 0x2000, LabelType::PerCore, CoreScope::Core(0))?;
        tracer.segment_register(&mut core, 0x3000, 0x4000, LabelType::Static, CoreScope::AllCores)?;

        let scopes: Vec<CoreScope> = tracer.sink().drain().iter().map(|e| e.scope).collect();
        assert_eq!(scopes, vec![CoreScope::Core(0), CoreScope::AllCores]);
        Ok(())
    }

    #[test]
    fn test_access_gated_by_enable_and_call_window() -> TestResult {
        let (tracer, mut core) = setup()?;
        let mut thread = ThreadContext::new(1, 1, "t");

        assert!(!tracer.record_access(&mut core, AccessType::Load, 0x1, 0x100)?);

        tracer.set_enabled(&mut core, EnableScope::AllCores("all"), true)?;
        // No running call extent yet.
        assert!(!tracer.record_access(&mut core, AccessType::Load, 0x1, 0x100)?);

        tracer.enter(&mut core, &mut thread, 0x1000)?;
        assert!(tracer.record_access(&mut core, AccessType::Store, 0x2, 0x200)?);

        tracer.pause(&mut core, ExecutionContext::Thread(&mut thread))?;
        assert!(!tracer.record_access(&mut core, AccessType::Store, 0x3, 0x300)?);
        Ok(())
    }

    #[test]
    fn test_access_without_call_window_requirement() -> TestResult {
        let config = TracerConfig::builder().require_call_window(false).build()?;
        let tracer = Tracer::new(config, RingSink::new())?;
        let mut core = tracer.core_context(1)?;

        tracer.set_enabled(&mut core, EnableScope::ThisCore, true)?;
        assert!(tracer.record_access(&mut core, AccessType::IoWrite, 0x1, 0x100)?);
        assert!(!tracer.should_record_access(0));
        Ok(())
    }

    #[test]
    fn test_set_enabled_records() -> TestResult {
        let (tracer, mut core) = setup()?;
        tracer.set_enabled(&mut core, EnableScope::AllCores("fork benchmark"), true)?;
        tracer.set_enabled(&mut core, EnableScope::ThisCore, false)?;
        tracer.set_enabled(&mut core, EnableScope::CallClass, true)?;

        let payloads: Vec<Payload> = drain(&tracer)?.iter().map(|r| r.payload).collect();
        assert_eq!(
            payloads,
            vec![
                Payload::Enable(EnableRecord::AccessAllCores {
                    enabled: true,
                    scope: FixedText::new("fork benchmark"),
                }),
                Payload::Enable(EnableRecord::AccessCore {
                    enabled: false,
                    core: 0
                }),
                Payload::Enable(EnableRecord::CallCore {
                    enabled: true,
                    core: 0
                }),
            ]
        );
        assert!(tracer.enable_state().access_all());
        assert!(tracer.enable_state().call_window(0));
        Ok(())
    }

    #[test]
    fn test_hooks_refuse_on_halted_core() -> TestResult {
        let (tracer, mut core) = setup()?;
        let mut thread = ThreadContext::new(1, 1, "t");
        assert_eq!(
            tracer.exit(&mut core, &mut thread),
            Err(TraceFault::StackUnderflow)
        );
        assert_eq!(
            tracer.record_call(&mut core, 0x1, 0x2, 0),
            Err(TraceFault::CoreHalted)
        );
        assert!(tracer.sink().is_empty());
        Ok(())
    }

    #[test]
    fn test_set_enabled_this_core_uses_calling_core() -> TestResult {
        let tracer = Tracer::new(TracerConfig::default(), RingSink::new())?;
        let mut core = tracer.core_context(6)?;
        tracer.set_enabled(&mut core, EnableScope::ThisCore, true)?;

        assert!(tracer.enable_state().access_core(6));
        assert!(!tracer.enable_state().access_core(0));
        let records = drain(&tracer)?;
        assert_eq!(records[0].header.core_id, 6);
        assert_eq!(
            records[0].payload,
            Payload::Enable(EnableRecord::AccessCore {
                enabled: true,
                core: 6
            })
        );
        Ok(())
    }

    #[test]
    fn test_halted_core_closes_access_gate() -> TestResult {
        let (tracer, mut core) = setup()?;
        let mut thread = ThreadContext::new(1, 1, "t");
        tracer.set_enabled(&mut core, EnableScope::AllCores("all"), true)?;
        tracer.enter(&mut core, &mut thread, 0x1000)?;
        assert!(tracer.should_record_access(0));

        for pc in 1..crate::CALL_STACK_DEPTH as u64 {
            tracer.enter(&mut core, &mut thread, pc)?;
        }
        assert_eq!(
            tracer.enter(&mut core, &mut thread, 0xdead),
            Err(TraceFault::StackOverflow)
        );
        assert!(!tracer.is_halted());
        assert!(!tracer.should_record_access(0));
        assert_eq!(
            crate::record_access_if_enabled!(tracer, core, AccessType::Load, 0x1, 0x100),
            Ok(false)
        );
        Ok(())
    }
}
