//! The tracer: shared state plus record emission and fault handling.
//!
//! Call-stack operations live in [`crate::tracker`], context transitions in
//! [`crate::router`] and the collaborator notifications in [`crate::hooks`];
//! all of them are `impl` blocks on [`Tracer`].

use core::sync::atomic::{AtomicBool, Ordering};

use guesttrace_record::{CallState, EnableRecord, FcallRecord, Payload};

use crate::config::{FaultPolicy, TracerConfig};
use crate::context::{CoreContext, Stamp};
use crate::enable::EnableState;
use crate::error::{TraceFault, TraceResult, TracerError, TracerResult};
use crate::irq::{HostInterrupts, InterruptMask};
use crate::metrics::{TracerCounters, TracerSnapshot};
use crate::sink::{CoreScope, TransportSink};
use crate::stack::CallFrame;
use crate::tag::{MAX_CORES, TagAllocator};

/// Execution tracer.
///
/// One instance is shared by every core. Per-core and per-thread state is
/// not stored here; it is passed into each call as a [`CoreContext`] and,
/// where relevant, a [`ThreadContext`](crate::ThreadContext).
///
/// # Example
///
/// ```rust
/// use guesttrace_core::{ExecutionContext, RingSink, ThreadContext, Tracer, TracerConfig};
///
/// let tracer = Tracer::new(TracerConfig::default(), RingSink::new())?;
/// let mut core = tracer.core_context(0)?;
/// let mut thread = ThreadContext::new(1, 1, "init");
///
/// let tag = tracer.push(&mut core, ExecutionContext::Thread(&mut thread), 0x1000)?;
/// assert_eq!(tag.core(), 0);
/// tracer.pop(&mut core, ExecutionContext::Thread(&mut thread))?;
/// assert!(thread.stack().is_empty());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Tracer<S, M = HostInterrupts> {
    config: TracerConfig,
    sink: S,
    mask: M,
    tags: TagAllocator,
    enable: EnableState,
    counters: TracerCounters,
    halted: AtomicBool,
    cores: [CoreSlot; MAX_CORES],
}

/// Shared per-core flags: whether the context was handed out, and a mirror
/// of its halt latch readable without the context.
#[derive(Debug, Default)]
struct CoreSlot {
    claimed: AtomicBool,
    halted: AtomicBool,
}

impl<S: TransportSink> Tracer<S> {
    /// Create a tracer for hosted use.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid.
    pub fn new(config: TracerConfig, sink: S) -> TracerResult<Self> {
        Self::with_interrupts(config, sink, HostInterrupts)
    }
}

impl<S: TransportSink, M: InterruptMask> Tracer<S, M> {
    /// Create a tracer that masks interrupts through `mask`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid.
    pub fn with_interrupts(config: TracerConfig, sink: S, mask: M) -> TracerResult<Self> {
        config.validate()?;

        tracing::info!(
            max_cores = config.max_cores,
            fault_depth_cap = config.fault_depth_cap,
            fault_policy = ?config.fault_policy,
            sink_available = sink.is_available(),
            "Tracer created"
        );

        Ok(Self {
            config,
            sink,
            mask,
            tags: TagAllocator::new(),
            enable: EnableState::new(),
            counters: TracerCounters::new(),
            halted: AtomicBool::new(false),
            cores: core::array::from_fn(|_| CoreSlot::default()),
        })
    }

    /// Create the context for core `id`.
    ///
    /// Call once per core at bring-up and keep the result in per-core
    /// storage. Each id is handed out at most once per tracer, so a core
    /// has a single record counter and interrupt stack.
    ///
    /// # Errors
    ///
    /// - [`TracerError::CoreOutOfRange`] if `id >= max_cores`
    /// - [`TracerError::CoreAlreadyClaimed`] if `id` was handed out before
    pub fn core_context(&self, id: u16) -> TracerResult<CoreContext> {
        let slot = self
            .slot(id)
            .filter(|_| id < self.config.max_cores)
            .ok_or(TracerError::CoreOutOfRange {
                core: id,
                max_cores: self.config.max_cores,
            })?;
        if slot.claimed.swap(true, Ordering::AcqRel) {
            return Err(TracerError::CoreAlreadyClaimed { core: id });
        }
        Ok(CoreContext::new(id))
    }

    /// Active configuration.
    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    /// The transport sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Health counters.
    pub fn counters(&self) -> &TracerCounters {
        &self.counters
    }

    /// Snapshot of the health counters.
    #[must_use]
    pub fn metrics(&self) -> TracerSnapshot {
        self.counters.snapshot()
    }

    /// Process-wide enable flags.
    pub fn enable_state(&self) -> &EnableState {
        &self.enable
    }

    /// True once a fault halted tracing everywhere.
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// True once a fault halted tracing on `core`.
    ///
    /// Unknown core ids read as not halted.
    pub fn is_core_halted(&self, core: u16) -> bool {
        self.slot(core)
            .is_some_and(|slot| slot.halted.load(Ordering::Acquire))
    }

    fn slot(&self, core: u16) -> Option<&CoreSlot> {
        self.cores.get(usize::from(core))
    }

    /// Run one operation for `core` with local interrupts masked.
    ///
    /// Refuses to start on a halted core or tracer. A protocol violation
    /// returned by `op` latches a halt per [`FaultPolicy`].
    pub(crate) fn run<R>(
        &self,
        core: &mut CoreContext,
        op: impl FnOnce(&mut CoreContext) -> TraceResult<R>,
    ) -> TraceResult<R> {
        self.mask.without_interrupts(|| {
            if self.is_halted() {
                return Err(TraceFault::TracerHalted);
            }
            if core.is_halted() {
                return Err(TraceFault::CoreHalted);
            }
            op(core).map_err(|fault| self.fault(core, fault))
        })
    }

    fn fault(&self, core: &mut CoreContext, fault: TraceFault) -> TraceFault {
        if !fault.is_protocol_violation() {
            return fault;
        }

        self.counters.inc_fault();
        core.halt();
        if let Some(slot) = self.slot(core.id()) {
            slot.halted.store(true, Ordering::Release);
        }
        self.enable.set_call_window(core.id(), false);
        match self.config.fault_policy {
            FaultPolicy::HaltCore => {
                tracing::error!(
                    core = core.id(),
                    fault_code = fault.code(),
                    fault = %fault,
                    "Tracing halted on core"
                );
            }
            FaultPolicy::HaltTracer => {
                self.halted.store(true, Ordering::Release);
                tracing::error!(
                    core = core.id(),
                    fault_code = fault.code(),
                    fault = %fault,
                    "Tracing halted on all cores"
                );
            }
        }
        fault
    }

    /// Encode `payload` with the next header stamp and hand it to the sink.
    pub(crate) fn emit(&self, stamp: &mut Stamp<'_>, payload: Payload, scope: CoreScope) {
        let record = payload.encode(stamp.core, stamp.advance());
        if self.sink.emit(&record, scope) {
            self.counters.inc_records_emitted();
        } else {
            self.counters.inc_records_dropped();
        }
    }

    /// Emit one fcall transition for `frame` at stack slot `depth`.
    pub(crate) fn emit_fcall(
        &self,
        stamp: &mut Stamp<'_>,
        tid: u64,
        frame: &CallFrame,
        depth: usize,
        state: CallState,
    ) {
        self.counters.inc_call_transition();
        self.emit(
            stamp,
            Payload::Fcall(FcallRecord {
                tid,
                pc: frame.pc,
                tag: frame.tag.raw(),
                depth: u16::try_from(depth).unwrap_or(u16::MAX),
                state,
            }),
            CoreScope::AllCores,
        );
    }

    /// Open or close the calling core's call window and announce it.
    pub(crate) fn set_call_window(&self, stamp: &mut Stamp<'_>, open: bool) {
        let core = stamp.core;
        self.enable.set_call_window(core, open);
        self.emit(
            stamp,
            Payload::Enable(EnableRecord::CallCore {
                enabled: open,
                core: u64::from(core),
            }),
            CoreScope::AllCores,
        );
    }

    /// Announce the calling core's call window without changing it.
    pub(crate) fn repeat_call_window(&self, stamp: &mut Stamp<'_>) {
        let open = self.enable.call_window(stamp.core);
        self.set_call_window(stamp, open);
    }

    pub(crate) fn tags(&self) -> &TagAllocator {
        &self.tags
    }
}
