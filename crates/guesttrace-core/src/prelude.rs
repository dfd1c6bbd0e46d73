//! Prelude for guesttrace-core
//!
//! Re-exports the tracer, its contexts and sinks, the record enums hook glue
//! passes in, and the macros.
//!
//! ```rust
//! use guesttrace_core::prelude::*;
//!
//! let tracer = Tracer::new(TracerConfig::default(), RingSink::new())?;
//! let mut core = tracer.core_context(0)?;
//! tracer.label_register(&mut core, LabelType::Heap, 0x1000, 32, "kmalloc-32", 0)?;
//! assert_eq!(tracer.sink().len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use crate::{
    AccessType, CallFrame, CallStack, CallTag, CoreContext, CoreScope, EnableScope,
    ExecutionContext, FaultPolicy, HostInterrupts, InterruptMask, LabelType, LogSink, NullSink,
    RingSink, RunningContext, ThreadContext, TraceFault, TraceResult, Tracer, TracerConfig,
    TracerCounters, TracerError, TracerSnapshot, TransportSink, record_access_if_enabled, traced,
};

#[cfg(all(feature = "trap", target_arch = "x86_64"))]
pub use crate::TrapSink;
