//! Call-stack tagging and trace record emission
//!
//! This crate tracks nested call extents per execution context and reports
//! every transition to an external observer as a fixed binary record:
//! - **Threads** each own a bounded [`CallStack`] inside a [`ThreadContext`]
//! - **Interrupts** use one extra stack per core inside its [`CoreContext`]
//! - **Tags** ([`CallTag`]) are globally unique without cross-core locking
//! - **Records** are encoded by `guesttrace-record` and handed to a
//!   [`TransportSink`]
//!
//! # Guarantees
//!
//! - No allocation and no blocking on any tracing path
//! - Every operation runs with local interrupts masked via [`InterruptMask`]
//! - At most one frame per core is running at any instant
//! - Protocol violations (stack overflow/underflow, tag exhaustion) halt
//!   tracing instead of panicking or corrupting state
//!
//! # Example
//!
//! ```rust
//! use guesttrace_core::{RingSink, ThreadContext, Tracer, TracerConfig};
//! use guesttrace_record::CallState;
//!
//! let tracer = Tracer::new(TracerConfig::default(), RingSink::new())?;
//! let mut core = tracer.core_context(0)?;
//! let mut thread = ThreadContext::new(42, 42, "worker");
//!
//! tracer.enter(&mut core, &mut thread, 0x1000)?;
//! tracer.irq_enter(&mut core, Some(&thread), 0xfee0)?;
//! tracer.irq_exit(&mut core, Some(&thread))?;
//! tracer.exit(&mut core, &mut thread)?;
//!
//! let states: Vec<CallState> = tracer
//!     .sink()
//!     .drain_decoded()?
//!     .iter()
//!     .filter_map(|r| r.as_fcall().map(|f| f.state))
//!     .collect();
//! assert_eq!(
//!     states,
//!     [
//!         CallState::Start,  // worker
//!         CallState::Pause,  // worker
//!         CallState::Start,  // handler
//!         CallState::Done,   // handler
//!         CallState::Resume, // worker
//!         CallState::Done,   // worker
//!     ]
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod context;
pub mod enable;
pub mod error;
pub mod hooks;
pub mod irq;
pub mod macros;
pub mod metrics;
pub mod prelude;
pub mod router;
pub mod sink;
pub mod stack;
pub mod tag;
pub mod tracer;
pub mod tracker;

pub use config::{FaultPolicy, TracerConfig, TracerConfigBuilder};
pub use context::{CoreContext, ExecutionContext, RunningContext, ThreadContext};
pub use enable::{EnableScope, EnableState};
pub use error::{TraceFault, TraceResult, TracerError, TracerResult};
pub use irq::{HostInterrupts, InterruptMask};
pub use metrics::{TracerCounters, TracerSnapshot};
pub use sink::{CoreScope, LogSink, NullSink, RingEntry, RingSink, TransportSink};
pub use stack::{CALL_STACK_DEPTH, CallFrame, CallStack};
pub use tag::{CORE_BITS, CallTag, MAX_CORES, TAG_SHIFT, TagAllocator};
pub use tracer::Tracer;

#[cfg(all(feature = "trap", target_arch = "x86_64"))]
#[cfg_attr(docsrs, doc(cfg(feature = "trap")))]
pub use sink::TrapSink;

pub use guesttrace_record::{AccessType, LabelType};
