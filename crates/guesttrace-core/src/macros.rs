//! Convenience macros for hook glue

/// Run a block inside a call extent on a thread's stack.
///
/// Opens the extent at `$pc`, evaluates `$body`, then closes the extent.
/// Evaluates to `(body_value, TraceResult<()>)`; the body always runs, even
/// if the tracer refused to open the extent.
///
/// # Example
///
/// ```rust
/// use guesttrace_core::{NullSink, ThreadContext, Tracer, TracerConfig, traced};
///
/// let tracer = Tracer::new(TracerConfig::default(), NullSink)?;
/// let mut core = tracer.core_context(0)?;
/// let mut thread = ThreadContext::new(1, 1, "worker");
///
/// let (sum, traced) = traced!(tracer, core, thread, 0x4000, { 2 + 2 });
/// assert_eq!(sum, 4);
/// assert!(traced.is_ok());
/// assert!(thread.stack().is_empty());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[macro_export]
macro_rules! traced {
    ($tracer:expr, $core:expr, $thread:expr, $pc:expr, $body:block) => {{
        let entered = $tracer.enter(&mut $core, &mut $thread, $pc);
        let value = $body;
        let status = match entered {
            ::core::result::Result::Ok(_) => $tracer.exit(&mut $core, &mut $thread).map(|_| ()),
            ::core::result::Result::Err(fault) => ::core::result::Result::Err(fault),
        };
        (value, status)
    }};
}

/// Record a memory access only when the core's access gate is open.
///
/// Skips evaluating the address expressions entirely when it is closed.
///
/// # Example
///
/// ```rust
/// use guesttrace_core::{AccessType, NullSink, Tracer, TracerConfig, record_access_if_enabled};
///
/// let tracer = Tracer::new(TracerConfig::default(), NullSink)?;
/// let mut core = tracer.core_context(0)?;
///
/// let recorded = record_access_if_enabled!(tracer, core, AccessType::Load, 0x10, 0x2000);
/// assert_eq!(recorded, Ok(false));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[macro_export]
macro_rules! record_access_if_enabled {
    ($tracer:expr, $core:expr, $access_type:expr, $pc:expr, $addr:expr) => {
        if $tracer.should_record_access($core.id()) {
            $tracer.record_access(&mut $core, $access_type, $pc, $addr)
        } else {
            ::core::result::Result::<bool, $crate::TraceFault>::Ok(false)
        }
    };
}
