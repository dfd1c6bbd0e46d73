//! Local interrupt masking.
//!
//! Every tracker and router operation runs inside exactly one
//! [`InterruptMask::without_interrupts`] call, which makes it atomic with
//! respect to interrupts on the calling core. No cross-core lock is involved.

/// Disables local interrupts for the duration of a closure.
///
/// Implementations must restore the previous interrupt state on return and
/// must tolerate being nested (an interrupt handler calling into the tracer
/// already runs with interrupts off).
pub trait InterruptMask: Send + Sync {
    /// Run `f` with local interrupts disabled.
    fn without_interrupts<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R;
}

/// Mask for hosted builds and tests.
///
/// Does nothing: `&mut` exclusivity on the core and thread contexts already
/// serializes every operation on a simulated core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostInterrupts;

impl InterruptMask for HostInterrupts {
    #[inline]
    fn without_interrupts<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        f()
    }
}

impl<M: InterruptMask> InterruptMask for &M {
    #[inline]
    fn without_interrupts<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        (**self).without_interrupts(f)
    }
}

impl<M: InterruptMask> InterruptMask for std::sync::Arc<M> {
    #[inline]
    fn without_interrupts<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        (**self).without_interrupts(f)
    }
}
