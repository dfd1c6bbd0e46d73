//! Process-wide enable flags.
//!
//! Three switch classes gate access recording: an all-cores access switch,
//! one access switch per core, and one call window per core. The call
//! window is written only by its owning core as call extents open and
//! close. The access switches are written under [`EnableState::lock`] so
//! that the flag change and its enable record are ordered the same way for
//! every writer.

use core::sync::atomic::{AtomicBool, Ordering};

use crossbeam::utils::CachePadded;
use parking_lot::{Mutex, MutexGuard};

use crate::tag::MAX_CORES;

/// Target of an enable request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableScope<'a> {
    /// Access recording on every core, labelled with a scope string.
    AllCores(&'a str),
    /// Access recording on the calling core.
    ThisCore,
    /// The calling core's call window.
    CallClass,
}

/// Read-mostly enable flags shared by all cores.
#[derive(Debug)]
pub struct EnableState {
    access_all: AtomicBool,
    access_core: [AtomicBool; MAX_CORES],
    call_core: [CachePadded<AtomicBool>; MAX_CORES],
    owner: Mutex<()>,
}

impl Default for EnableState {
    fn default() -> Self {
        Self::new()
    }
}

impl EnableState {
    /// All switches off.
    #[must_use]
    pub fn new() -> Self {
        Self {
            access_all: AtomicBool::new(false),
            access_core: core::array::from_fn(|_| AtomicBool::new(false)),
            call_core: core::array::from_fn(|_| CachePadded::new(AtomicBool::new(false))),
            owner: Mutex::new(()),
        }
    }

    /// Owning lock for the access switches.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.owner.lock()
    }

    pub(crate) fn set_access_all(&self, enabled: bool) {
        self.access_all.store(enabled, Ordering::Release);
    }

    pub(crate) fn set_access_core(&self, core: u16, enabled: bool) {
        if let Some(flag) = self.access_core.get(usize::from(core)) {
            flag.store(enabled, Ordering::Release);
        }
    }

    pub(crate) fn set_call_window(&self, core: u16, open: bool) {
        if let Some(flag) = self.call_core.get(usize::from(core)) {
            flag.store(open, Ordering::Relaxed);
        }
    }

    /// True if access recording is on for every core.
    #[must_use]
    pub fn access_all(&self) -> bool {
        self.access_all.load(Ordering::Acquire)
    }

    /// True if access recording is on for `core` specifically.
    #[must_use]
    pub fn access_core(&self, core: u16) -> bool {
        self.access_core
            .get(usize::from(core))
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    /// True while `core` has a running call extent.
    #[must_use]
    pub fn call_window(&self, core: u16) -> bool {
        self.call_core
            .get(usize::from(core))
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Access gate: some access switch covers `core`, and, when
    /// `require_call_window` is set, `core` has a running call extent.
    #[must_use]
    pub fn should_record_access(&self, core: u16, require_call_window: bool) -> bool {
        (self.access_all() || self.access_core(core))
            && (!require_call_window || self.call_window(core))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_everything_off_by_default() {
        let state = EnableState::new();
        assert!(!state.access_all());
        assert!(!state.access_core(0));
        assert!(!state.call_window(0));
        assert!(!state.should_record_access(0, false));
    }

    #[test]
    fn test_access_gate() {
        let state = EnableState::new();
        state.set_access_all(true);
        assert!(state.should_record_access(3, false));
        assert!(!state.should_record_access(3, true));

        state.set_call_window(3, true);
        assert!(state.should_record_access(3, true));
        assert!(!state.should_record_access(4, true));
    }

    #[test]
    fn test_per_core_switch() {
        let state = EnableState::new();
        state.set_access_core(2, true);
        assert!(state.should_record_access(2, false));
        assert!(!state.should_record_access(1, false));
    }

    #[test]
    fn test_out_of_range_core_is_off() {
        let state = EnableState::new();
        state.set_access_core(99, true);
        state.set_call_window(99, true);
        assert!(!state.access_core(99));
        assert!(!state.call_window(99));
    }
}
