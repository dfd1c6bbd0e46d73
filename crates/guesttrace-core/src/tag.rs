//! Globally unique call tags.
//!
//! A tag packs a per-core sequence number into its low 60 bits and the core
//! id into its high 4 bits. Each core bumps only its own counter, so tags are
//! unique across cores without any cross-core synchronization.
//!
//! # RT Safety
//!
//! [`TagAllocator::next_tag`] is a single relaxed `fetch_add` on a
//! cache-line-padded counter plus a bounds check. A thread and an interrupt
//! on the same core can never observe the same value.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use crossbeam::utils::CachePadded;

use crate::error::{TraceFault, TraceResult};

/// Bits of a tag reserved for the core id.
pub const CORE_BITS: u32 = 4;

/// Largest supported core count.
pub const MAX_CORES: usize = 1 << CORE_BITS;

/// Shift of the core id inside a tag.
pub const TAG_SHIFT: u32 = u64::BITS - CORE_BITS;

/// Mask of the sequence bits.
pub const SEQUENCE_MASK: u64 = (1 << TAG_SHIFT) - 1;

/// A globally unique call extent identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CallTag(u64);

impl CallTag {
    /// Compose a tag from a core id and sequence number.
    ///
    /// Out-of-range parts are masked, never shifted into each other.
    #[must_use]
    pub const fn from_parts(core: u16, sequence: u64) -> Self {
        let core = (core as u64) & ((1 << CORE_BITS) - 1);
        Self((core << TAG_SHIFT) | (sequence & SEQUENCE_MASK))
    }

    /// Wrap a raw tag value, e.g. one read back from a record.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw 64-bit value as written to records.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Core that issued the tag.
    #[inline]
    #[must_use]
    pub const fn core(self) -> u16 {
        (self.0 >> TAG_SHIFT) as u16
    }

    /// Per-core sequence number.
    #[inline]
    #[must_use]
    pub const fn sequence(self) -> u64 {
        self.0 & SEQUENCE_MASK
    }
}

impl fmt::Debug for CallTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallTag({}:{})", self.core(), self.sequence())
    }
}

impl fmt::Display for CallTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Per-core call tag counters.
///
/// One cache-line-padded counter per possible core. Counters start at zero,
/// so the first tag issued on a core has sequence 1.
#[derive(Debug)]
pub struct TagAllocator {
    counters: [CachePadded<AtomicU64>; MAX_CORES],
}

impl Default for TagAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl TagAllocator {
    /// Create an allocator with every counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counters: core::array::from_fn(|_| CachePadded::new(AtomicU64::new(0))),
        }
    }

    /// Issue the next tag for `core`.
    ///
    /// # Errors
    ///
    /// - [`TraceFault::CoreOutOfRange`] if `core >= MAX_CORES`
    /// - [`TraceFault::TagSpaceExhausted`] if the sequence would spill into
    ///   the core-id bits; the counter is left saturated so every later call
    ///   fails the same way instead of wrapping into a colliding tag
    pub fn next_tag(&self, core: u16) -> TraceResult<CallTag> {
        let counter = self
            .counters
            .get(usize::from(core))
            .ok_or(TraceFault::CoreOutOfRange)?;

        let previous = counter.fetch_add(1, Ordering::Relaxed);
        let sequence = previous.wrapping_add(1);
        if sequence & !SEQUENCE_MASK != 0 {
            counter.store(SEQUENCE_MASK.wrapping_add(1), Ordering::Relaxed);
            return Err(TraceFault::TagSpaceExhausted);
        }

        Ok(CallTag::from_parts(core, sequence))
    }

    /// Last sequence number issued on `core`, 0 if none.
    #[must_use]
    pub fn issued(&self, core: u16) -> u64 {
        self.counters
            .get(usize::from(core))
            .map_or(0, |c| c.load(Ordering::Relaxed).min(SEQUENCE_MASK))
    }

    #[cfg(test)]
    fn preload(&self, core: u16, sequence: u64) {
        if let Some(c) = self.counters.get(usize::from(core)) {
            c.store(sequence, Ordering::Relaxed);
        }
    }
}
