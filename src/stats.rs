//! Allocation statistics counters.
//!
//! All counters use `Relaxed` ordering; they are observational only, not
//! synchronization primitives. The pool's own mutex provides the ordering
//! guarantees for correctness; these exist purely for monitoring.
//!
//! Obtain a [`Snapshot`] with [`snapshot()`]. Individual counter loads are
//! atomic but the snapshot as a whole is not globally consistent.

use core::sync::atomic::{AtomicU64, Ordering};

pub(crate) struct Stats {
    // ---- Realtime paths ----
    /// Successful pool allocations.
    pub alloc_count: AtomicU64,
    /// Pool allocations that found the free list empty.
    pub alloc_failures: AtomicU64,
    /// Pool deallocations.
    pub dealloc_count: AtomicU64,
    /// Blocks moved from the staging list onto the free list.
    pub blocks_adopted: AtomicU64,
    /// Blocks moved off the free list into staging (above the high mark).
    pub blocks_spilled: AtomicU64,
    /// `try_lock` attempts on the realtime path that lost to the replenisher.
    pub trylock_misses: AtomicU64,

    // ---- Dispatcher ----
    /// Requests larger than the largest size class.
    pub oversize_rejects: AtomicU64,
    /// Requests that routed to a class whose free list was empty.
    pub class_exhausted: AtomicU64,

    // ---- Non-realtime / OS ----
    /// Replenish passes.
    pub replenish_count: AtomicU64,
    /// Blocks obtained from the OS heap.
    pub os_alloc_count: AtomicU64,
    /// Bytes obtained from the OS heap.
    pub os_alloc_bytes: AtomicU64,
    /// Blocks returned to the OS heap.
    pub os_free_count: AtomicU64,
}

impl Stats {
    const fn new() -> Self {
        Self {
            alloc_count: AtomicU64::new(0),
            alloc_failures: AtomicU64::new(0),
            dealloc_count: AtomicU64::new(0),
            blocks_adopted: AtomicU64::new(0),
            blocks_spilled: AtomicU64::new(0),
            trylock_misses: AtomicU64::new(0),
            oversize_rejects: AtomicU64::new(0),
            class_exhausted: AtomicU64::new(0),
            replenish_count: AtomicU64::new(0),
            os_alloc_count: AtomicU64::new(0),
            os_alloc_bytes: AtomicU64::new(0),
            os_free_count: AtomicU64::new(0),
        }
    }
}

pub(crate) static STATS: Stats = Stats::new();

/// A point-in-time snapshot of all statistics counters.
#[derive(Clone, Copy, Debug, Default)]
pub struct Snapshot {
    pub alloc_count: u64,
    pub alloc_failures: u64,
    pub dealloc_count: u64,
    pub blocks_adopted: u64,
    pub blocks_spilled: u64,
    pub trylock_misses: u64,
    pub oversize_rejects: u64,
    pub class_exhausted: u64,
    pub replenish_count: u64,
    pub os_alloc_count: u64,
    pub os_alloc_bytes: u64,
    pub os_free_count: u64,
}

/// Load all counters with `Relaxed` ordering and return a [`Snapshot`].
pub fn snapshot() -> Snapshot {
    let s = &STATS;
    Snapshot {
        alloc_count: s.alloc_count.load(Ordering::Relaxed),
        alloc_failures: s.alloc_failures.load(Ordering::Relaxed),
        dealloc_count: s.dealloc_count.load(Ordering::Relaxed),
        blocks_adopted: s.blocks_adopted.load(Ordering::Relaxed),
        blocks_spilled: s.blocks_spilled.load(Ordering::Relaxed),
        trylock_misses: s.trylock_misses.load(Ordering::Relaxed),
        oversize_rejects: s.oversize_rejects.load(Ordering::Relaxed),
        class_exhausted: s.class_exhausted.load(Ordering::Relaxed),
        replenish_count: s.replenish_count.load(Ordering::Relaxed),
        os_alloc_count: s.os_alloc_count.load(Ordering::Relaxed),
        os_alloc_bytes: s.os_alloc_bytes.load(Ordering::Relaxed),
        os_free_count: s.os_free_count.load(Ordering::Relaxed),
    }
}
