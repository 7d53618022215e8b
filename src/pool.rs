//! Single-size memory pool with a realtime / non-realtime split.
//!
//! The realtime side owns the free list outright: `allocate` pops its head
//! and `deallocate` pushes its tail, with no lock taken. The replenisher
//! owns a staging list behind a mutex, where it parks blocks fetched from
//! the OS and from where it drains surplus blocks back to the OS. The two
//! sides meet only through opportunistic `try_lock` work on the realtime
//! path: adopting staged blocks when the free list runs low, spilling
//! excess when it runs high, and publishing the free-list length into a
//! mirror counter the replenisher plans against.
//!
//! If the realtime side never wins the `try_lock`, nothing breaks: the
//! replenisher's view goes stale and it recovers on a later pass.

use core::cell::UnsafeCell;
use core::ptr;
use core::sync::atomic::{AtomicUsize, Ordering};

use alloc::boxed::Box;
use spin::Mutex;

use crate::block::{self, BlockList, BlockNode};
use crate::error::{Error, Result};
use crate::platform;
use crate::stat;

/// Replenisher-owned state. Guarded by [`Pool::staging`].
struct Staging {
    /// Blocks fetched from the OS but not yet visible to the realtime side.
    pending: BlockList,
    /// The realtime side's last published free-list length.
    mirror_free: usize,
}

/// A fixed-size block pool.
///
/// Created with [`Pool::new`], used through the realtime pair
/// [`allocate`](Pool::allocate) / [`deallocate`](Pool::deallocate) and the
/// non-realtime [`replenish`](Pool::replenish). With `thread_safe = true`
/// the replenisher may run on any thread concurrently with the single
/// realtime caller; with `thread_safe = false` the caller must serialize
/// all three operations.
pub struct Pool {
    /// Bytes available to the caller per block.
    payload_size: usize,
    /// Low water mark: replenishment tops the inventory up to at least this.
    min_free: usize,
    /// High water mark: surplus beyond this is returned to the OS.
    max_free: usize,
    /// Selects the dual-thread discipline.
    thread_safe: bool,
    /// Blocks ready for the realtime caller. Owned by the realtime role.
    free: UnsafeCell<BlockList>,
    /// Length of `free`. Written only by the realtime role; atomic so the
    /// replenisher and introspection can read it without a data race.
    free_count: AtomicUsize,
    /// Blocks currently handed out.
    in_use: AtomicUsize,
    /// Staging list and mirror counter.
    staging: Mutex<Staging>,
    /// Blocks currently obtained from the OS and not yet returned.
    os_blocks: AtomicUsize,
}

// SAFETY: `free` is mutated only by the single realtime caller (or the
// exclusive caller of a non-thread-safe pool) per the safety contracts on
// `allocate`/`deallocate`/`replenish`. Everything shared across threads is
// behind `staging` or an atomic.
unsafe impl Send for Pool {}
unsafe impl Sync for Pool {}

impl Pool {
    /// Create a pool and pre-fill its free list to `min_free` blocks.
    ///
    /// The fill happens before the pool is visible to any other thread, so
    /// it lands directly on the free list and the mirror counter starts
    /// exact. An OS refusal during the fill fails construction; blocks
    /// already obtained are released again.
    ///
    /// # Panics
    ///
    /// `payload_size` must be non-zero and `min_free < max_free`. Violating
    /// either is a programming error.
    pub fn new(
        payload_size: usize,
        min_free: usize,
        max_free: usize,
        thread_safe: bool,
    ) -> Result<Box<Pool>> {
        assert!(payload_size > 0, "payload_size must be non-zero");
        assert!(
            min_free < max_free,
            "min_free ({min_free}) must be < max_free ({max_free})"
        );

        let pool = Box::new(Pool {
            payload_size,
            min_free,
            max_free,
            thread_safe,
            free: UnsafeCell::new(BlockList::new()),
            free_count: AtomicUsize::new(0),
            in_use: AtomicUsize::new(0),
            staging: Mutex::new(Staging {
                pending: BlockList::new(),
                mirror_free: 0,
            }),
            os_blocks: AtomicUsize::new(0),
        });

        for _ in 0..min_free {
            let node = pool.obtain_block();
            if node.is_null() {
                // Drop releases the partially built free list.
                return Err(Error::OutOfMemory {
                    bytes: pool.block_size(),
                });
            }
            // SAFETY: the pool is not yet shared; we have exclusive access.
            unsafe { (*pool.free.get()).push_tail(node) };
            pool.free_count.fetch_add(1, Ordering::Relaxed);
        }
        pool.staging.lock().mirror_free = min_free;

        #[cfg(feature = "debug")]
        log::debug!(
            target: "rtpool",
            "pool created: payload {payload_size}, marks {min_free}/{max_free}"
        );

        Ok(pool)
    }

    /// Bytes available to the caller per block.
    #[inline]
    pub fn payload_size(&self) -> usize {
        self.payload_size
    }

    /// Current free-list length. Exact on the realtime thread, a snapshot
    /// elsewhere.
    #[inline]
    pub fn free_count(&self) -> usize {
        self.free_count.load(Ordering::Relaxed)
    }

    /// Blocks currently handed out.
    #[inline]
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Relaxed)
    }

    /// Blocks parked on the staging list. Takes the mutex; not for the
    /// realtime thread.
    pub fn staged_count(&self) -> usize {
        self.staging.lock().pending.len()
    }

    /// Blocks currently obtained from the OS and not yet returned.
    #[inline]
    pub fn os_blocks(&self) -> usize {
        self.os_blocks.load(Ordering::Relaxed)
    }

    /// Total size of one block as requested from the OS.
    #[inline]
    fn block_size(&self) -> usize {
        block::NODE_SIZE + self.payload_size
    }

    /// Fetch one block from the OS heap. Returns null on refusal.
    fn obtain_block(&self) -> *mut BlockNode {
        let total = self.block_size();
        // SAFETY: freed in `release_block` or `drop` with the same size.
        let raw = unsafe { platform::heap_alloc(total) };
        if raw.is_null() {
            #[cfg(feature = "debug")]
            log::debug!(target: "rtpool", "heap refused {total} bytes");
            return ptr::null_mut();
        }
        stat!(os_alloc_count);
        stat!(os_alloc_bytes, total);
        self.os_blocks.fetch_add(1, Ordering::Relaxed);
        raw as *mut BlockNode
    }

    /// Return one block to the OS heap.
    ///
    /// # Safety
    ///
    /// `node` must have come from [`obtain_block`](Self::obtain_block) on
    /// this pool and must not be on any list.
    unsafe fn release_block(&self, node: *mut BlockNode) {
        self.os_blocks.fetch_sub(1, Ordering::Relaxed);
        stat!(os_free_count);
        unsafe { platform::heap_free(node as *mut u8, self.block_size()) };
    }

    /// Top up or drain the pool to keep the effective inventory between the
    /// water marks. Non-realtime: takes the blocking mutex and calls the OS
    /// heap. An OS refusal stops the fill; the next pass retries.
    ///
    /// The effective inventory is the mirror counter plus the staged-block
    /// count, so a stale mirror (realtime side not winning `try_lock`)
    /// cannot make the staging list grow without bound.
    ///
    /// # Safety
    ///
    /// For a pool created with `thread_safe = false` this operates on the
    /// free list directly and must not run concurrently with
    /// [`allocate`](Self::allocate) or [`deallocate`](Self::deallocate).
    /// Thread-safe pools may be replenished from any thread at any time.
    pub unsafe fn replenish(&self) {
        stat!(replenish_count);
        if self.thread_safe {
            let mut staging = self.staging.lock();
            let mut inventory = staging.mirror_free + staging.pending.len();
            while inventory < self.min_free {
                let node = self.obtain_block();
                if node.is_null() {
                    break;
                }
                // SAFETY: fresh block, on no list.
                unsafe { staging.pending.push_tail(node) };
                inventory += 1;
            }
            while inventory > self.max_free {
                // SAFETY: list pointers maintained by push/pop only.
                let node = unsafe { staging.pending.pop_head() };
                if node.is_null() {
                    break;
                }
                // SAFETY: just detached from the staging list.
                unsafe { self.release_block(node) };
                inventory -= 1;
            }
        } else {
            // SAFETY: exclusive access guaranteed by the caller.
            let free = unsafe { &mut *self.free.get() };
            let mut count = self.free_count.load(Ordering::Relaxed);
            while count < self.min_free {
                let node = self.obtain_block();
                if node.is_null() {
                    break;
                }
                unsafe { free.push_tail(node) };
                count += 1;
            }
            while count > self.max_free {
                let node = unsafe { free.pop_head() };
                if node.is_null() {
                    break;
                }
                unsafe { self.release_block(node) };
                count -= 1;
            }
            self.free_count.store(count, Ordering::Relaxed);
        }
    }

    /// Realtime allocation. Pops the head of the free list; returns null if
    /// the list is empty. Never calls the OS heap, never blocks: the only
    /// synchronisation is an optional `try_lock` under which staged blocks
    /// are adopted and the mirror counter published.
    ///
    /// # Safety
    ///
    /// At most one thread may call `allocate`/`deallocate` on this pool at
    /// a time (the realtime role).
    pub unsafe fn allocate(&self) -> *mut u8 {
        // SAFETY: we are the realtime role; nobody else touches `free`.
        let free = unsafe { &mut *self.free.get() };
        let node = unsafe { free.pop_head() };
        if node.is_null() {
            stat!(alloc_failures);
            return ptr::null_mut();
        }
        let mut count = self.free_count.load(Ordering::Relaxed) - 1;
        self.free_count.store(count, Ordering::Relaxed);
        self.in_use.fetch_add(1, Ordering::Relaxed);
        stat!(alloc_count);

        if self.thread_safe {
            if let Some(mut staging) = self.staging.try_lock() {
                while count < self.min_free {
                    let adopted = unsafe { staging.pending.pop_head() };
                    if adopted.is_null() {
                        break;
                    }
                    unsafe { free.push_tail(adopted) };
                    count += 1;
                    stat!(blocks_adopted);
                }
                self.free_count.store(count, Ordering::Relaxed);
                staging.mirror_free = count;
            } else {
                stat!(trylock_misses);
            }
        }

        // SAFETY: `node` heads a live block of `block_size()` bytes.
        unsafe { block::payload_of(node) }
    }

    /// Realtime deallocation. Pushes the block on the free-list tail; spills
    /// surplus beyond the high mark into staging if the `try_lock` is won.
    /// Never calls the OS heap, never blocks, cannot fail.
    ///
    /// # Safety
    ///
    /// `payload` must have been returned by [`allocate`](Self::allocate) on
    /// this pool and not yet deallocated, and the caller must be the single
    /// realtime role.
    pub unsafe fn deallocate(&self, payload: *mut u8) {
        let node = unsafe { block::node_of(payload) };
        // SAFETY: we are the realtime role.
        let free = unsafe { &mut *self.free.get() };
        unsafe { free.push_tail(node) };
        let mut count = self.free_count.load(Ordering::Relaxed) + 1;
        self.free_count.store(count, Ordering::Relaxed);
        self.in_use.fetch_sub(1, Ordering::Relaxed);
        stat!(dealloc_count);

        if self.thread_safe {
            if let Some(mut staging) = self.staging.try_lock() {
                while count > self.max_free {
                    let spilled = unsafe { free.pop_head() };
                    if spilled.is_null() {
                        break;
                    }
                    unsafe { staging.pending.push_tail(spilled) };
                    count -= 1;
                    stat!(blocks_spilled);
                }
                self.free_count.store(count, Ordering::Relaxed);
                staging.mirror_free = count;
            } else {
                stat!(trylock_misses);
            }
        }
    }

    /// Allocate from a non-realtime context, replenishing until a block is
    /// available. May block on the mutex and call the OS heap; loops
    /// indefinitely under persistent OOM. Startup-path convenience.
    ///
    /// # Safety
    ///
    /// The caller takes the realtime role for the duration of the call:
    /// no other thread may call `allocate`/`deallocate` concurrently.
    pub unsafe fn allocate_blocking(&self) -> *mut u8 {
        loop {
            unsafe { self.replenish() };
            let payload = unsafe { self.allocate() };
            if !payload.is_null() {
                return payload;
            }
            if self.thread_safe {
                // The free list is empty and fresh blocks are parked in
                // staging, invisible to the realtime path. We are allowed to
                // block here, so adopt them under the full lock.
                // SAFETY: the caller holds the realtime role.
                let free = unsafe { &mut *self.free.get() };
                let mut staging = self.staging.lock();
                let mut count = self.free_count.load(Ordering::Relaxed);
                while count < self.min_free {
                    let node = unsafe { staging.pending.pop_head() };
                    if node.is_null() {
                        break;
                    }
                    unsafe { free.push_tail(node) };
                    count += 1;
                    stat!(blocks_adopted);
                }
                self.free_count.store(count, Ordering::Relaxed);
                staging.mirror_free = count;
            }
            core::hint::spin_loop();
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        assert_eq!(
            self.in_use.load(Ordering::Relaxed),
            0,
            "pool dropped with blocks still in use"
        );
        let total = self.block_size();
        let free = self.free.get_mut();
        while !free.is_empty() {
            let node = unsafe { free.pop_head() };
            stat!(os_free_count);
            // SAFETY: every listed block came from `heap_alloc(total)`.
            unsafe { platform::heap_free(node as *mut u8, total) };
        }
        let staging = self.staging.get_mut();
        while !staging.pending.is_empty() {
            let node = unsafe { staging.pending.pop_head() };
            stat!(os_free_count);
            // SAFETY: as above.
            unsafe { platform::heap_free(node as *mut u8, total) };
        }
        self.os_blocks.store(0, Ordering::Relaxed);
    }
}
