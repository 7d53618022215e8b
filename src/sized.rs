//! Size-class dispatcher over a family of pools.
//!
//! Pool `i` serves payloads of `BASE_CLASS_SIZE * 2^i - CLASS_SLACK` bytes;
//! the slack keeps each class just under a power of two so the C runtime's
//! own per-allocation overhead does not push block requests over a page or
//! chunk boundary. Requests are routed first-fit to the smallest class that
//! holds the payload plus a hidden back-reference to the owning pool, which
//! is what lets [`deallocate`](SizedAllocator::deallocate) work from the
//! user pointer alone.

use core::ptr;

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::config::{BASE_CLASS_SIZE, CLASS_SLACK, MAX_SIZE_CLASSES};
use crate::error::{Error, Result};
use crate::pool::Pool;
use crate::stat;

/// Bytes reserved in front of every handed-out region for the owning-pool
/// back-reference.
pub const POOL_REF_SIZE: usize = core::mem::size_of::<*const Pool>();

/// Variable-size facade over fixed-size pools.
pub struct SizedAllocator {
    /// Pools in ascending payload order. Boxed so the back-references stay
    /// valid for the allocator's lifetime.
    pools: Vec<Box<Pool>>,
}

impl core::fmt::Debug for SizedAllocator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SizedAllocator")
            .field("classes", &self.pools.len())
            .finish()
    }
}

impl SizedAllocator {
    /// Build the class table covering requests up to `max_size` bytes, and
    /// pre-fill every pool to `min_free` blocks.
    ///
    /// Fails if the OS refuses memory for a pool (already-built pools are
    /// torn down again) or if covering `max_size` would take more classes
    /// than the platform supports.
    pub fn new(
        max_size: usize,
        min_free: usize,
        max_free: usize,
        thread_safe: bool,
    ) -> Result<SizedAllocator> {
        let goal = max_size
            .checked_add(CLASS_SLACK + POOL_REF_SIZE)
            .ok_or(Error::TooManyClasses { max_size })?;

        // Smallest class count whose top class spans `goal`.
        let mut num_classes = 1usize;
        let mut span = BASE_CLASS_SIZE;
        while span < goal {
            span = span
                .checked_mul(2)
                .ok_or(Error::TooManyClasses { max_size })?;
            num_classes += 1;
        }
        if num_classes > MAX_SIZE_CLASSES || num_classes > usize::BITS as usize {
            return Err(Error::TooManyClasses { max_size });
        }

        let mut pools = Vec::with_capacity(num_classes);
        for i in 0..num_classes {
            let payload_size = (BASE_CLASS_SIZE << i) - CLASS_SLACK;
            pools.push(Pool::new(payload_size, min_free, max_free, thread_safe)?);
        }
        Ok(SizedAllocator { pools })
    }

    /// Number of size classes.
    #[inline]
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// The pool backing size class `index`.
    pub fn pool(&self, index: usize) -> &Pool {
        &self.pools[index]
    }

    /// Payload capacity of the largest class (before the back-reference is
    /// reserved).
    pub fn largest_payload(&self) -> usize {
        self.pools[self.pools.len() - 1].payload_size()
    }

    /// Realtime allocation of `size` bytes.
    ///
    /// Routes to the smallest class that fits `size` plus the back-reference
    /// and returns a pointer just past the stamped header. Returns null if
    /// the chosen class is out of inventory (no fall-through to a larger
    /// class, since the block would later be freed into the class stamped
    /// here) or if `size` exceeds the largest class, which also emits a
    /// warning event.
    ///
    /// # Safety
    ///
    /// At most one thread may call `allocate`/`deallocate` on this
    /// allocator's pools at a time (the realtime role).
    pub unsafe fn allocate(&self, size: usize) -> *mut u8 {
        #[cfg(feature = "debug")]
        log::debug!(target: "rtpool", "allocate called for {size} bytes");

        let Some(needed) = size.checked_add(POOL_REF_SIZE) else {
            stat!(oversize_rejects);
            log::warn!(target: "rtpool", "data size {size} too big");
            return ptr::null_mut();
        };

        for pool in &self.pools {
            if pool.payload_size() < needed {
                continue;
            }
            // SAFETY: forwarded realtime-role contract.
            let payload = unsafe { pool.allocate() };
            if payload.is_null() {
                stat!(class_exhausted);
                return ptr::null_mut();
            }
            #[cfg(feature = "debug")]
            log::debug!(target: "rtpool", "using block of size {}", pool.payload_size());

            // SAFETY: the payload is at least POOL_REF_SIZE bytes and
            // pointer-aligned (it sits on a heap block behind the two-pointer
            // list node).
            unsafe { (payload as *mut *const Pool).write(&**pool as *const Pool) };
            let user = unsafe { payload.add(POOL_REF_SIZE) };

            #[cfg(feature = "debug")]
            log::debug!(target: "rtpool", "returning pointer {:p}", user);
            return user;
        }

        stat!(oversize_rejects);
        log::warn!(target: "rtpool", "data size {size} too big");
        ptr::null_mut()
    }

    /// Realtime deallocation. Reads the owning pool from the header stamped
    /// by [`allocate`](Self::allocate); no allocator handle is needed.
    ///
    /// # Safety
    ///
    /// `user` must have been returned by `allocate` on an allocator that is
    /// still alive, must not have been deallocated already, and the caller
    /// must be the single realtime role for that allocator.
    pub unsafe fn deallocate(user: *mut u8) {
        let payload = unsafe { user.sub(POOL_REF_SIZE) };
        let pool = unsafe { (payload as *const *const Pool).read() };
        // SAFETY: the header was stamped with a pool owned by the live
        // allocator; forwarded realtime-role contract.
        unsafe { (*pool).deallocate(payload) };
    }

    /// Replenish every pool. Non-realtime; see [`Pool::replenish`].
    ///
    /// # Safety
    ///
    /// Same contract as [`Pool::replenish`] for every pool in the table.
    pub unsafe fn replenish(&self) {
        for pool in &self.pools {
            unsafe { pool.replenish() };
        }
    }
}
