//! OS heap abstraction.
//!
//! `heap_alloc`/`heap_free` are the only calls in the crate that reach the
//! operating-system allocator. They are invoked exclusively from
//! non-realtime paths (pool construction, replenishment, teardown); the
//! realtime paths recycle blocks without ever coming here.

cfg_if::cfg_if! {
    if #[cfg(miri)] {
        mod miri;
        use miri as imp;
    } else if #[cfg(unix)] {
        mod unix;
        use unix as imp;
    } else if #[cfg(windows)] {
        mod windows;
        use windows as imp;
    }
}

/// Minimum alignment every returned block satisfies. The C runtime heap
/// guarantees `max_align_t` alignment; the Miri shim requests it explicitly.
pub const HEAP_ALIGN: usize = 16;

/// Allocate `size` bytes from the process heap. Returns null on failure.
///
/// # Safety
///
/// Caller must eventually pass the returned pointer to [`heap_free`] with
/// the same `size`.
#[inline]
pub unsafe fn heap_alloc(size: usize) -> *mut u8 {
    unsafe { imp::heap_alloc(size) }
}

/// Return a block previously obtained from [`heap_alloc`].
///
/// # Safety
///
/// `ptr` must have been returned by `heap_alloc` with the same `size`, and
/// must not be used afterwards.
#[inline]
pub unsafe fn heap_free(ptr: *mut u8, size: usize) {
    unsafe { imp::heap_free(ptr, size) }
}
