//! Miri-compatible heap shim backed by `alloc::alloc`.
//!
//! Miri cannot execute foreign heap calls, so blocks come from the Rust
//! global allocator instead. This keeps every unsafe pointer manipulation
//! in the pool and dispatcher checkable under Miri.

extern crate alloc;

use core::alloc::Layout;

use super::HEAP_ALIGN;

pub unsafe fn heap_alloc(size: usize) -> *mut u8 {
    let layout = Layout::from_size_align(size, HEAP_ALIGN).unwrap();
    unsafe { alloc::alloc::alloc(layout) }
}

pub unsafe fn heap_free(ptr: *mut u8, size: usize) {
    let layout = Layout::from_size_align(size, HEAP_ALIGN).unwrap();
    unsafe { alloc::alloc::dealloc(ptr, layout) };
}
