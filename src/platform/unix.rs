//! Unix heap via the C runtime allocator.

pub unsafe fn heap_alloc(size: usize) -> *mut u8 {
    unsafe { libc::malloc(size) as *mut u8 }
}

pub unsafe fn heap_free(ptr: *mut u8, _size: usize) {
    unsafe { libc::free(ptr as *mut libc::c_void) };
}
