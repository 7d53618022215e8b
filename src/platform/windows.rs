//! Windows heap via the process heap API.

use core::ffi::c_void;

unsafe extern "system" {
    fn GetProcessHeap() -> *mut c_void;
    fn HeapAlloc(heap: *mut c_void, flags: u32, bytes: usize) -> *mut c_void;
    fn HeapFree(heap: *mut c_void, flags: u32, ptr: *mut c_void) -> i32;
}

pub unsafe fn heap_alloc(size: usize) -> *mut u8 {
    unsafe { HeapAlloc(GetProcessHeap(), 0, size) as *mut u8 }
}

pub unsafe fn heap_free(ptr: *mut u8, _size: usize) {
    unsafe { HeapFree(GetProcessHeap(), 0, ptr as *mut c_void) };
}
