//! C-ABI symbols that take over the platform allocator when this library
//! is preloaded into a process.

use libc::{c_void, size_t};

use crate::global;

#[unsafe(no_mangle)]
pub extern "C" fn malloc(size: size_t) -> *mut c_void {
  global::malloc(size).cast()
}

/// # Safety
///
/// `ptr` must be null or come from one of these functions.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free(ptr: *mut c_void) {
  unsafe { global::free(ptr.cast()) }
}

/// # Safety
///
/// `ptr` must be null or come from one of these functions.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn realloc(
  ptr: *mut c_void,
  size: size_t,
) -> *mut c_void {
  unsafe { global::realloc(ptr.cast(), size).cast() }
}

#[unsafe(no_mangle)]
pub extern "C" fn calloc(
  nmemb: size_t,
  size: size_t,
) -> *mut c_void {
  global::calloc(nmemb, size).cast()
}
