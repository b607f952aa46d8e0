//! The process-wide heap and its four entry points.
//!
//! One heap sits on the program break behind a single lock that is held for
//! the whole of every call, tracing included. Failures surface as null.

use std::{
  alloc::{GlobalAlloc, Layout},
  mem,
  ptr::{self, NonNull},
  sync::{Mutex, MutexGuard, PoisonError},
};

use crate::{
  align::ALIGNMENT,
  error::{HeapError, Result},
  growth::Sbrk,
  heap::{Heap, HeapStats},
  trace::{self, Event},
};

// On Linux the std mutex is a bare futex word and never allocates. Other
// targets may box a pthread mutex on first lock.
static HEAP: Mutex<Heap<Sbrk>> = Mutex::new(Heap::new(Sbrk));

fn heap() -> MutexGuard<'static, Heap<Sbrk>> {
  // Nothing inside the lock can leave the chain half-linked.
  HEAP.lock().unwrap_or_else(PoisonError::into_inner)
}

fn set_errno(error: HeapError) {
  if error == HeapError::InvalidSize {
    return;
  }

  #[cfg(target_os = "linux")]
  unsafe {
    *libc::__errno_location() = libc::ENOMEM;
  }
  #[cfg(target_os = "macos")]
  unsafe {
    *libc::__error() = libc::ENOMEM;
  }
}

fn settle(result: Result<NonNull<u8>>) -> *mut u8 {
  match result {
    Ok(payload) => payload.as_ptr(),
    Err(error) => {
      set_errno(error);
      ptr::null_mut()
    }
  }
}

fn block_size(
  heap: &Heap<Sbrk>,
  payload: *mut u8,
) -> usize {
  if payload.is_null() {
    0
  } else {
    unsafe { heap.usable_size(payload) }
  }
}

/// Returns at least `size` bytes aligned to 16, or null.
pub fn malloc(size: usize) -> *mut u8 {
  let mut heap = heap();
  let result = settle(heap.allocate(size));

  trace::record(Event::Malloc {
    size,
    result,
    block_size: block_size(&heap, result),
  });

  result
}

/// Releases a block for reuse. Null is ignored.
///
/// # Safety
///
/// `payload` must be null or a live pointer from this module.
pub unsafe fn free(payload: *mut u8) {
  let mut heap = heap();
  unsafe { heap.deallocate(payload) };

  trace::record(Event::Free { payload });
}

/// Resizes a block, moving it if needed. See [`Heap::reallocate`].
///
/// # Safety
///
/// `payload` must be null or a live pointer from this module.
pub unsafe fn realloc(
  payload: *mut u8,
  size: usize,
) -> *mut u8 {
  let mut heap = heap();
  let result = match unsafe { heap.reallocate(payload, size) } {
    Ok(Some(moved)) => moved.as_ptr(),
    Ok(None) => ptr::null_mut(),
    Err(error) => {
      set_errno(error);
      ptr::null_mut()
    }
  };

  trace::record(Event::Realloc {
    payload,
    size,
    result,
    block_size: block_size(&heap, result),
  });

  result
}

/// Returns `count * size` zeroed bytes, or null.
pub fn calloc(
  count: usize,
  size: usize,
) -> *mut u8 {
  let mut heap = heap();
  let result = settle(heap.zero_allocate(count, size));

  trace::record(Event::Calloc {
    count,
    size,
    result,
    block_size: block_size(&heap, result),
  });

  result
}

/// Snapshot of the process heap.
pub fn stats() -> HeapStats {
  heap().stats()
}

/// Routes Rust allocations through the process heap.
///
/// ```rust,ignore
/// use brkalloc::Brkalloc;
///
/// #[global_allocator]
/// static GLOBAL: Brkalloc = Brkalloc;
/// ```
///
/// Payloads are 16-aligned. A layout aligned beyond that is served from a
/// block `align` bytes larger than asked, with the block's own payload
/// pointer stored in the word right before the address handed out.
///
/// Only Linux is supported as a global allocator, since the heap lock must
/// not allocate.
pub struct Brkalloc;

const BASE_SLOT: usize = mem::size_of::<usize>();

/// Carves an `align`-aligned address out of `base`, remembering `base`.
///
/// # Safety
///
/// `base` must be null or a 16-aligned payload of at least `align` extra bytes.
unsafe fn over_aligned(
  base: *mut u8,
  align: usize,
) -> *mut u8 {
  if base.is_null() {
    return base;
  }

  // `base` is 16-aligned and `align` is larger, so there is always at least
  // one boundary's worth of room for the slot below the aligned address.
  let aligned = ((base as usize + align) & !(align - 1)) as *mut u8;
  unsafe { (aligned.sub(BASE_SLOT) as *mut *mut u8).write(base) };
  aligned
}

/// # Safety
///
/// `ptr` must come from [`over_aligned`].
unsafe fn base_of(ptr: *mut u8) -> *mut u8 {
  unsafe { (ptr.sub(BASE_SLOT) as *mut *mut u8).read() }
}

unsafe impl GlobalAlloc for Brkalloc {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() <= ALIGNMENT {
      return malloc(layout.size());
    }

    let Some(total) = layout.size().checked_add(layout.align()) else {
      return ptr::null_mut();
    };
    unsafe { over_aligned(malloc(total), layout.align()) }
  }

  unsafe fn dealloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
  ) {
    if layout.align() <= ALIGNMENT {
      unsafe { free(ptr) }
    } else {
      unsafe { free(base_of(ptr)) }
    }
  }

  unsafe fn alloc_zeroed(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() <= ALIGNMENT {
      return calloc(1, layout.size());
    }

    let Some(total) = layout.size().checked_add(layout.align()) else {
      return ptr::null_mut();
    };
    unsafe { over_aligned(calloc(1, total), layout.align()) }
  }

  unsafe fn realloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
    new_size: usize,
  ) -> *mut u8 {
    if layout.align() <= ALIGNMENT {
      return unsafe { realloc(ptr, new_size) };
    }

    unsafe {
      let new_layout = Layout::from_size_align_unchecked(new_size, layout.align());
      let moved = self.alloc(new_layout);
      if !moved.is_null() {
        ptr::copy_nonoverlapping(ptr, moved, layout.size().min(new_size));
        self.dealloc(ptr, layout);
      }
      moved
    }
  }
}
