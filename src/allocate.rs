use std::ptr::{self, NonNull};

use crate::{
  block::Block,
  error::{HeapError, Result},
  growth::Break,
  heap::Heap,
};

impl<B: Break> Heap<B> {
  /// Hands out at least `size` bytes, aligned to 16.
  ///
  /// A free block is reused as-is when one is large enough (first fit);
  /// otherwise a new block is carved at the end of the heap.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>> {
    if size == 0 {
      return Err(HeapError::InvalidSize);
    }

    let block = unsafe {
      if self.directory.is_empty() {
        self.create(ptr::null_mut(), size)?
      } else {
        let search = self.directory.search(size);

        if search.found.is_null() {
          self.create(search.last, size)?
        } else {
          (*search.found).is_free = false;
          search.found
        }
      }
    };

    Ok(unsafe { NonNull::new_unchecked(Block::payload(block)) })
  }

  /// Allocates `count * size` bytes and zeroes all of them.
  ///
  /// A product that overflows is rejected instead of wrapping.
  pub fn zero_allocate(
    &mut self,
    count: usize,
    size: usize,
  ) -> Result<NonNull<u8>> {
    let total = count.checked_mul(size).ok_or(HeapError::SizeOverflow)?;
    let payload = self.allocate(total)?;

    unsafe { ptr::write_bytes(payload.as_ptr(), 0, total) };

    Ok(payload)
  }
}
