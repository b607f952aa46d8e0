use std::ptr::{self, NonNull};

use crate::{
  align,
  block::{Block, HEADER_SIZE, HEADER_SPAN},
  error::Result,
  growth::Break,
  heap::Heap,
};

impl<B: Break> Heap<B> {
  /// Resizes the block behind `payload` to `size` bytes.
  ///
  /// - null `payload` allocates, `size == 0` frees and yields `None`;
  /// - shrinking stays in place, splitting a free block off the tail when
  ///   an aligned header and at least one payload byte fit in the released
  ///   bytes;
  /// - growing stays in place when the bytes up to the next block, or up to
  ///   the top of the heap for the final block, can hold it;
  /// - otherwise the contents move to a fresh block and the old one is freed.
  ///
  /// Bytes past the old size are left uninitialized. If moving fails the
  /// original block is untouched and still live.
  ///
  /// # Safety
  ///
  /// `payload` must be null or a live pointer returned by this heap.
  pub unsafe fn reallocate(
    &mut self,
    payload: *mut u8,
    size: usize,
  ) -> Result<Option<NonNull<u8>>> {
    let Some(current) = NonNull::new(payload) else {
      return self.allocate(size).map(Some);
    };

    if size == 0 {
      unsafe { self.deallocate(payload) };
      return Ok(None);
    }

    unsafe {
      let block = Block::from_payload(payload);
      let old_size = (*block).size;

      if size <= old_size {
        self.shrink(block, size);
        return Ok(Some(current));
      }

      if self.grow_in_place(block, size) {
        return Ok(Some(current));
      }

      let moved = self.allocate(size)?;
      ptr::copy_nonoverlapping(payload, moved.as_ptr(), old_size);
      self.deallocate(payload);

      Ok(Some(moved))
    }
  }

  /// Records the smaller size, handing the released tail to a new free block
  /// linked right after this one.
  unsafe fn shrink(
    &mut self,
    block: *mut Block,
    size: usize,
  ) {
    unsafe {
      let old_end = Block::payload_end(block);
      let released = (*block).size - size;
      (*block).size = size;

      if released <= HEADER_SIZE {
        return;
      }

      // Both the tail header and its payload sit on the boundary, so the
      // tail gets whatever is left of the released bytes after padding.
      let Some(tail) = align!(Block::payload_end(block)) else {
        return;
      };
      let tail_payload = tail + HEADER_SPAN;
      if tail_payload >= old_end {
        return;
      }

      let tail = Block::write(tail, old_end - tail_payload, true, ptr::null_mut());
      (*tail).region_end = (*block).region_end;
      (*block).region_end = false;
      self.directory.insert_after(block, tail);
    }
  }

  unsafe fn grow_in_place(
    &mut self,
    block: *mut Block,
    size: usize,
  ) -> bool {
    unsafe {
      let needed = size - (*block).size;

      if (*block).next.is_null() {
        let end = Block::span_for(size).and_then(|span| (block as usize).checked_add(span));
        if !end.is_some_and(|end| self.growth.absorb(end)) {
          return false;
        }
      } else if self.gap_after(block).is_none_or(|gap| needed > gap) {
        return false;
      }

      (*block).size = size;
      true
    }
  }

  /// Unused bytes between the end of this block's payload and the next header.
  ///
  /// `None` for the final block and for a block whose successor sits in a
  /// different region of the break.
  unsafe fn gap_after(
    &self,
    block: *mut Block,
  ) -> Option<usize> {
    unsafe {
      let next = (*block).next;
      if next.is_null() || (*block).region_end {
        return None;
      }

      (next as usize).checked_sub(Block::payload_end(block))
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{ptr, slice};

  use crate::{
    block::{Block, HEADER_SPAN},
    error::HeapError,
    growth::Break,
    heap::tests::TestHeap,
  };

  fn fill(
    payload: *mut u8,
    len: usize,
  ) {
    for i in 0..len {
      unsafe { *payload.add(i) = i as u8 };
    }
  }

  fn check(
    payload: *mut u8,
    len: usize,
  ) {
    let bytes = unsafe { slice::from_raw_parts(payload, len) };
    for (i, &byte) in bytes.iter().enumerate() {
      assert_eq!(byte, i as u8, "byte {i} changed");
    }
  }

  #[test]
  fn null_pointer_allocates() {
    let mut test = TestHeap::new(4096, 1024);

    let payload = unsafe { test.heap.reallocate(ptr::null_mut(), 24) }.unwrap().unwrap();

    assert_eq!(unsafe { test.heap.usable_size(payload.as_ptr()) }, 24);
    assert_eq!(
      unsafe { test.heap.reallocate(ptr::null_mut(), 0) },
      Err(HeapError::InvalidSize)
    );
  }

  #[test]
  fn zero_size_frees() {
    let mut test = TestHeap::new(4096, 1024);

    let payload = test.heap.allocate(24).unwrap();
    let result = unsafe { test.heap.reallocate(payload.as_ptr(), 0) };

    assert_eq!(result, Ok(None));
    assert_eq!(test.heap.stats().free_blocks, 1);
  }

  #[test]
  fn small_shrink_does_not_split() {
    let mut test = TestHeap::new(4096, 1024);

    let payload = test.heap.allocate(40).unwrap();
    let shrunk = unsafe { test.heap.reallocate(payload.as_ptr(), 30) }.unwrap();

    assert_eq!(shrunk, Some(payload));
    assert_eq!(test.heap.stats().blocks, 1);
    assert_eq!(unsafe { test.heap.usable_size(payload.as_ptr()) }, 30);
  }

  #[test]
  fn shrink_needs_room_for_an_aligned_tail() {
    let mut test = TestHeap::new(4096, 1024);

    // 25 bytes are released, but the tail header would start at the next
    // boundary and its payload would land past the old end.
    let payload = test.heap.allocate(64).unwrap();
    test.heap.allocate(8).unwrap();
    let shrunk = unsafe { test.heap.reallocate(payload.as_ptr(), 39) }.unwrap();

    assert_eq!(shrunk, Some(payload));
    assert_eq!(test.heap.stats().blocks, 2);
    assert_eq!(unsafe { test.heap.usable_size(payload.as_ptr()) }, 39);

    let mut test = TestHeap::new(4096, 1024);

    let payload = test.heap.allocate(64).unwrap();
    test.heap.allocate(8).unwrap();
    unsafe { test.heap.reallocate(payload.as_ptr(), 16) }.unwrap();

    let blocks: Vec<_> = test.heap.blocks().collect();
    assert_eq!(blocks.len(), 3);
    assert!(blocks[1].free);
    assert_eq!(blocks[1].size, 16);
    assert_eq!(blocks[1].payload as usize, payload.as_ptr() as usize + 16 + HEADER_SPAN);
  }

  #[test]
  fn shrink_splits_a_reusable_tail() {
    let mut test = TestHeap::new(4096, 1024);

    let payload = test.heap.allocate(200).unwrap();
    let after = test.heap.allocate(8).unwrap();
    fill(payload.as_ptr(), 200);

    let shrunk = unsafe { test.heap.reallocate(payload.as_ptr(), 40) }.unwrap();
    assert_eq!(shrunk, Some(payload));
    check(payload.as_ptr(), 40);

    let blocks: Vec<_> = test.heap.blocks().collect();
    assert_eq!(blocks.len(), 3);
    assert_eq!(blocks[0].size, 40);
    assert!(blocks[1].free);
    assert_eq!(blocks[2].payload, after.as_ptr());

    // The tail ends exactly where the original payload ended.
    let tail = blocks[1];
    assert_eq!(tail.payload as usize + tail.size, payload.as_ptr() as usize + 200);

    let reused = test.heap.allocate(tail.size).unwrap();
    assert_eq!(reused.as_ptr(), tail.payload);
    assert_eq!(test.heap.stats().blocks, 3);
  }

  #[test]
  fn last_block_grows_into_free_space() {
    let mut test = TestHeap::new(8192, 4096);

    let payload = test.heap.allocate(10).unwrap();
    fill(payload.as_ptr(), 10);

    let grown = unsafe { test.heap.reallocate(payload.as_ptr(), 1000) }.unwrap();
    assert_eq!(grown, Some(payload));
    check(payload.as_ptr(), 10);

    // The cursor moved past the grown block.
    let next = test.heap.allocate(10).unwrap().as_ptr() as usize;
    assert!(next >= payload.as_ptr() as usize + 1000);
  }

  #[test]
  fn last_block_beyond_top_moves() {
    let mut test = TestHeap::new(32 * 1024, 4096);

    let payload = test.heap.allocate(10).unwrap();
    fill(payload.as_ptr(), 10);

    let moved = unsafe { test.heap.reallocate(payload.as_ptr(), 10000) }.unwrap().unwrap();
    assert_ne!(moved, payload);
    check(moved.as_ptr(), 10);

    let blocks: Vec<_> = test.heap.blocks().collect();
    assert!(blocks[0].free);
    assert_eq!(blocks[1].payload, moved.as_ptr());
  }

  #[test]
  fn middle_block_grows_into_padding() {
    let mut test = TestHeap::new(4096, 1024);

    let payload = test.heap.allocate(20).unwrap();
    test.heap.allocate(8).unwrap();

    let padding = Block::span_for(20).unwrap() - HEADER_SPAN - 20;
    let grown = unsafe { test.heap.reallocate(payload.as_ptr(), 20 + padding) }.unwrap();
    assert_eq!(grown, Some(payload));

    let moved = unsafe { test.heap.reallocate(payload.as_ptr(), 21 + padding) }.unwrap();
    assert_ne!(moved, Some(payload));
    assert_eq!(test.heap.stats().blocks, 3);
  }

  #[test]
  fn gap_is_not_measured_across_regions() {
    let mut test = TestHeap::new(64 * 1024, 1024);

    let payload = test.heap.allocate(10).unwrap();
    // Someone else moves the break.
    test.heap.growth.source.extend(100).unwrap();
    test.heap.allocate(1000).unwrap();

    let moved = unsafe { test.heap.reallocate(payload.as_ptr(), 20) }.unwrap();
    assert_ne!(moved, Some(payload));
  }

  #[test]
  fn split_tail_keeps_region_boundary() {
    let mut test = TestHeap::new(64 * 1024, 1024);

    let payload = test.heap.allocate(200).unwrap();
    test.heap.growth.source.extend(100).unwrap();
    test.heap.allocate(1000).unwrap();

    unsafe { test.heap.reallocate(payload.as_ptr(), 40) }.unwrap();
    let tail = test.heap.blocks().nth(1).unwrap();
    assert!(tail.free);

    // The shrunk block now borders its own tail, so the padding before the
    // tail header is usable again.
    let grown = unsafe { test.heap.reallocate(payload.as_ptr(), 48) }.unwrap();
    assert_eq!(grown, Some(payload));

    // The tail is the one that ends the region now.
    let reused = test.heap.allocate(tail.size).unwrap();
    assert_eq!(reused.as_ptr(), tail.payload);
    let moved = unsafe { test.heap.reallocate(reused.as_ptr(), tail.size + 1) }.unwrap();
    assert_ne!(moved, Some(reused));
  }

  #[test]
  fn failed_move_keeps_original() {
    let mut test = TestHeap::new(2048, 1024);

    let payload = test.heap.allocate(10).unwrap();
    test.heap.allocate(10).unwrap();
    fill(payload.as_ptr(), 10);

    let result = unsafe { test.heap.reallocate(payload.as_ptr(), 4096) };
    assert_eq!(result, Err(HeapError::OutOfMemory));
    assert_eq!(test.heap.stats().free_blocks, 0);
    check(payload.as_ptr(), 10);
  }
}
