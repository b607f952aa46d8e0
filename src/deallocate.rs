use crate::{block::Block, growth::Break, heap::Heap};

impl<B: Break> Heap<B> {
  /// Marks the block behind `payload` as free for later reuse.
  ///
  /// The block stays in the chain with its size and contents untouched and
  /// is never merged with its neighbours. Null is a no-op.
  ///
  /// # Safety
  ///
  /// `payload` must be null or a pointer returned by this heap. Freeing
  /// anything else, or freeing twice, is not detected.
  pub unsafe fn deallocate(
    &mut self,
    payload: *mut u8,
  ) {
    if payload.is_null() {
      return;
    }

    unsafe {
      let block = Block::from_payload(payload);
      (*block).is_free = true;
    }
  }
}
