use std::ptr;

use crate::{
  block::Block,
  config::HeapConfig,
  directory::BlockDirectory,
  error::{HeapError, Result},
  growth::{Break, HeapGrowth},
};

/// All allocator state: the block chain and the break it was carved from.
///
/// Nothing is requested from the break until the first block is needed.
pub struct Heap<B> {
  pub(crate) directory: BlockDirectory,
  pub(crate) growth: HeapGrowth<B>,
}

// The raw pointers only ever reference memory handed out by the break,
// which is owned by whoever owns the heap.
unsafe impl<B: Send> Send for Heap<B> {}

/// A block as seen from outside the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  pub payload: *mut u8,
  pub size: usize,
  pub free: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
  /// Blocks in the chain, live or free.
  pub blocks: usize,
  pub free_blocks: usize,
  /// Recorded payload bytes of live blocks.
  pub used_bytes: usize,
  /// Recorded payload bytes of free blocks.
  pub free_bytes: usize,
  /// Top of the most recent extension.
  pub top: usize,
  /// First unused byte below `top`.
  pub cursor: usize,
}

impl<B: Break> Heap<B> {
  pub const fn new(source: B) -> Self {
    Self::with_config(source, HeapConfig::new())
  }

  pub const fn with_config(
    source: B,
    config: HeapConfig,
  ) -> Self {
    Self {
      directory: BlockDirectory::new(),
      growth: HeapGrowth::new(source, config.chunk_size),
    }
  }

  /// Carves a brand-new live block of `size` bytes and links it after `last`.
  ///
  /// On error the chain is left exactly as it was.
  ///
  /// # Safety
  ///
  /// `last` must be the final block of the chain, or null when it is empty.
  pub(crate) unsafe fn create(
    &mut self,
    last: *mut Block,
    size: usize,
  ) -> Result<*mut Block> {
    let span = Block::span_for(size).ok_or(HeapError::SizeOverflow)?;
    let carve = self.growth.carve(span)?;

    unsafe {
      let block = Block::write(carve.address, size, false, ptr::null_mut());

      if carve.new_region && !last.is_null() {
        (*last).region_end = true;
      }
      self.directory.append(last, block);

      Ok(block)
    }
  }

  /// Recorded size of the block behind `payload`.
  ///
  /// # Safety
  ///
  /// `payload` must be a live pointer returned by this heap.
  pub unsafe fn usable_size(
    &self,
    payload: *mut u8,
  ) -> usize {
    unsafe { (*Block::from_payload(payload)).size }
  }

  /// Walks every block in creation order.
  pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    unsafe { self.directory.iter() }.map(|block| unsafe {
      BlockInfo {
        payload: Block::payload(block),
        size: (*block).size,
        free: (*block).is_free,
      }
    })
  }

  pub fn stats(&self) -> HeapStats {
    let mut stats = HeapStats {
      top: self.growth.top(),
      cursor: self.growth.cursor(),
      ..HeapStats::default()
    };

    for block in self.blocks() {
      stats.blocks += 1;
      if block.free {
        stats.free_blocks += 1;
        stats.free_bytes += block.size;
      } else {
        stats.used_bytes += block.size;
      }
    }

    stats
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::growth::FixedBreak;

  /// A heap over its own buffer; the buffer lives as long as the heap.
  pub(crate) struct TestHeap {
    pub heap: Heap<FixedBreak>,
    _storage: Vec<u128>,
  }

  impl TestHeap {
    pub fn new(
      len: usize,
      chunk_size: usize,
    ) -> Self {
      let mut storage = vec![0u128; len / 16];
      let source = unsafe { FixedBreak::new(storage.as_mut_ptr() as *mut u8, len) };
      let heap = Heap::with_config(source, HeapConfig::new().chunk_size(chunk_size));

      Self {
        heap,
        _storage: storage,
      }
    }
  }

  #[test]
  fn fresh_heap_is_empty() {
    let test = TestHeap::new(4096, 1024);
    let stats = test.heap.stats();

    assert_eq!(stats, HeapStats::default());
    assert_eq!(test.heap.blocks().count(), 0);
  }

  #[test]
  fn create_links_in_order() {
    let mut test = TestHeap::new(4096, 1024);

    unsafe {
      let first = test.heap.create(ptr::null_mut(), 10).unwrap();
      let second = test.heap.create(first, 20).unwrap();

      assert_eq!((*first).next, second);
      assert!(!(*first).region_end);
    }

    let sizes: Vec<usize> = test.heap.blocks().map(|b| b.size).collect();
    assert_eq!(sizes, vec![10, 20]);
  }

  #[test]
  fn failed_create_leaves_chain_alone() {
    let mut test = TestHeap::new(1024, 512);

    unsafe {
      let first = test.heap.create(ptr::null_mut(), 10).unwrap();

      assert_eq!(test.heap.create(first, 4096), Err(HeapError::OutOfMemory));
      assert!((*first).next.is_null());
    }

    assert_eq!(test.heap.stats().blocks, 1);
  }

  #[test]
  fn stats_split_live_and_free() {
    let mut test = TestHeap::new(4096, 1024);

    unsafe {
      let first = test.heap.create(ptr::null_mut(), 10).unwrap();
      let second = test.heap.create(first, 20).unwrap();
      (*second).is_free = true;
    }

    let stats = test.heap.stats();
    assert_eq!(stats.blocks, 2);
    assert_eq!(stats.free_blocks, 1);
    assert_eq!(stats.used_bytes, 10);
    assert_eq!(stats.free_bytes, 20);
    assert!(stats.cursor <= stats.top);
  }
}
