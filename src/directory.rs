use std::ptr;

use crate::block::Block;

/// Outcome of a first-fit walk.
pub struct Search {
  /// First free block large enough, or null.
  pub found: *mut Block,
  /// Last block visited before stopping.
  pub last: *mut Block,
}

/// The creation-ordered chain of every block the heap has carved.
///
/// Blocks are only ever appended or spliced in; nothing leaves the chain.
pub struct BlockDirectory {
  base: *mut Block,
}

impl BlockDirectory {
  pub const fn new() -> Self {
    Self {
      base: ptr::null_mut(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.base.is_null()
  }

  /// Walks from the base and stops at the first free block holding at least
  /// `size` bytes, closeness of fit ignored.
  ///
  /// # Safety
  ///
  /// Every header reachable from the base must be intact.
  pub unsafe fn search(
    &self,
    size: usize,
  ) -> Search {
    unsafe {
      let mut last: *mut Block = ptr::null_mut();
      let mut current: *mut Block = self.base;

      while !current.is_null() {
        if (*current).is_free && (*current).size >= size {
          break;
        }
        last = current;
        current = (*current).next;
      }

      Search {
        found: current,
        last,
      }
    }
  }

  /// Links `block` after `last`, or roots the chain with it when `last` is null.
  ///
  /// # Safety
  ///
  /// `last` must be the final block of the chain (or null on an empty chain).
  pub unsafe fn append(
    &mut self,
    last: *mut Block,
    block: *mut Block,
  ) {
    if last.is_null() {
      self.base = block;
    } else {
      unsafe { (*last).next = block };
    }
  }

  /// Splices `block` in directly after `after`, inheriting its successor.
  ///
  /// # Safety
  ///
  /// Both pointers must be valid headers and `after` must be in the chain.
  pub unsafe fn insert_after(
    &mut self,
    after: *mut Block,
    block: *mut Block,
  ) {
    unsafe {
      (*block).next = (*after).next;
      (*after).next = block;
    }
  }

  /// Iterates the chain in creation order.
  ///
  /// # Safety
  ///
  /// The chain must not be mutated while the iterator is alive.
  pub unsafe fn iter(&self) -> Blocks {
    Blocks {
      current: self.base,
    }
  }
}

impl Default for BlockDirectory {
  fn default() -> Self {
    Self::new()
  }
}

pub struct Blocks {
  current: *mut Block,
}

impl Iterator for Blocks {
  type Item = *mut Block;

  fn next(&mut self) -> Option<Self::Item> {
    if self.current.is_null() {
      return None;
    }

    let block = self.current;
    self.current = unsafe { (*block).next };
    Some(block)
  }
}
