use std::{mem, ptr};

use crate::{align, align_down};

/// Metadata at the start of every block.
///
/// A block is laid out as `[header][padding][payload]`; the header is
/// carved on an [`ALIGNMENT`](crate::align::ALIGNMENT) boundary and the
/// payload starts at the next boundary past the header.
#[repr(C)]
pub struct Block {
  /// Requested payload bytes, header and padding excluded.
  pub size: usize,
  pub is_free: bool,
  /// The next block in the region is not physically adjacent to this one.
  pub region_end: bool,
  /// Next block in creation order.
  pub next: *mut Block,
}

/// Raw size of a [`Block`] header.
pub const HEADER_SIZE: usize = mem::size_of::<Block>();

/// Distance from a header to its payload: the header rounded up to the boundary.
pub const HEADER_SPAN: usize = (HEADER_SIZE + crate::align::ALIGNMENT - 1) & !(crate::align::ALIGNMENT - 1);

impl Block {
  pub fn new(
    size: usize,
    is_free: bool,
    next: *mut Block,
  ) -> Self {
    Self {
      size,
      is_free,
      region_end: false,
      next,
    }
  }

  /// Bytes a block with a payload of `size` occupies, or `None` on overflow.
  pub fn span_for(size: usize) -> Option<usize> {
    align!(size.checked_add(HEADER_SPAN)?)
  }

  /// Writes a fresh header at `address` and returns it.
  ///
  /// # Safety
  ///
  /// `address` must be aligned and point to at least [`HEADER_SIZE`] writable bytes.
  pub unsafe fn write(
    address: usize,
    size: usize,
    is_free: bool,
    next: *mut Block,
  ) -> *mut Block {
    let block = address as *mut Block;
    unsafe { ptr::write(block, Block::new(size, is_free, next)) };
    block
  }

  /// Walks a payload pointer back to its header.
  ///
  /// # Safety
  ///
  /// `payload` must have been produced by [`Block::payload`]; anything else
  /// reads unrelated bytes as metadata.
  pub unsafe fn from_payload(payload: *mut u8) -> *mut Block {
    align_down!((payload as usize).wrapping_sub(HEADER_SIZE)) as *mut Block
  }

  /// # Safety
  ///
  /// `block` must point to a header written by [`Block::write`].
  pub unsafe fn payload(block: *mut Block) -> *mut u8 {
    (block as usize + HEADER_SPAN) as *mut u8
  }

  /// First address past the recorded payload.
  ///
  /// # Safety
  ///
  /// `block` must point to a live header.
  pub unsafe fn payload_end(block: *mut Block) -> usize {
    unsafe { block as usize + HEADER_SPAN + (*block).size }
  }
}
