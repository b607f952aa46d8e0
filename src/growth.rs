use libc::{c_void, intptr_t, sbrk};

use crate::{
  align,
  error::{HeapError, Result},
  trace,
};

/// A contiguous address range that can be grown at its top.
///
/// # Safety
///
/// Every byte between a previous top returned by [`Break::extend`] and the
/// new top must be writable and owned by the caller until the process ends.
pub unsafe trait Break {
  /// Reads the current top without growing.
  fn query_top(&mut self) -> Result<usize>;

  /// Makes `increment` more bytes available, returning the previous top.
  fn extend(
    &mut self,
    increment: usize,
  ) -> Result<usize>;
}

/// The process program break.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sbrk;

unsafe impl Break for Sbrk {
  fn query_top(&mut self) -> Result<usize> {
    let top = unsafe { sbrk(0) };

    if top == usize::MAX as *mut c_void {
      trace::sbrk_error();
      return Err(HeapError::OutOfMemory);
    }

    Ok(top as usize)
  }

  fn extend(
    &mut self,
    increment: usize,
  ) -> Result<usize> {
    let increment = intptr_t::try_from(increment).map_err(|_| HeapError::OutOfMemory)?;
    let previous = unsafe { sbrk(increment) };

    if previous == usize::MAX as *mut c_void {
      trace::sbrk_error();
      return Err(HeapError::OutOfMemory);
    }

    Ok(previous as usize)
  }
}

/// A fixed buffer handed out like a program break.
#[derive(Debug)]
pub struct FixedBreak {
  end: usize,
  top: usize,
}

impl FixedBreak {
  /// # Safety
  ///
  /// `start..start + len` must be writable and must not be used by anything
  /// else for as long as a heap built on it is alive.
  pub unsafe fn new(
    start: *mut u8,
    len: usize,
  ) -> Self {
    let top = start as usize;
    Self {
      end: top + len,
      top,
    }
  }

  /// Bytes left before `extend` starts failing.
  pub fn remaining(&self) -> usize {
    self.end - self.top
  }
}

unsafe impl Break for FixedBreak {
  fn query_top(&mut self) -> Result<usize> {
    Ok(self.top)
  }

  fn extend(
    &mut self,
    increment: usize,
  ) -> Result<usize> {
    let top = self
      .top
      .checked_add(increment)
      .filter(|&top| top <= self.end)
      .ok_or(HeapError::OutOfMemory)?;

    let previous = self.top;
    self.top = top;
    Ok(previous)
  }
}

/// Where a new block landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Carve {
  pub address: usize,
  /// The break moved under us since the last growth, so this block opens a
  /// new region that does not touch the previous one.
  pub new_region: bool,
}

/// Owns the break and the two addresses the allocator tracks inside it.
pub struct HeapGrowth<B> {
  pub(crate) source: B,
  chunk_size: usize,
  /// Top of the most recent extension, `0` before the first one.
  top: usize,
  /// First unused byte of the most recent extension.
  cursor: usize,
}

impl<B: Break> HeapGrowth<B> {
  pub const fn new(
    source: B,
    chunk_size: usize,
  ) -> Self {
    Self {
      source,
      chunk_size,
      top: 0,
      cursor: 0,
    }
  }

  pub fn top(&self) -> usize {
    self.top
  }

  pub fn cursor(&self) -> usize {
    self.cursor
  }

  pub fn query_top(&mut self) -> Result<usize> {
    self.source.query_top()
  }

  /// Reserves `span` bytes at the cursor, growing the break first if they
  /// do not fit below the current top. `span` must be a multiple of the
  /// alignment boundary.
  ///
  /// On error nothing is recorded; bytes already taken from the break stay
  /// with the process.
  pub fn carve(
    &mut self,
    span: usize,
  ) -> Result<Carve> {
    let current = self.query_top()?;

    let fits = self.top != 0
      && self
        .cursor
        .checked_add(span)
        .is_some_and(|end| end <= self.top);

    let mut new_region = false;
    if !fits {
      new_region = self.grow(current, span)?;
    }

    let address = self.cursor;
    self.cursor += span;

    Ok(Carve {
      address,
      new_region,
    })
  }

  /// Extends the break so `span` bytes fit at the cursor.
  ///
  /// Returns whether the cursor had to jump to a new region.
  fn grow(
    &mut self,
    current: usize,
    span: usize,
  ) -> Result<bool> {
    let amount = if span > self.chunk_size {
      span
    } else {
      self.chunk_size
    };

    let contiguous = self.top != 0 && current == self.top;
    let slack = if contiguous {
      0
    } else {
      align!(current).ok_or(HeapError::SizeOverflow)? - current
    };
    let increment = amount.checked_add(slack).ok_or(HeapError::OutOfMemory)?;

    let previous = self.source.extend(increment)?;
    let top = previous.checked_add(increment).ok_or(HeapError::OutOfMemory)?;

    let contiguous = self.top != 0 && previous == self.top;
    let start = if contiguous {
      self.cursor
    } else {
      align!(previous).ok_or(HeapError::SizeOverflow)?
    };

    // The break moved between reading it and extending it.
    if start.checked_add(span).is_none_or(|end| end > top) {
      return Err(HeapError::OutOfMemory);
    }

    let new_region = self.top != 0 && !contiguous;
    self.top = top;
    self.cursor = start;

    Ok(new_region)
  }

  /// Lets the block ending the chain stretch to `end` without growing.
  ///
  /// `end` is the block's new aligned end. Returns `false`, changing
  /// nothing, if the current top cannot hold it.
  pub fn absorb(
    &mut self,
    end: usize,
  ) -> bool {
    if end > self.top {
      return false;
    }

    self.cursor = self.cursor.max(end);
    true
  }
}
