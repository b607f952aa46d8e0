//! One-line call traces that never allocate.
//!
//! Lines are formatted into a fixed stack buffer and written with a single
//! `write(2)`, so tracing is safe from inside the allocator itself.

use std::fmt::{self, Write};

use libc::{STDERR_FILENO, STDOUT_FILENO, c_int, c_void};

use crate::config;

const LINE_CAPACITY: usize = 128;

/// A call observed at one of the four entry points.
#[derive(Debug, Clone, Copy)]
pub enum Event {
  Malloc {
    size: usize,
    result: *mut u8,
    block_size: usize,
  },
  Free {
    payload: *mut u8,
  },
  Realloc {
    payload: *mut u8,
    size: usize,
    result: *mut u8,
    block_size: usize,
  },
  Calloc {
    count: usize,
    size: usize,
    result: *mut u8,
    block_size: usize,
  },
}

impl fmt::Display for Event {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match *self {
      Event::Malloc {
        size,
        result,
        block_size,
      } => write!(f, "MALLOC: malloc({size})\t\t=> (ptr={result:p}, size={block_size})"),
      Event::Free { payload } => write!(f, "MALLOC: free({payload:p})"),
      Event::Realloc {
        payload,
        size,
        result,
        block_size,
      } => write!(
        f,
        "MALLOC: realloc({payload:p},{size})\t=> (ptr={result:p}, size={block_size})"
      ),
      Event::Calloc {
        count,
        size,
        result,
        block_size,
      } => write!(
        f,
        "MALLOC: calloc({count},{size})\t\t=> (ptr={result:p}, size={block_size})"
      ),
    }
  }
}

/// A line of text held on the stack. Anything past its capacity is dropped.
pub struct TraceLine {
  buf: [u8; LINE_CAPACITY],
  len: usize,
}

impl TraceLine {
  pub const fn new() -> Self {
    Self {
      buf: [0; LINE_CAPACITY],
      len: 0,
    }
  }

  /// Formats `event` followed by a newline.
  pub fn of(event: &Event) -> Self {
    let mut line = Self::new();
    let _ = writeln!(line, "{event}");
    line
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.buf[..self.len]
  }

  fn emit(
    &self,
    fd: c_int,
  ) {
    let mut bytes = self.as_bytes();

    while !bytes.is_empty() {
      let written = unsafe { libc::write(fd, bytes.as_ptr() as *const c_void, bytes.len()) };
      if written <= 0 {
        return;
      }
      bytes = &bytes[written as usize..];
    }
  }
}

impl Default for TraceLine {
  fn default() -> Self {
    Self::new()
  }
}

impl Write for TraceLine {
  fn write_str(
    &mut self,
    s: &str,
  ) -> fmt::Result {
    let room = LINE_CAPACITY - self.len;
    let take = s.len().min(room);

    self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
    self.len += take;
    Ok(())
  }
}

/// The line for `event`, or `None` while `DEBUG_MALLOC` is unset.
pub fn render(event: &Event) -> Option<TraceLine> {
  config::tracing_enabled().then(|| TraceLine::of(event))
}

/// Prints `event` to stdout when `DEBUG_MALLOC` is set.
pub fn record(event: Event) {
  if let Some(line) = render(&event) {
    line.emit(STDOUT_FILENO);
  }
}

pub(crate) fn sbrk_error() {
  let mut line = TraceLine::new();
  let _ = line.write_str("sbrk error\n");
  line.emit(STDERR_FILENO);
}
