use std::ffi::CStr;

/// Default growth increment for requests that fit in a chunk.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Environment variable that turns on one trace line per call.
pub const DEBUG_ENV: &CStr = c"DEBUG_MALLOC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
  /// Bytes requested from the break when a block fits in one chunk.
  pub chunk_size: usize,
}

impl HeapConfig {
  pub const fn new() -> Self {
    Self {
      chunk_size: CHUNK_SIZE,
    }
  }

  pub const fn chunk_size(
    mut self,
    chunk_size: usize,
  ) -> Self {
    self.chunk_size = chunk_size;
    self
  }
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self::new()
  }
}

/// Whether `DEBUG_MALLOC` is set in the environment.
///
/// Goes through `getenv` directly so it can run inside the allocator
/// without allocating.
pub fn tracing_enabled() -> bool {
  unsafe { !libc::getenv(DEBUG_ENV.as_ptr()).is_null() }
}
