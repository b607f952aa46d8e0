use thiserror::Error;

/// Why an entry point handed back a null pointer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
  /// Zero-byte request.
  #[error("Invalid size (must be non-zero)")]
  InvalidSize,
  /// The break could not be extended.
  #[error("Out of memory")]
  OutOfMemory,
  /// Size or alignment arithmetic does not fit in `usize`.
  #[error("Requested size overflows the address space")]
  SizeOverflow,
}

pub type Result<T> = core::result::Result<T, HeapError>;
