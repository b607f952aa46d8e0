/// Every header and every payload starts on a multiple of this boundary.
pub const ALIGNMENT: usize = 16;

/// Rounds the given address or size up to [`ALIGNMENT`].
///
/// Evaluates to `None` when rounding would overflow `usize`.
///
/// # Examples
///
/// ```rust
/// use brkalloc::align;
///
/// assert_eq!(align!(13), Some(16));
/// assert_eq!(align!(32), Some(32));
/// assert_eq!(align!(usize::MAX), None);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value as usize)
      .checked_add($crate::align::ALIGNMENT - 1)
      .map(|v| v & !($crate::align::ALIGNMENT - 1))
  };
}

/// Rounds the given address down to [`ALIGNMENT`].
///
/// This is the inverse of [`align!`] for addresses that were produced by it.
#[macro_export]
macro_rules! align_down {
  ($value:expr) => {
    ($value as usize) & !($crate::align::ALIGNMENT - 1)
  };
}
