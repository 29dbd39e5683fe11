use thiserror::Error;

/// Positional and lookup failures of [`OrderedList`](crate::OrderedList).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ListError {
  #[error("index {index} out of bounds for list of length {len}")]
  IndexOutOfBounds { index: usize, len: usize },

  #[error("no matching element in list")]
  ValueNotFound,
}

/// Failures reported by [`FirstFitAllocator`](crate::FirstFitAllocator).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
  #[error("invalid argument: {0}")]
  InvalidArgument(&'static str),

  #[error("no allocated block at address {address}")]
  NotFound { address: usize },

  #[error(transparent)]
  List(#[from] ListError),
}

pub type Result<T, E = AllocError> = core::result::Result<T, E>;
