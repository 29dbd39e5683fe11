/// What `malloc` does when no free block is large enough.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExhaustionPolicy {
  /// Report failure straight away.
  Fail,
  /// Coalesce the free list once and rescan, but only when coalescing would
  /// actually produce a large enough block.
  #[default]
  DefragAndRetry,
}

/// What `free` does with an address that is not the base of an allocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownFreePolicy {
  #[default]
  Error,
  Ignore,
}

/// Tunable behavior of a [`FirstFitAllocator`](crate::FirstFitAllocator).
///
/// ```rust
/// use memspace::{ExhaustionPolicy, Policy, UnknownFreePolicy};
///
/// let policy = Policy::default()
///   .with_exhaustion(ExhaustionPolicy::Fail)
///   .with_unknown_free(UnknownFreePolicy::Ignore)
///   .with_defrag_on_free(true);
///
/// assert!(policy.defrag_on_free);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Policy {
  pub on_exhaustion: ExhaustionPolicy,
  pub on_unknown_free: UnknownFreePolicy,
  /// Run `defrag` after every successful `free`.
  pub defrag_on_free: bool,
}

impl Policy {
  pub fn with_exhaustion(
    mut self,
    on_exhaustion: ExhaustionPolicy,
  ) -> Self {
    self.on_exhaustion = on_exhaustion;
    self
  }

  pub fn with_unknown_free(
    mut self,
    on_unknown_free: UnknownFreePolicy,
  ) -> Self {
    self.on_unknown_free = on_unknown_free;
    self
  }

  pub fn with_defrag_on_free(
    mut self,
    defrag_on_free: bool,
  ) -> Self {
    self.defrag_on_free = defrag_on_free;
    self
  }
}
