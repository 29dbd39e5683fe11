use std::fmt;

/// A contiguous range `[base_address, base_address + length)` of the
/// simulated address space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Block {
  pub base_address: usize,
  pub length: usize,
}

impl Block {
  pub fn new(
    base_address: usize,
    length: usize,
  ) -> Self {
    Self {
      base_address,
      length,
    }
  }

  /// One past the last address covered by this block.
  ///
  /// Blocks handed out by the allocator always end inside the managed space.
  /// For arbitrary blocks use [`end_checked`](Self::end_checked); this one
  /// panics on overflow.
  pub fn end(&self) -> usize {
    match self.end_checked() {
      Some(end) => end,
      None => panic!("block {self} ends past usize::MAX"),
    }
  }

  pub fn end_checked(&self) -> Option<usize> {
    self.base_address.checked_add(self.length)
  }

  pub fn contains(
    &self,
    address: usize,
  ) -> bool {
    address >= self.base_address && address < self.end()
  }

  pub fn overlaps(
    &self,
    other: &Block,
  ) -> bool {
    self.base_address < other.end() && other.base_address < self.end()
  }

  /// `other` starts exactly where `self` ends.
  pub fn is_adjacent_to(
    &self,
    other: &Block,
  ) -> bool {
    self.end() == other.base_address
  }
}

impl fmt::Display for Block {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "({} , {})", self.base_address, self.length)
  }
}
