//! Ordered sequence consumed by the allocator.
//!
//! ```text
//!   OrderedList<T>
//!
//!   index:   0       1       2       3
//!          ┌───────┬───────┬───────┬───────┐
//!          │   a   │   b   │   c   │   d   │
//!          └───────┴───────┴───────┴───────┘
//!                      ▲
//!                      └── CursorMut (current = b, peek_next = c)
//! ```
//!
//! A [`CursorMut`] holds the list's unique borrow, so while a traversal is
//! active the only way to change the list is through the cursor itself.
//! Removing through the cursor leaves it on the element that followed the
//! removed one.

use std::fmt;

use crate::error::ListError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderedList<T> {
  items: Vec<T>,
}

impl<T> Default for OrderedList<T> {
  fn default() -> Self {
    Self { items: Vec::new() }
  }
}

impl<T> OrderedList<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn first(&self) -> Option<&T> {
    self.items.first()
  }

  pub fn last(&self) -> Option<&T> {
    self.items.last()
  }

  pub fn append(
    &mut self,
    item: T,
  ) {
    self.items.push(item);
  }

  pub fn push_front(
    &mut self,
    item: T,
  ) {
    self.items.insert(0, item);
  }

  /// Inserts `item` before position `index`; `index == len` appends.
  pub fn insert_at(
    &mut self,
    index: usize,
    item: T,
  ) -> Result<(), ListError> {
    if index > self.items.len() {
      return Err(self.out_of_bounds(index));
    }
    self.items.insert(index, item);
    Ok(())
  }

  pub fn remove_at(
    &mut self,
    index: usize,
  ) -> Result<T, ListError> {
    if index >= self.items.len() {
      return Err(self.out_of_bounds(index));
    }
    Ok(self.items.remove(index))
  }

  pub fn value_at(
    &self,
    index: usize,
  ) -> Result<&T, ListError> {
    let len = self.items.len();
    self
      .items
      .get(index)
      .ok_or(ListError::IndexOutOfBounds { index, len })
  }

  pub fn value_at_mut(
    &mut self,
    index: usize,
  ) -> Result<&mut T, ListError> {
    let len = self.items.len();
    self
      .items
      .get_mut(index)
      .ok_or(ListError::IndexOutOfBounds { index, len })
  }

  pub fn iter(&self) -> std::slice::Iter<'_, T> {
    self.items.iter()
  }

  pub fn cursor_mut(&mut self) -> CursorMut<'_, T> {
    CursorMut {
      list: self,
      index: 0,
    }
  }

  /// Stable in-place sort; elements keep their identity, only their order
  /// changes.
  pub fn sort_by_key<K, F>(
    &mut self,
    f: F,
  ) where
    K: Ord,
    F: FnMut(&T) -> K,
  {
    self.items.sort_by_key(f);
  }

  fn out_of_bounds(
    &self,
    index: usize,
  ) -> ListError {
    ListError::IndexOutOfBounds {
      index,
      len: self.items.len(),
    }
  }
}

impl<T: PartialEq> OrderedList<T> {
  pub fn index_of(
    &self,
    item: &T,
  ) -> Option<usize> {
    self.items.iter().position(|candidate| candidate == item)
  }

  /// Removes the first element equal to `item` and returns its former index.
  pub fn remove_by_value(
    &mut self,
    item: &T,
  ) -> Result<usize, ListError> {
    let index = self.index_of(item).ok_or(ListError::ValueNotFound)?;
    self.items.remove(index);
    Ok(index)
  }
}

impl<'a, T> IntoIterator for &'a OrderedList<T> {
  type Item = &'a T;
  type IntoIter = std::slice::Iter<'a, T>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.iter()
  }
}

impl<T> FromIterator<T> for OrderedList<T> {
  fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
    Self {
      items: iter.into_iter().collect(),
    }
  }
}

impl<T: fmt::Display> fmt::Display for OrderedList<T> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in self.items.iter().enumerate() {
      if i > 0 {
        write!(f, ", ")?;
      }
      write!(f, "{item}")?;
    }
    write!(f, "]")
  }
}

/// Forward traversal over an [`OrderedList`] that can inspect, replace and
/// remove the element it is visiting.
pub struct CursorMut<'a, T> {
  list: &'a mut OrderedList<T>,
  index: usize,
}

impl<T> CursorMut<'_, T> {
  /// Position of the visited element, `None` once the traversal is exhausted.
  pub fn index(&self) -> Option<usize> {
    (self.index < self.list.len()).then_some(self.index)
  }

  pub fn current(&self) -> Option<&T> {
    self.list.items.get(self.index)
  }

  pub fn current_mut(&mut self) -> Option<&mut T> {
    self.list.items.get_mut(self.index)
  }

  pub fn peek_next(&self) -> Option<&T> {
    self.list.items.get(self.index + 1)
  }

  pub fn move_next(&mut self) {
    if self.index < self.list.len() {
      self.index += 1;
    }
  }

  /// Restarts the traversal at the first element.
  pub fn reset(&mut self) {
    self.index = 0;
  }

  /// Removes the visited element; the cursor then visits its successor.
  pub fn remove_current(&mut self) -> Option<T> {
    if self.index < self.list.len() {
      Some(self.list.items.remove(self.index))
    } else {
      None
    }
  }

  /// Removes the successor of the visited element without moving.
  pub fn remove_next(&mut self) -> Option<T> {
    if self.index + 1 < self.list.len() {
      Some(self.list.items.remove(self.index + 1))
    } else {
      None
    }
  }
}
