//! Slot storage for [`Block`]s.
//!
//! Lists never hold a `Block` by value. They hold a [`BlockId`], and every
//! split or merge writes through the arena, so whoever holds the id (a scan in
//! progress, the other list, a test) sees the updated range.

use std::ops::{Index, IndexMut};

use crate::block::Block;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockId(usize);

#[derive(Debug, Default)]
pub struct BlockArena {
  slots: Vec<Option<Block>>,
  vacant: Vec<BlockId>,
}

impl BlockArena {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(
    &mut self,
    block: Block,
  ) -> BlockId {
    match self.vacant.pop() {
      Some(id) => {
        self.slots[id.0] = Some(block);
        id
      }
      None => {
        self.slots.push(Some(block));
        BlockId(self.slots.len() - 1)
      }
    }
  }

  /// Releases the slot; the id may be handed out again by a later `insert`.
  pub fn remove(
    &mut self,
    id: BlockId,
  ) -> Option<Block> {
    let block = self.slots.get_mut(id.0)?.take()?;
    self.vacant.push(id);
    Some(block)
  }

  pub fn get(
    &self,
    id: BlockId,
  ) -> Option<&Block> {
    self.slots.get(id.0)?.as_ref()
  }

  pub fn get_mut(
    &mut self,
    id: BlockId,
  ) -> Option<&mut Block> {
    self.slots.get_mut(id.0)?.as_mut()
  }

  /// Number of live blocks.
  pub fn len(&self) -> usize {
    self.slots.len() - self.vacant.len()
  }
}

impl Index<BlockId> for BlockArena {
  type Output = Block;

  fn index(
    &self,
    id: BlockId,
  ) -> &Block {
    match self.get(id) {
      Some(block) => block,
      None => panic!("stale block id {}", id.0),
    }
  }
}

impl IndexMut<BlockId> for BlockArena {
  fn index_mut(
    &mut self,
    id: BlockId,
  ) -> &mut Block {
    match self.get_mut(id) {
      Some(block) => block,
      None => panic!("stale block id {}", id.0),
    }
  }
}
