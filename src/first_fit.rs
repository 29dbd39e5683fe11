use std::fmt;

use log::{debug, trace, warn};

use crate::{
  arena::{BlockArena, BlockId},
  block::Block,
  error::{AllocError, Result},
  event::{Event, Observer},
  list::OrderedList,
  policy::{ExhaustionPolicy, Policy, UnknownFreePolicy},
};

pub struct FirstFitAllocator {
  max_size: usize,
  arena: BlockArena,
  free: OrderedList<BlockId>,
  allocated: OrderedList<BlockId>,
  policy: Policy,
  observer: Option<Box<dyn Observer>>,
}

impl FirstFitAllocator {
  pub fn new(max_size: usize) -> Result<Self> {
    Self::with_policy(max_size, Policy::default())
  }

  pub fn with_policy(
    max_size: usize,
    policy: Policy,
  ) -> Result<Self> {
    if max_size == 0 {
      return Err(AllocError::InvalidArgument(
        "memory space size must be positive",
      ));
    }

    let mut arena = BlockArena::new();
    let mut free = OrderedList::new();
    free.append(arena.insert(Block::new(0, max_size)));

    debug!("memory space of {max_size} words, policy {policy:?}");

    Ok(Self {
      max_size,
      arena,
      free,
      allocated: OrderedList::new(),
      policy,
      observer: None,
    })
  }

  pub fn policy(&self) -> Policy {
    self.policy
  }

  pub fn set_observer<O: Observer + 'static>(
    &mut self,
    observer: O,
  ) {
    self.observer = Some(Box::new(observer));
  }

  pub fn take_observer(&mut self) -> Option<Box<dyn Observer>> {
    self.observer.take()
  }

  /// Allocates `length` words and returns the base address of the new block.
  ///
  /// `Ok(None)` means no free block could hold the request; in that case
  /// neither list has been touched.
  pub fn malloc(
    &mut self,
    length: usize,
  ) -> Result<Option<usize>> {
    if length == 0 {
      return Err(AllocError::InvalidArgument(
        "allocation length must be positive",
      ));
    }

    let mut retried = false;
    loop {
      if let Some(address) = self.take_first_fit(length) {
        debug!("malloc({length}) -> {address}");
        self.notify(Event::Allocated { address, length });
        return Ok(Some(address));
      }

      if retried
        || self.policy.on_exhaustion == ExhaustionPolicy::Fail
        || !self.coalesced_fit_exists(length)
      {
        break;
      }

      debug!("malloc({length}): no single block fits, defragmenting");
      self.defrag();
      retried = true;
    }

    debug!("malloc({length}) failed, {} words free", self.free_capacity());
    self.notify(Event::AllocationFailed { length });
    Ok(None)
  }

  fn take_first_fit(
    &mut self,
    length: usize,
  ) -> Option<usize> {
    let mut cursor = self.free.cursor_mut();

    while let Some(&id) = cursor.current() {
      let block = &mut self.arena[id];

      if block.length >= length {
        let address = block.base_address;

        if block.length == length {
          cursor.remove_current();
          self.allocated.append(id);
        } else {
          block.base_address += length;
          block.length -= length;
          let allocated = self.arena.insert(Block::new(address, length));
          self.allocated.append(allocated);
        }

        return Some(address);
      }

      trace!("skipping free block {block}");
      cursor.move_next();
    }

    None
  }

  /// Whether coalescing the free list would yield a block of at least
  /// `length` words. Leaves the free list untouched.
  fn coalesced_fit_exists(
    &self,
    length: usize,
  ) -> bool {
    let mut ranges: Vec<Block> = self.free_blocks().collect();
    ranges.sort_by_key(|block| block.base_address);

    let mut run = 0;
    let mut run_end = None;
    for block in ranges {
      if run_end == Some(block.base_address) {
        run += block.length;
      } else {
        run = block.length;
      }
      run_end = Some(block.end());

      if run >= length {
        return true;
      }
    }

    false
  }

  /// Releases the allocation whose base address is `address`.
  ///
  /// The range is appended to the free list as its own entry; it is only
  /// merged with neighbours by [`defrag`](Self::defrag), or right away when
  /// the policy asks for `defrag_on_free`.
  pub fn free(
    &mut self,
    address: usize,
  ) -> Result<()> {
    let position = self
      .allocated
      .iter()
      .position(|&id| self.arena[id].base_address == address);

    let Some(index) = position else {
      self.notify(Event::UnknownFree { address });
      return match self.policy.on_unknown_free {
        UnknownFreePolicy::Error => {
          debug!("free({address}): no such allocation");
          Err(AllocError::NotFound { address })
        }
        UnknownFreePolicy::Ignore => {
          warn!("free({address}): no such allocation, ignoring");
          Ok(())
        }
      };
    };

    let id = self.allocated.remove_at(index)?;
    self.free.append(id);

    let length = self.arena[id].length;
    debug!("free({address}) released {length} words");
    self.notify(Event::Freed { address, length });

    if self.policy.defrag_on_free {
      self.defrag();
    }

    Ok(())
  }

  /// Sorts the free list by base address and merges every run of adjacent
  /// blocks into one. Returns the number of blocks absorbed.
  pub fn defrag(&mut self) -> usize {
    let merged = self.coalesce_free_list();

    debug!("defrag merged {merged} blocks, {} remain free", self.free.len());
    self.notify(Event::Defragmented { merged });
    merged
  }

  fn coalesce_free_list(&mut self) -> usize {
    if self.free.len() < 2 {
      return 0;
    }

    let arena = &self.arena;
    self.free.sort_by_key(|&id| arena[id].base_address);

    let mut merged = 0;
    let mut cursor = self.free.cursor_mut();

    while let Some(&current) = cursor.current() {
      let next = cursor.peek_next().copied();

      match next {
        Some(next) if self.arena[current].is_adjacent_to(&self.arena[next]) => {
          cursor.remove_next();
          if let Some(absorbed) = self.arena.remove(next) {
            trace!("merging {absorbed} into {}", self.arena[current]);
            self.arena[current].length += absorbed.length;
          }
          merged += 1;
        }
        _ => cursor.move_next(),
      }
    }

    merged
  }

  pub fn max_size(&self) -> usize {
    self.max_size
  }

  pub fn free_blocks(&self) -> impl Iterator<Item = Block> + '_ {
    self.free.iter().map(|&id| self.arena[id])
  }

  pub fn allocated_blocks(&self) -> impl Iterator<Item = Block> + '_ {
    self.allocated.iter().map(|&id| self.arena[id])
  }

  pub fn free_capacity(&self) -> usize {
    self.free_blocks().map(|block| block.length).sum()
  }

  pub fn allocated_capacity(&self) -> usize {
    self.allocated_blocks().map(|block| block.length).sum()
  }

  pub fn largest_free_block(&self) -> Option<Block> {
    self.free_blocks().max_by_key(|block| block.length)
  }

  /// Length of the allocation starting at `address`, if there is one.
  pub fn allocation_size(
    &self,
    address: usize,
  ) -> Option<usize> {
    self
      .allocated_blocks()
      .find(|block| block.base_address == address)
      .map(|block| block.length)
  }

  /// Free list on the first line, allocated list on the second.
  pub fn debug_string(&self) -> String {
    self.to_string()
  }

  fn notify(
    &mut self,
    event: Event,
  ) {
    if let Some(observer) = self.observer.as_mut() {
      observer.on_event(&event);
    }
  }
}

impl fmt::Display for FirstFitAllocator {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    let free: OrderedList<Block> = self.free_blocks().collect();
    let allocated: OrderedList<Block> = self.allocated_blocks().collect();
    write!(f, "{free}\n{allocated}")
  }
}

impl fmt::Debug for FirstFitAllocator {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("FirstFitAllocator")
      .field("max_size", &self.max_size)
      .field("free", &self.free_blocks().collect::<Vec<_>>())
      .field("allocated", &self.allocated_blocks().collect::<Vec<_>>())
      .field("live_blocks", &self.arena.len())
      .field("policy", &self.policy)
      .field("observer", &self.observer.is_some())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use test_log::test;

  use super::*;

  fn space_with(
    max_size: usize,
    free: &[Block],
    allocated: &[Block],
    policy: Policy,
  ) -> FirstFitAllocator {
    let mut arena = BlockArena::new();
    let free = free.iter().map(|&block| arena.insert(block)).collect();
    let allocated = allocated.iter().map(|&block| arena.insert(block)).collect();

    FirstFitAllocator {
      max_size,
      arena,
      free,
      allocated,
      policy,
      observer: None,
    }
  }

  fn free_of(space: &FirstFitAllocator) -> Vec<(usize, usize)> {
    space
      .free_blocks()
      .map(|block| (block.base_address, block.length))
      .collect()
  }

  fn allocated_of(space: &FirstFitAllocator) -> Vec<(usize, usize)> {
    space
      .allocated_blocks()
      .map(|block| (block.base_address, block.length))
      .collect()
  }

  #[test]
  fn test_new_spans_whole_space() {
    let space = FirstFitAllocator::new(100).unwrap();

    assert_eq!(free_of(&space), vec![(0, 100)]);
    assert!(allocated_of(&space).is_empty());
    assert_eq!(space.max_size(), 100);
  }

  #[test]
  fn test_invalid_arguments() {
    assert!(matches!(
      FirstFitAllocator::new(0),
      Err(AllocError::InvalidArgument(_))
    ));

    let mut space = FirstFitAllocator::new(10).unwrap();
    assert!(matches!(
      space.malloc(0),
      Err(AllocError::InvalidArgument(_))
    ));
    assert_eq!(free_of(&space), vec![(0, 10)]);
  }

  #[test]
  fn test_first_fit_splits_first_large_enough_block() {
    let mut space = space_with(
      25,
      &[Block::new(0, 10), Block::new(20, 5)],
      &[Block::new(10, 10)],
      Policy::default(),
    );

    assert_eq!(space.malloc(4).unwrap(), Some(0));
    assert_eq!(free_of(&space), vec![(4, 6), (20, 5)]);
    assert_eq!(allocated_of(&space), vec![(10, 10), (0, 4)]);
  }

  #[test]
  fn test_first_fit_skips_small_blocks() {
    let mut space = space_with(
      25,
      &[Block::new(0, 3), Block::new(20, 5)],
      &[Block::new(3, 17)],
      Policy::default(),
    );

    assert_eq!(space.malloc(5).unwrap(), Some(20));
    assert_eq!(free_of(&space), vec![(0, 3)]);
  }

  #[test]
  fn test_split_mutates_block_in_place() {
    let mut space = FirstFitAllocator::new(270).unwrap();
    space.malloc(250).unwrap();
    let before = *space.free.value_at(0).unwrap();

    assert_eq!(space.malloc(17).unwrap(), Some(250));

    assert_eq!(*space.free.value_at(0).unwrap(), before);
    assert_eq!(space.arena[before], Block::new(267, 3));
  }

  #[test]
  fn test_exact_fit_removes_free_block() {
    let mut space = FirstFitAllocator::new(10).unwrap();

    assert_eq!(space.malloc(10).unwrap(), Some(0));
    assert!(free_of(&space).is_empty());
    assert_eq!(allocated_of(&space), vec![(0, 10)]);
    assert_eq!(space.malloc(1).unwrap(), None);
  }

  #[test]
  fn test_exhaustion_leaves_lists_unchanged() {
    let mut space = FirstFitAllocator::new(5).unwrap();

    assert_eq!(space.malloc(6).unwrap(), None);
    assert_eq!(free_of(&space), vec![(0, 5)]);
    assert!(allocated_of(&space).is_empty());
  }

  #[test]
  fn test_failed_retry_does_not_regroup_free_list() {
    let mut space = space_with(
      12,
      &[Block::new(8, 2), Block::new(0, 2), Block::new(2, 3)],
      &[Block::new(5, 3), Block::new(10, 2)],
      Policy::default(),
    );

    assert_eq!(space.malloc(6).unwrap(), None);
    assert_eq!(free_of(&space), vec![(8, 2), (0, 2), (2, 3)]);
  }

  #[test]
  fn test_defrag_and_retry() {
    let mut space = FirstFitAllocator::new(10).unwrap();
    space.malloc(5).unwrap();
    space.malloc(5).unwrap();
    space.free(5).unwrap();
    space.free(0).unwrap();
    assert_eq!(free_of(&space), vec![(5, 5), (0, 5)]);

    assert_eq!(space.malloc(8).unwrap(), Some(0));
    assert_eq!(free_of(&space), vec![(8, 2)]);
  }

  #[test]
  fn test_fail_policy_skips_retry() {
    let mut space = FirstFitAllocator::with_policy(
      10,
      Policy::default().with_exhaustion(ExhaustionPolicy::Fail),
    )
    .unwrap();
    space.malloc(5).unwrap();
    space.malloc(5).unwrap();
    space.free(0).unwrap();
    space.free(5).unwrap();

    assert_eq!(space.malloc(8).unwrap(), None);
    assert_eq!(free_of(&space), vec![(0, 5), (5, 5)]);
  }

  #[test]
  fn test_free_round_trip() {
    let mut space = FirstFitAllocator::new(20).unwrap();
    let address = space.malloc(5).unwrap().unwrap();
    assert_eq!(space.allocation_size(address), Some(5));

    space.free(address).unwrap();

    assert_eq!(space.free_capacity(), 20);
    assert_eq!(space.allocated_capacity(), 0);
    assert_eq!(space.allocation_size(address), None);
    assert_eq!(free_of(&space), vec![(5, 15), (0, 5)]);
  }

  #[test]
  fn test_free_unknown_address() {
    let mut space = FirstFitAllocator::new(20).unwrap();
    space.malloc(5).unwrap();

    assert_eq!(space.free(3), Err(AllocError::NotFound { address: 3 }));
    assert_eq!(allocated_of(&space), vec![(0, 5)]);
    assert_eq!(free_of(&space), vec![(5, 15)]);

    let mut lenient = FirstFitAllocator::with_policy(
      20,
      Policy::default().with_unknown_free(UnknownFreePolicy::Ignore),
    )
    .unwrap();
    lenient.malloc(5).unwrap();

    assert_eq!(lenient.free(3), Ok(()));
    assert_eq!(allocated_of(&lenient), vec![(0, 5)]);
    assert_eq!(free_of(&lenient), vec![(5, 15)]);
  }

  #[test]
  fn test_double_free_is_reported() {
    let mut space = FirstFitAllocator::new(20).unwrap();
    let address = space.malloc(5).unwrap().unwrap();

    space.free(address).unwrap();
    assert_eq!(
      space.free(address),
      Err(AllocError::NotFound { address })
    );
  }

  #[test]
  fn test_defrag_on_free_policy() {
    let mut space = FirstFitAllocator::with_policy(
      20,
      Policy::default().with_defrag_on_free(true),
    )
    .unwrap();
    let a = space.malloc(5).unwrap().unwrap();
    let b = space.malloc(5).unwrap().unwrap();

    space.free(a).unwrap();
    assert_eq!(free_of(&space), vec![(0, 5), (10, 10)]);

    space.free(b).unwrap();
    assert_eq!(free_of(&space), vec![(0, 20)]);
  }

  #[test]
  fn test_rejected_free_does_not_defrag() {
    let mut space = FirstFitAllocator::with_policy(
      30,
      Policy::default().with_defrag_on_free(true),
    )
    .unwrap();
    let a = space.malloc(5).unwrap().unwrap();
    let b = space.malloc(5).unwrap().unwrap();
    space.malloc(5).unwrap();

    space.free(b).unwrap();
    assert_eq!(free_of(&space), vec![(5, 5), (15, 15)]);

    // Any defrag would put this back in address order.
    space.free.sort_by_key(|&id| std::cmp::Reverse(space.arena[id].base_address));
    let unsorted = vec![(15, 15), (5, 5)];
    assert_eq!(free_of(&space), unsorted);

    assert_eq!(space.free(b), Err(AllocError::NotFound { address: b }));
    assert_eq!(space.free(a + 1), Err(AllocError::NotFound { address: a + 1 }));
    assert_eq!(free_of(&space), unsorted);
    assert_eq!(allocated_of(&space), vec![(0, 5), (10, 5)]);

    space.policy.on_unknown_free = UnknownFreePolicy::Ignore;
    assert_eq!(space.free(b), Ok(()));
    assert_eq!(free_of(&space), unsorted);
  }

  #[test]
  fn test_defrag_coalesces_any_order() {
    let mut space = space_with(
      23,
      &[Block::new(10, 5), Block::new(0, 10), Block::new(20, 3)],
      &[Block::new(15, 5)],
      Policy::default(),
    );
    assert_eq!(space.defrag(), 1);
    assert_eq!(free_of(&space), vec![(0, 15), (20, 3)]);

    let mut space = space_with(
      23,
      &[Block::new(10, 5), Block::new(0, 10), Block::new(20, 3), Block::new(15, 5)],
      &[],
      Policy::default(),
    );
    assert_eq!(space.defrag(), 3);
    assert_eq!(free_of(&space), vec![(0, 23)]);
    assert_eq!(space.arena.len(), 1);
  }

  #[test]
  fn test_defrag_is_idempotent() {
    let mut space = space_with(
      40,
      &[Block::new(30, 10), Block::new(5, 5), Block::new(0, 5), Block::new(20, 5)],
      &[Block::new(10, 10), Block::new(25, 5)],
      Policy::default(),
    );

    space.defrag();
    let once = free_of(&space);
    assert_eq!(once, vec![(0, 10), (20, 5), (30, 10)]);

    assert_eq!(space.defrag(), 0);
    assert_eq!(free_of(&space), once);
    assert_eq!(allocated_of(&space), vec![(10, 10), (25, 5)]);
  }

  #[test]
  fn test_defrag_single_block_is_noop() {
    let mut space = FirstFitAllocator::new(8).unwrap();

    assert_eq!(space.defrag(), 0);
    assert_eq!(free_of(&space), vec![(0, 8)]);
  }

  #[test]
  fn test_largest_free_block() {
    let space = space_with(
      30,
      &[Block::new(0, 4), Block::new(10, 12), Block::new(25, 5)],
      &[Block::new(4, 6), Block::new(22, 3)],
      Policy::default(),
    );

    assert_eq!(space.largest_free_block(), Some(Block::new(10, 12)));
  }

  #[test]
  fn test_debug_string() {
    let mut space = FirstFitAllocator::new(100).unwrap();
    assert_eq!(space.debug_string(), "[(0 , 100)]\n[]");

    space.malloc(17).unwrap();
    space.malloc(3).unwrap();
    assert_eq!(
      space.debug_string(),
      "[(20 , 80)]\n[(0 , 17), (17 , 3)]"
    );
  }

  #[test]
  fn test_observer_receives_events() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);

    let mut space = FirstFitAllocator::new(10).unwrap();
    space.set_observer(move |event: &Event| sink.borrow_mut().push(*event));

    space.malloc(4).unwrap();
    space.malloc(20).unwrap();
    space.free(0).unwrap();
    let _ = space.free(7);
    space.defrag();
    space.defrag();

    assert_eq!(
      *events.borrow(),
      vec![
        Event::Allocated {
          address: 0,
          length: 4,
        },
        Event::AllocationFailed { length: 20 },
        Event::Freed {
          address: 0,
          length: 4,
        },
        Event::UnknownFree { address: 7 },
        Event::Defragmented { merged: 1 },
        Event::Defragmented { merged: 0 },
      ]
    );
    let outcomes: Vec<bool> = events.borrow().iter().map(Event::succeeded).collect();
    assert_eq!(outcomes, vec![true, false, true, false, true, true]);

    assert!(space.take_observer().is_some());
    space.malloc(1).unwrap();
    assert_eq!(events.borrow().len(), 6);
  }
}
