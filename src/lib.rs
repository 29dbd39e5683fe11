//! # memspace - A Simulated First-Fit Memory Space
//!
//! This crate models a fixed-size linear address space that is handed out
//! through explicit `malloc` and `free` calls. No real memory is touched:
//! addresses are plain word offsets into `[0, max_size)`.
//!
//! ## Overview
//!
//! Two lists describe the whole space at any time:
//!
//! ```text
//!   Address space of max_size = 100:
//!
//!   0          17   20                 60        75                 100
//!   ┌──────────┬────┬──────────────────┬─────────┬──────────────────┐
//!   │    A1    │ F1 │        A2        │   F2    │        F3        │
//!   └──────────┴────┴──────────────────┴─────────┴──────────────────┘
//!
//!   allocated list: [(0 , 17), (20 , 40)]
//!   free list:      [(75 , 25), (17 , 3), (60 , 15)]
//!
//!   Together the lists tile [0, max_size) with no overlap.
//! ```
//!
//! The free list is neither sorted nor coalesced between calls. Freed ranges
//! are appended at the end, and only [`FirstFitAllocator::defrag`] puts the
//! list back in address order and merges neighbours.
//!
//! ## Crate Structure
//!
//! ```text
//!   memspace
//!   ├── arena      - Slot storage for blocks, addressed by BlockId (internal)
//!   ├── block      - Block value type (base address, length)
//!   ├── error      - ListError and AllocError
//!   ├── event      - Observer callback and the events it receives
//!   ├── first_fit  - FirstFitAllocator: malloc, free, defrag
//!   ├── list       - OrderedList sequence and its CursorMut
//!   └── policy     - Exhaustion / unknown-free / defrag-on-free settings
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use memspace::FirstFitAllocator;
//!
//! let mut space = FirstFitAllocator::new(100).unwrap();
//!
//! let a = space.malloc(17).unwrap().unwrap();
//! let b = space.malloc(3).unwrap().unwrap();
//! assert_eq!((a, b), (0, 17));
//!
//! space.free(a).unwrap();
//! assert_eq!(space.debug_string(), "[(20 , 80), (0 , 17)]\n[(17 , 3)]");
//!
//! // Too large for any single block.
//! assert_eq!(space.malloc(98).unwrap(), None);
//! ```
//!
//! ## How It Works
//!
//! `malloc` takes the first free block that is large enough:
//!
//! ```text
//!   malloc(17) with first fitting free block (250 , 20):
//!
//!   before   free: ... (250 , 20) ...
//!
//!   after    free: ... (267 , 3) ...       <- same entry, shrunk in place
//!            allocated: ..., (250 , 17)    <- new entry at the end
//!
//!   An exact fit moves the entry from the free list to the allocated list.
//! ```
//!
//! `defrag` sorts the free list by base address and walks it once, folding
//! every block whose base equals the end of the current one into it:
//!
//! ```text
//!   [(10 , 5), (0 , 10), (20 , 3), (15 , 5)]
//!        │ sort
//!        ▼
//!   [(0 , 10), (10 , 5), (15 , 5), (20 , 3)]
//!        │ merge
//!        ▼
//!   [(0 , 23)]
//! ```
//!
//! ## Policies
//!
//! See [`Policy`]. By default a failing `malloc` defragments once and rescans
//! when that would help, and `free` of an unknown address is an error.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: wrap the allocator in a `Mutex` to share it
//! - **No alignment**: every length is a plain word count
//! - **Linear scans**: malloc and free are O(n) in the number of blocks

mod arena;
mod block;
mod error;
mod event;
mod first_fit;
mod list;
mod policy;

pub use block::Block;
pub use error::{AllocError, ListError, Result};
pub use event::{Event, Observer};
pub use first_fit::FirstFitAllocator;
pub use list::{CursorMut, OrderedList};
pub use policy::{ExhaustionPolicy, Policy, UnknownFreePolicy};
