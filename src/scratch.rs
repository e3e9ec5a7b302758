//! Temporary regions carved from the unused tail of an arena.
//!
//! ```text
//! +-----------------------+---------------------------+-------------------+
//! |  arena allocations -> |           free            | <- scratch allocs |
//! +-----------------------+---------------------------+-------------------+
//! 0                      low                         high            capacity
//! ```
//!
//! The root arena grows `low` upward and is bounded by `high`; a scratch region grows `high`
//! downward and is bounded by `low`. Both frontiers live in the shared `Block`, so every scratch
//! allocation checks against the root's current frontier, and the root can never be handed bytes
//! the scratch is still using. If the root claims the tail first, the scratch allocation fails
//! with `OutOfSpace` even though the scratch was opened when the space was free.
//!
//! Ending the outermost scratch region moves `high` back to where it was when the region was
//! opened, releasing everything allocated in it at once.

use std::fmt;
use crate::region::sealed::Sealed;
use crate::{Block, Direction, Region};

/// Guard for a scratch region. Allocations made through it end with it.
///
/// Anything that must outlive the scratch has to be copied into the parent before the guard is
/// dropped; the borrow checker rejects references that try to escape.
pub struct Scratch<'a> {
    block: &'a Block,
    restore: Option<usize>,
}

impl<'a> Scratch<'a> {
    pub(crate) fn open(block: &'a Block) -> Scratch<'a> {
        if block.scratch_open() {
            panic!("a scratch region is already open on this arena, derive nested scratch from it instead");
        }
        block.set_scratch_open(true);
        frontiers!("scratch open", block);
        Scratch {
            block,
            restore: Some(block.high()),
        }
    }

    /// Returns true if dropping this guard releases the scratch memory.
    pub fn is_outermost(&self) -> bool {
        self.restore.is_some()
    }
}

impl Sealed for Scratch<'_> {}

impl Region for Scratch<'_> {
    #[inline(always)]
    fn block(&self) -> &Block {
        self.block
    }

    #[inline(always)]
    fn direction(&self) -> Direction {
        Direction::Down
    }

    /// A scratch of a scratch is the same region: it keeps bumping the same tail and releases
    /// nothing when dropped. The outermost guard releases everything.
    fn scratch(&self) -> Scratch<'_> {
        Scratch {
            block: self.block,
            restore: None,
        }
    }
}

impl Drop for Scratch<'_> {
    fn drop(&mut self) {
        if let Some(high) = self.restore {
            self.block.set_high(high);
            self.block.set_scratch_open(false);
            frontiers!("scratch close", self.block);
        }
    }
}

impl fmt::Debug for Scratch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scratch")
            .field("block", self.block)
            .field("outermost", &self.is_outermost())
            .finish()
    }
}

#[cfg(test)]
mod scratch_tests {
    use crate::testing::AlignedBuf;
    use crate::{Arena, ArenaError, Region, UStr};

    #[test]
    fn scratch_grows_down_from_the_tail() {
        let mut buf = AlignedBuf::<64>::new();
        let arena = Arena::new(buf.bytes());
        let scratch = arena.scratch();
        let bytes = scratch.alloc_copy(b"tail");
        assert_eq!(60, arena.block().offset_of(bytes.as_ptr()));
        assert_eq!(0, arena.block().low());
        assert_eq!(60, arena.block().high());
    }

    #[test]
    fn parent_can_not_overwrite_live_scratch_bytes() {
        let mut buf = AlignedBuf::<64>::new();
        let arena = Arena::new(buf.bytes());
        let scratch = arena.scratch();
        let temp = scratch.alloc_fill(16, 0xEEu8);

        assert!(arena.try_alloc_fill(49, 1u8).is_err());
        let parent = arena.alloc_fill(48, 1u8);

        assert!(temp.iter().all(|b| *b == 0xEE));
        assert!(parent.iter().all(|b| *b == 1));
    }

    #[test]
    fn scratch_fails_once_the_parent_claims_its_tail() {
        let mut buf = AlignedBuf::<64>::new();
        let arena = Arena::new(buf.bytes());
        let scratch = arena.scratch();
        let temp = scratch.alloc_copy(b"0123456789abcdef");

        let parent = arena.alloc_copy(&[7u8; 48]);

        let err = scratch.try_alloc(0u8).err();
        assert_eq!(Some(ArenaError::OutOfSpace { requested: 1, available: 0 }), err);
        assert_eq!(&[7u8; 48], parent);
        assert_eq!(b"0123456789abcdef", temp);
    }

    #[test]
    fn ending_the_scratch_returns_its_memory() {
        let mut buf = AlignedBuf::<64>::new();
        let arena = Arena::new(buf.bytes());
        {
            let scratch = arena.scratch();
            scratch.alloc([0u8; 60]);
            assert!(arena.try_alloc([0u8; 8]).is_err());
        }
        assert_eq!(64, arena.remaining());
        let reused = arena.alloc_fill(64, 3u8);
        assert_eq!(64, reused.len());
    }

    #[test]
    fn nested_scratch_is_the_same_region() {
        let mut buf = AlignedBuf::<64>::new();
        let arena = Arena::new(buf.bytes());
        let outer = arena.scratch();
        outer.alloc([0u8; 8]);
        {
            let inner = outer.scratch();
            assert!(!inner.is_outermost());
            inner.alloc([0u8; 8]);
            assert_eq!(48, arena.block().high());
        }
        // the inner guard released nothing
        assert_eq!(48, arena.block().high());
        drop(outer);
        assert_eq!(64, arena.block().high());
    }

    #[test]
    #[should_panic(expected = "already open")]
    fn second_top_level_scratch_is_rejected() {
        let mut buf = AlignedBuf::<64>::new();
        let arena = Arena::new(buf.bytes());
        let _first = arena.scratch();
        let _second = arena.scratch();
    }

    #[test]
    fn results_are_copied_out_before_the_scratch_ends() {
        let mut buf = AlignedBuf::<128>::new();
        let arena = Arena::new(buf.bytes());
        let kept = {
            let scratch = arena.scratch();
            let joined = UStr::from_str("left-").concat(&scratch, UStr::from_str("right"));
            UStr::copy_from(&arena, joined.as_bytes())
        };
        assert_eq!("left-right", kept);
        assert_eq!(128, arena.block().high());
    }

    #[test]
    fn failures_inside_a_checkpoint_close_the_scratch() {
        let mut buf = AlignedBuf::<128>::new();
        let arena = Arena::new(buf.bytes());
        let result = arena.checkpoint(|arena| {
            let scratch = arena.scratch();
            scratch.alloc([0u8; 64]);
            scratch.alloc([0u8; 64]);
        });
        assert!(result.is_err());
        assert_eq!(128, arena.block().high());
        let _ = arena.scratch();
    }
}
