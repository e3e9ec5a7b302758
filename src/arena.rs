use std::fmt;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ptr::NonNull;
use crate::region::sealed::Sealed;
use crate::{Block, Direction, Region, Scratch};

/// Root region over a caller supplied buffer.
///
/// The `Arena` never allocates from the system. It borrows the buffer for `'buf` and bump
/// allocates from its start towards its end; the buffer is released by whoever supplied it once
/// the `Arena` is gone.
///
/// ```
/// use memreg::{Arena, Region};
///
/// let mut buffer = vec![0u8; 1 << 16];
/// let arena = Arena::new(&mut buffer);
///
/// let result = arena.checkpoint(|arena| {
///     let numbers = arena.alloc_copy(&[1u32, 2, 3]);
///     let scratch = arena.scratch();
///     let doubled = scratch.alloc_fill(numbers.len(), 0u32);
///     for (d, n) in doubled.iter_mut().zip(numbers.iter()) {
///         *d = n * 2;
///     }
///     let total: u32 = doubled.iter().sum();
///     total
/// });
/// assert_eq!(Ok(12), result);
/// ```
///
/// Individual allocations are never freed. `reset` reclaims everything at once, and requires
/// exclusive access so no reference into the old contents can survive it. Values moved into the
/// arena are never dropped.
///
/// The `Arena` and everything derived from it belong to one thread.
pub struct Arena<'buf> {
    block: Block,
    _buffer: PhantomData<&'buf mut [MaybeUninit<u8>]>,
}

impl<'buf> Arena<'buf> {
    /// Creates an arena over `buffer`. Allocations zero their memory unless told otherwise, so the
    /// previous contents do not matter.
    pub fn new(buffer: &'buf mut [u8]) -> Arena<'buf> {
        let capacity = buffer.len();
        let base = NonNull::from(buffer).cast::<u8>();
        Arena::from_parts(base, capacity)
    }

    /// Creates an arena over uninitialized memory.
    pub fn from_uninit(buffer: &'buf mut [MaybeUninit<u8>]) -> Arena<'buf> {
        let capacity = buffer.len();
        let base = NonNull::from(buffer).cast::<u8>();
        Arena::from_parts(base, capacity)
    }

    fn from_parts(base: NonNull<u8>, capacity: usize) -> Arena<'buf> {
        debug!("arena over {} bytes", capacity);
        Arena {
            // the exclusive borrow held in `_buffer` keeps `base` valid for `'buf`
            block: unsafe { Block::new(base, capacity) },
            _buffer: PhantomData,
        }
    }

    /// Reclaims every allocation, including any scratch space and checkpoint records.
    pub fn reset(&mut self) {
        self.block.reset();
        frontiers!("reset", &self.block);
    }
}

impl Sealed for Arena<'_> {}

impl Region for Arena<'_> {
    #[inline(always)]
    fn block(&self) -> &Block {
        &self.block
    }

    #[inline(always)]
    fn direction(&self) -> Direction {
        Direction::Up
    }

    /// Opens the scratch region of this arena.
    ///
    /// Panics if one is already open; derive nested scratch regions from the open one instead.
    fn scratch(&self) -> Scratch<'_> {
        Scratch::open(&self.block)
    }
}

impl fmt::Debug for Arena<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Arena").field(&self.block).finish()
    }
}
