use std::ptr::NonNull;
use crate::{checkpoint, dontdothis, AllocFlags, ArenaError, Block, Direction, Scratch, Zeroable};

/// Allocation surface shared by the root `Arena` and its `Scratch` regions.
///
/// Every allocating method comes in two forms. The `try_` form reports `OutOfSpace` to the caller
/// and never unwinds. The plain form treats running out of space as unrecoverable for the current
/// unit of work: it unwinds to the innermost checkpoint installed with `Region::checkpoint`, and
/// panics if there is none.
///
/// Returned references live as long as the borrow of the region, so nothing allocated from a
/// scratch region can escape it, and nothing at all survives `Arena::reset`.
///
/// The trait is sealed: `Arena` and `Scratch` are the only regions, and no other type can claim
/// bytes from their buffer.
///
/// ```compile_fail
/// use memreg::{Arena, Block, Direction, Region, Scratch};
///
/// struct Tail<'a>(&'a Arena<'a>);
///
/// impl Region for Tail<'_> {
///     fn block(&self) -> &Block { self.0.block() }
///     fn direction(&self) -> Direction { Direction::Down }
///     fn scratch(&self) -> Scratch<'_> { self.0.scratch() }
/// }
/// ```
pub trait Region: sealed::Sealed {
    /// The buffer and frontiers this region allocates from.
    fn block(&self) -> &Block;

    /// The end of the free space this region carves from.
    fn direction(&self) -> Direction;

    /// Derives a scratch region for temporary allocations. See `Scratch`.
    fn scratch(&self) -> Scratch<'_>;

    /// Runs `work` under a recovery checkpoint.
    ///
    /// Returns `Ok` with the result of `work` if it completes. If a plain (non `try_`) allocation
    /// on this arena or any of its scratch regions runs out of space while `work` runs, the
    /// remaining frames of `work` are unwound and `Err(OutOfSpace)` is returned instead.
    ///
    /// The checkpoint record is itself allocated from the region; if even that does not fit,
    /// `work` is not run.
    ///
    /// `work` receives the region for as long as `self` is borrowed, so it may return values
    /// allocated through it.
    fn checkpoint<'r, R, F>(&'r self, work: F) -> Result<R, ArenaError>
        where
            Self: Sized,
            F: FnOnce(&'r Self) -> R,
    {
        checkpoint::install(self, work)
    }

    /// Total size of the backing buffer.
    fn capacity(&self) -> usize {
        self.block().capacity()
    }

    /// Bytes claimed so far by this region and every region sharing its buffer.
    fn used(&self) -> usize {
        self.block().used()
    }

    /// Bytes still free between the frontiers.
    fn remaining(&self) -> usize {
        self.block().remaining()
    }

    /// Carves `count` items of `elem_size` bytes aligned to `align`.
    ///
    /// With `SOFT_FAIL` an `OutOfSpace` failure is always returned. Without it, the failure unwinds
    /// to an installed checkpoint and is only returned if there is none. `align` must be a power
    /// of two. The memory is zeroed unless `NO_INIT` is set.
    fn alloc_raw(&self, elem_size: usize, align: usize, count: usize, flags: AllocFlags) -> Result<NonNull<u8>, ArenaError> {
        let block = self.block();
        match block.carve(self.direction(), elem_size, align, count, flags) {
            Ok(ptr) => Ok(ptr),
            Err(e) if flags.contains(AllocFlags::SOFT_FAIL) => Err(e),
            Err(e) => Err(checkpoint::raise(block, e)),
        }
    }

    /// Moves `value` into the region.
    #[allow(clippy::mut_from_ref)]
    fn alloc<T>(&self, value: T) -> &mut T {
        let ptr = hard(slots::<T, Self>(self, 1, AllocFlags::NO_INIT));
        unsafe { dontdothis::write_value(ptr, value) }
    }

    #[allow(clippy::mut_from_ref)]
    fn try_alloc<T>(&self, value: T) -> Result<&mut T, ArenaError> {
        let ptr = slots::<T, Self>(self, 1, AllocFlags::SOFT_FAIL | AllocFlags::NO_INIT)?;
        Ok(unsafe { dontdothis::write_value(ptr, value) })
    }

    /// Allocates `count` zeroed items.
    #[allow(clippy::mut_from_ref)]
    fn alloc_zeroed<T: Zeroable>(&self, count: usize) -> &mut [T] {
        let ptr = hard(slots::<T, Self>(self, count, AllocFlags::NONE));
        unsafe { dontdothis::initialized_slice(ptr, count) }
    }

    #[allow(clippy::mut_from_ref)]
    fn try_alloc_zeroed<T: Zeroable>(&self, count: usize) -> Result<&mut [T], ArenaError> {
        let ptr = slots::<T, Self>(self, count, AllocFlags::SOFT_FAIL)?;
        Ok(unsafe { dontdothis::initialized_slice(ptr, count) })
    }

    /// Allocates `count` copies of `value`.
    #[allow(clippy::mut_from_ref)]
    fn alloc_fill<T: Copy>(&self, count: usize, value: T) -> &mut [T] {
        let ptr = hard(slots::<T, Self>(self, count, AllocFlags::NO_INIT));
        unsafe { dontdothis::fill(ptr, count, value) }
    }

    #[allow(clippy::mut_from_ref)]
    fn try_alloc_fill<T: Copy>(&self, count: usize, value: T) -> Result<&mut [T], ArenaError> {
        let ptr = slots::<T, Self>(self, count, AllocFlags::SOFT_FAIL | AllocFlags::NO_INIT)?;
        Ok(unsafe { dontdothis::fill(ptr, count, value) })
    }

    /// Allocates a copy of `items`.
    #[allow(clippy::mut_from_ref)]
    fn alloc_copy<T: Copy>(&self, items: &[T]) -> &mut [T] {
        let ptr = hard(slots::<T, Self>(self, items.len(), AllocFlags::NO_INIT));
        unsafe { dontdothis::copy_from_slice(ptr, items) }
    }

    #[allow(clippy::mut_from_ref)]
    fn try_alloc_copy<T: Copy>(&self, items: &[T]) -> Result<&mut [T], ArenaError> {
        let ptr = slots::<T, Self>(self, items.len(), AllocFlags::SOFT_FAIL | AllocFlags::NO_INIT)?;
        Ok(unsafe { dontdothis::copy_from_slice(ptr, items) })
    }

    /// Allocates a copy of `value`.
    #[allow(clippy::mut_from_ref)]
    fn alloc_str(&self, value: &str) -> &mut str {
        let bytes = self.alloc_copy(value.as_bytes());
        unsafe { std::str::from_utf8_unchecked_mut(bytes) }
    }

    #[allow(clippy::mut_from_ref)]
    fn try_alloc_str(&self, value: &str) -> Result<&mut str, ArenaError> {
        let bytes = self.try_alloc_copy(value.as_bytes())?;
        Ok(unsafe { std::str::from_utf8_unchecked_mut(bytes) })
    }
}

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// Carves room for `count` values of `T`.
pub(crate) fn slots<T, R: Region + ?Sized>(region: &R, count: usize, flags: AllocFlags) -> Result<NonNull<T>, ArenaError> {
    region
        .alloc_raw(std::mem::size_of::<T>(), std::mem::align_of::<T>(), count, flags)
        .map(|ptr| ptr.cast::<T>())
}

/// Unwraps the result of a plain allocation. Reaching the error arm means the allocation failed
/// without a checkpoint to unwind to.
pub(crate) fn hard<T>(result: Result<T, ArenaError>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("region allocation failed with no recovery checkpoint installed: {}", e),
    }
}

#[cfg(test)]
mod region_tests {
    use crate::testing::AlignedBuf;
    use crate::{AllocFlags, Arena, ArenaError, Region};

    #[test]
    fn typed_allocations_hold_their_values() {
        let mut buf = AlignedBuf::<256>::new();
        let arena = Arena::new(buf.bytes());

        let value = arena.alloc(0xDEAD_BEEF_u32);
        let filled = arena.alloc_fill(3, 7u16);
        let copied = arena.alloc_copy(&[1i64, 2, 3]);
        let text = arena.alloc_str("hello");
        let zeroed = arena.alloc_zeroed::<u64>(4);

        assert_eq!(0xDEAD_BEEF, *value);
        assert_eq!(&[7, 7, 7], filled);
        assert_eq!(&[1, 2, 3], copied);
        assert_eq!("hello", text);
        assert_eq!(&[0, 0, 0, 0], zeroed);
    }

    #[test]
    fn allocations_are_mutable_and_independent() {
        let mut buf = AlignedBuf::<64>::new();
        let arena = Arena::new(buf.bytes());
        let a = arena.alloc_zeroed::<u8>(4);
        let b = arena.alloc_zeroed::<u8>(4);
        a.copy_from_slice(b"abcd");
        b.copy_from_slice(b"wxyz");
        assert_eq!(b"abcd", a);
        assert_eq!(b"wxyz", b);
    }

    #[test]
    fn try_forms_report_out_of_space() {
        let mut buf = AlignedBuf::<16>::new();
        let arena = Arena::new(buf.bytes());
        assert!(arena.try_alloc([0u8; 16]).is_ok());
        assert_eq!(Err(ArenaError::OutOfSpace { requested: 1, available: 0 }), arena.try_alloc(1u8).map(|v| *v));
        assert!(arena.try_alloc_fill(1, 0u8).is_err());
        assert!(arena.try_alloc_copy(b"x").is_err());
        assert!(arena.try_alloc_str("x").is_err());
        assert!(arena.try_alloc_zeroed::<u8>(1).is_err());
    }

    #[test]
    fn raw_allocation_without_checkpoint_returns_the_error() {
        let mut buf = AlignedBuf::<8>::new();
        let arena = Arena::new(buf.bytes());
        assert!(arena.alloc_raw(1, 1, 9, AllocFlags::NONE).is_err());
        assert!(arena.alloc_raw(1, 1, 8, AllocFlags::NONE).is_ok());
    }

    #[test]
    #[should_panic(expected = "no recovery checkpoint installed")]
    fn plain_allocation_without_checkpoint_panics() {
        let mut buf = AlignedBuf::<8>::new();
        let arena = Arena::new(buf.bytes());
        arena.alloc([0u64; 2]);
    }

    #[test]
    fn zero_sized_types_take_no_space() {
        let mut buf = AlignedBuf::<8>::new();
        let arena = Arena::new(buf.bytes());
        let units = arena.alloc_fill(1000, ());
        assert_eq!(1000, units.len());
        assert_eq!(0, arena.used());
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn request() -> impl Strategy<Value = (usize, usize, usize, bool)> {
            (0usize..24, 0u32..6, 0usize..8, any::<bool>()).prop_map(|(size, shift, count, scratch)| (size, 1 << shift, count, scratch))
        }

        proptest! {
            #[test]
            fn allocations_are_aligned_in_bounds_and_disjoint(
                requests in proptest::collection::vec(request(), 1..64),
            ) {
                let mut buf = AlignedBuf::<1024>::new();
                let arena = Arena::new(buf.bytes());
                let scratch = arena.scratch();
                let mut live: Vec<(usize, usize)> = vec![];

                for (size, align, count, from_scratch) in requests {
                    let result = if from_scratch {
                        scratch.alloc_raw(size, align, count, AllocFlags::SOFT_FAIL)
                    } else {
                        arena.alloc_raw(size, align, count, AllocFlags::SOFT_FAIL)
                    };
                    if let Ok(ptr) = result {
                        let len = size * count;
                        prop_assert_eq!(0, ptr.as_ptr() as usize % align);
                        prop_assert!(arena.block().contains(ptr.as_ptr(), len));
                        let start = ptr.as_ptr() as usize;
                        if len > 0 {
                            for &(other, other_len) in &live {
                                prop_assert!(start + len <= other || other + other_len <= start);
                            }
                            live.push((start, len));
                        }
                    }
                }
            }

            #[test]
            fn failures_never_move_the_frontiers(
                requests in proptest::collection::vec(request(), 1..64),
            ) {
                let mut buf = AlignedBuf::<256>::new();
                let arena = Arena::new(buf.bytes());
                let scratch = arena.scratch();

                for (size, align, count, from_scratch) in requests {
                    let (low, high) = (arena.block().low(), arena.block().high());
                    let result = if from_scratch {
                        scratch.alloc_raw(size, align, count * 8, AllocFlags::SOFT_FAIL)
                    } else {
                        arena.alloc_raw(size, align, count * 8, AllocFlags::SOFT_FAIL)
                    };
                    if result.is_err() {
                        prop_assert_eq!(low, arena.block().low());
                        prop_assert_eq!(high, arena.block().high());
                    }
                    prop_assert!(arena.block().low() <= arena.block().high());
                }
            }
        }
    }
}
