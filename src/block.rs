use std::cell::Cell;
use std::fmt;
use std::ops::BitOr;
use std::ptr::NonNull;
use crate::ArenaError;

/// Which end of the free space a region carves from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Allocations advance the low frontier towards the high one. Used by the root arena.
    Up,
    /// Allocations retreat the high frontier towards the low one. Used by scratch regions.
    Down,
}

/// Options for `Region::alloc_raw`.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocFlags(u8);

impl AllocFlags {
    pub const NONE: AllocFlags = AllocFlags(0);
    /// Report `OutOfSpace` to the caller even if a checkpoint is installed.
    pub const SOFT_FAIL: AllocFlags = AllocFlags(1 << 0);
    /// Leave the carved bytes as they are instead of zeroing them.
    pub const NO_INIT: AllocFlags = AllocFlags(1 << 1);

    #[inline(always)]
    pub const fn contains(self, other: AllocFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for AllocFlags {
    type Output = AllocFlags;

    fn bitor(self, rhs: AllocFlags) -> AllocFlags {
        AllocFlags(self.0 | rhs.0)
    }
}

impl fmt::Debug for AllocFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocFlags")
            .field("soft_fail", &self.contains(AllocFlags::SOFT_FAIL))
            .field("no_init", &self.contains(AllocFlags::NO_INIT))
            .finish()
    }
}

/// Placement computed for a request before any frontier moves.
struct Carve {
    start: usize,
    cursor: usize,
    bytes: usize,
}

/// The backing buffer and its two frontiers.
///
/// Free space is always `low..high`. The root arena bumps `low` up, scratch regions bump `high`
/// down, so neither can hand out bytes the other has claimed. Offsets are relative to the start
/// of the buffer; alignment is computed on real addresses.
pub struct Block {
    base: NonNull<u8>,
    capacity: usize,
    low: Cell<usize>,
    high: Cell<usize>,
    checkpoints: Cell<usize>,
    scratch_open: Cell<bool>,
}

impl Block {
    /// `base` must be valid for reads and writes of `capacity` bytes for as long as the block lives.
    pub(crate) unsafe fn new(base: NonNull<u8>, capacity: usize) -> Block {
        Block {
            base,
            capacity,
            low: Cell::new(0),
            high: Cell::new(capacity),
            checkpoints: Cell::new(0),
            scratch_open: Cell::new(false),
        }
    }

    /// Total size of the backing buffer in bytes.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Offset of the next upward allocation.
    #[inline(always)]
    pub fn low(&self) -> usize {
        self.low.get()
    }

    /// Offset one past the free space; the next downward allocation ends here.
    #[inline(always)]
    pub fn high(&self) -> usize {
        self.high.get()
    }

    /// Bytes claimed from either end, padding included.
    pub fn used(&self) -> usize {
        self.low() + (self.capacity - self.high())
    }

    /// Bytes between the frontiers.
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.high() - self.low()
    }

    /// Returns true if `ptr..ptr+len` lies inside the backing buffer.
    pub fn contains(&self, ptr: *const u8, len: usize) -> bool {
        let start = self.base.as_ptr() as usize;
        let addr = ptr as usize;
        addr >= start && addr - start <= self.capacity && len <= self.capacity - (addr - start)
    }

    pub(crate) fn reset(&self) {
        self.low.set(0);
        self.high.set(self.capacity);
        self.checkpoints.set(0);
        self.scratch_open.set(false);
    }

    pub(crate) fn set_high(&self, high: usize) {
        debug_assert!(high >= self.low() && high <= self.capacity, "high frontier out of range");
        self.high.set(high);
    }

    pub(crate) fn checkpoints(&self) -> usize {
        self.checkpoints.get()
    }

    pub(crate) fn set_checkpoints(&self, depth: usize) {
        self.checkpoints.set(depth);
    }

    pub(crate) fn scratch_open(&self) -> bool {
        self.scratch_open.get()
    }

    pub(crate) fn set_scratch_open(&self, open: bool) {
        self.scratch_open.set(open);
    }

    /// Identity used to route unwinds to checkpoints of the same block.
    #[inline(always)]
    pub(crate) fn id(&self) -> usize {
        self as *const Block as usize
    }

    /// Offset of a pointer previously carved from this block.
    #[inline(always)]
    pub(crate) fn offset_of(&self, ptr: *const u8) -> usize {
        debug_assert!(self.contains(ptr, 0), "pointer does not belong to this block");
        ptr as usize - self.base.as_ptr() as usize
    }

    /// Pointer to `offset`, carrying the provenance of the whole buffer.
    #[inline(always)]
    pub(crate) fn at(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset <= self.capacity);
        unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset)) }
    }

    #[inline(always)]
    fn address(&self, offset: usize) -> usize {
        self.base.as_ptr() as usize + offset
    }

    /// Finds where `count` items of `elem_size` bytes aligned to `align` go in `direction`.
    ///
    /// Capacity is checked by dividing the free space, never by multiplying the request, so huge
    /// counts can not overflow into a false fit.
    fn fit(&self, direction: Direction, elem_size: usize, align: usize, count: usize) -> Result<Carve, ArenaError> {
        let low = self.low();
        let high = self.high();
        let available = high - low;
        let out_of_space = |padding: usize| ArenaError::OutOfSpace {
            requested: elem_size.saturating_mul(count).saturating_add(padding),
            available,
        };

        match direction {
            Direction::Up => {
                let padding = self.address(low).wrapping_neg() & (align - 1);
                if padding > available || (elem_size != 0 && count > (available - padding) / elem_size) {
                    return Err(out_of_space(padding));
                }
                let bytes = elem_size * count;
                Ok(Carve { start: low + padding, cursor: low + padding + bytes, bytes })
            }
            Direction::Down => {
                if elem_size != 0 && count > available / elem_size {
                    return Err(out_of_space(0));
                }
                let bytes = elem_size * count;
                // aligning the start, not the frontier, keeps odd-sized requests aligned
                let padding = (self.address(high) - bytes) & (align - 1);
                if padding > available - bytes {
                    return Err(out_of_space(padding));
                }
                let start = high - bytes - padding;
                Ok(Carve { start, cursor: start, bytes })
            }
        }
    }

    /// Claims space for `count` items and returns its start.
    ///
    /// On failure neither frontier moves. Unless `NO_INIT` is set the returned bytes are zeroed.
    pub(crate) fn carve(
        &self,
        direction: Direction,
        elem_size: usize,
        align: usize,
        count: usize,
        flags: AllocFlags,
    ) -> Result<NonNull<u8>, ArenaError> {
        if !align.is_power_of_two() {
            panic!("alignment {} is not a power of two", align);
        }

        let carve = match self.fit(direction, elem_size, align, count) {
            Ok(carve) => carve,
            Err(e) => {
                trace!("carve {:?} {}x{} (align {}) failed: {}", direction, count, elem_size, align, e);
                return Err(e);
            }
        };

        match direction {
            Direction::Up => self.low.set(carve.cursor),
            Direction::Down => self.high.set(carve.cursor),
        }

        let ptr = self.at(carve.start);
        if !flags.contains(AllocFlags::NO_INIT) {
            unsafe { ptr.as_ptr().write_bytes(0, carve.bytes) };
        }
        Ok(ptr)
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("capacity", &self.capacity)
            .field("low", &self.low())
            .field("high", &self.high())
            .field("checkpoints", &self.checkpoints())
            .field("scratch_open", &self.scratch_open())
            .finish()
    }
}

#[cfg(test)]
mod block_tests {
    use super::{AllocFlags, Block, Direction};
    use crate::testing::AlignedBuf;
    use crate::ArenaError;
    use std::ptr::NonNull;

    fn block(buf: &mut AlignedBuf<64>) -> Block {
        unsafe { Block::new(NonNull::from(&mut buf.0).cast(), 64) }
    }

    #[test]
    fn up_pads_to_alignment() {
        let mut buf = AlignedBuf::<64>::new();
        let block = block(&mut buf);
        block.carve(Direction::Up, 1, 1, 3, AllocFlags::NONE).expect("fits");
        let ptr = block.carve(Direction::Up, 8, 8, 1, AllocFlags::NONE).expect("fits");
        assert_eq!(8, block.offset_of(ptr.as_ptr()));
        assert_eq!(16, block.low());
    }

    #[test]
    fn down_aligns_the_start_of_odd_sized_requests() {
        let mut buf = AlignedBuf::<64>::new();
        let block = block(&mut buf);
        let ptr = block.carve(Direction::Down, 3, 8, 1, AllocFlags::NONE).expect("fits");
        assert_eq!(0, ptr.as_ptr() as usize % 8);
        assert_eq!(56, block.offset_of(ptr.as_ptr()));
        assert_eq!(56, block.high());
    }

    #[test]
    fn failure_moves_no_frontier() {
        let mut buf = AlignedBuf::<64>::new();
        let block = block(&mut buf);
        block.carve(Direction::Up, 1, 1, 1, AllocFlags::NONE).expect("fits");
        let err = block.carve(Direction::Up, 8, 8, 8, AllocFlags::NONE).err();
        assert_eq!(Some(ArenaError::OutOfSpace { requested: 71, available: 63 }), err);
        assert_eq!(1, block.low());
        assert_eq!(64, block.high());
    }

    #[test]
    fn huge_counts_do_not_overflow_into_a_fit() {
        let mut buf = AlignedBuf::<64>::new();
        let block = block(&mut buf);
        let err = block.carve(Direction::Up, 16, 8, usize::MAX / 8, AllocFlags::NONE).err();
        assert!(err.map(|e| e.is_out_of_space()).unwrap_or(false));
        let err = block.carve(Direction::Down, 16, 8, usize::MAX / 8, AllocFlags::NONE).err();
        assert!(err.map(|e| e.is_out_of_space()).unwrap_or(false));
        assert_eq!(64, block.remaining());
    }

    #[test]
    fn zeroes_unless_asked_not_to() {
        let mut buf = AlignedBuf::<64>::new();
        let block = block(&mut buf);
        let zeroed = block.carve(Direction::Up, 1, 1, 4, AllocFlags::NONE).expect("fits");
        let raw = block.carve(Direction::Up, 1, 1, 4, AllocFlags::NO_INIT).expect("fits");
        unsafe {
            assert_eq!(&[0u8; 4], std::slice::from_raw_parts(zeroed.as_ptr(), 4));
            assert_eq!(&[AlignedBuf::<64>::FILL; 4], std::slice::from_raw_parts(raw.as_ptr(), 4));
        }
    }

    #[test]
    fn zero_sized_requests_only_need_padding() {
        let mut buf = AlignedBuf::<64>::new();
        let block = block(&mut buf);
        block.carve(Direction::Up, 1, 1, 64, AllocFlags::NONE).expect("fills the block");
        assert!(block.carve(Direction::Up, 0, 1, 10, AllocFlags::NONE).is_ok());
        assert!(block.carve(Direction::Up, 4, 1, 0, AllocFlags::NONE).is_ok());
        assert!(block.carve(Direction::Up, 1, 1, 1, AllocFlags::NONE).is_err());
    }

    #[test]
    #[should_panic(expected = "not a power of two")]
    fn rejects_bad_alignment() {
        let mut buf = AlignedBuf::<64>::new();
        let block = block(&mut buf);
        let _ = block.carve(Direction::Up, 4, 3, 1, AllocFlags::NONE);
    }

    #[test]
    fn flags_combine() {
        let flags = AllocFlags::SOFT_FAIL | AllocFlags::NO_INIT;
        assert!(flags.contains(AllocFlags::SOFT_FAIL));
        assert!(flags.contains(AllocFlags::NO_INIT));
        assert!(!AllocFlags::NONE.contains(AllocFlags::NO_INIT));
    }
}
