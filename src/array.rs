use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use crate::region::{hard, slots};
use crate::{AllocFlags, ArenaError, Block, Direction, Region};

/// Growable contiguous sequence stored in a region.
///
/// The region is passed to every call that may grow the array. When the array's storage is the
/// most recent allocation of an upward growing region, growth extends it in place and the data
/// does not move. Otherwise a larger block is allocated and the items are copied over; the old
/// block stays behind, unreferenced, until the arena is reset.
///
/// Items are never dropped.
pub struct Array<'a, T> {
    origin: Option<&'a Block>,
    data: NonNull<T>,
    len: usize,
    capacity: usize,
    /// Offset one past the reserved storage, compared with the region frontier.
    end: usize,
    _items: PhantomData<&'a mut [T]>,
}

impl<'a, T> Array<'a, T> {
    /// Capacity reserved by the first growth of an empty array.
    pub const INITIAL_CAPACITY: usize = 16;

    /// Creates an empty array. Nothing is allocated until the first push.
    pub fn new() -> Array<'a, T> {
        Array {
            origin: None,
            data: NonNull::dangling(),
            len: 0,
            capacity: 0,
            end: 0,
            _items: PhantomData,
        }
    }

    pub fn with_capacity<R: Region + ?Sized>(region: &'a R, capacity: usize) -> Array<'a, T> {
        let mut array = Array::new();
        hard(array.reserve_exact(region, capacity, AllocFlags::NONE));
        array
    }

    pub fn try_with_capacity<R: Region + ?Sized>(region: &'a R, capacity: usize) -> Result<Array<'a, T>, ArenaError> {
        let mut array = Array::new();
        array.reserve_exact(region, capacity, AllocFlags::SOFT_FAIL)?;
        Ok(array)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    /// Appends `value` and returns a reference to it.
    pub fn push<R: Region + ?Sized>(&mut self, region: &'a R, value: T) -> &mut T {
        if self.len == self.capacity {
            hard(self.grow(region, AllocFlags::NONE));
        }
        self.write_next(value)
    }

    pub fn try_push<R: Region + ?Sized>(&mut self, region: &'a R, value: T) -> Result<&mut T, ArenaError> {
        if self.len == self.capacity {
            self.grow(region, AllocFlags::SOFT_FAIL)?;
        }
        Ok(self.write_next(value))
    }

    /// Appends a default item and returns the slot for the caller to fill in.
    pub fn push_slot<R: Region + ?Sized>(&mut self, region: &'a R) -> &mut T where T: Default {
        self.push(region, T::default())
    }

    pub fn try_push_slot<R: Region + ?Sized>(&mut self, region: &'a R) -> Result<&mut T, ArenaError> where T: Default {
        self.try_push(region, T::default())
    }

    fn write_next(&mut self, value: T) -> &mut T {
        debug_assert!(self.len < self.capacity);
        unsafe {
            let slot = self.data.as_ptr().add(self.len);
            slot.write(value);
            self.len += 1;
            &mut *slot
        }
    }

    fn grown_capacity(capacity: usize) -> usize {
        if capacity == 0 {
            Self::INITIAL_CAPACITY
        } else {
            capacity.saturating_add((capacity + 1) / 2)
        }
    }

    /// Returns true if nothing was allocated from `region` since this array last grew in it.
    fn is_at_frontier<R: Region + ?Sized>(&self, region: &R) -> bool {
        match self.origin {
            Some(block) => {
                region.direction() == Direction::Up
                    && ptr::eq(block, region.block())
                    && block.low() == self.end
            }
            None => false,
        }
    }

    fn grow<R: Region + ?Sized>(&mut self, region: &'a R, flags: AllocFlags) -> Result<(), ArenaError> {
        let capacity = Self::grown_capacity(self.capacity);
        self.reserve_exact(region, capacity, flags)
    }

    /// Makes room for exactly `capacity` items, in place when possible.
    fn reserve_exact<R: Region + ?Sized>(&mut self, region: &'a R, capacity: usize, flags: AllocFlags) -> Result<(), ArenaError> {
        if capacity <= self.capacity {
            return Ok(());
        }
        let flags = flags | AllocFlags::NO_INIT;
        let block = region.block();

        if self.capacity > 0 && self.is_at_frontier(region) {
            let extra = slots::<T, R>(region, capacity - self.capacity, flags)?;
            debug_assert_eq!(unsafe { self.data.as_ptr().add(self.capacity) }, extra.as_ptr(), "in-place growth must be contiguous");
            trace!("array grew in place from {} to {}", self.capacity, capacity);
        } else {
            let data = slots::<T, R>(region, capacity, flags)?;
            unsafe { ptr::copy_nonoverlapping(self.data.as_ptr(), data.as_ptr(), self.len) };
            trace!("array moved to a new block, {} items copied, capacity {} -> {}", self.len, self.capacity, capacity);
            self.data = data;
            self.origin = Some(block);
        }

        self.capacity = capacity;
        self.end = block.offset_of(self.data.as_ptr() as *const u8) + capacity * std::mem::size_of::<T>();
        Ok(())
    }
}

impl<'a, T> Default for Array<'a, T> {
    fn default() -> Self {
        Array::new()
    }
}

impl<'a, T> Deref for Array<'a, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.data.as_ptr(), self.len) }
    }
}

impl<'a, T> DerefMut for Array<'a, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.data.as_ptr(), self.len) }
    }
}

impl<'a, T: fmt::Debug> fmt::Debug for Array<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
