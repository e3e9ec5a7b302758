/*!

Turn freshly carved region memory into references.

Every function here trusts the caller that the pointer came out of `Block::carve` for the
requested number of items, that nothing else refers to those bytes, and that the region
they were carved from outlives `'a`.

*/

use std::ptr::NonNull;

#[inline(always)]
pub unsafe fn write_value<'a, T>(ptr: NonNull<T>, value: T) -> &'a mut T {
    ptr.as_ptr().write(value);
    &mut *ptr.as_ptr()
}

#[inline(always)]
pub unsafe fn fill<'a, T: Copy>(ptr: NonNull<T>, count: usize, value: T) -> &'a mut [T] {
    for index in 0..count {
        ptr.as_ptr().add(index).write(value);
    }
    std::slice::from_raw_parts_mut(ptr.as_ptr(), count)
}

#[inline(always)]
pub unsafe fn copy_from_slice<'a, T: Copy>(ptr: NonNull<T>, items: &[T]) -> &'a mut [T] {
    std::ptr::copy_nonoverlapping(items.as_ptr(), ptr.as_ptr(), items.len());
    std::slice::from_raw_parts_mut(ptr.as_ptr(), items.len())
}

/// The memory must already hold `count` valid items (zeroed `Zeroable` items count).
#[inline(always)]
pub unsafe fn initialized_slice<'a, T>(ptr: NonNull<T>, count: usize) -> &'a mut [T] {
    std::slice::from_raw_parts_mut(ptr.as_ptr(), count)
}
