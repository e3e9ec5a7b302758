//! This module is for testing only

use std::cell::RefCell;
use std::rc::Rc;

pub type DropFlag<T> = Rc<RefCell<T>>;

/// Counts how many times values sharing the flag were dropped.
pub struct Droppable {
    pub value: i32,
    pub drops: DropFlag<usize>,
}

impl Drop for Droppable {
    fn drop(&mut self) {
        *self.drops.borrow_mut() += 1;
    }
}

/// Buffer with a known address alignment, pre-filled so zeroing is observable.
#[repr(C, align(64))]
pub struct AlignedBuf<const N: usize>(pub [u8; N]);

impl<const N: usize> AlignedBuf<N> {
    pub const FILL: u8 = 0xA5;

    pub fn new() -> AlignedBuf<N> {
        AlignedBuf([Self::FILL; N])
    }

    pub fn bytes(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

#[test]
fn dropflag() {
    let drops = DropFlag::new(RefCell::new(0));
    let droppable = Droppable { value: 1, drops: drops.clone() };
    assert_eq!(0, *drops.borrow());
    std::mem::drop(droppable);
    assert_eq!(1, *drops.borrow());
}

#[test]
fn aligned_buf_is_aligned() {
    let mut buf = AlignedBuf::<128>::new();
    assert_eq!(0, buf.bytes().as_ptr() as usize % 64);
}
