use crate::{ArenaError, Array, Region};

/// Types for which the all-zero bit pattern is a valid value.
///
/// Implementing this for a type where that does not hold makes `Region::alloc_zeroed` produce
/// invalid values.
pub unsafe trait Zeroable: Copy {}

macro_rules! zeroable {
    ($($t:ty),*) => {
        $(unsafe impl Zeroable for $t {})*
    };
}

zeroable!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, bool, char);

unsafe impl<T: Zeroable, const N: usize> Zeroable for [T; N] {}

/// Implements collect to region allocated arrays.
pub trait ArenaIterator: Iterator {
    fn collect_array<'a, R: Region + ?Sized>(self, region: &'a R) -> Array<'a, Self::Item>;

    fn try_collect_array<'a, R: Region + ?Sized>(self, region: &'a R) -> Result<Array<'a, Self::Item>, ArenaError>;
}

impl<Q: Iterator> ArenaIterator for Q {
    fn collect_array<'a, R: Region + ?Sized>(self, region: &'a R) -> Array<'a, Self::Item> {
        let (lower, _) = self.size_hint();
        let mut array = Array::with_capacity(region, lower);
        for item in self {
            array.push(region, item);
        }
        array
    }

    fn try_collect_array<'a, R: Region + ?Sized>(self, region: &'a R) -> Result<Array<'a, Self::Item>, ArenaError> {
        let (lower, _) = self.size_hint();
        let mut array = Array::try_with_capacity(region, lower)?;
        for item in self {
            array.try_push(region, item)?;
        }
        Ok(array)
    }
}
