use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};
use std::ptr;
use std::str::Utf8Error;
use crate::region::hard;
use crate::{hash, AllocFlags, ArenaError, Block, Direction, Region};

/// Where a region allocated string starts.
#[derive(Clone, Copy)]
struct Origin<'a> {
    block: &'a Block,
    offset: usize,
}

/// Immutable byte string, usually living in a region.
///
/// Strings are built in allocation order without copying: `concat` of a string that ends at the
/// region frontier only copies the tail, right behind it. Out of order building costs one
/// compaction copy of the head.
///
/// Equality and hashing look at the bytes only, so strings from different regions, or not from a
/// region at all, compare equal when their contents do.
#[derive(Clone, Copy)]
pub struct UStr<'a> {
    bytes: &'a [u8],
    origin: Option<Origin<'a>>,
}

impl<'a> UStr<'a> {
    /// Wraps bytes that live outside of any region.
    pub const fn new(bytes: &'a [u8]) -> UStr<'a> {
        UStr { bytes, origin: None }
    }

    #[allow(clippy::should_implement_trait)]
    pub const fn from_str(value: &'a str) -> UStr<'a> {
        UStr::new(value.as_bytes())
    }

    fn at(block: &'a Block, offset: usize, len: usize) -> UStr<'a> {
        let bytes = unsafe { std::slice::from_raw_parts(block.at(offset).as_ptr(), len) };
        UStr { bytes, origin: Some(Origin { block, offset }) }
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_str(&self) -> Result<&'a str, Utf8Error> {
        std::str::from_utf8(self.bytes)
    }

    /// The FNV-1a hash of the bytes. Matches hashing through `FnvBuildHasher`.
    pub fn fnv1a(&self) -> u64 {
        hash::fnv1a(self.bytes)
    }

    /// Returns true if this string is the last allocation made in `region`.
    pub fn is_at_frontier<R: Region + ?Sized>(&self, region: &R) -> bool {
        match self.origin {
            Some(Origin { block, offset }) if ptr::eq(block, region.block()) => match region.direction() {
                Direction::Up => block.low() == offset + self.len(),
                Direction::Down => block.high() == offset,
            },
            _ => false,
        }
    }

    /// Copies `bytes` into `region`.
    pub fn copy_from<R: Region + ?Sized>(region: &'a R, bytes: &[u8]) -> UStr<'a> {
        hard(UStr::copy_with(region, bytes, AllocFlags::NONE))
    }

    pub fn try_copy_from<R: Region + ?Sized>(region: &'a R, bytes: &[u8]) -> Result<UStr<'a>, ArenaError> {
        UStr::copy_with(region, bytes, AllocFlags::SOFT_FAIL)
    }

    fn copy_with<R: Region + ?Sized>(region: &'a R, bytes: &[u8], flags: AllocFlags) -> Result<UStr<'a>, ArenaError> {
        let offset = UStr::copy_to(region, bytes, flags)?;
        Ok(UStr::at(region.block(), offset, bytes.len()))
    }

    /// Copies `bytes` to the frontier of `region` and returns their offset.
    fn copy_to<R: Region + ?Sized>(region: &R, bytes: &[u8], flags: AllocFlags) -> Result<usize, ArenaError> {
        let dest = region.alloc_raw(1, 1, bytes.len(), flags | AllocFlags::NO_INIT)?;
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), dest.as_ptr(), bytes.len()) };
        Ok(region.block().offset_of(dest.as_ptr()))
    }

    /// Returns a string with the same bytes that lives in `region`.
    ///
    /// Empty strings and strings already at the frontier of `region` are returned as they are.
    pub fn clone_in<R: Region + ?Sized>(self, region: &'a R) -> UStr<'a> {
        hard(self.clone_with(region, AllocFlags::NONE))
    }

    pub fn try_clone_in<R: Region + ?Sized>(self, region: &'a R) -> Result<UStr<'a>, ArenaError> {
        self.clone_with(region, AllocFlags::SOFT_FAIL)
    }

    fn clone_with<R: Region + ?Sized>(self, region: &'a R, flags: AllocFlags) -> Result<UStr<'a>, ArenaError> {
        if self.is_empty() || self.is_at_frontier(region) {
            Ok(self)
        } else {
            UStr::copy_with(region, self.bytes, flags)
        }
    }

    /// Appends `tail` to this string.
    ///
    /// If this string ends at the frontier of an upward growing region only `tail` is copied, and
    /// the result starts where this string starts. Otherwise this string is first moved to the
    /// frontier. Scratch regions grow downward, so there both parts are copied into one fresh
    /// allocation.
    pub fn concat<R: Region + ?Sized>(self, region: &'a R, tail: UStr<'a>) -> UStr<'a> {
        hard(self.concat_with(region, tail, AllocFlags::NONE))
    }

    pub fn try_concat<R: Region + ?Sized>(self, region: &'a R, tail: UStr<'a>) -> Result<UStr<'a>, ArenaError> {
        self.concat_with(region, tail, AllocFlags::SOFT_FAIL)
    }

    fn concat_with<R: Region + ?Sized>(self, region: &'a R, tail: UStr<'a>, flags: AllocFlags) -> Result<UStr<'a>, ArenaError> {
        if self.is_empty() {
            return tail.clone_with(region, flags);
        }

        let block = region.block();
        let flags = flags | AllocFlags::NO_INIT;
        match region.direction() {
            Direction::Up if self.is_at_frontier(region) => {
                let offset = block.offset_of(self.bytes.as_ptr());
                let dest = region.alloc_raw(1, 1, tail.len(), flags)?;
                debug_assert_eq!(offset + self.len(), block.offset_of(dest.as_ptr()), "tail must follow head");
                unsafe { ptr::copy_nonoverlapping(tail.bytes.as_ptr(), dest.as_ptr(), tail.len()) };
                Ok(UStr::at(block, offset, self.len() + tail.len()))
            }
            _ => {
                let len = self.len() + tail.len();
                let dest = region.alloc_raw(1, 1, len, flags)?;
                unsafe {
                    ptr::copy_nonoverlapping(self.bytes.as_ptr(), dest.as_ptr(), self.len());
                    ptr::copy_nonoverlapping(tail.bytes.as_ptr(), dest.as_ptr().add(self.len()), tail.len());
                }
                Ok(UStr::at(block, block.offset_of(dest.as_ptr()), len))
            }
        }
    }

    /// Renders `args` into `region`, allocating exactly the rendered length.
    ///
    /// The arguments are rendered twice: once to measure and once into the allocation. Use the
    /// `format_in!` macro to build the arguments.
    pub fn format<R: Region + ?Sized>(region: &'a R, args: fmt::Arguments<'_>) -> UStr<'a> {
        match UStr::format_with(region, args, AllocFlags::NONE) {
            Err(ArenaError::Format) => panic!("a Display implementation returned an error"),
            other => hard(other),
        }
    }

    /// Like `format`, but reports failures. A `Display` impl that fails, or renders shorter than it
    /// measured, during the second pass leaves the measured bytes claimed.
    pub fn try_format<R: Region + ?Sized>(region: &'a R, args: fmt::Arguments<'_>) -> Result<UStr<'a>, ArenaError> {
        UStr::format_with(region, args, AllocFlags::SOFT_FAIL)
    }

    fn format_with<R: Region + ?Sized>(region: &'a R, args: fmt::Arguments<'_>, flags: AllocFlags) -> Result<UStr<'a>, ArenaError> {
        let mut measure = Measure(0);
        fmt::write(&mut measure, args).map_err(|_| ArenaError::Format)?;

        let block = region.block();
        let dest = region.alloc_raw(1, 1, measure.0, flags)?;
        let mut render = Render {
            buf: unsafe { std::slice::from_raw_parts_mut(dest.as_ptr(), measure.0) },
            written: 0,
        };
        fmt::write(&mut render, args).map_err(|_| ArenaError::Format)?;
        Ok(UStr::at(block, block.offset_of(dest.as_ptr()), render.written))
    }
}

struct Measure(usize);

impl fmt::Write for Measure {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

struct Render<'b> {
    buf: &'b mut [u8],
    written: usize,
}

impl fmt::Write for Render<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.written + s.len();
        if end > self.buf.len() {
            // the arguments rendered longer than they measured
            return Err(fmt::Error);
        }
        self.buf[self.written..end].copy_from_slice(s.as_bytes());
        self.written = end;
        Ok(())
    }
}

/// Formats into a region: `format_in!(&arena, "{}-{}", a, b)` returns a `UStr`.
#[macro_export]
macro_rules! format_in {
    ($region:expr, $($arg:tt)*) => {
        $crate::UStr::format($region, format_args!($($arg)*))
    };
}

impl Default for UStr<'_> {
    fn default() -> Self {
        UStr::new(&[])
    }
}

impl Debug for UStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&String::from_utf8_lossy(self.bytes), f)
    }
}

impl Display for UStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&String::from_utf8_lossy(self.bytes), f)
    }
}

impl<'a, 'b> PartialEq<UStr<'b>> for UStr<'a> {
    fn eq(&self, other: &UStr<'b>) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for UStr<'_> {}

impl PartialEq<[u8]> for UStr<'_> {
    fn eq(&self, other: &[u8]) -> bool {
        self.bytes == other
    }
}

impl PartialEq<str> for UStr<'_> {
    fn eq(&self, other: &str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl PartialEq<&str> for UStr<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl PartialEq<UStr<'_>> for str {
    fn eq(&self, other: &UStr<'_>) -> bool {
        self.as_bytes() == other.bytes
    }
}

impl PartialEq<UStr<'_>> for &str {
    fn eq(&self, other: &UStr<'_>) -> bool {
        self.as_bytes() == other.bytes
    }
}

impl Hash for UStr<'_> {
    /// Feeds exactly the bytes, no length prefix, so `FnvHasher` agrees with `UStr::fnv1a`.
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(self.bytes);
    }
}

impl AsRef<[u8]> for UStr<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}
