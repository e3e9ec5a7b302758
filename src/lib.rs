//! Region allocation over a buffer you bring.
//!
//! An `Arena` bump allocates from a borrowed byte buffer. `Scratch` regions borrow the unused
//! tail of the same buffer for temporary work and give it back when they end. Running out of
//! space is either reported (`try_` methods) or unwinds to a checkpoint installed with
//! `Region::checkpoint`. `Array` and `UStr` build growable arrays and strings on top, extending
//! their storage in place whenever nothing else was allocated in between.
//!
//! Enable the `logging` feature to trace frontier movements through the `log` crate.

#[macro_use]
mod logging;
mod dontdothis;
mod error;
mod block;
mod region;
mod checkpoint;
mod arena;
mod scratch;
mod array;
mod ustr;
mod hash;
mod traits;

pub use error::ArenaError;
pub use block::{AllocFlags, Block, Direction};
pub use region::Region;
pub use arena::Arena;
pub use scratch::Scratch;
pub use array::Array;
pub use ustr::UStr;
pub use hash::{fnv1a, FnvBuildHasher, FnvHasher, FNV_OFFSET_BASIS, FNV_PRIME};
pub use traits::{ArenaIterator, Zeroable};

#[cfg(test)]
pub mod testing;
