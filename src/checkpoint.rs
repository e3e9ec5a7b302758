//! Recovery checkpoints.
//!
//! A plain allocation that runs out of space does not return to its caller. Instead the stack
//! is unwound back to the innermost `Region::checkpoint` call on the same arena, which reports
//! the failure as an `Err`. This turns one check per allocation into one check per unit of work.
//!
//! The unwind uses `std::panic::resume_unwind` with a private payload, so the panic hook is not
//! invoked and ordinary panics pass through checkpoints untouched. Values owned by the unwound
//! frames are dropped as usual, which includes closing scratch regions opened inside them.

use std::panic::{self, AssertUnwindSafe};
use crate::{ArenaError, Block, Region};

/// Payload carried from the failing allocation to its checkpoint.
struct Unwind {
    block: usize,
    error: ArenaError,
}

/// Carved from the protected region for every installed checkpoint, so its lifetime matches
/// the region's.
#[cfg_attr(not(feature = "logging"), allow(dead_code))]
struct CheckpointRecord {
    outer_depth: usize,
    low: usize,
    high: usize,
}

/// Uninstalls the checkpoint when `install` returns or is unwound through.
struct Installed<'a> {
    block: &'a Block,
    outer_depth: usize,
}

impl Drop for Installed<'_> {
    fn drop(&mut self) {
        self.block.set_checkpoints(self.outer_depth);
    }
}

pub(crate) fn install<'r, T, R, F>(region: &'r T, work: F) -> Result<R, ArenaError>
    where
        T: Region,
        F: FnOnce(&'r T) -> R,
{
    let block = region.block();
    let record = region.try_alloc(CheckpointRecord {
        outer_depth: block.checkpoints(),
        low: block.low(),
        high: block.high(),
    })?;

    block.set_checkpoints(record.outer_depth + 1);
    let _installed = Installed { block, outer_depth: record.outer_depth };
    debug!("checkpoint {} installed at low={} high={}", record.outer_depth + 1, record.low, record.high);

    match panic::catch_unwind(AssertUnwindSafe(|| work(region))) {
        Ok(result) => Ok(result),
        Err(payload) => match payload.downcast::<Unwind>() {
            Ok(unwind) if unwind.block == block.id() => {
                debug!("checkpoint {} recovered from {}", record.outer_depth + 1, unwind.error);
                frontiers!("recovered", block);
                Err(unwind.error)
            }
            Ok(foreign) => panic::resume_unwind(foreign),
            Err(other) => panic::resume_unwind(other),
        },
    }
}

/// Sends `error` to the innermost checkpoint of `block`, or hands it back if there is none.
pub(crate) fn raise(block: &Block, error: ArenaError) -> ArenaError {
    if block.checkpoints() > 0 {
        debug!("{}, unwinding to checkpoint {}", error, block.checkpoints());
        panic::resume_unwind(Box::new(Unwind { block: block.id(), error }));
    }
    error
}
