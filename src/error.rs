use std::fmt::{self, Display};

/// Recoverable failures reported by region operations.
///
/// Precondition violations (a non power-of-two alignment, opening a second top-level scratch,
/// a hard allocation failure with no checkpoint installed) are not represented here: they panic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The request does not fit before the region boundary. This covers both true exhaustion
    /// and a scratch region whose tail has been claimed by its root since it was opened.
    OutOfSpace {
        /// Bytes needed, including alignment padding (saturated on overflow).
        requested: usize,
        /// Bytes that were free between the frontiers.
        available: usize,
    },
    /// A `Display` implementation returned an error while rendering into the region.
    Format,
}

impl ArenaError {
    pub fn is_out_of_space(&self) -> bool {
        matches!(self, ArenaError::OutOfSpace { .. })
    }
}

impl Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArenaError::OutOfSpace { requested, available } => write!(
                f,
                "Region is out of space - requested {} bytes, but only {} are available",
                requested, available
            ),
            ArenaError::Format => Display::fmt("Formatter returned an error", f),
        }
    }
}

impl std::error::Error for ArenaError {}
