//! Logging shim. Without the `logging` feature every macro expands to nothing,
//! so frontier positions are only reported when explicitly asked for.

#![allow(unused_macros)]

macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::debug!(target: $target, $($arg)+);
    );
    ($($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::debug!($($arg)+);
    )
}

macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::trace!(target: $target, $($arg)+);
    );
    ($($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::trace!($($arg)+);
    )
}

/// Logs both frontiers of a block, tagged with the event that moved them.
macro_rules! frontiers {
    ($event:expr, $block:expr) => (
        #[cfg(feature = "logging")]
        {
            let block: &$crate::Block = $block;
            log::debug!(
                target: "memreg::frontier",
                "{}\tlow={} high={} remaining={}",
                $event, block.low(), block.high(), block.remaining()
            );
        }
    )
}
