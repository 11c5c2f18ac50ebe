//! Thin wrappers around the `log` macros which vanish unless the `logging` feature is enabled.
#![allow(unused_macros)]

macro_rules! debug {
    ($($arg:tt)+) => (
        #[cfg(feature = "logging")]
        ::log::debug!(target: "relovec", $($arg)+);
    )
}

macro_rules! trace {
    ($($arg:tt)+) => (
        #[cfg(feature = "logging")]
        ::log::trace!(target: "relovec", $($arg)+);
    )
}

#[allow(unused_imports)]
pub(crate) use {debug, trace};
