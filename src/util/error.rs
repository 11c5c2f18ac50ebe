//! Strongly typed errors reported by the fallible (`try_`) half of the API.
//!
//! Leaf errors are plain structs with a hand-written [`Display`] and [`Error`] impl. The enums
//! combining them are derived, so each leaf converts into its own enum with `?`, and a
//! [`ReserveError`] converts into [`InsertError`].
use std::alloc::Layout;
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use derive_more::{Display, Error, From, IsVariant, TryInto};

/// An index or position was outside of the valid range of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOutOfBounds {
    /// The offending index.
    pub index: usize,
    /// The number of elements in the collection at the time.
    pub len: usize,
}

impl Display for IndexOutOfBounds {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Index {} out of bounds for collection with {} elements!", self.index, self.len)
    }
}

impl Error for IndexOutOfBounds {}

/// The requested capacity would need a block larger than [`isize::MAX`] bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityOverflow;

impl Display for CapacityOverflow {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Capacity overflow!")
    }
}

impl Error for CapacityOverflow {}

/// The memory service couldn't provide a block for the contained layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocFailure {
    /// The layout of the block that was requested.
    pub layout: Layout,
}

impl Display for AllocFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to allocate {} bytes with alignment {}!",
            self.layout.size(),
            self.layout.align()
        )
    }
}

impl Error for AllocFailure {}

/// Any reason for a reservation (or an operation that grows) to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error, From, TryInto, IsVariant)]
pub enum ReserveError {
    /// See [`CapacityOverflow`].
    CapacityOverflow(CapacityOverflow),
    /// See [`AllocFailure`].
    AllocFailure(AllocFailure),
}

/// Any reason for an insertion to fail. Nothing is mutated when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error, From, TryInto, IsVariant)]
pub enum InsertError {
    /// The position was past the end of the collection.
    IndexOutOfBounds(IndexOutOfBounds),
    /// The collection needed to grow, but couldn't.
    Reserve(ReserveError),
}
