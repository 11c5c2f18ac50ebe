//! Raw storage primitives, from single-value construction up to typed block allocation.
//!
//! Everything in here works on uninitialized memory through raw pointers and is therefore
//! `unsafe`. The safe surface built on top of it is
//! [`Vector`](crate::collections::contiguous::Vector).

pub mod allocator;
pub mod construct;
pub mod memory;
pub mod relocate;
pub mod relocation;
pub mod size_class;


#[doc(inline)]
pub use allocator::Allocator;
#[doc(inline)]
pub use memory::{Global, MemoryService};
#[doc(inline)]
pub use relocation::{Bitwise, Elementwise, Relocation};
