//! Growable contiguous storage with an optional inline (small-buffer) capacity, built from a small
//! set of raw memory primitives.
//!
//! # Layers
//! Data only flows upward:
//! - [`mem::construct`]: in-place construction and destruction of single values and runs.
//! - [`mem::relocate`]: moving a live run from one address to another, leaving the source dead.
//! - [`mem::allocator`]: typed blocks on top of a platform [`MemoryService`](mem::MemoryService).
//! - [`Vector`](collections::contiguous::Vector): the public container, which owns a buffer that
//!   is either inline or a heap block.
//!
//! # Relocation
//! The single most important extension point is the [`Relocation`](mem::Relocation) strategy. With
//! [`Bitwise`](mem::Bitwise) (the default) a run of values is moved with one overlapping-safe
//! memory copy and heap blocks are resized in place where the memory service allows it. With
//! [`Elementwise`](mem::Elementwise) every value is moved on its own and reallocation always goes
//! through a fresh block. Both produce identical contents.
//!
//! # Error Handling
//! Like most collections, [`Vector`](collections::contiguous::Vector) panics by default: nobody
//! wants to handle a capacity overflow on every append. Running out of memory is reported through
//! [`std::alloc::handle_alloc_error`]. Every fallible operation also has a `try_` variant that
//! returns one of the strongly typed errors in [`error`] instead, without touching the contents.
//!
//! A panicking [`Clone`] or constructor closure never leaves constructed-but-unreachable values
//! behind: the partially built run is dropped and any fresh block is released before the panic
//! continues.
//!
//! # Features
//! - `logging`: emits `log` records on growth, shrinking and allocation failures.
//! - `malloc`: enables [`Malloc`](mem::memory::Malloc), a memory service backed by libc.
#![warn(clippy::missing_safety_doc)]
#![warn(clippy::undocumented_unsafe_blocks)]
#![warn(clippy::missing_const_for_fn)]
#![warn(clippy::missing_panics_doc)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_inception)]

pub mod collections;
pub mod mem;

pub(crate) mod util;

#[doc(inline)]
pub use util::error;
