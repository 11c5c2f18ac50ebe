//! The capability deciding how live values are moved between addresses.
//!
//! Every Rust value can be moved with a plain byte copy, so [`Bitwise`] is always sound and is the
//! default everywhere. [`Elementwise`] moves values one at a time instead, which is observably
//! identical and exists to keep the per-element path available (and comparable) for payloads
//! where a caller prefers it.

/// A strategy for moving contiguous runs of values. Chosen statically, so the unused path is
/// compiled out entirely.
pub trait Relocation: 'static {
    /// Whether a run may be moved with a single (possibly overlapping) memory copy, and whether a
    /// block holding live values may be resized in place by the memory service.
    const BITWISE: bool;
}

/// Moves runs with one `memmove`-like copy and lets blocks be resized in place.
#[derive(Debug)]
pub enum Bitwise {}

impl Relocation for Bitwise {
    const BITWISE: bool = true;
}

/// Moves runs one value at a time and always reallocates into a fresh block.
#[derive(Debug)]
pub enum Elementwise {}

impl Relocation for Elementwise {
    const BITWISE: bool = false;
}
