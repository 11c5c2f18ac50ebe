//! General-purpose collection types.
//!
//! # Method
//! Applicable types here implement [`Deref<Target = [T]>`](std::ops::Deref) (and DerefMut), which
//! saves them from repeating the read-only functionality of slices.

pub mod contiguous;
