//! Contiguous collection types. Namely [`Vector`], a growable array with optional inline capacity.

pub mod vector;

#[doc(inline)]
pub use vector::Vector;
