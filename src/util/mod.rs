#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod panic;
pub mod result;

#[cfg(test)]
pub mod test_types;
