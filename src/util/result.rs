use std::alloc;
use std::error::Error;

use crate::error::{InsertError, ReserveError};

pub(crate) trait ResultExtension<T, E: Error> {
    /// A method similar to [`Result::unwrap`], except that it applies only to types which implement
    /// [`Error`] and panics with the message of the error itself.
    ///
    /// # Panics
    /// Panics if the [`Result`] is an [`Err`].
    fn throw(self) -> T;
}

impl<T, E: Error> ResultExtension<T, E> for Result<T, E> {
    fn throw(self) -> T {
        match self {
            Ok(val) => val,
            Err(error) => panic!("{}", error),
        }
    }
}

pub(crate) trait RaiseExtension<T> {
    /// Unwraps the value of a growing operation. Allocation failures are passed to
    /// [`alloc::handle_alloc_error`], everything else panics with the error's message.
    ///
    /// # Panics
    /// Panics if the [`Result`] is an [`Err`] that isn't an allocation failure.
    fn raise(self) -> T;
}

impl<T> RaiseExtension<T> for Result<T, ReserveError> {
    fn raise(self) -> T {
        match self {
            Ok(val) => val,
            Err(ReserveError::AllocFailure(failure)) => alloc::handle_alloc_error(failure.layout),
            Err(error) => panic!("{}", error),
        }
    }
}

impl<T> RaiseExtension<T> for Result<T, InsertError> {
    fn raise(self) -> T {
        match self {
            Ok(val) => val,
            Err(InsertError::Reserve(error)) => Err::<T, _>(error).raise(),
            Err(error) => panic!("{}", error),
        }
    }
}
