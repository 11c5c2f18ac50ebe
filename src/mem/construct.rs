//! In-place construction and destruction of values and runs of values.
//!
//! Construction is all-or-nothing: either a value ends up fully written at the target address, or
//! the target is left uninitialized. [`copy_construct`] extends this to a whole run by dropping
//! the clones it already made if a later [`Clone`] panics.
use std::mem;
use std::ptr::{self, NonNull};

use super::Relocation;

/// Writes `value` to `at`.
///
/// # Safety
/// `at` must be valid for writes, properly aligned and must not hold a live value (it would be
/// overwritten without being dropped).
#[inline]
pub const unsafe fn construct<T>(at: NonNull<T>, value: T) {
    // SAFETY: The caller guarantees that at is valid for writes and uninitialized.
    unsafe { at.write(value) }
}

/// Builds a value with `make` and writes it to `at`. If `make` panics, nothing is written.
///
/// # Safety
/// See [`construct`].
#[inline]
pub unsafe fn construct_with<T, F: FnOnce() -> T>(at: NonNull<T>, make: F) {
    let value = make();
    // SAFETY: The caller guarantees that at is valid for writes and uninitialized.
    unsafe { at.write(value) }
}

/// Builds a value with the fallible `make` and writes it to `at` on success. On failure the error
/// is returned and `at` is left untouched.
///
/// # Safety
/// See [`construct`].
#[inline]
pub unsafe fn try_construct_with<T, E, F>(at: NonNull<T>, make: F) -> Result<(), E>
where
    F: FnOnce() -> Result<T, E>,
{
    let value = make()?;
    // SAFETY: The caller guarantees that at is valid for writes and uninitialized.
    unsafe { at.write(value) };
    Ok(())
}

/// Drops the value at `at` in place.
///
/// # Safety
/// `at` must point to a live, properly aligned value which isn't used again afterwards.
#[inline]
pub unsafe fn destruct<T>(at: NonNull<T>) {
    // SAFETY: The caller guarantees that at holds a live value.
    unsafe { ptr::drop_in_place(at.as_ptr()) }
}

/// Drops `count` consecutive values starting at `first`.
///
/// # Safety
/// All `count` values must be live, properly aligned and not used again afterwards.
#[inline]
pub unsafe fn destruct_n<T>(first: NonNull<T>, count: usize) {
    if mem::needs_drop::<T>() && count > 0 {
        // SAFETY: The caller guarantees that the run [first, first + count) is live.
        unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(first.as_ptr(), count)) }
    }
}

/// Drops every value in `[first, last)`.
///
/// # Safety
/// `first` and `last` must belong to the same block with `first <= last`. See [`destruct_n`].
#[inline]
pub unsafe fn destruct_range<T>(first: NonNull<T>, last: NonNull<T>) {
    debug_assert!(first <= last, "destruct_range called with last before first");
    let count = if size_of::<T>() == 0 {
        0
    } else {
        // SAFETY: Both pointers belong to the same block, as guaranteed by the caller.
        unsafe { last.offset_from(first) as usize }
    };
    // SAFETY: Forwarded from the caller.
    unsafe { destruct_n(first, count) }
}

/// Clones every value of `src` into the uninitialized run starting at `dest`.
///
/// If a clone panics, the clones already written are dropped before the panic continues, leaving
/// `dest` uninitialized again. `src` is never modified.
///
/// # Safety
/// `dest` must be valid for `src.len()` writes, properly aligned, uninitialized and must not
/// overlap `src`.
pub unsafe fn copy_construct<T: Clone>(src: &[T], dest: NonNull<T>) {
    let mut run = PartialRun {
        first: dest,
        len: 0,
    };

    for value in src {
        let clone = value.clone();
        // SAFETY: run.len < src.len(), so this is in bounds of the destination.
        unsafe { run.first.add(run.len).write(clone) };
        run.len += 1;
    }

    // Everything was written, the run now belongs to the caller.
    mem::forget(run);
}

/// Moves `count` values from `src` into the uninitialized, non-overlapping run at `dest`.
///
/// The source isn't dropped: afterwards it holds stale copies which must be treated as
/// uninitialized. Relocation is built on top of this by simply forgetting the source.
///
/// # Safety
/// `src` must hold `count` live values, `dest` must be valid for `count` writes and the two runs
/// must not overlap. Both must be properly aligned.
#[inline]
pub unsafe fn move_construct<T, R: Relocation>(src: NonNull<T>, count: usize, dest: NonNull<T>) {
    debug_assert!(
        !overlaps(src, count, dest, count),
        "move_construct called with overlapping runs"
    );

    if R::BITWISE {
        // SAFETY: The runs don't overlap and are valid for count reads and writes respectively.
        unsafe { ptr::copy_nonoverlapping(src.as_ptr(), dest.as_ptr(), count) }
    } else {
        for i in 0..count {
            // SAFETY: i < count, so both offsets are in bounds of their runs.
            unsafe { dest.add(i).write(src.add(i).read()) }
        }
    }
}

/// Returns true if the runs `[a, a + a_len)` and `[b, b + b_len)` share any bytes.
pub(crate) fn overlaps<T>(a: NonNull<T>, a_len: usize, b: NonNull<T>, b_len: usize) -> bool {
    let size = size_of::<T>();
    if size == 0 || a_len == 0 || b_len == 0 {
        return false;
    }

    let a_start = a.as_ptr() as usize;
    let b_start = b.as_ptr() as usize;
    a_start < b_start + b_len * size && b_start < a_start + a_len * size
}

/// A run of initialized values which is dropped unless forgotten. Unwinding out of a partially
/// completed construction loop drops exactly the values written so far.
struct PartialRun<T> {
    first: NonNull<T>,
    len: usize,
}

impl<T> Drop for PartialRun<T> {
    fn drop(&mut self) {
        // SAFETY: Only the first len values have been written, and none have been handed out.
        unsafe { destruct_n(self.first, self.len) }
    }
}
