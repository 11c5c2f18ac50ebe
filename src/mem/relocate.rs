//! Moving a live run to another address, leaving the source dead.
//!
//! Relocation is move construction followed by forgetting the source, which in Rust needs no
//! destructor calls at all. With [`Bitwise`](super::Bitwise) the whole run is moved by a single
//! overlap-aware copy; with [`Elementwise`](super::Elementwise) values are moved one by one, in an
//! order that keeps overlapping moves correct.
//!
//! # Overlap
//! [`relocate`] copies front to back and so requires `dest <= first` (or no overlap at all);
//! [`relocate_backward`] copies back to front and requires `dest_end >= last`. These rules are
//! only checked with `debug_assert!`.
use std::ptr::{self, NonNull};

use super::Relocation;
use super::construct::overlaps;

/// Moves the `count` live values starting at `first` to `dest`, front to back.
///
/// # Safety
/// - `[first, first + count)` must hold live values which are treated as uninitialized afterwards.
/// - `[dest, dest + count)` must be valid for writes and hold no live values outside of the
///   source run.
/// - `dest <= first`, or the runs must not overlap.
#[inline]
pub unsafe fn relocate<T, R: Relocation>(first: NonNull<T>, count: usize, dest: NonNull<T>) {
    debug_assert!(
        dest <= first || !overlaps(first, count, dest, count),
        "relocate requires dest <= first for overlapping runs"
    );

    if R::BITWISE {
        // SAFETY: Both runs are valid for count values, ptr::copy handles the overlap.
        unsafe { ptr::copy(first.as_ptr(), dest.as_ptr(), count) }
    } else {
        for i in 0..count {
            // SAFETY: i < count. Because dest <= first, dest + i never lands on a source value
            // that hasn't been moved yet.
            unsafe { dest.add(i).write(first.add(i).read()) }
        }
    }
}

/// Moves the `count` live values starting at `first` so that they end just before `dest_end`,
/// back to front.
///
/// # Safety
/// Same as [`relocate`], except that the destination is `[dest_end - count, dest_end)` and
/// overlapping runs require `dest_end >= first + count`.
#[inline]
pub unsafe fn relocate_backward<T, R: Relocation>(
    first: NonNull<T>,
    count: usize,
    dest_end: NonNull<T>,
) {
    // SAFETY: The caller guarantees that the destination run lies within one block.
    let dest = unsafe { dest_end.sub(count) };
    // SAFETY: The caller guarantees that first + count is in bounds of the source block.
    let last = unsafe { first.add(count) };
    debug_assert!(
        dest_end >= last || !overlaps(first, count, dest, count),
        "relocate_backward requires dest_end >= last for overlapping runs"
    );

    if R::BITWISE {
        // SAFETY: Both runs are valid for count values, ptr::copy handles the overlap.
        unsafe { ptr::copy(first.as_ptr(), dest.as_ptr(), count) }
    } else {
        for i in (0..count).rev() {
            // SAFETY: i < count. Because dest >= first, dest + i never lands on a source value
            // that hasn't been moved yet.
            unsafe { dest.add(i).write(first.add(i).read()) }
        }
    }
}

/// Moves the run `[first, first + count)` `shift` places to the left, closing a gap of `shift`
/// dead slots in front of it.
///
/// # Safety
/// `[first - shift, first)` must be in bounds of the same block and hold no live values. See
/// [`relocate`].
#[inline]
pub unsafe fn relocate_left<T, R: Relocation>(first: NonNull<T>, count: usize, shift: usize) {
    // SAFETY: The caller guarantees that first - shift is in bounds.
    let dest = unsafe { first.sub(shift) };
    // SAFETY: dest <= first, forwarded from the caller.
    unsafe { relocate::<T, R>(first, count, dest) }
}

/// Moves the run `[first, first + count)` `shift` places to the right, opening a gap of `shift`
/// uninitialized slots at `first`.
///
/// # Safety
/// `[first + count, first + count + shift)` must be in bounds of the same block and hold no live
/// values. See [`relocate_backward`].
#[inline]
pub unsafe fn relocate_right<T, R: Relocation>(first: NonNull<T>, count: usize, shift: usize) {
    // SAFETY: The caller guarantees that the shifted run is in bounds.
    let dest_end = unsafe { first.add(count + shift) };
    // SAFETY: dest_end >= first + count, forwarded from the caller.
    unsafe { relocate_backward::<T, R>(first, count, dest_end) }
}
