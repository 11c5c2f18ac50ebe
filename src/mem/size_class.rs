//! Rounding of allocation sizes to the classes a typical general purpose allocator hands out
//! anyway, so growth never wastes the slack at the end of a block.
use std::num::NonZeroUsize;

/// Every request up to this size is rounded to a multiple of [`QUANTUM`].
const SMALL_LIMIT: usize = 128;
const QUANTUM: usize = 16;
/// The number of size classes per power of two above [`SMALL_LIMIT`].
const CLASSES_PER_DOUBLING: usize = 4;

/// Returns the size class that a request for `bytes` will end up in. The result is never smaller
/// than `bytes`; requests too large to round saturate at [`usize::MAX`].
///
/// # Examples
/// ```
/// # use relovec::mem::size_class::optimal_size;
/// # use std::num::NonZeroUsize;
/// let size = |n| optimal_size(NonZeroUsize::new(n).unwrap()).get();
/// assert_eq!(size(1), 16);
/// assert_eq!(size(100), 112);
/// assert_eq!(size(513), 640);
/// assert_eq!(size(999), 1024);
/// ```
pub const fn optimal_size(bytes: NonZeroUsize) -> NonZeroUsize {
    let bytes = bytes.get();

    let step = if bytes <= SMALL_LIMIT {
        QUANTUM
    } else {
        // 2^k < bytes <= 2^(k + 1), with k >= 7 so the shift can't underflow.
        let k = usize::BITS - 1 - (bytes - 1).leading_zeros();
        (1 << k) / CLASSES_PER_DOUBLING
    };

    let rounded = match bytes.checked_add(step - 1) {
        Some(sum) => sum / step * step,
        None => usize::MAX,
    };

    match NonZeroUsize::new(rounded) {
        Some(size) => size,
        None => NonZeroUsize::MAX,
    }
}

/// Rounds a capacity of `count` elements of type `T` up to the element count that fills its size
/// class, never exceeding `max_count`. Zero sized types are returned unchanged.
pub const fn optimal_count<T>(count: NonZeroUsize, max_count: usize) -> NonZeroUsize {
    let size = size_of::<T>();
    if size == 0 {
        return count;
    }

    let bytes = match count.get().checked_mul(size) {
        Some(bytes) => bytes,
        None => return count,
    };
    // SAFETY: count and size are both non-zero and their product didn't overflow.
    let bytes = unsafe { NonZeroUsize::new_unchecked(bytes) };

    let rounded = optimal_size(bytes).get() / size;
    let clamped = if rounded > max_count { max_count } else { rounded };

    if clamped < count.get() {
        count
    } else {
        // SAFETY: clamped >= count > 0.
        unsafe { NonZeroUsize::new_unchecked(clamped) }
    }
}
