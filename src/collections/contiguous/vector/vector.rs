use std::borrow::{Borrow, BorrowMut};
use std::cmp;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::ops::{Bound, Deref, DerefMut, RangeBounds};
use std::slice;

use super::buffer::Buffer;
use crate::error::{CapacityOverflow, IndexOutOfBounds, InsertError, ReserveError};
use crate::mem::construct::{copy_construct, destruct_n};
use crate::mem::relocate::{relocate_left, relocate_right};
use crate::mem::{Bitwise, Global, MemoryService, Relocation};
use crate::util::result::{RaiseExtension, ResultExtension};

/// A growable contiguous collection which keeps up to `N` values inline before moving to the
/// heap.
///
/// - `N`: the inline (small) capacity. With the default of 0 the Vector never stores values
///   inline, and is the only variant that can be [`swap`](Vector::swap)ped in constant time.
/// - `R`: the [`Relocation`] strategy used whenever values move between or within blocks.
/// - `M`: the [`MemoryService`] providing heap blocks.
///
/// # Growth
/// When an append or insert needs room, the capacity becomes `count + (count + 2) / 2` (about
/// 1.5x), rounded up to fill the allocator's size class. Growth invalidates every pointer into the
/// Vector; the borrow checker enforces this for references.
///
/// # Time Complexity
/// For this analysis of time complexity, variables are defined as follows:
/// - `n`: The number of items in the Vector.
/// - `i`: The index of the item in question.
///
/// | Method | Complexity |
/// |-|-|
/// | `append` | `O(1)`*, `O(n)` |
/// | `append_inplace` | `O(1)`*, `O(n)` |
/// | `insert_at` | `O(n-i)` |
/// | `drop_at` | `O(n-i)` |
/// | `drop_back` | `O(1)` |
/// | `truncate` | `O(n)`** |
/// | `reserve` | `O(n)`***, `O(1)` |
/// | `swap` | `O(1)` |
///
/// \* If the Vector doesn't have enough capacity for the new element, appending takes `O(n)`.
///
/// \** Only for dropping the removed values.
///
/// \*** If the Vector has enough capacity already, `reserve` is `O(1)`.
pub struct Vector<T, const N: usize = 0, R: Relocation = Bitwise, M: MemoryService = Global> {
    pub(crate) buf: Buffer<T, N, R, M>,
}

impl<T, const N: usize, R: Relocation, M: MemoryService + Default> Vector<T, N, R, M> {
    /// Creates a new, empty Vector. No memory is allocated until the inline capacity is exceeded.
    ///
    /// # Examples
    /// ```
    /// # use relovec::collections::contiguous::Vector;
    /// let vec: Vector<u8> = Vector::new();
    /// assert_eq!(vec.count(), 0);
    /// assert_eq!(vec.capacity(), 0);
    ///
    /// let small: Vector<u8, 8> = Vector::new();
    /// assert_eq!(small.capacity(), 8);
    /// assert!(small.is_inline());
    /// ```
    pub fn new() -> Vector<T, N, R, M> {
        Self::new_in(M::default())
    }

    /// Creates a new Vector with room for at least `capacity` values.
    ///
    /// # Panics
    /// Panics if the memory layout size would exceed [`isize::MAX`].
    ///
    /// # Examples
    /// ```
    /// # use relovec::collections::contiguous::Vector;
    /// let vec: Vector<u32> = Vector::with_capacity(20);
    /// assert!(vec.capacity() >= 20);
    /// ```
    pub fn with_capacity(capacity: usize) -> Vector<T, N, R, M> {
        let mut vec = Self::new();
        vec.reserve(capacity);
        vec
    }
}

impl<T, const N: usize, R: Relocation, M: MemoryService> Vector<T, N, R, M> {
    /// Creates a new, empty Vector drawing its heap blocks from `memory`.
    pub const fn new_in(memory: M) -> Vector<T, N, R, M> {
        Vector {
            buf: Buffer::new_in(memory),
        }
    }

    /// Returns the inline capacity, `N`.
    pub const fn default_capacity() -> usize {
        N
    }

    /// Returns the number of values in the Vector.
    pub const fn count(&self) -> usize {
        self.buf.count()
    }

    /// Returns the number of values the Vector can hold without growing. Never less than
    /// [`count`](Vector::count).
    pub const fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Returns the number of bytes occupied by the values.
    pub const fn byte_size(&self) -> usize {
        self.buf.count() * size_of::<T>()
    }

    /// Returns true if the values are currently stored inline rather than on the heap.
    pub const fn is_inline(&self) -> bool {
        self.buf.is_inline()
    }

    /// Returns the memory service backing this Vector.
    pub const fn memory(&self) -> &M {
        self.buf.memory()
    }

    /// Extracts a slice containing the entire Vector.
    pub const fn as_slice(&self) -> &[T] {
        self.buf.as_slice()
    }

    /// Extracts a mutable slice containing the entire Vector.
    pub const fn as_mut_slice(&mut self) -> &mut [T] {
        self.buf.as_mut_slice()
    }

    /// Appends `value` to the end of the Vector, growing if required.
    ///
    /// # Panics
    /// Panics if the memory layout of the Vector would have a size that exceeds [`isize::MAX`].
    ///
    /// # Examples
    /// ```
    /// # use relovec::collections::contiguous::Vector;
    /// let mut vec = Vector::<u8>::new();
    /// for i in 0..=5 {
    ///     vec.append(i);
    /// }
    /// assert_eq!(&*vec, &[0, 1, 2, 3, 4, 5]);
    /// ```
    pub fn append(&mut self, value: T) {
        self.try_append(value).raise()
    }

    /// Appends `value`, returning an error instead of panicking if the Vector can't grow. On
    /// error the Vector is unchanged and `value` is dropped.
    pub fn try_append(&mut self, value: T) -> Result<(), ReserveError> {
        if self.buf.count() == self.buf.capacity() {
            self.buf.grow(self.recommend_capacity()?)?;
        }
        // SAFETY: There is spare capacity now.
        unsafe { self.buf.push_unchecked(value) };
        Ok(())
    }

    /// Appends the value built by `make`, which may read the current contents of the Vector.
    ///
    /// If the Vector has to grow, the new value is built while the old contents are still in
    /// place and stored in the new block before anything is moved, so deriving it from the
    /// Vector's own values is always safe.
    ///
    /// # Panics
    /// Panics if the memory layout of the Vector would have a size that exceeds [`isize::MAX`].
    /// If `make` panics, the Vector is left unchanged.
    ///
    /// # Examples
    /// ```
    /// # use relovec::collections::contiguous::Vector;
    /// let mut vec = Vector::<String>::from(["a".to_owned(), "b".to_owned()]);
    /// vec.append_inplace(|values| values.concat());
    /// assert_eq!(&*vec, &["a", "b", "ab"]);
    /// ```
    pub fn append_inplace<F: FnOnce(&[T]) -> T>(&mut self, make: F) {
        self.try_append_inplace::<ReserveError, _>(|values| Ok(make(values)))
            .raise()
    }

    /// Appends the value built by the fallible `make`. Both growth failures (converted into `E`)
    /// and errors from `make` leave the Vector unchanged.
    pub fn try_append_inplace<E, F>(&mut self, make: F) -> Result<(), E>
    where
        E: From<ReserveError>,
        F: FnOnce(&[T]) -> Result<T, E>,
    {
        if self.buf.count() < self.buf.capacity() {
            let value = make(self.buf.as_slice())?;
            // SAFETY: There is spare capacity.
            unsafe { self.buf.push_unchecked(value) };
            Ok(())
        } else {
            let capacity = self.recommend_capacity()?;
            self.buf.grow_append_inplace(capacity, make)
        }
    }

    /// Inserts `value` at `pos`, shifting all following values one place to the right.
    ///
    /// # Panics
    /// Panics if `pos > count`, or if the Vector needs to grow and can't.
    ///
    /// # Examples
    /// ```
    /// # use relovec::collections::contiguous::Vector;
    /// let mut vec = Vector::<u8>::from([0, 1, 2]);
    /// vec.insert_at(1, 100);
    /// vec.insert_at(1, 200);
    /// vec.insert_at(5, 250);
    /// assert_eq!(&*vec, &[0, 200, 100, 1, 2, 250]);
    /// ```
    pub fn insert_at(&mut self, pos: usize, value: T) {
        self.try_insert_at(pos, value).raise()
    }

    /// Inserts `value` at `pos`, returning an error instead of panicking. On error nothing is
    /// mutated.
    pub fn try_insert_at(&mut self, pos: usize, value: T) -> Result<(), InsertError> {
        let count = self.buf.count();

        if pos > count {
            return Err(IndexOutOfBounds { index: pos, len: count }.into());
        }
        if pos == count {
            return Ok(self.try_append(value)?);
        }

        if count == self.buf.capacity() {
            self.buf.grow(self.recommend_capacity()?)?;
        }

        let base = self.buf.as_mut_ptr();
        // SAFETY: pos < count < capacity, so the shifted tail and the gap are in bounds. The
        // value is written into the gap right after, so no slot is left dead.
        unsafe {
            relocate_right::<T, R>(base.add(pos), count - pos, 1);
            base.add(pos).write(value);
            self.buf.set_count(count + 1);
        }
        Ok(())
    }

    /// Removes `count` values starting at `pos`, or all values from `pos` onwards if there are
    /// fewer. The order of the remaining values is preserved. Does nothing if `pos` is out of
    /// bounds.
    ///
    /// # Examples
    /// ```
    /// # use relovec::collections::contiguous::Vector;
    /// let mut vec = Vector::<u8>::from([0, 1, 2, 3, 4, 5]);
    /// vec.drop_at(1, 2);
    /// assert_eq!(&*vec, &[0, 3, 4, 5]);
    /// vec.drop_at(2, 10);
    /// assert_eq!(&*vec, &[0, 3]);
    /// ```
    pub fn drop_at(&mut self, pos: usize, count: usize) {
        let len = self.buf.count();
        if pos >= len || count == 0 {
            return;
        }

        let remaining = len - pos;
        if count >= remaining {
            self.drop_back_unchecked(remaining);
            return;
        }

        // SAFETY: The count is lowered first, so a panicking drop leaks the tail instead of
        // dropping it twice.
        unsafe { self.buf.set_count(pos) };
        // Any later &mut borrow of an inline buffer would invalidate this pointer.
        let base = self.buf.as_mut_ptr();
        // SAFETY: [pos, pos + count) are live values which are dropped, then the tail after them
        // is moved left over the gap.
        unsafe {
            destruct_n(base.add(pos), count);
            relocate_left::<T, R>(base.add(pos + count), remaining - count, count);
        }
        // SAFETY: The gap is closed, so [0, len - count) is live again.
        unsafe { self.buf.set_count(len - count) };
    }

    /// Drops the last value.
    ///
    /// # Panics
    /// Panics if the Vector is empty.
    pub fn drop_back(&mut self) {
        if self.buf.count() == 0 {
            Err(IndexOutOfBounds { index: 0, len: 0 }).throw()
        }
        self.drop_back_unchecked(1);
    }

    /// Drops the last `count` values, or all of them if there are fewer.
    pub fn drop_back_n(&mut self, count: usize) {
        self.drop_back_unchecked(cmp::min(count, self.buf.count()));
    }

    /// Removes and returns the last value, if there is one.
    ///
    /// # Examples
    /// ```
    /// # use relovec::collections::contiguous::Vector;
    /// let mut vec = Vector::<u8, 2>::from([1, 2]);
    /// assert_eq!(vec.pop_back(), Some(2));
    /// assert_eq!(vec.pop_back(), Some(1));
    /// assert_eq!(vec.pop_back(), None);
    /// ```
    pub fn pop_back(&mut self) -> Option<T> {
        let count = self.buf.count().checked_sub(1)?;
        // SAFETY: The last value is live, and is forgotten by lowering the count.
        unsafe {
            self.buf.set_count(count);
            Some(self.buf.as_mut_ptr().add(count).read())
        }
    }

    /// Shortens the Vector to `count` values, dropping the rest. Does nothing if the Vector is
    /// already shorter. The capacity is unchanged.
    pub fn truncate(&mut self, count: usize) {
        let len = self.buf.count();
        if count < len {
            self.drop_back_unchecked(len - count);
        }
    }

    /// Drops all values. The capacity is unchanged.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Ensures that the Vector can hold at least `capacity` values in total.
    ///
    /// # Panics
    /// Panics if the memory layout of the Vector would have a size that exceeds [`isize::MAX`].
    pub fn reserve(&mut self, capacity: usize) {
        self.try_reserve(capacity).raise()
    }

    /// Ensures that the Vector can hold at least `capacity` values in total, returning an error
    /// instead of panicking. On error the Vector is unchanged.
    ///
    /// # Examples
    /// ```
    /// # use relovec::collections::contiguous::Vector;
    /// let mut vec = Vector::<u64>::from([1, 2, 3]);
    /// assert!(vec.try_reserve(usize::MAX / 2).is_err());
    /// assert_eq!(&*vec, &[1, 2, 3]);
    /// ```
    pub fn try_reserve(&mut self, capacity: usize) -> Result<(), ReserveError> {
        if capacity <= self.buf.capacity() {
            return Ok(());
        }

        let recommended = cmp::min(self.recommended_count(), Buffer::<T, N, R, M>::MAX_CAPACITY);
        self.buf.grow(Self::check_capacity(cmp::max(capacity, recommended))?)
    }

    /// Ensures that the Vector can hold `extra` more values.
    ///
    /// # Panics
    /// Panics if the memory layout of the Vector would have a size that exceeds [`isize::MAX`].
    pub fn reserve_append(&mut self, extra: usize) {
        self.try_reserve_append(extra).raise()
    }

    /// Ensures that the Vector can hold `extra` more values, returning an error instead of
    /// panicking.
    pub fn try_reserve_append(&mut self, extra: usize) -> Result<(), ReserveError> {
        self.try_reserve(self.buf.count().saturating_add(extra))
    }

    /// Reduces the capacity as far as the allocator allows, moving the values back inline if
    /// they fit.
    pub fn shrink_to_fit(&mut self) {
        self.buf.shrink_to(self.buf.count());
    }

    /// Drops the last `count` values.
    fn drop_back_unchecked(&mut self, count: usize) {
        debug_assert!(count <= self.buf.count());
        let len = self.buf.count() - count;
        // SAFETY: The last count values are live and no longer reachable once the count is
        // lowered.
        unsafe {
            self.buf.set_count(len);
            destruct_n(self.buf.as_mut_ptr().add(len), count);
        }
    }

    /// The capacity to grow to when the Vector is full: about 1.5x the count, always greater than
    /// the count.
    const fn recommended_count(&self) -> usize {
        let count = self.buf.count();
        count.saturating_add((count / 2) + 1)
    }

    fn recommend_capacity(&self) -> Result<NonZeroUsize, ReserveError> {
        let max = Buffer::<T, N, R, M>::MAX_CAPACITY;
        if self.buf.count() >= max {
            return Err(CapacityOverflow.into());
        }
        Self::check_capacity(cmp::min(self.recommended_count(), max))
    }

    fn check_capacity(capacity: usize) -> Result<NonZeroUsize, ReserveError> {
        match NonZeroUsize::new(capacity) {
            Some(capacity) if capacity.get() <= Buffer::<T, N, R, M>::MAX_CAPACITY => Ok(capacity),
            _ => Err(CapacityOverflow.into()),
        }
    }
}

impl<T: Clone, const N: usize, R: Relocation, M: MemoryService> Vector<T, N, R, M> {
    /// Clones and appends every value of `values`. If a clone panics, the values cloned so far
    /// are dropped and the Vector keeps its previous contents.
    ///
    /// # Panics
    /// Panics if the memory layout of the Vector would have a size that exceeds [`isize::MAX`].
    pub fn extend_from_slice(&mut self, values: &[T]) {
        if values.is_empty() {
            return;
        }

        self.reserve_append(values.len());
        // SAFETY: There is room for values.len() more values, and values can't alias the spare
        // capacity of self.
        unsafe {
            copy_construct(values, self.buf.end_ptr());
            self.buf.set_count(self.buf.count() + values.len());
        }
    }

    /// Clones the values in `range` and appends them to the end, growing first if required. The
    /// range may cover the entire Vector.
    ///
    /// # Panics
    /// Panics if the range is out of bounds, or if the Vector needs to grow and can't.
    ///
    /// # Examples
    /// ```
    /// # use relovec::collections::contiguous::Vector;
    /// let mut vec = Vector::<u8>::from([1, 2]);
    /// vec.append_from_within(..);
    /// vec.append_from_within(1..3);
    /// assert_eq!(&*vec, &[1, 2, 1, 2, 2, 1]);
    /// ```
    pub fn append_from_within<B: RangeBounds<usize>>(&mut self, range: B) {
        let len = self.buf.count();
        let start = match range.start_bound() {
            Bound::Included(&start) => start,
            Bound::Excluded(&start) => start.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&end) => end.saturating_add(1),
            Bound::Excluded(&end) => end,
            Bound::Unbounded => len,
        };
        if end > len {
            Err(IndexOutOfBounds { index: end, len }).throw()
        }
        if start > end {
            Err(IndexOutOfBounds { index: start, len: end }).throw()
        }

        let extra = end - start;
        if extra == 0 {
            return;
        }

        // Growth may move the values, so only positions are carried across it.
        self.reserve_append(extra);
        let base = self.buf.as_mut_ptr();
        // SAFETY: [start, end) is live and lies before the spare capacity being written, which
        // has room for extra values.
        unsafe {
            let source = slice::from_raw_parts(base.add(start).as_ptr(), extra);
            copy_construct(source, base.add(len));
            self.buf.set_count(len + extra);
        }
    }
}

impl<T, R: Relocation, M: MemoryService> Vector<T, 0, R, M> {
    /// Exchanges the contents of two Vectors in constant time, without moving any values. Only
    /// available without inline capacity, where the values always live in a heap block.
    ///
    /// # Examples
    /// ```
    /// # use relovec::collections::contiguous::Vector;
    /// let mut a = Vector::<u8>::from([1, 2]);
    /// let mut b = Vector::<u8>::from([3]);
    /// a.swap(&mut b);
    /// assert_eq!((&*a, &*b), (&[3][..], &[1, 2][..]));
    /// ```
    pub fn swap(&mut self, other: &mut Self) {
        self.buf.swap(&mut other.buf);
    }
}

impl<T, const N: usize, R: Relocation, M: MemoryService> Extend<T> for Vector<T, N, R, M> {
    fn extend<A: IntoIterator<Item = T>>(&mut self, iter: A) {
        let iter = iter.into_iter();
        self.reserve_append(iter.size_hint().0);

        for item in iter {
            self.append(item);
        }
    }
}

impl<'a, T: Copy + 'a, const N: usize, R: Relocation, M: MemoryService> Extend<&'a T>
    for Vector<T, N, R, M>
{
    fn extend<A: IntoIterator<Item = &'a T>>(&mut self, iter: A) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T, const N: usize, R: Relocation, M: MemoryService + Default> FromIterator<T>
    for Vector<T, N, R, M>
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut vec = Self::new();
        vec.extend(iter);
        vec
    }
}

impl<T, const N: usize, const K: usize, R: Relocation, M: MemoryService + Default> From<[T; K]>
    for Vector<T, N, R, M>
{
    fn from(value: [T; K]) -> Self {
        let mut vec = Self::with_capacity(K);
        for item in value {
            // SAFETY: vec has been created with enough capacity.
            unsafe { vec.buf.push_unchecked(item) };
        }
        vec
    }
}

impl<T: Clone, const N: usize, R: Relocation, M: MemoryService + Default> From<&[T]>
    for Vector<T, N, R, M>
{
    fn from(value: &[T]) -> Self {
        let mut vec = Self::new();
        vec.extend_from_slice(value);
        vec
    }
}

impl<T, const N: usize, R: Relocation, M: MemoryService + Default> Default for Vector<T, N, R, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, const N: usize, R: Relocation, M: MemoryService + Clone> Clone
    for Vector<T, N, R, M>
{
    fn clone(&self) -> Self {
        let mut vec = Self::new_in(self.memory().clone());
        vec.extend_from_slice(self);
        vec
    }
}

impl<T, const N: usize, R: Relocation, M: MemoryService> Deref for Vector<T, N, R, M> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T, const N: usize, R: Relocation, M: MemoryService> DerefMut for Vector<T, N, R, M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<T, const N: usize, R: Relocation, M: MemoryService> AsRef<[T]> for Vector<T, N, R, M> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, const N: usize, R: Relocation, M: MemoryService> AsMut<[T]> for Vector<T, N, R, M> {
    fn as_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, const N: usize, R: Relocation, M: MemoryService> Borrow<[T]> for Vector<T, N, R, M> {
    fn borrow(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, const N: usize, R: Relocation, M: MemoryService> BorrowMut<[T]> for Vector<T, N, R, M> {
    fn borrow_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: PartialEq, const N: usize, R: Relocation, M: MemoryService> PartialEq
    for Vector<T, N, R, M>
{
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

impl<T: Eq, const N: usize, R: Relocation, M: MemoryService> Eq for Vector<T, N, R, M> {}

impl<T: Hash, const N: usize, R: Relocation, M: MemoryService> Hash for Vector<T, N, R, M> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (**self).hash(state);
    }
}

impl<T: Debug, const N: usize, R: Relocation, M: MemoryService> Debug for Vector<T, N, R, M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vector")
            .field("contents", &self.as_slice())
            .field("count", &self.count())
            .field("capacity", &self.capacity())
            .field("inline", &self.is_inline())
            .finish()
    }
}
