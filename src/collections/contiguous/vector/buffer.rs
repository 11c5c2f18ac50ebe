use std::alloc::Layout;
use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};
use std::num::NonZeroUsize;
use std::ptr::NonNull;
use std::slice;

use crate::error::{AllocFailure, CapacityOverflow, ReserveError};
use crate::mem::construct::{construct, destruct_n, move_construct};
use crate::mem::size_class::optimal_count;
use crate::mem::{Allocator, MemoryService, Relocation};
use crate::util::logging::trace;

/// The storage behind a [`Vector`](super::Vector): count and capacity bookkeeping over either an
/// inline array of `N` slots or a heap block.
///
/// The buffer is inline exactly when `heap` is [`None`] and `N > 0`. With `N == 0`, no heap block
/// simply means capacity 0. The data pointer is derived from that state on every access rather
/// than stored, so the buffer stays valid wherever it is moved to.
///
/// Invariants: `count <= cap`, all values in `[0, count)` are live, and `cap` only changes through
/// [`grow`](Buffer::grow), [`grow_append_inplace`](Buffer::grow_append_inplace) and the explicit
/// [`shrink_to`](Buffer::shrink_to).
pub(crate) struct Buffer<T, const N: usize, R: Relocation, M: MemoryService> {
    inline: [MaybeUninit<T>; N],
    heap: Option<NonNull<T>>,
    count: usize,
    cap: usize,
    alloc: Allocator<T, R, M>,
    _phantom: PhantomData<T>,
}

impl<T, const N: usize, R: Relocation, M: MemoryService> Buffer<T, N, R, M> {
    pub(crate) const MAX_CAPACITY: usize = Allocator::<T, R, M>::MAX_COUNT;

    pub(crate) const fn new_in(memory: M) -> Buffer<T, N, R, M> {
        Buffer {
            inline: [const { MaybeUninit::uninit() }; N],
            heap: None,
            count: 0,
            cap: if size_of::<T>() == 0 { usize::MAX } else { N },
            alloc: Allocator::new(memory),
            _phantom: PhantomData,
        }
    }

    pub(crate) const fn count(&self) -> usize {
        self.count
    }

    pub(crate) const fn capacity(&self) -> usize {
        self.cap
    }

    pub(crate) const fn is_inline(&self) -> bool {
        self.heap.is_none() && N > 0
    }

    pub(crate) const fn memory(&self) -> &M {
        self.alloc.memory()
    }

    pub(crate) const fn as_ptr(&self) -> NonNull<T> {
        match self.heap {
            Some(ptr) => ptr,
            // SAFETY: Derived from a reference, so it can't be null.
            None => unsafe { NonNull::new_unchecked(self.inline.as_ptr().cast::<T>().cast_mut()) },
        }
    }

    pub(crate) const fn as_mut_ptr(&mut self) -> NonNull<T> {
        match self.heap {
            Some(ptr) => ptr,
            // SAFETY: Derived from a reference, so it can't be null.
            None => unsafe { NonNull::new_unchecked(self.inline.as_mut_ptr().cast::<T>()) },
        }
    }

    /// Returns a pointer to the first uninitialized slot.
    pub(crate) const fn end_ptr(&mut self) -> NonNull<T> {
        // SAFETY: count <= cap, so this is at most one past the end of the storage.
        unsafe { self.as_mut_ptr().add(self.count) }
    }

    pub(crate) const fn as_slice(&self) -> &[T] {
        // SAFETY: The first count values are live and the pointer is aligned and non-null.
        unsafe { slice::from_raw_parts(self.as_ptr().as_ptr(), self.count) }
    }

    pub(crate) const fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: As above, and self is borrowed mutably for the lifetime of the slice.
        unsafe { slice::from_raw_parts_mut(self.as_mut_ptr().as_ptr(), self.count) }
    }

    /// Sets the number of live values.
    ///
    /// # Safety
    /// `count <= capacity` and exactly the values in `[0, count)` must be live.
    pub(crate) const unsafe fn set_count(&mut self, count: usize) {
        debug_assert!(count <= self.cap, "count would exceed capacity");
        self.count = count;
    }

    /// Writes `value` into the first free slot.
    ///
    /// # Safety
    /// There must be spare capacity.
    pub(crate) unsafe fn push_unchecked(&mut self, value: T) {
        debug_assert!(self.count < self.cap, "no spare capacity");
        // SAFETY: The slot at count is in bounds and uninitialized.
        unsafe { construct(self.end_ptr(), value) };
        self.count += 1;
    }

    pub(crate) fn clear(&mut self) {
        let count = self.count;
        // Forget the values first, so a panicking drop can't cause a double drop later.
        self.count = 0;
        // SAFETY: The first count values were live and are no longer reachable.
        unsafe { destruct_n(self.as_mut_ptr(), count) }
    }

    /// Validates a capacity request and rounds it up to its size class.
    fn prepare(capacity: NonZeroUsize) -> Result<(NonZeroUsize, Layout), ReserveError> {
        if capacity.get() > Self::MAX_CAPACITY {
            return Err(CapacityOverflow.into());
        }

        let cap = optimal_count::<T>(capacity, Self::MAX_CAPACITY);
        let layout = Allocator::<T, R, M>::layout(cap.get()).ok_or(CapacityOverflow)?;
        Ok((cap, layout))
    }

    /// Moves the contents into a block with room for at least `capacity` values. The first growth
    /// of an inline buffer moves it to the heap. The count doesn't change, and on failure nothing
    /// does.
    pub(crate) fn grow(&mut self, capacity: NonZeroUsize) -> Result<(), ReserveError> {
        debug_assert!(capacity.get() > self.cap, "grow must increase the capacity");

        let (cap, layout) = Self::prepare(capacity)?;
        trace!(
            "growing buffer from {} to {} elements (inline: {})",
            self.cap,
            cap,
            self.is_inline()
        );

        let block = match self.heap {
            // SAFETY: The block was allocated for cap values, the first count of which are live.
            Some(old) => unsafe { self.alloc.reallocate(Some(old), self.cap, cap, self.count) },
            None => {
                let block = self.alloc.allocate(cap);
                if let Some(block) = block {
                    // SAFETY: The fresh block can't overlap the inline array (or an empty run).
                    unsafe { move_construct::<T, R>(self.as_mut_ptr(), self.count, block) }
                }
                block
            }
        };

        self.heap = Some(block.ok_or(AllocFailure { layout })?);
        self.cap = cap.get();
        Ok(())
    }

    /// Grows a full buffer to at least `capacity` and appends the value built by `make`.
    ///
    /// `make` receives the live values while they still sit in the old storage, so it may derive
    /// the new value from them. A fresh block is always allocated and the new value is written
    /// into it *before* the old values are moved and the old storage is retired. If `make` fails
    /// or panics, the fresh block is released and the buffer is left exactly as it was.
    pub(crate) fn grow_append_inplace<E, F>(
        &mut self,
        capacity: NonZeroUsize,
        make: F,
    ) -> Result<(), E>
    where
        E: From<ReserveError>,
        F: FnOnce(&[T]) -> Result<T, E>,
    {
        debug_assert!(self.count == self.cap, "grow_append_inplace requires a full buffer");
        debug_assert!(capacity.get() > self.cap, "grow must increase the capacity");

        let (cap, layout) = Self::prepare(capacity)?;
        let block = self
            .alloc
            .allocate(cap)
            .ok_or(ReserveError::from(AllocFailure { layout }))?;

        let fresh = FreshBlock {
            alloc: &self.alloc,
            block,
            cap: cap.get(),
        };
        let value = make(self.as_slice())?;
        // SAFETY: The slot at count is in bounds of the fresh block and uninitialized.
        unsafe { construct(block.add(self.count), value) };
        mem::forget(fresh);

        trace!(
            "grew buffer from {} to {} elements while appending (inline: {})",
            self.cap,
            cap,
            self.is_inline()
        );

        // SAFETY: The fresh block doesn't overlap the current storage. The old block held cap
        // slots and all of its values have just been moved out.
        unsafe {
            move_construct::<T, R>(self.as_mut_ptr(), self.count, block);
            self.alloc.deallocate(self.heap, self.cap);
        }

        self.heap = Some(block);
        self.count += 1;
        self.cap = cap.get();
        Ok(())
    }

    /// Reduces the capacity towards `max(capacity, count)`, returning to the inline array when
    /// the contents fit. A failed reallocation keeps the current block, as shrinking is only an
    /// optimization.
    pub(crate) fn shrink_to(&mut self, capacity: usize) {
        let Some(old) = self.heap else { return };
        let target = capacity.max(self.count);
        if target >= self.cap {
            return;
        }

        if N > 0 && target <= N {
            trace!("moving {} elements back inline", self.count);
            // SAFETY: The inline array has room for count <= N values and doesn't overlap the
            // heap block, which is released after its values have been moved out.
            unsafe {
                let inline = NonNull::from(&mut self.inline).cast::<T>();
                move_construct::<T, R>(old, self.count, inline);
                self.alloc.deallocate(Some(old), self.cap);
            }
            self.heap = None;
            self.cap = N;
            return;
        }

        match NonZeroUsize::new(target) {
            None => {
                trace!("releasing empty block of {} elements", self.cap);
                // SAFETY: The block holds no live values.
                unsafe { self.alloc.deallocate(Some(old), self.cap) };
                self.heap = None;
                self.cap = 0;
            }
            Some(target) => {
                trace!("shrinking block from {} to {} elements", self.cap, target);
                // SAFETY: The block was allocated for cap values, the first count of which are
                // live. target >= count, so no values are dropped.
                let block = unsafe { self.alloc.reallocate(Some(old), self.cap, target, self.count) };
                if let Some(block) = block {
                    self.heap = Some(block);
                    self.cap = target.get();
                }
            }
        }
    }
}

impl<T, R: Relocation, M: MemoryService> Buffer<T, 0, R, M> {
    /// Exchanges the contents of two buffers without touching their values. Only buffers without
    /// inline capacity can do this in constant time.
    pub(crate) fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }
}

impl<T, const N: usize, R: Relocation, M: MemoryService> Drop for Buffer<T, N, R, M> {
    fn drop(&mut self) {
        self.clear();
        // SAFETY: All values have been dropped, heap is None or a block for cap values.
        unsafe { self.alloc.deallocate(self.heap, self.cap) }
    }
}

// SAFETY: A Buffer uniquely owns its values and block, just like a Vec.
unsafe impl<T: Send, const N: usize, R: Relocation, M: MemoryService + Send> Send
    for Buffer<T, N, R, M>
{
}
// SAFETY: Shared access only hands out shared references to values.
unsafe impl<T: Sync, const N: usize, R: Relocation, M: MemoryService + Sync> Sync
    for Buffer<T, N, R, M>
{
}

/// A freshly allocated block which is released again unless forgotten.
struct FreshBlock<'a, T, R: Relocation, M: MemoryService> {
    alloc: &'a Allocator<T, R, M>,
    block: NonNull<T>,
    cap: usize,
}

impl<T, R: Relocation, M: MemoryService> Drop for FreshBlock<'_, T, R, M> {
    fn drop(&mut self) {
        // SAFETY: The block was allocated for cap values and holds none.
        unsafe { self.alloc.deallocate(Some(self.block), self.cap) }
    }
}
