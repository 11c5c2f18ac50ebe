//! Typed blocks on top of a [`MemoryService`].
use std::alloc::Layout;
use std::cmp;
use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;
use std::mem;
use std::num::NonZeroUsize;
use std::ptr::NonNull;

use super::construct::{destruct_n, move_construct};
use super::{Bitwise, Global, MemoryService, Relocation};
use crate::util::logging::debug;

/// Acquires and releases uninitialized blocks sized for a number of `T`s.
///
/// Failure is never exceptional here: requests that can't be satisfied, including those which
/// would exceed [`MAX_COUNT`](Allocator::MAX_COUNT), produce [`None`]. Zero sized types never reach
/// the memory service and always get a dangling, well aligned pointer.
///
/// The [`Relocation`] strategy `R` decides how [`reallocate`](Allocator::reallocate) preserves
/// live values.
pub struct Allocator<T, R: Relocation = Bitwise, M: MemoryService = Global> {
    memory: M,
    _phantom: PhantomData<(fn() -> T, fn() -> R)>,
}

impl<T, R: Relocation, M: MemoryService> Allocator<T, R, M> {
    /// The largest number of elements a single block can hold, keeping its size within
    /// [`isize::MAX`] bytes.
    pub const MAX_COUNT: usize = match size_of::<T>() {
        0 => usize::MAX,
        size => isize::MAX as usize / size,
    };

    /// Creates an Allocator drawing from `memory`.
    pub const fn new(memory: M) -> Allocator<T, R, M> {
        Allocator {
            memory,
            _phantom: PhantomData,
        }
    }

    /// Returns the underlying memory service.
    pub const fn memory(&self) -> &M {
        &self.memory
    }

    /// Returns the layout of a block for `count` elements, or [`None`] if it would exceed
    /// [`MAX_COUNT`](Allocator::MAX_COUNT).
    pub fn layout(count: usize) -> Option<Layout> {
        if count > Self::MAX_COUNT {
            return None;
        }
        Layout::array::<T>(count).ok()
    }

    /// Requests an uninitialized block for `count` elements.
    pub fn allocate(&self, count: NonZeroUsize) -> Option<NonNull<T>> {
        let layout = Self::layout(count.get())?;
        if layout.size() == 0 {
            return Some(NonNull::dangling());
        }

        let block = self.memory.allocate(layout);
        if block.is_none() {
            debug!("allocation of {} elements ({} bytes) failed", count, layout.size());
        }
        block.map(NonNull::cast)
    }

    /// Releases `block`, which was returned for `count` elements. Releasing [`None`] does nothing,
    /// so a moved-from owner can be released like any other. Live values aren't dropped.
    ///
    /// # Safety
    /// `block` must have been returned by this Allocator (or one sharing its memory service) for
    /// exactly `count` elements, and must not be used afterwards.
    pub unsafe fn deallocate(&self, block: Option<NonNull<T>>, count: usize) {
        let Some(block) = block else { return };
        let Some(layout) = Self::layout(count) else { return };

        if layout.size() != 0 {
            // SAFETY: The caller guarantees that block was allocated with this layout.
            unsafe { self.memory.deallocate(block.cast(), layout) }
        }
    }

    /// Resizes `block` (holding `capacity` slots, the first `live` of which are initialized) so
    /// that it holds `new_count` slots, preserving the first `min(new_count, live)` values. Values
    /// past `new_count` are dropped. A `block` of [`None`] behaves like
    /// [`allocate`](Allocator::allocate).
    ///
    /// On success the old block must be considered released. On failure [`None`] is returned and
    /// the old block and all of its values are left exactly as they were.
    ///
    /// # Safety
    /// `block` must have been returned by this Allocator for exactly `capacity` elements, with
    /// `live <= capacity` values initialized at its start. A [`None`] block requires `capacity`
    /// and `live` to be zero.
    pub unsafe fn reallocate(
        &self,
        block: Option<NonNull<T>>,
        capacity: usize,
        new_count: NonZeroUsize,
        live: usize,
    ) -> Option<NonNull<T>> {
        debug_assert!(live <= capacity, "more live values than capacity");

        let Some(old) = block else {
            debug_assert!(capacity == 0 && live == 0);
            return self.allocate(new_count);
        };

        let new_layout = Self::layout(new_count.get())?;
        if new_layout.size() == 0 {
            if new_count.get() < live {
                // SAFETY: The values past new_count are live and are being discarded.
                unsafe { destruct_n(old.add(new_count.get()), live - new_count.get()) }
            }
            return Some(old);
        }

        if R::BITWISE && (!mem::needs_drop::<T>() || new_count.get() >= live) {
            // Nothing needs dropping, so the memory service may move the bytes itself.
            let old_layout = Self::layout(capacity)?;
            // SAFETY: The block was allocated with old_layout, and new_layout shares its alignment.
            let resized = unsafe { self.memory.resize(old.cast(), old_layout, new_layout.size()) };
            if resized.is_none() {
                debug!("resize from {} to {} elements failed", capacity, new_count);
            }
            return resized.map(NonNull::cast);
        }

        // Shrinking below the live values of a type with drop glue, or moving element-wise: the
        // values go to a fresh block, so failure can't touch the old one.
        let new = self.allocate(new_count)?;
        let kept = cmp::min(new_count.get(), live);

        // SAFETY: The blocks are distinct. The first kept values move to the new block, the
        // remaining live values are dropped and the old block is released afterwards.
        unsafe {
            move_construct::<T, R>(old, kept, new);
            destruct_n(old.add(kept), live - kept);
            self.deallocate(Some(old), capacity);
        }

        Some(new)
    }
}

impl<T, R: Relocation, M: MemoryService + Default> Default for Allocator<T, R, M> {
    fn default() -> Self {
        Self::new(M::default())
    }
}

impl<T, R: Relocation, M: MemoryService + Clone> Clone for Allocator<T, R, M> {
    fn clone(&self) -> Self {
        Self::new(self.memory.clone())
    }
}

impl<T, R: Relocation, M: MemoryService + Debug> Debug for Allocator<T, R, M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocator")
            .field("memory", &self.memory)
            .field("bitwise", &R::BITWISE)
            .finish()
    }
}
