//! The platform memory service underneath [`Allocator`](super::Allocator).
use std::alloc::{self, Layout};
use std::ptr::{self, NonNull};

/// Raw, untyped memory. Requests are always described by a [`Layout`] with non-zero size; zero
/// sized requests are handled by the [`Allocator`](super::Allocator) without calling the service.
///
/// # Safety
/// Implementors must return blocks that are valid for reads and writes of `layout.size()` bytes,
/// aligned to `layout.align()` and not aliased by any other live block, until they are passed
/// back to [`deallocate`](MemoryService::deallocate) or [`resize`](MemoryService::resize).
pub unsafe trait MemoryService {
    /// Returns a fresh, uninitialized block for `layout`, or [`None`] if the request can't be
    /// satisfied.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Releases a block.
    ///
    /// # Safety
    /// `ptr` must have been returned by this service for exactly `layout`.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Changes the size of a block to `new_size` bytes, preserving its first
    /// `min(old.size(), new_size)` bytes. The block may move. On failure [`None`] is returned and
    /// the old block stays valid and untouched.
    ///
    /// The default implementation allocates a new block, copies and releases the old one.
    ///
    /// # Safety
    /// `ptr` must have been returned by this service for exactly `old`, and `new_size` must be
    /// non-zero and form a valid [`Layout`] with `old.align()`.
    unsafe fn resize(&self, ptr: NonNull<u8>, old: Layout, new_size: usize) -> Option<NonNull<u8>> {
        // SAFETY: Forwarded from the caller.
        unsafe { resize_by_copy(self, ptr, old, new_size) }
    }
}

/// Resizes a block by allocating a new one, copying the preserved prefix and releasing the old
/// block.
///
/// # Safety
/// See [`MemoryService::resize`].
pub unsafe fn resize_by_copy<M: MemoryService + ?Sized>(
    memory: &M,
    ptr: NonNull<u8>,
    old: Layout,
    new_size: usize,
) -> Option<NonNull<u8>> {
    let new = Layout::from_size_align(new_size, old.align()).ok()?;
    let new_ptr = memory.allocate(new)?;

    // SAFETY: Both blocks are valid for at least the copied size and were returned separately by
    // the service, so they don't overlap.
    unsafe {
        ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), old.size().min(new_size));
        memory.deallocate(ptr, old);
    }

    Some(new_ptr)
}

/// The global allocator, as registered with `#[global_allocator]`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Global;

// SAFETY: Every method forwards to the global allocator, which upholds the same contract.
unsafe impl MemoryService for Global {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        debug_assert!(layout.size() != 0);
        // SAFETY: Zero-sized layouts are never requested.
        NonNull::new(unsafe { alloc::alloc(layout) })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: The caller guarantees that ptr was allocated with layout.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
    }

    unsafe fn resize(&self, ptr: NonNull<u8>, old: Layout, new_size: usize) -> Option<NonNull<u8>> {
        debug_assert!(new_size != 0);
        // SAFETY: The caller guarantees that ptr was allocated with old and that new_size forms a
        // valid layout with old.align(). realloc leaves the old block alone when it fails.
        NonNull::new(unsafe { alloc::realloc(ptr.as_ptr(), old, new_size) })
    }
}

#[cfg(all(feature = "malloc", unix))]
pub use malloc::Malloc;

#[cfg(all(feature = "malloc", unix))]
mod malloc {
    use std::alloc::Layout;
    use std::ptr::NonNull;

    use libc::c_void;

    use super::{MemoryService, resize_by_copy};

    /// The alignment that malloc guarantees for any request.
    const MIN_ALIGN: usize = if cfg!(target_pointer_width = "64") { 16 } else { 8 };

    /// A memory service calling straight into the C library: `malloc`, `realloc`, `free` and
    /// `posix_memalign` for over-aligned layouts.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Malloc;

    const fn malloc_aligned(layout: &Layout) -> bool {
        layout.align() <= MIN_ALIGN && layout.align() <= layout.size()
    }

    // SAFETY: malloc and posix_memalign return suitably aligned, unaliased blocks. realloc keeps
    // the old block valid when it fails.
    unsafe impl MemoryService for Malloc {
        fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
            let ptr = if malloc_aligned(&layout) {
                // SAFETY: malloc has no preconditions.
                unsafe { libc::malloc(layout.size()) }
            } else {
                let mut out: *mut c_void = std::ptr::null_mut();
                let align = layout.align().max(size_of::<usize>());
                // SAFETY: out is a valid location to store the result and align is a power of two
                // multiple of the pointer size.
                let status = unsafe { libc::posix_memalign(&mut out, align, layout.size()) };
                if status != 0 {
                    return None;
                }
                out
            };

            NonNull::new(ptr.cast())
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, _layout: Layout) {
            // SAFETY: ptr was returned by malloc or posix_memalign, both of which pair with free.
            unsafe { libc::free(ptr.as_ptr().cast()) }
        }

        unsafe fn resize(
            &self,
            ptr: NonNull<u8>,
            old: Layout,
            new_size: usize,
        ) -> Option<NonNull<u8>> {
            if old.align() <= MIN_ALIGN && old.align() <= new_size {
                // SAFETY: ptr was returned by this service and malloc's alignment still satisfies
                // the layout after the resize.
                NonNull::new(unsafe { libc::realloc(ptr.as_ptr().cast(), new_size) }.cast())
            } else {
                // SAFETY: Forwarded from the caller.
                unsafe { resize_by_copy(self, ptr, old, new_size) }
            }
        }
    }
}
