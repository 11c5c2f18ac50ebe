//! Payloads and memory services that make the behavior of the storage core observable in tests.
use std::alloc::Layout;
use std::cell::Cell;
use std::ptr::NonNull;
use std::rc::Rc;

use crate::mem::{Global, MemoryService};

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ZeroSizedType;

/// Increments the shared counter every time an instance is dropped. Clones share the counter.
#[derive(Debug, Clone)]
pub struct CountedDrop(pub Rc<Cell<usize>>);

impl CountedDrop {
    pub fn new() -> CountedDrop {
        CountedDrop(Rc::new(Cell::new(0)))
    }

    pub fn drops(&self) -> usize {
        self.0.get()
    }
}

impl Drop for CountedDrop {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

/// A value whose [`Clone`] panics once the shared budget of successful clones runs out. Live
/// instances are tracked so that leaks and double drops both show up.
#[derive(Debug)]
pub struct PanicOnClone {
    pub value: usize,
    budget: Rc<Cell<usize>>,
    live: Rc<Cell<isize>>,
}

impl PanicOnClone {
    pub fn new(value: usize, budget: &Rc<Cell<usize>>, live: &Rc<Cell<isize>>) -> PanicOnClone {
        live.set(live.get() + 1);
        PanicOnClone {
            value,
            budget: budget.clone(),
            live: live.clone(),
        }
    }
}

impl Clone for PanicOnClone {
    fn clone(&self) -> Self {
        let left = self.budget.get();
        if left == 0 {
            panic!("clone budget exhausted");
        }
        self.budget.set(left - 1);
        PanicOnClone::new(self.value, &self.budget, &self.live)
    }
}

impl PartialEq for PanicOnClone {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Drop for PanicOnClone {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

/// Forwards to [`Global`], counting outstanding blocks and refusing new ones once `budget`
/// successful allocations (including resizes) have been made.
#[derive(Debug, Clone)]
pub struct TestMemory {
    pub outstanding: Rc<Cell<isize>>,
    pub budget: Rc<Cell<usize>>,
    pub resizes: Rc<Cell<usize>>,
}

impl TestMemory {
    pub fn new() -> TestMemory {
        TestMemory::with_budget(usize::MAX)
    }

    pub fn with_budget(budget: usize) -> TestMemory {
        TestMemory {
            outstanding: Rc::new(Cell::new(0)),
            budget: Rc::new(Cell::new(budget)),
            resizes: Rc::new(Cell::new(0)),
        }
    }

    pub fn outstanding(&self) -> isize {
        self.outstanding.get()
    }

    pub fn set_budget(&self, budget: usize) {
        self.budget.set(budget);
    }

    fn take_budget(&self) -> bool {
        match self.budget.get() {
            0 => false,
            left => {
                self.budget.set(left - 1);
                true
            }
        }
    }
}

// SAFETY: Every block comes from Global.
unsafe impl MemoryService for TestMemory {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if !self.take_budget() {
            return None;
        }
        let ptr = Global.allocate(layout)?;
        self.outstanding.set(self.outstanding.get() + 1);
        Some(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.outstanding.set(self.outstanding.get() - 1);
        // SAFETY: The block was allocated by Global with this layout.
        unsafe { Global.deallocate(ptr, layout) }
    }

    unsafe fn resize(&self, ptr: NonNull<u8>, old: Layout, new_size: usize) -> Option<NonNull<u8>> {
        if !self.take_budget() {
            return None;
        }
        self.resizes.set(self.resizes.get() + 1);
        // SAFETY: Forwarded from the caller, the block belongs to Global.
        unsafe { Global.resize(ptr, old, new_size) }
    }
}

/// Forwards allocation to a [`TestMemory`] but keeps the default
/// [`resize`](MemoryService::resize), so every resize allocates, copies and releases.
#[derive(Debug, Clone)]
pub struct CopyingMemory(pub TestMemory);

impl CopyingMemory {
    pub fn new() -> CopyingMemory {
        CopyingMemory(TestMemory::new())
    }
}

// SAFETY: Every block comes from the wrapped TestMemory.
unsafe impl MemoryService for CopyingMemory {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        self.0.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: Forwarded from the caller.
        unsafe { self.0.deallocate(ptr, layout) }
    }
}
