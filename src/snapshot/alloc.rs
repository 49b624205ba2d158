//! Process-wide allocation counter.
//!
//! The counter only moves when the embedding installs `CountingAllocator`
//! as its global allocator:
//!
//! ```rust,ignore
//! #[global_allocator]
//! static ALLOC: lineprof::CountingAllocator = lineprof::CountingAllocator::new();
//! ```
//!
//! Without it `allocated_objects()` stays at zero and snapshots carry a zero
//! allocation component.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};

static ALLOCATED_OBJECTS: AtomicU64 = AtomicU64::new(0);

/// Number of allocations made through `CountingAllocator` since process start.
pub fn allocated_objects() -> u64 {
    ALLOCATED_OBJECTS.load(Ordering::Relaxed)
}

/// A `GlobalAlloc` that forwards to the system allocator and counts every
/// successful allocation. Reallocations resize an existing object and are not
/// counted.
pub struct CountingAllocator;

impl CountingAllocator {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for CountingAllocator {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl GlobalAlloc for CountingAllocator {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            ALLOCATED_OBJECTS.fetch_add(1, Ordering::Relaxed);
        }
        ptr
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }

    #[inline]
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            ALLOCATED_OBJECTS.fetch_add(1, Ordering::Relaxed);
        }
        ptr
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        unsafe { System.realloc(ptr, layout, new_size) }
    }
}
