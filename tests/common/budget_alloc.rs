//! Counting global allocator for heap budget tests.
//!
//! Install it with `#[global_allocator]` in a test binary that holds a
//! single test, then wrap the code under test in [`BudgetAlloc::measure`].

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};

/// Heap usage observed while a closure ran.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapUsage {
    /// Highest live byte count above the level at entry.
    pub peak_bytes: usize,
    /// Live bytes still held at exit, above the level at entry.
    pub retained_bytes: usize,
    /// Allocation and reallocation calls.
    pub allocations: usize,
}

pub struct BudgetAlloc {
    live: AtomicUsize,
    high_water: AtomicUsize,
    calls: AtomicUsize,
}

impl BudgetAlloc {
    pub const fn new() -> Self {
        Self {
            live: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Run `f` and report the heap it used on top of what was live before.
    pub fn measure<R>(&self, f: impl FnOnce() -> R) -> (R, HeapUsage) {
        let base = self.live.load(SeqCst);
        self.high_water.store(base, SeqCst);
        let calls = self.calls.load(SeqCst);

        let out = f();

        let usage = HeapUsage {
            peak_bytes: self.high_water.load(SeqCst).saturating_sub(base),
            retained_bytes: self.live.load(SeqCst).saturating_sub(base),
            allocations: self.calls.load(SeqCst) - calls,
        };
        (out, usage)
    }

    fn track(&self, grown: usize, shrunk: usize) {
        if grown > 0 {
            let live = self.live.fetch_add(grown, SeqCst) + grown;
            self.high_water.fetch_max(live, SeqCst);
        }
        if shrunk > 0 {
            self.live.fetch_sub(shrunk, SeqCst);
        }
    }
}

unsafe impl GlobalAlloc for BudgetAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            self.calls.fetch_add(1, SeqCst);
            self.track(layout.size(), 0);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            self.calls.fetch_add(1, SeqCst);
            self.track(layout.size(), 0);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        self.track(0, layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let moved = unsafe { System.realloc(ptr, layout, new_size) };
        if !moved.is_null() {
            self.calls.fetch_add(1, SeqCst);
            self.track(
                new_size.saturating_sub(layout.size()),
                layout.size().saturating_sub(new_size),
            );
        }
        moved
    }
}
