//! Test helpers for the internals.

use std::{
    alloc::{self, Layout},
    ptr::NonNull,
    sync::atomic::{AtomicUsize, Ordering},
};

use crate::{Configuration, Platform, PowerOf2};

/// Test configuration
pub(crate) struct TestConfiguration;

impl Configuration for TestConfiguration {
    const PAGE_SIZE: PowerOf2 = unsafe { PowerOf2::new_unchecked(4 * 1024) };
    const BATCH_PAGES: usize = 8;
}

/// Test configuration, refilling bins one page at a time.
pub(crate) struct SinglePageConfiguration;

impl Configuration for SinglePageConfiguration {
    const PAGE_SIZE: PowerOf2 = unsafe { PowerOf2::new_unchecked(4 * 1024) };
    const BATCH_PAGES: usize = 1;
}

/// Test Platform
///
/// Maps pages from the system allocator, keeping track of the number of live pages; fails beyond `limit` live pages.
pub(crate) struct TestPlatform {
    live: AtomicUsize,
    limit: usize,
}

impl TestPlatform {
    /// Creates a platform which never runs out of pages.
    pub(crate) fn new() -> Self { Self::with_limit(usize::MAX) }

    /// Creates a platform which fails to map more than `limit` live pages.
    pub(crate) fn with_limit(limit: usize) -> Self { Self { live: AtomicUsize::new(0), limit } }

    /// Returns the number of pages currently mapped.
    pub(crate) fn live_pages(&self) -> usize { self.live.load(Ordering::Relaxed) }
}

impl Default for TestPlatform {
    fn default() -> Self { Self::new() }
}

impl Platform for TestPlatform {
    unsafe fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        assert_eq!(PAGE_SIZE, layout.align());
        assert_eq!(0, layout.size() % PAGE_SIZE);

        let pages = layout.size() / PAGE_SIZE;

        let reserved = self.live.fetch_add(pages, Ordering::Relaxed);

        if reserved.saturating_add(pages) > self.limit {
            self.live.fetch_sub(pages, Ordering::Relaxed);
            return None;
        }

        let result = NonNull::new(alloc::alloc_zeroed(layout));

        if result.is_none() {
            self.live.fetch_sub(pages, Ordering::Relaxed);
        }

        result
    }

    unsafe fn deallocate(&self, pointer: NonNull<u8>, layout: Layout) {
        assert_eq!(PAGE_SIZE, layout.align());
        assert_eq!(0, layout.size() % PAGE_SIZE);

        self.live.fetch_sub(layout.size() / PAGE_SIZE, Ordering::Relaxed);

        alloc::dealloc(pointer.as_ptr(), layout);
    }
}

/// A single zeroed page, on the stack.
#[repr(align(4096))]
pub(crate) struct Page([u8; PAGE_SIZE]);

impl Page {
    pub(crate) fn as_ptr(&mut self) -> NonNull<u8> { NonNull::from(&mut self.0).cast() }
}

impl Default for Page {
    fn default() -> Self { Self([0; PAGE_SIZE]) }
}

//
//  Implementation
//

const PAGE_SIZE: usize = TestConfiguration::PAGE_SIZE.value();
