//! Page Source
//!
//! The Page Source obtains blocks of whole pages from the Platform, and returns them, keeping count as it goes.

use core::{alloc::Layout, marker, ptr::NonNull};

use crate::{Configuration, Platform, Statistics};
use crate::utils;

use super::counters::Counters;

/// PageSource
pub(crate) struct PageSource<C, P> {
    platform: P,
    counters: Counters,
    _configuration: marker::PhantomData<C>,
}

impl<C, P> PageSource<C, P> {
    /// Creates an instance.
    pub(crate) const fn new(platform: P) -> Self {
        let counters = Counters::new();
        let _configuration = marker::PhantomData;

        Self { platform, counters, _configuration }
    }

    /// Returns a reference to the platform.
    pub(crate) fn platform(&self) -> &P { &self.platform }

    /// Returns a reference to the counters.
    pub(crate) fn counters(&self) -> &Counters { &self.counters }

    /// Returns a snapshot of the counters.
    pub(crate) fn statistics(&self) -> Statistics { self.counters.snapshot() }
}

impl<C, P> PageSource<C, P>
    where
        C: Configuration,
        P: Platform,
{
    /// Acquires `pages` contiguous pages, zeroed and aligned on the page size.
    ///
    /// Returns None if the Platform fails to map them.
    pub(crate) fn acquire(&self, pages: usize) -> Option<NonNull<u8>> {
        let size = pages.checked_mul(C::PAGE_SIZE.value())?;

        self.acquire_bytes(size)
    }

    /// Acquires `size` bytes worth of contiguous pages, zeroed and aligned on the page size.
    ///
    /// Returns None if the Platform fails to map them.
    pub(crate) fn acquire_bytes(&self, size: usize) -> Option<NonNull<u8>> {
        debug_assert!(size > 0);
        debug_assert!(size % C::PAGE_SIZE == 0, "{} is not a multiple of the page size", size);

        let layout = Layout::from_size_align(size, C::PAGE_SIZE.value()).ok()?;

        //  Safety:
        //  -   `layout.size()` is a non-zero multiple of `layout.align()`.
        //  -   `layout.align()` is the page size.
        let pages = unsafe { self.platform.allocate(layout) }?;

        debug_assert!(utils::is_sufficiently_aligned_for(pages, C::PAGE_SIZE));

        self.counters.record_mapped(size / C::PAGE_SIZE);

        Some(pages)
    }

    /// Releases a block of pages previously acquired.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `pages` was returned by `acquire` or `acquire_bytes`, for exactly `size` bytes.
    /// -   Assumes that the block is no longer in use.
    pub(crate) unsafe fn release(&self, pages: NonNull<u8>, size: usize) {
        debug_assert!(utils::is_sufficiently_aligned_for(pages, C::PAGE_SIZE));
        debug_assert!(size > 0);
        debug_assert!(size % C::PAGE_SIZE == 0, "{} is not a multiple of the page size", size);

        //  Safety:
        //  -   `size` is a non-zero multiple of the page size, as asserted.
        let layout = Layout::from_size_align_unchecked(size, C::PAGE_SIZE.value());

        self.platform.deallocate(pages, layout);

        self.counters.record_unmapped(size / C::PAGE_SIZE);
    }
}
