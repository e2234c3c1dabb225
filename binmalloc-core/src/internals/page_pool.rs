//! Page Pool
//!
//! A thread-local reserve of pages, refilled in batches of `C::BATCH_PAGES` pages from the Page Source, and handing
//! them out one at a time to the bins.

use core::{marker, ptr::NonNull};

use crate::{Configuration, Platform};
use crate::utils;

use super::page_source::PageSource;

/// PagePool
pub(crate) struct PagePool<C> {
    next: Option<NonNull<u8>>,
    remaining: usize,
    _configuration: marker::PhantomData<C>,
}

impl<C> PagePool<C> {
    /// Creates an empty instance.
    pub(crate) const fn new() -> Self { Self { next: None, remaining: 0, _configuration: marker::PhantomData } }

    /// Returns the number of pages still in reserve.
    #[cfg(test)]
    pub(crate) fn remaining(&self) -> usize { self.remaining }
}

impl<C> PagePool<C>
    where
        C: Configuration
{
    /// Pops a page, refilling the reserve from `source` if empty.
    ///
    /// Returns None if the reserve is empty and cannot be refilled.
    pub(crate) fn pop<P>(&mut self, source: &PageSource<C, P>) -> Option<NonNull<u8>>
        where
            P: Platform
    {
        debug_assert!(C::BATCH_PAGES > 0);

        if self.remaining == 0 {
            self.next = Some(source.acquire(C::BATCH_PAGES)?);
            self.remaining = C::BATCH_PAGES;
        }

        let page = self.next?;

        self.remaining -= 1;
        self.next = if self.remaining > 0 {
            //  Safety:
            //  -   At least one more page of the batch follows `page`.
            Some(unsafe { utils::offset(page, C::PAGE_SIZE.value()) })
        } else {
            None
        };

        Some(page)
    }
}
