//! Bin
//!
//! A Bin serves the chunks of a single class size for its arena:
//!
//! -   Freed chunks are recycled first, most recently freed first.
//! -   Otherwise, chunks are carved from the current page at the bump cursor.
//!
//! The bump cursor is None when the current page cannot hold another chunk; when Some, there is room for at least one
//! more chunk before the end of the page. No chunk ever straddles a page boundary.
//!
//! The first chunk of a page is placed at the first offset past the header aligned on the class alignment, so that the
//! chunks of a power of 2 class are aligned on their size.

use core::ptr::NonNull;

use crate::{ClassSize, Configuration, Properties, ThreadId};
use crate::utils;

use super::{cells::CellStack, page_header::PageHeader};

/// Bin
pub(crate) struct Bin {
    class_size: ClassSize,
    free: CellStack,
    cursor: Option<NonNull<u8>>,
}

impl Bin {
    /// Creates an empty bin.
    pub(crate) const fn new(class_size: ClassSize) -> Self { Self { class_size, free: CellStack::new(), cursor: None } }

    /// Returns the number of freed chunks awaiting reuse.
    pub(crate) fn free_length(&self) -> usize { self.free.len() }

    /// Returns whether a chunk can be handed out without a new page.
    pub(crate) fn is_exhausted(&self) -> bool { self.free.is_empty() && self.cursor.is_none() }

    /// Allocates a chunk, if any is available.
    ///
    /// #   Safety
    ///
    /// -   Assumes that the freed chunks have not been written to since their release.
    pub(crate) unsafe fn allocate<C>(&mut self) -> Option<NonNull<u8>>
        where
            C: Configuration
    {
        if let Some(cell) = self.free.pop() {
            return Some(cell);
        }

        self.carve::<C>()
    }

    /// Returns a chunk of this class size to the bin.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `cell` was carved by a bin of the same class size, and is no longer in use.
    pub(crate) unsafe fn deallocate(&mut self, cell: NonNull<u8>) { self.free.push(cell) }

    /// Starts carving chunks out of `page`, recording the class size and owner in its header.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `page` is a fresh page, exclusively owned.
    /// -   Assumes that the bin is exhausted.
    pub(crate) unsafe fn refill<C>(&mut self, page: NonNull<u8>, owner: ThreadId)
        where
            C: Configuration
    {
        let offset = self.class_size.first_offset(PageHeader::SIZE);

        debug_assert!(self.cursor.is_none());
        debug_assert!(offset + self.class_size.size() <= C::PAGE_SIZE.value());

        let header = PageHeader::initialize(page, self.class_size.size(), owner);

        self.cursor = Some(PageHeader::payload(header, offset));
    }

    //  Internal; carves a chunk at the bump cursor, if any.
    unsafe fn carve<C>(&mut self) -> Option<NonNull<u8>>
        where
            C: Configuration
    {
        let chunk = self.cursor?;
        let size = self.class_size.size();

        let page_end = Properties::<C>::page_of(chunk).as_ptr() as usize + C::PAGE_SIZE.value();
        let next = chunk.as_ptr() as usize + size;

        debug_assert!(next <= page_end);

        self.cursor = if next + size <= page_end {
            //  Safety:
            //  -   `next` lies within the page, as checked.
            Some(utils::offset(chunk, size))
        } else {
            None
        };

        Some(chunk)
    }
}
