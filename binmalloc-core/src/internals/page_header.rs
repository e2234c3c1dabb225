//! Page Header
//!
//! The header written at the start of every page carved into chunks, and of every Large allocation.
//!
//! For a binned page, `size` is the class size of every chunk of the page; for a Large allocation, `size` is the
//! total number of bytes mapped, header included.
//!
//! The header of any pointer handed out is found by rounding the pointer down to the page size, unless the pointer is
//! itself aligned on a page: only the payload of a Large allocation aligned on a page is, and its header then sits one
//! page lower.

use core::{mem, ptr::{self, NonNull}};

use crate::{Configuration, Properties, ThreadId};
use crate::utils;

/// PageHeader
#[repr(C, align(16))]
pub(crate) struct PageHeader {
    size: usize,
    owner: usize,
}

impl PageHeader {
    /// The size of the header, which is also the minimum offset of the first chunk of the page.
    pub(crate) const SIZE: usize = mem::size_of::<PageHeader>();

    /// In-place constructs a `PageHeader` at the start of `page`.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `page` points to the start of a page, exclusively accessed.
    #[allow(clippy::cast_ptr_alignment)]
    pub(crate) unsafe fn initialize(page: NonNull<u8>, size: usize, owner: ThreadId) -> NonNull<PageHeader> {
        debug_assert!(page.as_ptr() as usize % mem::align_of::<PageHeader>() == 0);

        let header: NonNull<PageHeader> = page.cast();

        ptr::write(header.as_ptr(), PageHeader { size, owner: owner.value() });

        header
    }

    /// Returns the header of the page containing `ptr`.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `ptr` was handed out by a domain of Configuration `C`.
    pub(crate) unsafe fn from_payload<C>(ptr: NonNull<u8>) -> NonNull<PageHeader>
        where
            C: Configuration
    {
        let page = Properties::<C>::page_of(ptr);

        if page != ptr {
            return page.cast();
        }

        let page = page.as_ptr() as usize - C::PAGE_SIZE.value();
        debug_assert!(page != 0);

        //  Safety:
        //  -   A page-aligned payload is preceded by the page holding its header, which is not at address 0.
        NonNull::new_unchecked(page as *mut u8).cast()
    }

    /// Returns the payload at `offset` bytes from the start of the header.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `offset` is at least `SIZE`, and within the pages starting at `header`.
    pub(crate) unsafe fn payload(header: NonNull<PageHeader>, offset: usize) -> NonNull<u8> {
        debug_assert!(offset >= Self::SIZE);

        utils::offset(header.cast(), offset)
    }

    /// Returns the offset of `ptr` from the start of `header`.
    pub(crate) fn offset_of(header: NonNull<PageHeader>, ptr: NonNull<u8>) -> usize {
        debug_assert!(ptr.as_ptr() as usize >= header.as_ptr() as usize);

        ptr.as_ptr() as usize - header.as_ptr() as usize
    }

    /// Returns the recorded size.
    pub(crate) fn size(&self) -> usize { self.size }

    /// Returns the recorded owner, or None if the header was never written.
    pub(crate) fn owner(&self) -> Option<ThreadId> { ThreadId::new(self.owner) }

    /// Returns whether the header describes a Large allocation.
    pub(crate) fn is_large<C>(&self) -> bool
        where
            C: Configuration
    {
        self.size >= C::PAGE_SIZE.value()
    }
}

#[cfg(test)]
mod tests {

use super::*;

use crate::internals::test::{Page, TestConfiguration};

#[test]
fn page_header_size() {
    assert_eq!(16, PageHeader::SIZE);
}

#[test]
fn page_header_initialize() {
    let mut page = Page::default();
    let owner = ThreadId::new(3).unwrap();

    let header = unsafe { PageHeader::initialize(page.as_ptr(), 128, owner) };
    let header = unsafe { header.as_ref() };

    assert_eq!(128, header.size());
    assert_eq!(Some(owner), header.owner());
    assert!(!header.is_large::<TestConfiguration>());
}

#[test]
fn page_header_from_payload() {
    let mut page = Page::default();
    let base = page.as_ptr();

    let header = unsafe { PageHeader::initialize(base, 3 * 4096, ThreadId::new(1).unwrap()) };
    let payload = unsafe { PageHeader::payload(header, PageHeader::SIZE) };

    assert_eq!(base.as_ptr() as usize + 16, payload.as_ptr() as usize);
    assert_eq!(16, PageHeader::offset_of(header, payload));

    for offset in &[16, 24, 1000, 4095] {
        let interior = unsafe { utils::offset(base, *offset) };
        let found = unsafe { PageHeader::from_payload::<TestConfiguration>(interior) };

        assert_eq!(header, found);
    }

    assert!(unsafe { header.as_ref() }.is_large::<TestConfiguration>());
}

#[test]
fn page_header_from_page_aligned_payload() {
    let mut pages = [Page::default(), Page::default()];
    let base = pages[0].as_ptr();

    let header = unsafe { PageHeader::initialize(base, 2 * 4096, ThreadId::new(1).unwrap()) };
    let payload = unsafe { PageHeader::payload(header, 4096) };

    assert_eq!(pages[1].as_ptr(), payload);
    assert_eq!(header, unsafe { PageHeader::from_payload::<TestConfiguration>(payload) });
    assert_eq!(4096, PageHeader::offset_of(header, payload));
}

#[test]
fn page_header_zeroed_has_no_owner() {
    let mut page = Page::default();

    let header: NonNull<PageHeader> = page.as_ptr().cast();

    assert_eq!(None, unsafe { header.as_ref() }.owner());
}

}
