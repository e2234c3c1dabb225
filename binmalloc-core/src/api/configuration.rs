//! The configuration of binmalloc-core.
//!
//! A single Configuration instance should be shared between a DomainHandle and all its ThreadHandles.
//!
//! binmalloc features 2 allocation categories:
//!
//! -   Binned: fulfilled by the bins of the thread arena, carving chunks of a given class size out of single pages.
//! -   Large: fulfilled directly by the Platform trait, as a block of whole pages prefixed by a page header.
//!
//! The Configuration instance allows adjusting the page size to the underlying platform native page size, and the
//! number of pages requested at once to refill the bins.

use core::{alloc::Layout, cmp, ptr::NonNull};

use super::{Category, ClassSize, PowerOf2};
use crate::internals::page_header::PageHeader;

/// Configuration
///
/// The Configuration instance allows adjusting the page size and the batching of page requests.
pub trait Configuration {
    /// The size of a page, on which all allocations are aligned.
    ///
    /// The minimum this size can be is 64, so that the smallest class size and the page header fit within a page.
    const PAGE_SIZE: PowerOf2;

    /// The number of pages requested at once from the Platform when a thread runs out of pages for its bins.
    ///
    /// Must be at least 1.
    const BATCH_PAGES: usize;
}

/// Properties
///
/// Properties of a given Configuration.
///
/// Work-around for the inability to implement static methods directly on a trait.
pub struct Properties<C>(C);

impl<C> Properties<C>
    where
        C: Configuration
{
    /// Returns the size of the header at the start of each page.
    pub fn header_size() -> usize { PageHeader::SIZE }

    /// Returns the number of class sizes.
    pub fn number_classes() -> usize { ClassSize::number_classes(C::PAGE_SIZE, Self::header_size()) }

    /// Returns the size of the largest class.
    ///
    /// Allocations for a size less than or equal to this size are of the Binned category.
    pub fn largest_class_size() -> usize { ClassSize::new(Self::number_classes() - 1).size() }

    /// Returns the category of an allocation, based on its size.
    pub fn category_of_size(size: usize) -> Category {
        if size <= Self::largest_class_size() { Category::Binned } else { Category::Large }
    }

    /// Returns the class size of an allocation, if Binned.
    pub fn class_size_of_size(size: usize) -> Option<ClassSize> {
        match Self::category_of_size(size) {
            Category::Binned => Some(ClassSize::from_size(size)),
            Category::Large => None,
        }
    }

    /// Returns whether `size` is exactly one of the class sizes.
    pub fn is_class_size(size: usize) -> bool {
        Self::class_size_of_size(size).map_or(false, |class| class.size() == size)
    }

    /// Returns the class size of an allocation of `size` bytes aligned on `align`, if Binned.
    ///
    /// The chunks of a power of 2 class are aligned on their size, hence over-aligned requests are rounded up to their
    /// alignment, and to the first power of 2 class.
    pub fn class_size_of_layout(size: usize, align: PowerOf2) -> Option<ClassSize> {
        if align.value() <= ClassSize::new(0).alignment() {
            return Self::class_size_of_size(size);
        }

        let size = align.checked_round_up(size)?;

        Self::class_size_of_size(cmp::max(size, ClassSize::new(1).size()))
    }

    /// Returns the offset of the payload of a Large allocation aligned on `align`, from the start of its pages.
    pub fn large_offset(align: PowerOf2) -> usize { cmp::max(Self::header_size(), align.value()) }

    /// Returns whether `offset` is the offset of the payload of a Large allocation for some supported alignment.
    pub fn is_large_offset(offset: usize) -> bool {
        offset == Self::header_size()
            || (offset.is_power_of_two() && offset > Self::header_size() && offset <= C::PAGE_SIZE.value())
    }

    /// Returns the layout of the pages backing a Large allocation aligned on `align`, header included.
    ///
    /// Returns None if the size cannot be represented.
    pub fn large_layout(size: usize, align: PowerOf2) -> Option<Layout> {
        debug_assert!(align <= C::PAGE_SIZE);

        let size = size.checked_add(Self::large_offset(align))?;
        let size = C::PAGE_SIZE.checked_round_up(size)?;

        Layout::from_size_align(size, C::PAGE_SIZE.value()).ok()
    }

    /// Returns the start of the page containing `ptr`.
    pub fn page_of(ptr: NonNull<u8>) -> NonNull<u8> {
        let page = C::PAGE_SIZE.round_down(ptr.as_ptr() as usize);
        debug_assert!(page != 0);

        //  Safety:
        //  -   `ptr` lies within a page handed out by the Platform, which never starts at address 0.
        unsafe { NonNull::new_unchecked(page as *mut u8) }
    }
}
