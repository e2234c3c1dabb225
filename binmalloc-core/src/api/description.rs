//! Description of various properties of the allocations.

use core::{cmp, fmt};

use crate::PowerOf2;

/// Category
///
/// The Category of an allocation.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Category {
    /// Binned.
    ///
    /// Binned allocations are carved out of pages by the bins of the thread arena, and recycled through free lists.
    Binned,
    /// Large.
    ///
    /// Large allocations are fulfilled directly by the Platform instance, and returned to it on deallocation.
    Large,
}

/// ClassSize
///
/// The class size of a Binned allocation: 24, 32, 64, 128, ... bytes.
///
/// Large allocations are not bucketed by size, and therefore it is meaningless for them.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ClassSize(usize);

impl ClassSize {
    /// The maximum number of class sizes, whatever the page size.
    pub const MAX_CLASSES: usize = 16;

    /// Returns the number of class sizes whose first chunk, placed after a page header of `header_size` bytes, fits
    /// within a single page of `page_size` bytes.
    pub fn number_classes(page_size: PowerOf2, header_size: usize) -> usize {
        (0..Self::MAX_CLASSES)
            .take_while(|&index| Self(index).first_offset(header_size) + Self(index).size() <= page_size.value())
            .count()
    }

    /// Creates a new instance.
    pub const fn new(value: usize) -> Self { Self(value) }

    /// Creates an instance based on the requested size of the allocation.
    ///
    /// Returns the smallest class size greater than or equal to `size`; a size of 0 is served by the smallest class.
    pub fn from_size(size: usize) -> Self {
        let mut index = 0;

        while index + 1 < Self::MAX_CLASSES && Self(index).size() < size {
            index += 1;
        }

        debug_assert!(Self(index).size() >= size, "{} is too large for any class", size);

        Self(index)
    }

    /// Returns the underlying value, the index of the class.
    pub const fn value(&self) -> usize { self.0 }

    /// Returns the size of the chunks of this class.
    pub const fn size(&self) -> usize {
        if self.0 == 0 { FIRST_CLASS_SIZE } else { MIN_POWER_CLASS_SIZE << self.0 }
    }

    /// Returns the alignment of the chunks of this class: the largest power of 2 dividing its size.
    pub const fn alignment(&self) -> usize { 1 << self.size().trailing_zeros() }

    /// Returns the offset of the first chunk of a page, past a header of `header_size` bytes.
    ///
    /// The chunks of a page are aligned on the alignment of their class, as long as `header_size` is a power of 2.
    pub fn first_offset(&self, header_size: usize) -> usize {
        debug_assert!(header_size.is_power_of_two());

        cmp::max(header_size, self.alignment())
    }
}

/// ThreadId
///
/// Identifier of a thread registered with a domain; identifiers are sequential, starting at 1.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ThreadId(usize);

impl ThreadId {
    /// Returns the underlying value.
    pub const fn value(&self) -> usize { self.0 }

    /// Creates an instance, or None for 0 which is never assigned.
    pub(crate) const fn new(value: usize) -> Option<Self> {
        if value == 0 { None } else { Some(Self(value)) }
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{}", self.0) }
}

//
//  Implementation
//

//  The smallest chunk holds 3 pointers.
const FIRST_CLASS_SIZE: usize = 24;

//  Class size 1 is 32 bytes, and each subsequent class doubles.
const MIN_POWER_CLASS_SIZE: usize = 16;
