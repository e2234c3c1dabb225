//! Platform
//!
//! The Platform trait is used to request pages directly from the Platform. By abstracting the underlying platform,
//! it becomes possible to easily port the code to a different OS, or to substitute a counting platform in tests.

use core::{
    alloc::Layout,
    ptr::NonNull,
};

/// Abstraction of platform specific page mapping and unmapping.
pub trait Platform {
    /// Maps a fresh block of pages as per the specified layout.
    ///
    /// Returns None if the request cannot be satisfied.
    ///
    /// #   Safety
    ///
    /// The caller may assume that if the returned pointer is not None then:
    /// -   The number of usable bytes is _greater than or equal_ to `layout.size()`.
    /// -   The pointer is _at least_ aligned to `layout.align()`.
    /// -   The memory is zeroed.
    ///
    /// `allocate` assumes that:
    /// -   `layout.size()` is a non-zero multiple of `layout.align()`.
    /// -   `layout.align()` is the page size of the Configuration.
    unsafe fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Unmaps the supplied block of pages.
    ///
    /// #   Safety
    ///
    /// The caller should no longer reference the memory after calling this function.
    ///
    /// `deallocate` assumes that:
    /// -   `pointer` was allocated by this instance of `Platform`, with `layout` as argument.
    /// -   `pointer` is the value returned by `Platform`, and not an interior pointer.
    unsafe fn deallocate(&self, pointer: NonNull<u8>, layout: Layout);
}
