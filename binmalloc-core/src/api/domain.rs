//! Domain Handle.
//!
//! An instance of the Domain Handle defines an allocation Domain:
//!
//! -   A single allocation Domain is connected to 1 to N Threads, each with its own ThreadHandle.
//! -   Any thread connected to the Domain may deallocate memory allocated by any other, the memory finds its way back
//!     to the thread which carved it.
//!
//! The allocation Domain is its own island, memory wise:
//!
//! -   Any piece of memory allocated by a connected Thread is served by the Domain.
//! -   In exchange, pieces of memory MUST be deallocated through their original Domain.
//!
//! Typically, applications will use a global Domain.

use core::{alloc::Layout, ptr::NonNull};

use crate::{Configuration, Fatal, Platform, PowerOf2, Statistics, ThreadHandle};
use crate::internals::router::Router;

/// Domain Handle.
///
/// `free` only takes a pointer: the Domain Handle bridges the gap by recording the size and owner of every
/// allocation in the header of its page, which is found by rounding the pointer down to the page size.
pub struct DomainHandle<C, P>(Router<C, P>);

impl<C, P> DomainHandle<C, P> {
    /// Creates a Domain.
    ///
    /// The Domain created will map pages from the `platform`, and unmap them through the `platform`.
    pub const fn new(platform: P) -> Self { Self(Router::new(platform)) }

    /// Returns a reference to the platform.
    pub fn platform(&self) -> &P { self.0.platform() }

    /// Returns a snapshot of the counters of the Domain.
    ///
    /// If a `thread` is provided, `free_length` is the number of freed chunks awaiting reuse in its bins.
    pub fn statistics(&self, thread: Option<&ThreadHandle<C>>) -> Statistics {
        let mut statistics = self.0.statistics();

        if let Some(thread) = thread {
            statistics.free_length = thread.free_length();
        }

        statistics
    }
}

impl<C, P> DomainHandle<C, P>
    where
        C: Configuration,
        P: Platform,
{
    /// Registers the calling thread with the Domain, creating its ThreadHandle.
    ///
    /// The ThreadHandle should be acquired once per thread, and only ever used from this thread.
    #[cold]
    pub fn acquire_thread_handle(&self) -> Result<ThreadHandle<C>, Fatal> {
        self.0.acquire_arena().map(ThreadHandle::new)
    }

    /// Allocates `size` bytes of memory.
    ///
    /// The memory is aligned on at least 8 bytes, and on 16 bytes if `size` is greater than 24.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `thread` was acquired from this Domain by the calling thread.
    pub unsafe fn allocate(&self, thread: &ThreadHandle<C>, size: usize) -> Result<NonNull<u8>, Fatal> {
        self.0.allocate(thread.as_mut(), size)
    }

    /// Allocates memory fitting `layout`.
    ///
    /// Alignments up to the page size are supported; larger ones result in `Fatal::UnsupportedAlignment`.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `thread` was acquired from this Domain by the calling thread.
    pub unsafe fn allocate_aligned(&self, thread: &ThreadHandle<C>, layout: Layout) -> Result<NonNull<u8>, Fatal> {
        self.0.allocate_aligned(thread.as_mut(), layout.size(), alignment_of(layout))
    }

    /// Deallocates the memory located at `pointer`.
    ///
    /// `thread` may be None if the calling thread never acquired a ThreadHandle.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `thread`, if any, was acquired from this Domain by the calling thread.
    /// -   Assumes that `pointer` has been returned by a prior call to `allocate` or `reallocate` of this Domain.
    /// -   Assumes that `pointer` has not been deallocated since its allocation.
    /// -   Assumes that the memory pointed by `pointer` is no longer in use.
    pub unsafe fn deallocate(&self, thread: Option<&ThreadHandle<C>>, pointer: NonNull<u8>) -> Result<(), Fatal> {
        self.0.deallocate(thread.map(|thread| thread.as_mut()), pointer)
    }

    /// Reallocates the memory located at `pointer` to `size` bytes.
    ///
    /// Reallocation always moves: a fresh allocation is made, the content copied up to the lesser of the usable size
    /// of `pointer` and `size`, and `pointer` deallocated.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `thread` was acquired from this Domain by the calling thread.
    /// -   Assumes that `pointer` has been returned by a prior call to `allocate` or `reallocate` of this Domain.
    /// -   Assumes that `pointer` has not been deallocated since its allocation.
    pub unsafe fn reallocate(&self, thread: &ThreadHandle<C>, pointer: NonNull<u8>, size: usize)
        -> Result<NonNull<u8>, Fatal>
    {
        self.0.reallocate(thread.as_mut(), pointer, size)
    }

    /// Reallocates the memory located at `pointer` into a fresh allocation fitting `layout`.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `thread` was acquired from this Domain by the calling thread.
    /// -   Assumes that `pointer` has been returned by a prior call to `allocate` or `reallocate` of this Domain.
    /// -   Assumes that `pointer` has not been deallocated since its allocation.
    pub unsafe fn reallocate_aligned(&self, thread: &ThreadHandle<C>, pointer: NonNull<u8>, layout: Layout)
        -> Result<NonNull<u8>, Fatal>
    {
        self.0.reallocate_aligned(thread.as_mut(), pointer, layout.size(), alignment_of(layout))
    }

    /// Returns the number of usable bytes at `pointer`.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `pointer` has been returned by a prior call to `allocate` or `reallocate` of this Domain.
    /// -   Assumes that `pointer` has not been deallocated since its allocation.
    pub unsafe fn usable_size(&self, pointer: NonNull<u8>) -> Result<usize, Fatal> { self.0.usable_size(pointer) }
}

impl<C, P> Default for DomainHandle<C, P>
    where
        P: Default
{
    fn default() -> Self { Self::new(P::default()) }
}

//
//  Implementation
//

fn alignment_of(layout: Layout) -> PowerOf2 {
    //  Safety:
    //  -   The alignment of a Layout is a power of 2.
    unsafe { PowerOf2::new_unchecked(layout.align()) }
}
