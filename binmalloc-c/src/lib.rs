#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

//! Exposition of the BinAllocator API via a C ABI.

use core::{alloc::Layout, ptr::{self, NonNull}};

use binmalloc::BinAllocator;

/// Registers the current thread, and prepares its arena for allocation.
///
/// Returns the identifier of the thread on success, and a negative value otherwise.
///
/// Failure to warm up the current thread only occurs if the pages holding its arena cannot be mapped.
#[cold]
#[no_mangle]
pub extern fn bm_warm_up() -> i64 {
    match ALLOCATOR.warm_up() {
        Ok(id) => id.value() as i64,
        Err(_) => -1,
    }
}

/// Allocates `size` bytes of memory.
///
/// The returned pointer is never NULL: the process is aborted if memory cannot be obtained. It is aligned on at least
/// 8 bytes, or 16 bytes if `size` is greater than 24.
#[no_mangle]
pub extern fn bm_malloc(size: usize) -> *mut u8 { ALLOCATOR.allocate(size).as_ptr() }

/// Allocates `size` bytes of memory, aligned on `alignment`.
///
/// Returns NULL if `alignment` is not a power of 2, or exceeds the page size.
#[no_mangle]
pub extern fn bm_aligned_malloc(size: usize, alignment: usize) -> *mut u8 {
    Layout::from_size_align(size, alignment)
        .ok()
        .and_then(|layout| ALLOCATOR.allocate_aligned(layout))
        .map_or(ptr::null_mut(), NonNull::as_ptr)
}

/// Deallocates the memory located at `pointer`; does nothing if `pointer` is NULL.
///
/// #   Safety
///
/// -   Assumes `pointer` is NULL, or has been returned by a prior call to `bm_malloc` or `bm_realloc`.
/// -   Assumes `pointer` has not been deallocated since its allocation.
/// -   Assumes the memory pointed by `pointer` is no longer in use.
#[no_mangle]
pub unsafe extern fn bm_free(pointer: *mut u8) {
    if let Some(pointer) = NonNull::new(pointer) {
        ALLOCATOR.release(pointer);
    }
}

/// Reallocates the memory located at `pointer` to `size` bytes; allocates if `pointer` is NULL.
///
/// #   Safety
///
/// -   Assumes `pointer` is NULL, or has been returned by a prior call to `bm_malloc` or `bm_realloc`.
/// -   Assumes `pointer` has not been deallocated since its allocation.
/// -   Assumes the memory pointed by `pointer` is no longer in use.
#[no_mangle]
pub unsafe extern fn bm_realloc(pointer: *mut u8, size: usize) -> *mut u8 {
    match NonNull::new(pointer) {
        Some(pointer) => ALLOCATOR.reallocate(pointer, size).as_ptr(),
        None => bm_malloc(size),
    }
}

/// Returns the number of usable bytes at `pointer`, or 0 if `pointer` is NULL.
///
/// #   Safety
///
/// -   Assumes `pointer` is NULL, or has been returned by a prior call to `bm_malloc` or `bm_realloc`.
/// -   Assumes `pointer` has not been deallocated since its allocation.
#[no_mangle]
pub unsafe extern fn bm_usable_size(pointer: *mut u8) -> usize {
    NonNull::new(pointer).map_or(0, |pointer| ALLOCATOR.usable_size(pointer))
}

/// Prints the statistics of the allocator on standard error.
#[cold]
#[no_mangle]
pub extern fn bm_print_stats() { ALLOCATOR.print_statistics() }

//
//  Implementation
//

static ALLOCATOR: BinAllocator = BinAllocator::new();
