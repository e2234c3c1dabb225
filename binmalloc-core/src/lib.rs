#![cfg_attr(not(test), no_std)]

#![deny(missing_docs)]

//! Building blocks for a binned, thread-aware allocator.
//!
//! binmalloc-core is a set of building blocks to build a malloc replacement carving size-classed chunks out of pages.
//! It contains:
//! -   A platform trait, used to map and unmap whole pages of memory to be carved up.
//! -   A domain handle, routing allocations to the binned or large paths, and frees to their owning thread.
//! -   A thread handle, the per-thread arena, leaving it up to the user to store it in thread-local storage.

mod api;
mod internals;
mod utils;

pub use api::*;
