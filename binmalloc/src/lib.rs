#![no_std]
#![deny(missing_docs)]

//! A binned, thread-aware Memory Allocator library.
//!
//! The type `BinAllocator` provides a memory allocator, as a drop-in replacement for regular allocators.
//!
//! Each thread carves size-classed chunks out of its own pages; chunks freed by another thread are sent back to the
//! thread which carved them. Requests larger than the largest class size are mapped and unmapped directly.
//!
//! #   Warning
//!
//! Memory handed out to a thread is never returned to the OS until the process exits, even after the thread ends.

mod allocator;
mod platform;

pub use allocator::BinAllocator;
pub use binmalloc_core::{Fatal, Statistics, ThreadId};

use platform::{BMConfiguration, Platform, BMPlatform, ThreadLocal, BMThreadLocal};
