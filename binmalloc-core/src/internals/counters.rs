//! Counters of a domain.

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::Statistics;

/// Counters
///
/// Diagnostic counters; updated and read with relaxed ordering, they synchronize nothing.
pub(crate) struct Counters {
    pages_mapped: AtomicUsize,
    pages_unmapped: AtomicUsize,
    chunks_allocated: AtomicUsize,
    chunks_freed: AtomicUsize,
}

impl Counters {
    /// Creates an instance, all counters at 0.
    pub(crate) const fn new() -> Self {
        Self {
            pages_mapped: AtomicUsize::new(0),
            pages_unmapped: AtomicUsize::new(0),
            chunks_allocated: AtomicUsize::new(0),
            chunks_freed: AtomicUsize::new(0),
        }
    }

    pub(crate) fn record_mapped(&self, pages: usize) { self.pages_mapped.fetch_add(pages, Ordering::Relaxed); }

    pub(crate) fn record_unmapped(&self, pages: usize) { self.pages_unmapped.fetch_add(pages, Ordering::Relaxed); }

    pub(crate) fn record_allocated(&self) { self.chunks_allocated.fetch_add(1, Ordering::Relaxed); }

    pub(crate) fn record_freed(&self) { self.chunks_freed.fetch_add(1, Ordering::Relaxed); }

    /// Returns a snapshot; `free_length` is left at 0.
    pub(crate) fn snapshot(&self) -> Statistics {
        Statistics {
            pages_mapped: self.pages_mapped.load(Ordering::Relaxed),
            pages_unmapped: self.pages_unmapped.load(Ordering::Relaxed),
            chunks_allocated: self.chunks_allocated.load(Ordering::Relaxed),
            chunks_freed: self.chunks_freed.load(Ordering::Relaxed),
            free_length: 0,
        }
    }
}
