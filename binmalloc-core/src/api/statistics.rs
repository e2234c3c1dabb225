//! Statistics.
//!
//! A snapshot of the counters maintained by a DomainHandle.
//!
//! The counters are updated with relaxed atomics, hence a snapshot taken while other threads allocate is only
//! eventually consistent.

use core::fmt;

/// Statistics
///
/// Page and chunk counters of a domain, plus the free-list length of one thread.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct Statistics {
    /// The number of pages mapped from the Platform.
    pub pages_mapped: usize,
    /// The number of pages unmapped back to the Platform.
    pub pages_unmapped: usize,
    /// The number of successful allocations.
    pub chunks_allocated: usize,
    /// The number of successful deallocations.
    pub chunks_freed: usize,
    /// The number of chunks sitting in the bins of the thread the snapshot was taken for.
    pub free_length: usize,
}

impl Statistics {
    /// Returns the number of pages currently mapped.
    pub fn pages_in_use(&self) -> usize { self.pages_mapped.saturating_sub(self.pages_unmapped) }

    /// Returns the number of chunks currently allocated.
    pub fn chunks_in_use(&self) -> usize { self.chunks_allocated.saturating_sub(self.chunks_freed) }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== binmalloc stats ==")?;
        writeln!(f, "Mapped:   {}", self.pages_mapped)?;
        writeln!(f, "Unmapped: {}", self.pages_unmapped)?;
        writeln!(f, "Allocs:   {}", self.chunks_allocated)?;
        writeln!(f, "Frees:    {}", self.chunks_freed)?;
        writeln!(f, "Freelen:  {}", self.free_length)
    }
}

#[cfg(test)]
mod tests {

use super::*;

#[test]
fn statistics_in_use() {
    let statistics = Statistics { pages_mapped: 9, pages_unmapped: 2, chunks_allocated: 5, chunks_freed: 5, free_length: 3 };

    assert_eq!(7, statistics.pages_in_use());
    assert_eq!(0, statistics.chunks_in_use());
}

#[test]
fn statistics_display() {
    let statistics = Statistics { pages_mapped: 9, pages_unmapped: 2, chunks_allocated: 5, chunks_freed: 4, free_length: 3 };

    let expected = "== binmalloc stats ==\nMapped:   9\nUnmapped: 2\nAllocs:   5\nFrees:    4\nFreelen:  3\n";

    assert_eq!(expected, statistics.to_string());
}

}
