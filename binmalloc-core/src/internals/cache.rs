//! Cache
//!
//! The Cache of a thread is the mailbox through which chunks freed by any thread make their way back to the thread
//! which carved them.
//!
//! Any thread may push; only the owner drains. Both happen under the Cache's lock.

use core::{ptr::{self, NonNull}, sync::atomic::{AtomicPtr, Ordering}};

use crate::ThreadId;

use super::cells::CellStack;

/// Cache
pub(crate) struct Cache {
    owner: ThreadId,
    cells: spin::Mutex<CellStack>,
    //  Next Cache of the registry, written once before publication.
    next: AtomicPtr<Cache>,
}

impl Cache {
    /// In-place constructs a `Cache`.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `place` is suitably sized and aligned, and exclusively accessed.
    pub(crate) unsafe fn initialize(place: NonNull<Cache>, owner: ThreadId, next: *mut Cache) -> NonNull<Cache> {
        let cells = spin::Mutex::new(CellStack::new());
        let next = AtomicPtr::new(next);

        ptr::write(place.as_ptr(), Cache { owner, cells, next });

        place
    }

    /// Returns the owner.
    pub(crate) fn owner(&self) -> ThreadId { self.owner }

    /// Returns the next Cache of the registry.
    pub(crate) fn next(&self) -> Option<&Cache> {
        let next = self.next.load(Ordering::Acquire);

        //  Safety:
        //  -   Caches are never destroyed.
        unsafe { next.as_ref() }
    }

    /// Returns the number of cells awaiting the owner.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize { self.cells.lock().len() }

    /// Pushes a freed chunk.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `cell` was carved by a bin of the owner, and is no longer in use.
    pub(crate) unsafe fn push(&self, cell: NonNull<u8>) { self.cells.lock().push(cell) }

    /// Pushes `cell`, if any, then hands over every cell to `sink`, most recently pushed first.
    ///
    /// The lock is held throughout. Returns the number of cells handed over.
    ///
    /// #   Safety
    ///
    /// -   Assumes that it is only called by the owner.
    /// -   Assumes that `cell`, if any, was carved by a bin of the owner, and is no longer in use.
    /// -   Assumes that `sink` does not access this Cache.
    pub(crate) unsafe fn drain<F>(&self, cell: Option<NonNull<u8>>, mut sink: F) -> usize
        where
            F: FnMut(NonNull<u8>)
    {
        let mut cells = self.cells.lock();

        if let Some(cell) = cell {
            cells.push(cell);
        }

        let mut drained = 0;

        while let Some(cell) = cells.pop() {
            sink(cell);
            drained += 1;
        }

        drained
    }
}
