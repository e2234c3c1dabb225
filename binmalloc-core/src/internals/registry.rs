//! Registry
//!
//! The Registry assigns sequential identifiers to threads, and keeps track of their Caches so that any thread may
//! locate the Cache of the owner of a chunk.
//!
//! The list of Caches is append-only: Caches are linked under the lock, together with the assignment of their
//! identifier, and published with Release semantics; lookups traverse the list without the lock.

use core::{ptr::{self, NonNull}, sync::atomic::{AtomicPtr, Ordering}};

use crate::ThreadId;

use super::cache::Cache;

/// Registry
pub(crate) struct Registry {
    next_id: spin::Mutex<usize>,
    head: AtomicPtr<Cache>,
}

impl Registry {
    /// Creates an empty instance.
    pub(crate) const fn new() -> Self { Self { next_id: spin::Mutex::new(1), head: AtomicPtr::new(ptr::null_mut()) } }

    /// Registers a new thread, constructing its Cache in `place`.
    ///
    /// Returns None if identifiers are exhausted.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `place` is suitably sized and aligned, exclusively accessed, and never freed.
    pub(crate) unsafe fn register(&self, place: NonNull<Cache>) -> Option<NonNull<Cache>> {
        let mut next_id = self.next_id.lock();

        let id = ThreadId::new(*next_id)?;
        *next_id = next_id.checked_add(1)?;

        //  Only ever modified under the lock, hence up-to-date.
        let head = self.head.load(Ordering::Relaxed);

        let cache = Cache::initialize(place, id, head);

        self.head.store(cache.as_ptr(), Ordering::Release);

        Some(cache)
    }

    /// Finds the Cache of the thread `id`.
    pub(crate) fn find(&self, id: ThreadId) -> Option<&Cache> {
        //  Safety:
        //  -   Caches are never destroyed.
        let mut current = unsafe { self.head.load(Ordering::Acquire).as_ref() };

        while let Some(cache) = current {
            if cache.owner() == id {
                return Some(cache);
            }

            current = cache.next();
        }

        None
    }
}
