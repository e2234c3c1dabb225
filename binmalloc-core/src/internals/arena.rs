//! Arena
//!
//! The Arena of a thread holds one Bin per class size, its reserve of pages, and a pointer to its Cache.
//!
//! An Arena is only ever accessed by the thread which created it; other threads only ever access its Cache. Both are
//! placed in pages acquired at registration, and live until the end of the process.

use core::{array, mem, ptr::{self, NonNull}};

use crate::{ClassSize, Configuration, Platform, ThreadId};
use crate::utils;

use super::{
    bin::Bin,
    cache::Cache,
    page_header::PageHeader,
    page_pool::PagePool,
    page_source::PageSource,
    registry::Registry,
};

/// Arena
pub(crate) struct Arena<C> {
    owner: ThreadId,
    cache: NonNull<Cache>,
    bins: [Bin; ClassSize::MAX_CLASSES],
    pool: PagePool<C>,
}

impl<C> Arena<C> {
    /// Returns the identifier of the owning thread.
    pub(crate) fn owner(&self) -> ThreadId { self.owner }

    /// Returns the Cache of the owning thread.
    pub(crate) fn cache(&self) -> &Cache {
        //  Safety:
        //  -   Caches are never destroyed.
        unsafe { self.cache.as_ref() }
    }

    /// Returns the number of freed chunks awaiting reuse in the bins.
    pub(crate) fn free_length(&self) -> usize { self.bins.iter().map(Bin::free_length).sum() }
}

impl<C> Arena<C>
    where
        C: Configuration
{
    /// Registers a new thread, and creates its Arena.
    ///
    /// Returns None if the pages cannot be acquired, or the registry is exhausted.
    #[cold]
    #[inline(never)]
    pub(crate) fn bootstrap<P>(registry: &Registry, source: &PageSource<C, P>) -> Option<NonNull<Arena<C>>>
        where
            P: Platform
    {
        let size = C::PAGE_SIZE.round_up(Self::ARENA_OFFSET + mem::size_of::<Arena<C>>());

        let pages = source.acquire_bytes(size)?;

        //  Safety:
        //  -   `pages` is aligned on the page size, hence suitably aligned for a Cache.
        //  -   `pages` is freshly acquired, hence exclusively accessed, and never released.
        let cache = match unsafe { registry.register(pages.cast()) } {
            Some(cache) => cache,
            None => {
                //  Safety:
                //  -   `pages` was acquired just above, for `size` bytes, and is not in use.
                unsafe { source.release(pages, size) };
                return None;
            },
        };

        //  Safety:
        //  -   `cache` is fully initialized.
        let owner = unsafe { cache.as_ref() }.owner();

        let arena = Arena {
            owner,
            cache,
            bins: array::from_fn(|index| Bin::new(ClassSize::new(index))),
            pool: PagePool::new(),
        };

        //  Safety:
        //  -   `ARENA_OFFSET` is within the pages, and suitably aligned for an Arena.
        let place: NonNull<Arena<C>> = unsafe { utils::offset(pages, Self::ARENA_OFFSET) }.cast();

        //  Safety:
        //  -   `place` is within the pages, exclusively accessed, and suitably sized.
        unsafe { ptr::write(place.as_ptr(), arena) };

        Some(place)
    }

    /// Allocates a chunk of `class_size`.
    ///
    /// Returns None if no page can be acquired to refill the bin.
    ///
    /// #   Safety
    ///
    /// -   Assumes that it is called from the owning thread.
    #[inline(always)]
    pub(crate) unsafe fn allocate<P>(&mut self, class_size: ClassSize, source: &PageSource<C, P>) -> Option<NonNull<u8>>
        where
            P: Platform
    {
        debug_assert!(class_size.value() < ClassSize::MAX_CLASSES);

        if let Some(chunk) = self.bins[class_size.value()].allocate::<C>() {
            return Some(chunk);
        }

        self.allocate_slow(class_size, source)
    }

    /// Releases a chunk carved by this Arena, reclaiming everything pushed to its Cache at the same time.
    ///
    /// #   Safety
    ///
    /// -   Assumes that it is called from the owning thread.
    /// -   Assumes that `chunk` was carved by this Arena, and is no longer in use.
    pub(crate) unsafe fn release(&mut self, chunk: NonNull<u8>) {
        let cache = self.cache;

        //  Safety:
        //  -   The sink only touches the bins, not the Cache.
        cache.as_ref().drain(Some(chunk), |cell| self.reclaim(cell));
    }

    /// Moves all the chunks pushed to the Cache back into the bins.
    ///
    /// Returns the number of chunks moved.
    ///
    /// #   Safety
    ///
    /// -   Assumes that it is called from the owning thread.
    pub(crate) unsafe fn reclaim_cache(&mut self) -> usize {
        let cache = self.cache;

        //  Safety:
        //  -   The sink only touches the bins, not the Cache.
        cache.as_ref().drain(None, |cell| self.reclaim(cell))
    }

    //  Offset of the Arena from the start of its pages, after the Cache.
    const ARENA_OFFSET: usize = {
        let align = mem::align_of::<Arena<C>>();
        (mem::size_of::<Cache>() + align - 1) / align * align
    };

    #[cold]
    #[inline(never)]
    unsafe fn allocate_slow<P>(&mut self, class_size: ClassSize, source: &PageSource<C, P>) -> Option<NonNull<u8>>
        where
            P: Platform
    {
        let index = class_size.value();

        //  Chunks freed by other threads may have refilled the bin.
        if self.reclaim_cache() > 0 && !self.bins[index].is_exhausted() {
            return self.bins[index].allocate::<C>();
        }

        let page = self.pool.pop(source)?;

        self.bins[index].refill::<C>(page, self.owner);
        self.bins[index].allocate::<C>()
    }

    //  Internal; returns `cell` to the bin of its class size, as recorded in its page header.
    unsafe fn reclaim(&mut self, cell: NonNull<u8>) {
        let header = PageHeader::from_payload::<C>(cell);
        let class_size = ClassSize::from_size(header.as_ref().size());

        debug_assert_eq!(Some(self.owner), header.as_ref().owner());
        debug_assert_eq!(class_size.size(), header.as_ref().size());

        self.bins[class_size.value()].deallocate(cell);
    }
}
