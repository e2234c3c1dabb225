//! Router
//!
//! The Router sends each request down the Binned or Large path:
//!
//! -   Allocations up to the largest class size are carved by the Arena of the calling thread; larger ones are mapped
//!     directly, behind a page header.
//! -   Deallocations read the page header: Large allocations are unmapped, chunks are sent to the Cache of the thread
//!     recorded as their owner, and reclaimed immediately if that is the calling thread.

use core::{cmp, ptr::{self, NonNull}};

use crate::{Configuration, Fatal, Platform, PowerOf2, Properties, Statistics};

use super::{
    arena::Arena,
    page_header::PageHeader,
    page_source::PageSource,
    registry::Registry,
};

/// Router
pub(crate) struct Router<C, P> {
    source: PageSource<C, P>,
    registry: Registry,
}

impl<C, P> Router<C, P> {
    /// Creates an instance.
    pub(crate) const fn new(platform: P) -> Self { Self { source: PageSource::new(platform), registry: Registry::new() } }

    /// Returns a reference to the platform.
    pub(crate) fn platform(&self) -> &P { self.source.platform() }

    /// Returns a snapshot of the counters.
    pub(crate) fn statistics(&self) -> Statistics { self.source.statistics() }
}

impl<C, P> Router<C, P>
    where
        C: Configuration,
        P: Platform,
{
    /// Registers the calling thread, and creates its Arena.
    #[cold]
    pub(crate) fn acquire_arena(&self) -> Result<NonNull<Arena<C>>, Fatal> {
        Arena::bootstrap(&self.registry, &self.source).ok_or(Fatal::OutOfMemory)
    }

    /// Allocates `size` bytes, aligned on at least 8 bytes.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `arena` belongs to the calling thread.
    pub(crate) unsafe fn allocate(&self, arena: &mut Arena<C>, size: usize) -> Result<NonNull<u8>, Fatal> {
        self.allocate_aligned(arena, size, PowerOf2::ONE)
    }

    /// Allocates `size` bytes, aligned on `align`.
    ///
    /// Alignments greater than the page size are not supported.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `arena` belongs to the calling thread.
    pub(crate) unsafe fn allocate_aligned(&self, arena: &mut Arena<C>, size: usize, align: PowerOf2)
        -> Result<NonNull<u8>, Fatal>
    {
        if align > C::PAGE_SIZE {
            return Err(Fatal::UnsupportedAlignment(align.value()));
        }

        let result = match Properties::<C>::class_size_of_layout(size, align) {
            Some(class_size) => arena.allocate(class_size, &self.source).ok_or(Fatal::OutOfMemory),
            None => self.allocate_large(arena, size, align),
        };

        if result.is_ok() {
            self.source.counters().record_allocated();
        }

        debug_assert!(result.map_or(true, |ptr| ptr.as_ptr() as usize % align == 0));

        result
    }

    /// Deallocates the memory pointed to by `ptr`.
    ///
    /// `arena` is None if the calling thread never allocated.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `arena`, if any, belongs to the calling thread.
    /// -   Assumes that `ptr` was returned by `allocate` or `reallocate`, and not deallocated since.
    pub(crate) unsafe fn deallocate(&self, arena: Option<&mut Arena<C>>, ptr: NonNull<u8>) -> Result<(), Fatal> {
        let header = self.header_of(ptr)?;
        let (size, owner) = (header.as_ref().size(), header.as_ref().owner());

        //  Checked by `header_of`.
        let owner = owner.ok_or(Fatal::CorruptHeader(header.as_ptr() as usize))?;

        if header.as_ref().is_large::<C>() {
            self.source.release(header.cast(), size);
        } else {
            match arena {
                Some(arena) if arena.owner() == owner => arena.release(ptr),
                _ => self.registry.find(owner).ok_or(Fatal::UnregisteredThread(owner))?.push(ptr),
            }
        }

        self.source.counters().record_freed();

        Ok(())
    }

    /// Reallocates the memory pointed to by `ptr` into a fresh allocation of `size` bytes.
    ///
    /// The content is copied up to the lesser of the usable size of `ptr` and `size`.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `arena` belongs to the calling thread.
    /// -   Assumes that `ptr` was returned by `allocate` or `reallocate`, and not deallocated since.
    pub(crate) unsafe fn reallocate(&self, arena: &mut Arena<C>, ptr: NonNull<u8>, size: usize)
        -> Result<NonNull<u8>, Fatal>
    {
        self.reallocate_aligned(arena, ptr, size, PowerOf2::ONE)
    }

    /// Reallocates the memory pointed to by `ptr` into a fresh allocation of `size` bytes, aligned on `align`.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `arena` belongs to the calling thread.
    /// -   Assumes that `ptr` was returned by `allocate` or `reallocate`, and not deallocated since.
    pub(crate) unsafe fn reallocate_aligned(&self, arena: &mut Arena<C>, ptr: NonNull<u8>, size: usize, align: PowerOf2)
        -> Result<NonNull<u8>, Fatal>
    {
        let usable = self.usable_size(ptr)?;

        let result = self.allocate_aligned(arena, size, align)?;

        ptr::copy_nonoverlapping(ptr.as_ptr(), result.as_ptr(), cmp::min(usable, size));

        self.deallocate(Some(arena), ptr)?;

        Ok(result)
    }

    /// Returns the number of usable bytes of the memory pointed to by `ptr`.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `ptr` was returned by `allocate` or `reallocate`, and not deallocated since.
    pub(crate) unsafe fn usable_size(&self, ptr: NonNull<u8>) -> Result<usize, Fatal> {
        let header = self.header_of(ptr)?;

        if header.as_ref().is_large::<C>() {
            Ok(header.as_ref().size() - PageHeader::offset_of(header, ptr))
        } else {
            Ok(header.as_ref().size())
        }
    }

    #[cold]
    #[inline(never)]
    unsafe fn allocate_large(&self, arena: &Arena<C>, size: usize, align: PowerOf2) -> Result<NonNull<u8>, Fatal> {
        let layout = Properties::<C>::large_layout(size, align).ok_or(Fatal::OutOfMemory)?;

        let pages = self.source.acquire_bytes(layout.size()).ok_or(Fatal::OutOfMemory)?;

        let header = PageHeader::initialize(pages, layout.size(), arena.owner());

        Ok(PageHeader::payload(header, Properties::<C>::large_offset(align)))
    }

    //  Internal; returns the header of `ptr`, after checking it is one written by this domain.
    unsafe fn header_of(&self, ptr: NonNull<u8>) -> Result<NonNull<PageHeader>, Fatal> {
        let header = PageHeader::from_payload::<C>(ptr);
        let corrupt = Fatal::CorruptHeader(header.as_ptr() as usize);

        let (size, owner) = (header.as_ref().size(), header.as_ref().owner());

        if owner.is_none() {
            return Err(corrupt);
        }

        let offset = PageHeader::offset_of(header, ptr);

        let is_sane = if header.as_ref().is_large::<C>() {
            size % C::PAGE_SIZE == 0 && offset < size && Properties::<C>::is_large_offset(offset)
        } else {
            Properties::<C>::is_class_size(size) && offset >= PageHeader::SIZE
        };

        if is_sane { Ok(header) } else { Err(corrupt) }
    }
}

#[cfg(test)]
mod tests {

use std::thread;

use super::*;

use crate::ThreadId;
use crate::internals::test::{SinglePageConfiguration, TestConfiguration, TestPlatform};

type TestRouter = Router<TestConfiguration, TestPlatform>;

fn arena<C: Configuration>(router: &Router<C, TestPlatform>) -> &'static mut Arena<C> {
    let mut arena = router.acquire_arena().expect("Arena");

    unsafe { arena.as_mut() }
}

fn fill(ptr: NonNull<u8>, size: usize, value: u8) { unsafe { ptr::write_bytes(ptr.as_ptr(), value, size) } }

fn check(ptr: NonNull<u8>, size: usize, value: u8) -> bool {
    let bytes = unsafe { core::slice::from_raw_parts(ptr.as_ptr(), size) };
    bytes.iter().all(|b| *b == value)
}

struct SendPtr(NonNull<u8>);

unsafe impl Send for SendPtr {}

#[test]
fn router_allocate_binned() {
    let router = TestRouter::new(TestPlatform::default());
    let arena = arena(&router);

    for size in &[1, 24, 25, 100, 2047, 2048] {
        let ptr = unsafe { router.allocate(arena, *size) }.expect("Allocated");

        fill(ptr, *size, 0xAB);
        assert!(check(ptr, *size, 0xAB));

        assert!(unsafe { router.usable_size(ptr) }.unwrap() >= *size);
    }

    assert_eq!(6, router.statistics().chunks_allocated);
}

#[test]
fn router_allocate_zero() {
    let router = TestRouter::new(TestPlatform::default());
    let arena = arena(&router);

    let ptr = unsafe { router.allocate(arena, 0) }.expect("Allocated");

    assert_eq!(Ok(24), unsafe { router.usable_size(ptr) });
}

#[test]
fn router_allocate_large() {
    let router = TestRouter::new(TestPlatform::default());
    let arena = arena(&router);

    let before = router.platform().live_pages();

    let ptr = unsafe { router.allocate(arena, 5000) }.expect("Allocated");

    assert_eq!(16, ptr.as_ptr() as usize % 4096);
    assert_eq!(before + 2, router.platform().live_pages());

    fill(ptr, 5000, 0x5A);
    assert!(check(ptr, 5000, 0x5A));

    let header = unsafe { PageHeader::from_payload::<TestConfiguration>(ptr).as_ref() };
    assert_eq!(8192, header.size());
    assert_eq!(Some(arena.owner()), header.owner());

    assert_eq!(Ok(8192 - 16), unsafe { router.usable_size(ptr) });

    unsafe { router.deallocate(Some(&mut *arena), ptr) }.expect("Deallocated");

    assert_eq!(before, router.platform().live_pages());

    let statistics = router.statistics();
    assert_eq!(2, statistics.pages_unmapped);
    assert_eq!(1, statistics.chunks_freed);
}

#[test]
fn router_allocate_large_boundaries() {
    let router = TestRouter::new(TestPlatform::default());
    let arena = arena(&router);

    for (size, pages) in &[(2049, 1), (4080, 1), (4081, 2), (4096, 2), (3 * 4096, 4)] {
        let before = router.platform().live_pages();

        let ptr = unsafe { router.allocate(arena, *size) }.expect("Allocated");

        assert_eq!(before + pages, router.platform().live_pages(), "size {}", size);

        unsafe { router.deallocate(Some(&mut *arena), ptr) }.expect("Deallocated");

        assert_eq!(before, router.platform().live_pages(), "size {}", size);
    }
}

#[test]
fn router_allocate_large_unrepresentable() {
    let router = TestRouter::new(TestPlatform::default());
    let arena = arena(&router);

    assert_eq!(Err(Fatal::OutOfMemory), unsafe { router.allocate(arena, usize::MAX) });
    assert_eq!(Err(Fatal::OutOfMemory), unsafe { router.allocate(arena, usize::MAX - 4096) });

    assert_eq!(0, router.statistics().chunks_allocated);
}

#[test]
fn router_out_of_memory() {
    let router = TestRouter::new(TestPlatform::with_limit(1));
    let arena = arena(&router);

    assert_eq!(Err(Fatal::OutOfMemory), unsafe { router.allocate(arena, 100) });
    assert_eq!(Err(Fatal::OutOfMemory), unsafe { router.allocate(arena, 10_000) });
}

#[test]
fn router_release_reuse_without_corruption() {
    let router = TestRouter::new(TestPlatform::default());
    let arena = arena(&router);

    let a = unsafe { router.allocate(arena, 100) }.expect("Allocated");
    let b = unsafe { router.allocate(arena, 100) }.expect("Allocated");

    fill(b, 128, 0xB0);

    unsafe { router.deallocate(Some(&mut *arena), a) }.expect("Deallocated");

    let c = unsafe { router.allocate(arena, 100) }.expect("Allocated");

    assert_eq!(a, c);
    assert!(check(b, 128, 0xB0));
    assert_eq!(Ok(128), unsafe { router.usable_size(c) });
}

#[test]
fn router_steady_state_cycles() {
    let router = TestRouter::new(TestPlatform::default());
    let arena = arena(&router);

    let mut live: Vec<_> = (0..100).map(|_| unsafe { router.allocate(arena, 48) }.expect("Allocated")).collect();

    let pages = router.platform().live_pages();

    for _ in 0..50 {
        for ptr in live.drain(..) {
            unsafe { router.deallocate(Some(&mut *arena), ptr) }.expect("Deallocated");
        }

        live.extend((0..100).map(|_| unsafe { router.allocate(arena, 48) }.expect("Allocated")));

        assert_eq!(pages, router.platform().live_pages());
    }
}

#[test]
fn router_first_allocation_maps_one_page() {
    let router = Router::<SinglePageConfiguration, _>::new(TestPlatform::default());
    let arena = arena(&router);

    let registered = router.platform().live_pages();

    let ptr = unsafe { router.allocate(arena, 100) }.expect("Allocated");

    assert_eq!(registered + 1, router.platform().live_pages());

    let header = unsafe { PageHeader::from_payload::<SinglePageConfiguration>(ptr).as_ref() };
    assert_eq!(128, header.size());
    assert_eq!(Some(arena.owner()), header.owner());
}

#[test]
fn router_cross_thread_release() {
    let router = TestRouter::new(TestPlatform::default());
    let arena = arena(&router);

    //  (4096 - 32) / 32: exactly one page worth of chunks, leaving the bin exhausted.
    const CHUNKS: usize = 127;

    let chunks: Vec<_> = (0..CHUNKS).map(|_| unsafe { router.allocate(arena, 32) }.expect("Allocated")).collect();

    let pages = router.platform().live_pages();

    let sent: Vec<_> = chunks.iter().map(|ptr| SendPtr(*ptr)).collect();

    thread::scope(|scope| {
        scope.spawn(|| {
            //  A thread which never allocated pushes every chunk to the owner's Cache.
            for ptr in sent {
                unsafe { router.deallocate(None, ptr.0) }.expect("Deallocated");
            }
        });
    });

    assert_eq!(CHUNKS, arena.cache().len());

    let again: Vec<_> = (0..CHUNKS).map(|_| unsafe { router.allocate(arena, 32) }.expect("Allocated")).collect();

    assert_eq!(pages, router.platform().live_pages());

    let mut before: Vec<_> = chunks.iter().map(|p| p.as_ptr() as usize).collect();
    let mut after: Vec<_> = again.iter().map(|p| p.as_ptr() as usize).collect();

    before.sort_unstable();
    after.sort_unstable();

    assert_eq!(before, after);
}

#[test]
fn router_cross_thread_release_by_other_arena() {
    let router = TestRouter::new(TestPlatform::default());
    let first = arena(&router);
    let second = arena(&router);

    let ptr = unsafe { router.allocate(first, 64) }.expect("Allocated");

    //  Released by the second thread: pushed to the Cache of the first, not into the bins of the second.
    unsafe { router.deallocate(Some(&mut *second), ptr) }.expect("Deallocated");

    assert_eq!(1, first.cache().len());
    assert_eq!(0, second.free_length());

    //  Reclaimed by the first on its next release.
    let other = unsafe { router.allocate(first, 64) }.expect("Allocated");
    unsafe { router.deallocate(Some(&mut *first), other) }.expect("Deallocated");

    assert_eq!(0, first.cache().len());
    assert_eq!(2, first.free_length());
}

#[test]
fn router_two_arenas_keep_their_caches_apart() {
    const CHUNKS: usize = 1000;

    let router = TestRouter::new(TestPlatform::default());
    let first = arena(&router);
    let second = arena(&router);

    let firsts: Vec<_> = (0..CHUNKS).map(|_| unsafe { router.allocate(first, 48) }.expect("Allocated")).collect();
    let mut seconds: Vec<_> = (0..CHUNKS).map(|_| unsafe { router.allocate(second, 48) }.expect("Allocated")).collect();

    //  The first releases its own chunks, straight into its bins.
    for ptr in firsts {
        unsafe { router.deallocate(Some(&mut *first), ptr) }.expect("Deallocated");
    }

    assert_eq!(CHUNKS, first.free_length());
    assert_eq!(0, first.cache().len());

    //  The chunks of the second, but one, are released by the first: they wait in the Cache of the second.
    let last = seconds.pop().expect("Chunk");

    for ptr in seconds {
        unsafe { router.deallocate(Some(&mut *first), ptr) }.expect("Deallocated");
    }

    assert_eq!(CHUNKS, first.free_length());
    assert_eq!(0, first.cache().len());
    assert_eq!(0, second.free_length());
    assert_eq!(CHUNKS - 1, second.cache().len());

    //  Further activity of the first leaves the Cache of the second alone.
    let pages = router.platform().live_pages();

    let ptr = unsafe { router.allocate(first, 48) }.expect("Allocated");
    unsafe { router.deallocate(Some(&mut *first), ptr) }.expect("Deallocated");

    assert_eq!(pages, router.platform().live_pages());
    assert_eq!(CHUNKS, first.free_length());
    assert_eq!(CHUNKS - 1, second.cache().len());

    //  The second reclaims its Cache on its own release.
    unsafe { router.deallocate(Some(&mut *second), last) }.expect("Deallocated");

    assert_eq!(0, second.cache().len());
    assert_eq!(CHUNKS, second.free_length());
    assert_eq!(CHUNKS, first.free_length());
}

#[test]
fn router_reallocate_grow() {
    let router = TestRouter::new(TestPlatform::default());
    let arena = arena(&router);

    let ptr = unsafe { router.allocate(arena, 100) }.expect("Allocated");

    let bytes = unsafe { core::slice::from_raw_parts_mut(ptr.as_ptr(), 100) };
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = i as u8;
    }

    let grown = unsafe { router.reallocate(arena, ptr, 300) }.expect("Reallocated");

    let bytes = unsafe { core::slice::from_raw_parts(grown.as_ptr(), 100) };
    for (i, byte) in bytes.iter().enumerate() {
        assert_eq!(i as u8, *byte);
    }

    assert_eq!(Ok(512), unsafe { router.usable_size(grown) });

    let statistics = router.statistics();
    assert_eq!((2, 1), (statistics.chunks_allocated, statistics.chunks_freed));
}

#[test]
fn router_reallocate_shrink_and_large() {
    let router = TestRouter::new(TestPlatform::default());
    let arena = arena(&router);

    let ptr = unsafe { router.allocate(arena, 10_000) }.expect("Allocated");
    fill(ptr, 10_000, 0x11);

    let grown = unsafe { router.reallocate(arena, ptr, 20_000) }.expect("Reallocated");
    assert!(check(grown, 10_000, 0x11));

    let shrunk = unsafe { router.reallocate(arena, grown, 10) }.expect("Reallocated");
    assert!(check(shrunk, 10, 0x11));
    assert_eq!(Ok(24), unsafe { router.usable_size(shrunk) });
}

#[test]
fn router_corrupt_header() {
    let router = TestRouter::new(TestPlatform::default());
    let arena = arena(&router);

    let ptr = unsafe { router.allocate(arena, 64) }.expect("Allocated");
    let header = unsafe { PageHeader::from_payload::<TestConfiguration>(ptr) };
    let page = header.as_ptr() as usize;

    //  Size which is neither a class size, nor a multiple of pages.
    unsafe { PageHeader::initialize(header.cast(), 100, arena.owner()) };

    assert_eq!(Err(Fatal::CorruptHeader(page)), unsafe { router.deallocate(Some(&mut *arena), ptr) });
    assert_eq!(Err(Fatal::CorruptHeader(page)), unsafe { router.usable_size(ptr) });
}

#[test]
fn router_unregistered_owner() {
    let router = TestRouter::new(TestPlatform::default());
    let arena = arena(&router);

    let ptr = unsafe { router.allocate(arena, 64) }.expect("Allocated");
    let header = unsafe { PageHeader::from_payload::<TestConfiguration>(ptr) };

    let stranger = ThreadId::new(42).unwrap();
    unsafe { PageHeader::initialize(header.cast(), 64, stranger) };

    assert_eq!(Err(Fatal::UnregisteredThread(stranger)), unsafe { router.deallocate(Some(&mut *arena), ptr) });
}

}
