//! Allocator

use core::{
    alloc::{GlobalAlloc, Layout},
    cmp,
    fmt::{self, Write},
    ptr::{self, NonNull},
};

use binmalloc_core::{self, Fatal, Statistics, ThreadId};

use crate::{BMConfiguration, Platform, BMPlatform, ThreadLocal, BMThreadLocal};

/// Binned Allocator.
///
/// As a `GlobalAlloc`, any alignment up to the page size is honored; larger alignments result in a null pointer.
///
/// Fatal errors, such as the OS refusing to map more memory, abort the process after a message on standard error.
#[derive(Default)]
pub struct BinAllocator;

impl BinAllocator {
    /// Creates an instance.
    pub const fn new() -> Self { Self }

    /// Registers the current thread, and prepares its arena for allocation.
    ///
    /// Returns the identifier of the thread if the attempt succeeded, Err otherwise.
    ///
    /// Failure to warm up the current thread only occurs if the pages holding its arena cannot be mapped.
    #[cold]
    pub fn warm_up(&self) -> Result<ThreadId, Fatal> {
        Thread::get()
            .map(Ok)
            .unwrap_or_else(Thread::initialize)
            .map(|thread| thread.0.thread_id())
    }

    /// Allocates `size` bytes of memory.
    ///
    /// The returned pointer is never null, and is aligned on at least 8 bytes, or 16 bytes if `size` is greater than
    /// 24; a `size` of 0 is served as the smallest class size.
    pub fn allocate(&self, size: usize) -> NonNull<u8> {
        let thread = Thread::current();

        //  Safety:
        //  -   `thread` belongs to the current thread.
        unsafe { DOMAIN.allocate(&thread.0, size) }.unwrap_or_else(|error| fatal(error))
    }

    /// Deallocates the memory located at `pointer`.
    ///
    /// The current thread need not have allocated anything.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` has been returned by a prior call to `allocate` or `reallocate`.
    /// -   Assumes `pointer` has not been deallocated since its allocation.
    /// -   Assumes the memory pointed by `pointer` is no longer in use.
    pub unsafe fn release(&self, pointer: NonNull<u8>) {
        let thread = Thread::get();

        if let Err(error) = DOMAIN.deallocate(thread.as_ref().map(|thread| &thread.0), pointer) {
            fatal(error);
        }
    }

    /// Reallocates the memory located at `pointer` to `size` bytes, preserving its content up to the lesser of its
    /// usable size and `size`.
    ///
    /// The memory is always moved.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` has been returned by a prior call to `allocate` or `reallocate`.
    /// -   Assumes `pointer` has not been deallocated since its allocation.
    /// -   Assumes the memory pointed by `pointer` is no longer in use.
    pub unsafe fn reallocate(&self, pointer: NonNull<u8>, size: usize) -> NonNull<u8> {
        let thread = Thread::current();

        DOMAIN.reallocate(&thread.0, pointer, size).unwrap_or_else(|error| fatal(error))
    }

    /// Allocates memory fitting `layout`.
    ///
    /// Returns None if the alignment of `layout` exceeds the page size, every smaller alignment is honored.
    pub fn allocate_aligned(&self, layout: Layout) -> Option<NonNull<u8>> {
        let thread = Thread::current();

        //  Safety:
        //  -   `thread` belongs to the current thread.
        or_unsupported(unsafe { DOMAIN.allocate_aligned(&thread.0, layout) })
    }

    /// Reallocates the memory located at `pointer` into a fresh allocation fitting `layout`, preserving its content up
    /// to the lesser of its usable size and `layout.size()`.
    ///
    /// Returns None if the alignment of `layout` exceeds the page size, in which case `pointer` is left untouched.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` has been returned by a prior call to `allocate` or `reallocate`.
    /// -   Assumes `pointer` has not been deallocated since its allocation.
    /// -   Assumes the memory pointed by `pointer` is no longer in use.
    pub unsafe fn reallocate_aligned(&self, pointer: NonNull<u8>, layout: Layout) -> Option<NonNull<u8>> {
        let thread = Thread::current();

        or_unsupported(DOMAIN.reallocate_aligned(&thread.0, pointer, layout))
    }

    /// Returns the number of usable bytes at `pointer`, at least as many as requested.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` has been returned by a prior call to `allocate` or `reallocate`.
    /// -   Assumes `pointer` has not been deallocated since its allocation.
    pub unsafe fn usable_size(&self, pointer: NonNull<u8>) -> usize {
        DOMAIN.usable_size(pointer).unwrap_or_else(|error| fatal(error))
    }

    /// Returns a snapshot of the statistics of the allocator, and the free-list length of the current thread.
    pub fn statistics(&self) -> Statistics {
        let thread = Thread::get();

        DOMAIN.statistics(thread.as_ref().map(|thread| &thread.0))
    }

    /// Prints the statistics of the allocator on standard error, without allocating.
    #[cold]
    pub fn print_statistics(&self) {
        let mut buffer = StackBuffer::new();

        //  Truncated if it does not fit, there is no other recourse.
        let _ = write!(buffer, "\n{}", self.statistics());

        DOMAIN.platform().write_error(buffer.as_bytes());
    }
}

unsafe impl GlobalAlloc for BinAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.allocate_aligned(layout).map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _: Layout) {
        if let Some(ptr) = NonNull::new(ptr) {
            self.release(ptr);
        }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        //  Safety:
        //  -   `layout.align()` is a power of 2, and `new_size` does not overflow once rounded, as per GlobalAlloc.
        let new_layout = Layout::from_size_align_unchecked(new_size, layout.align());

        let result = match NonNull::new(ptr) {
            Some(ptr) => self.reallocate_aligned(ptr, new_layout),
            None => self.allocate_aligned(new_layout),
        };

        result.map_or(ptr::null_mut(), NonNull::as_ptr)
    }
}

//
//  Integration test backdoors.
//
//  Unfortunately the backdoors have to be exposed as part of the public API for use in integration tests.
//

impl BinAllocator {
    /// Exposes the identifier of the current thread, if registered.
    #[cold]
    #[doc(hidden)]
    pub fn thread_id(&self) -> Option<ThreadId> { Thread::get().map(|thread| thread.0.thread_id()) }

    /// Exposes the largest size served by the bins.
    #[cold]
    #[doc(hidden)]
    pub fn largest_class_size(&self) -> usize { Properties::largest_class_size() }
}

//
//  Implementation
//

type DomainHandle = binmalloc_core::DomainHandle<BMConfiguration, BMPlatform>;
type Properties = binmalloc_core::Properties<BMConfiguration>;
type ThreadHandle = binmalloc_core::ThreadHandle<BMConfiguration>;

//  Domain Handle.
static DOMAIN: DomainHandle = DomainHandle::new(BMPlatform::new());

//  Thread-local.
static THREAD_LOCAL: BMThreadLocal<u8> = BMThreadLocal::new();

//  Returns None on unsupported alignment, aborts on any other error.
fn or_unsupported(result: Result<NonNull<u8>, Fatal>) -> Option<NonNull<u8>> {
    match result {
        Ok(pointer) => Some(pointer),
        Err(Fatal::UnsupportedAlignment(_)) => None,
        Err(error) => fatal(error),
    }
}

//  Reports a fatal error, and aborts.
#[cold]
#[inline(never)]
fn fatal(error: Fatal) -> ! {
    let mut buffer = StackBuffer::new();

    let _ = writeln!(buffer, "binmalloc: fatal error: {}", error);

    DOMAIN.platform().write_error(buffer.as_bytes());
    DOMAIN.platform().abort()
}

struct Thread(ThreadHandle);

impl Thread {
    //  Returns the thread-local instance, if initialized.
    #[inline(always)]
    fn get() -> Option<Thread> {
        NonNull::new(THREAD_LOCAL.get())
            .map(|pointer| unsafe { Self(ThreadHandle::from_pointer(pointer)) })
    }

    //  Returns the thread-local instance, initializing it if need be.
    //
    //  Aborts if initialization fails.
    #[inline(always)]
    fn current() -> Thread {
        Self::get().unwrap_or_else(|| Self::initialize().unwrap_or_else(|error| fatal(error)))
    }

    //  Initializes the thread-local instance and returns it.
    #[cold]
    #[inline(never)]
    fn initialize() -> Result<Thread, Fatal> {
        let pointer = DOMAIN.acquire_thread_handle()?.into_pointer();

        THREAD_LOCAL.set(pointer.as_ptr());

        //  Safety:
        //  -   `pointer` was obtained from `into_pointer`.
        Ok(Self(unsafe { ThreadHandle::from_pointer(pointer) }))
    }
}

//  A fixed-size buffer, to format messages without allocating.
struct StackBuffer {
    buffer: [u8; 256],
    length: usize,
}

impl StackBuffer {
    fn new() -> Self { Self { buffer: [0; 256], length: 0 } }

    fn as_bytes(&self) -> &[u8] { &self.buffer[..self.length] }
}

impl fmt::Write for StackBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let available = self.buffer.len() - self.length;
        let copied = cmp::min(available, s.len());

        self.buffer[self.length..self.length + copied].copy_from_slice(&s.as_bytes()[..copied]);
        self.length += copied;

        if copied == s.len() { Ok(()) } else { Err(fmt::Error) }
    }
}
