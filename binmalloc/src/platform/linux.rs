//! Implementation of Linux specific calls.

use core::{alloc::Layout, marker, ptr, sync::atomic};

use binmalloc_core::{self, PowerOf2};

use super::{Configuration, Platform, ThreadLocal};

/// Implementation of the Configuration trait, for Linux.
#[derive(Default)]
pub(crate) struct BMConfiguration;

impl Configuration for BMConfiguration {
    //  4 KB, the native page size.
    const PAGE_SIZE: PowerOf2 = unsafe { PowerOf2::new_unchecked(4 * 1024) };

    //  32 KB at a time.
    const BATCH_PAGES: usize = 8;
}

/// Implementation of the Platform trait, for Linux.
#[derive(Default)]
pub(crate) struct BMPlatform;

impl BMPlatform {
    /// Creates an instance.
    pub(crate) const fn new() -> Self { Self }
}

impl binmalloc_core::Platform for BMPlatform {
    unsafe fn allocate(&self, layout: Layout) -> Option<ptr::NonNull<u8>> {
        const PAGE_SIZE: PowerOf2 = BMConfiguration::PAGE_SIZE;

        debug_assert!(layout.size() % PAGE_SIZE == 0,
            "Incorrect size: {} % {} != 0", layout.size(), PAGE_SIZE.value());
        debug_assert!(layout.align() <= PAGE_SIZE.value(),
            "Incorrect alignment: {} > {}", layout.align(), PAGE_SIZE.value());

        //  `mmap` always returns memory aligned on the native page size, and zeroed for anonymous mappings.
        let candidate = mmap_allocate(layout.size());

        debug_assert!(candidate.map_or(true, |pointer| pointer.as_ptr() as usize % PAGE_SIZE == 0),
            "Incorrect alignment of allocation: {:?} not {:x}-aligned", candidate, PAGE_SIZE.value());

        candidate
    }

    unsafe fn deallocate(&self, pointer: ptr::NonNull<u8>, layout: Layout) {
        munmap_deallocate(pointer.as_ptr(), layout.size());
    }
}

impl Platform for BMPlatform {
    fn write_error(&self, bytes: &[u8]) {
        let mut remaining = bytes;

        while !remaining.is_empty() {
            //  Safety:
            //  -   `remaining` is valid for reads of `remaining.len()` bytes.
            let written = unsafe {
                libc::write(libc::STDERR_FILENO, remaining.as_ptr() as *const libc::c_void, remaining.len())
            };

            if written <= 0 {
                return;
            }

            remaining = &remaining[written as usize..];
        }
    }

    #[cold]
    #[inline(never)]
    fn abort(&self) -> ! {
        //  Safety:
        //  -   Always safe to call.
        unsafe { libc::abort() }
    }
}

/// Implementation of the ThreadLocal trait, for Linux.
///
/// No destructor is registered for the key: the arenas outlive their threads.
pub(crate) struct BMThreadLocal<T> {
    key: atomic::AtomicI64,
    _marker: marker::PhantomData<*const T>,
}

impl<T> BMThreadLocal<T> {
    const UNINITIALIZED: i64 = -1;
    const UNDER_INITIALIZATION: i64 = -2;

    /// Creates an uninitialized instance.
    pub(crate) const fn new() -> Self {
        let key = atomic::AtomicI64::new(Self::UNINITIALIZED);
        let _marker = marker::PhantomData;

        BMThreadLocal { key, _marker }
    }

    #[inline(always)]
    fn get_key(&self) -> libc::pthread_key_t {
        let key = self.key.load(atomic::Ordering::Acquire);
        if key >= 0 { key as libc::pthread_key_t } else { unsafe { self.initialize() } }
    }

    #[cold]
    #[inline(never)]
    unsafe fn initialize(&self) -> libc::pthread_key_t {
        const ACQUIRE: atomic::Ordering = atomic::Ordering::Acquire;
        const RELAXED: atomic::Ordering = atomic::Ordering::Relaxed;

        let mut key = self.key.load(ACQUIRE);

        if self.key.compare_exchange(Self::UNINITIALIZED, Self::UNDER_INITIALIZATION, RELAXED, RELAXED).is_ok() {
            key = Self::create_key();
            self.key.store(key, atomic::Ordering::Release);
        }

        while key < 0 {
            libc::sched_yield();
            key = self.key.load(ACQUIRE);
        }

        key as libc::pthread_key_t
    }

    #[cold]
    unsafe fn create_key() -> i64 {
        let mut key: libc::pthread_key_t = 0;

        let result = libc::pthread_key_create(&mut key as *mut _, None);

        if result != 0 {
            BMPlatform::new().write_error(b"binmalloc: could not create thread-local key\n");
            BMPlatform::new().abort();
        }

        key as i64
    }
}

impl<T> ThreadLocal<T> for BMThreadLocal<T> {
    fn get(&self) -> *mut T {
        let key = self.key.load(atomic::Ordering::Acquire);

        //  If key is not initialized, no value was ever set.
        if key < 0 {
            return ptr::null_mut();
        }

        unsafe { libc::pthread_getspecific(key as libc::pthread_key_t) as *mut T }
    }

    #[cold]
    #[inline(never)]
    fn set(&self, value: *mut T) {
        let key = self.get_key();

        let result = unsafe { libc::pthread_setspecific(key, value as *mut libc::c_void) };

        if result != 0 {
            BMPlatform::new().write_error(b"binmalloc: could not set thread-local value\n");
            BMPlatform::new().abort();
        }
    }
}

unsafe impl<T> Sync for BMThreadLocal<T> {}

//  Wrapper around `mmap`.
//
//  Returns a pointer to `size` bytes of zeroed memory, aligned on the native page size.
fn mmap_allocate(size: usize) -> Option<ptr::NonNull<u8>> {
    let length = size;
    let prot = libc::PROT_READ | libc::PROT_WRITE;
    let flags = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;

    //  No specific address hint.
    let addr = ptr::null_mut();
    //  When used in conjunction with MAP_ANONYMOUS, fd is mandated to be -1 on some implementations.
    let fd = -1;
    //  When used in conjunction with MAP_ANONYMOUS, offset is mandated to be 0 on some implementations.
    let offset = 0;

    //  Safety:
    //  -   `addr`, `fd`, and `offset` are suitable for MAP_ANONYMOUS.
    let result = unsafe { libc::mmap(addr, length, prot, flags, fd, offset) };

    let result = if result != libc::MAP_FAILED { result as *mut u8 } else { ptr::null_mut() };
    ptr::NonNull::new(result)
}

//  Wrapper around `munmap`.
//
//  #   Safety
//
//  -   Assumes that `addr` points to a `mmap`ed area of at least `size` bytes.
//  -   Assumes that the range `[addr, addr + size)` is no longer in use.
unsafe fn munmap_deallocate(addr: *mut u8, size: usize) {
    let result = libc::munmap(addr as *mut libc::c_void, size);
    debug_assert!(result == 0, "Could not munmap {:x}, {}: {}", addr as usize, size, result);
}
