//! Thread Handle
//!
//! The Thread Handle is a handle to the arena of a thread; the user is expected to acquire one for each of the
//! threads they use, and on each allocation to refer to the thread-local Thread Handle.
//!
//! The lack of `AtomicThreadHandle` reflects the fact that no two threads should ever contend for a single handle.
//!
//! #   Safety
//!
//! A Thread Handle _assumes_ it is only used from a single thread, and makes no attempt at synchronizing memory
//! accesses. It is Undefined Behavior to use a Thread Handle from multiple threads without external synchronization.

use core::ptr;

use crate::ThreadId;
use crate::internals::arena::Arena;

/// Handle to the arena of a thread.
pub struct ThreadHandle<C>(ptr::NonNull<Arena<C>>);

impl<C> ThreadHandle<C> {
    /// Rematerialize from raw pointer.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` was obtained from `into_pointer`.
    pub unsafe fn from_pointer(pointer: ptr::NonNull<u8>) -> ThreadHandle<C> { Self::new(pointer.cast()) }

    /// Turn into raw pointer.
    pub fn into_pointer(self) -> ptr::NonNull<u8> { self.0.cast() }

    /// Returns the identifier of the thread, as assigned by the Domain.
    pub fn thread_id(&self) -> ThreadId {
        //  Safety:
        //  -   The arena outlives its handles.
        unsafe { self.0.as_ref() }.owner()
    }

    /// Returns the number of freed chunks awaiting reuse in the bins of the thread.
    pub fn free_length(&self) -> usize {
        //  Safety:
        //  -   The arena outlives its handles.
        unsafe { self.0.as_ref() }.free_length()
    }

    /// Creates an instance.
    pub(crate) fn new(value: ptr::NonNull<Arena<C>>) -> Self { Self(value) }

    /// Yield the underlying arena.
    ///
    /// #   Safety
    ///
    /// -   Assumes that it is called from the owning thread, and that no other reference to the arena is alive.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn as_mut(&self) -> &mut Arena<C> {
        let mut arena = self.0;
        arena.as_mut()
    }
}
