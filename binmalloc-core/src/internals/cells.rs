//! Cells
//!
//! A Cell represents a freed chunk.
//!
//! Whilst allocated, the content of the chunk is purely in the hands of the user. Whilst deallocated, however, its
//! first word is reused to link it to the next free chunk.
//!
//! Note: Cells are never _constructed_, instead the first word of raw memory is read and written through explicit
//! pointer accesses; a cell is linked in exactly one stack at any time.

use core::{mem, ptr::{self, NonNull}};

/// CellStack
///
/// An intrusive LIFO stack of freed chunks.
#[derive(Debug, Default)]
pub(crate) struct CellStack {
    head: Option<NonNull<u8>>,
    length: usize,
}

impl CellStack {
    /// Creates an empty instance.
    pub(crate) const fn new() -> Self { Self { head: None, length: 0 } }

    /// Returns whether the stack is empty.
    pub(crate) fn is_empty(&self) -> bool { self.head.is_none() }

    /// Returns the number of cells in the stack.
    pub(crate) fn len(&self) -> usize { self.length }

    /// Pushes a cell on top of the stack.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `cell` points to a freed chunk of at least a pointer in size, suitably aligned.
    /// -   Assumes that `cell` is not already linked in any stack.
    pub(crate) unsafe fn push(&mut self, cell: NonNull<u8>) {
        debug_assert!(cell.as_ptr() as usize % mem::align_of::<*mut u8>() == 0);

        write_next(cell, self.head);

        self.head = Some(cell);
        self.length += 1;
    }

    /// Pops the top cell of the stack, if any.
    ///
    /// #   Safety
    ///
    /// -   Assumes that no cell of the stack was modified since it was pushed.
    pub(crate) unsafe fn pop(&mut self) -> Option<NonNull<u8>> {
        let cell = self.head?;

        debug_assert!(self.length > 0);

        self.head = read_next(cell);
        self.length -= 1;

        Some(cell)
    }
}

//  Safety:
//  -   A CellStack exclusively owns the chunks it links, those may be handed to another thread.
unsafe impl Send for CellStack {}

//
//  Implementation
//

//  Safety:
//  -   Assumes that `cell` is valid for reading a pointer.
#[allow(clippy::cast_ptr_alignment)]
unsafe fn read_next(cell: NonNull<u8>) -> Option<NonNull<u8>> {
    NonNull::new(ptr::read(cell.as_ptr() as *const *mut u8))
}

//  Safety:
//  -   Assumes that `cell` is valid for writing a pointer.
#[allow(clippy::cast_ptr_alignment)]
unsafe fn write_next(cell: NonNull<u8>, next: Option<NonNull<u8>>) {
    let next = next.map_or(ptr::null_mut(), |next| next.as_ptr());

    ptr::write(cell.as_ptr() as *mut *mut u8, next);
}
