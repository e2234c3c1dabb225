//! A collection of utilities.

use core::ptr::NonNull;

mod power_of_2;

pub use power_of_2::PowerOf2;

/// Returns whether the pointer is sufficiently aligned for the given alignment.
pub(crate) fn is_sufficiently_aligned_for(ptr: NonNull<u8>, alignment: PowerOf2) -> bool {
    (ptr.as_ptr() as usize) % alignment == 0
}

/// Returns the pointer `offset` bytes past `ptr`.
///
/// #   Safety
///
/// -   Assumes that the result lies within, or one past the end of, the block `ptr` points into.
pub(crate) unsafe fn offset(ptr: NonNull<u8>, offset: usize) -> NonNull<u8> {
    //  Safety:
    //  -   Within the block, hence not null.
    NonNull::new_unchecked(ptr.as_ptr().add(offset))
}

#[cfg(test)]
mod tests {

use super::*;

#[test]
fn is_sufficiently_aligned_for() {
    fn is_aligned_for(ptr: usize, alignment: usize) -> bool {
        let alignment = PowerOf2::new(alignment).unwrap();
        let ptr = NonNull::new(ptr as *mut u8).unwrap();
        super::is_sufficiently_aligned_for(ptr, alignment)
    }

    assert!(is_aligned_for(16, 16));
    assert!(is_aligned_for(4096, 16));
    assert!(is_aligned_for(4096, 4096));

    assert!(!is_aligned_for(8, 16));
    assert!(!is_aligned_for(4096 + 24, 16));
    assert!(!is_aligned_for(4096 + 16, 4096));
}

#[test]
fn offset() {
    let mut buffer = [0u8; 64];
    let base = NonNull::new(buffer.as_mut_ptr()).unwrap();

    let moved = unsafe { super::offset(base, 24) };

    assert_eq!(base.as_ptr() as usize + 24, moved.as_ptr() as usize);
}

}
