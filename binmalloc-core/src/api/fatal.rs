//! Fatal errors.
//!
//! A fatal error signals that the allocator cannot honor a request, or that its meta-data no longer makes sense. It is
//! up to the user to decide how to report it; the only sensible continuation is aborting the process.

use thiserror::Error;

use super::ThreadId;

/// Fatal
///
/// The errors reported by the DomainHandle.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum Fatal {
    /// The Platform could not map the pages required.
    #[error("out of memory")]
    OutOfMemory,
    /// A chunk records an owner which never registered with the domain.
    #[error("chunk owned by unregistered thread {0}")]
    UnregisteredThread(ThreadId),
    /// The page header of a released or reallocated pointer is not one the domain wrote.
    #[error("corrupt page header at {0:#x}")]
    CorruptHeader(usize),
    /// The requested alignment exceeds the page size.
    #[error("unsupported alignment of {0} bytes")]
    UnsupportedAlignment(usize),
}
