//! API of OS required services.

pub use binmalloc_core::Configuration;

/// Abstraction over OS services.
pub(crate) trait Platform : binmalloc_core::Platform + Send + Sync {
    /// Writes `bytes` to the standard error stream, without allocating.
    ///
    /// Errors are ignored: there is nowhere to report them.
    fn write_error(&self, bytes: &[u8]);

    /// Aborts the process.
    fn abort(&self) -> !;
}

/// Abstraction over thread-local storage.
pub(crate) trait ThreadLocal<T> {
    /// Returns a pointer to the thread-local value associated to this instance.
    ///
    /// May return a null pointer if no prior value was set.
    fn get(&self) -> *mut T;

    /// Sets the pointer to the thread-local value associated to this instance.
    ///
    /// #   Safety
    ///
    /// -   Assumes that the value is not already set.
    fn set(&self, value: *mut T);
}
