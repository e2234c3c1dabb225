//! The internals of binmalloc-core.
//!
//! The internals provide all the heavy-lifting.

pub mod arena;
pub mod bin;
pub mod cache;
pub mod cells;
pub mod counters;
pub mod page_header;
pub mod page_pool;
pub mod page_source;
pub mod registry;
pub mod router;

#[cfg(test)]
pub mod test;
