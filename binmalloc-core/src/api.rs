//! The API of binmalloc-core.

mod configuration;
mod description;
mod domain;
mod fatal;
mod platform;
mod statistics;
mod thread;

pub use configuration::{Configuration, Properties};
pub use description::{Category, ClassSize, ThreadId};
pub use domain::DomainHandle;
pub use fatal::Fatal;
pub use platform::Platform;
pub use statistics::Statistics;
pub use thread::ThreadHandle;

pub use crate::utils::PowerOf2;
