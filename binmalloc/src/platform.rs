//! Abstraction over OS differences.

mod api;

pub(crate) use api::{Configuration, Platform, ThreadLocal};

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub(crate) use linux::{BMConfiguration, BMPlatform, BMThreadLocal};
