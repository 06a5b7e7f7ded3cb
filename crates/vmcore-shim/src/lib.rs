//! Platform layer for a bytecode runtime's vmcore OS API.
//!
//! The runtime expects a fixed set of `os_*` functions (heap, virtual memory,
//! mutexes, thread and time queries, cache maintenance). Each adapter here
//! translates one group of them onto an injected host capability from
//! [`host`]; [`api`] binds them to the native host and exports the C symbols.

extern crate libc;

pub mod cache;
pub mod config;
pub mod error;
pub mod flags;
pub mod heap;
pub mod host;
pub mod mmap;
pub mod mutex;
pub mod platform;
pub mod sync;
pub mod thread;
pub mod time;
pub mod util;

#[cfg(any(target_os = "linux", target_os = "macos"))]
pub mod api;
#[cfg(any(target_os = "linux", target_os = "macos"))]
pub mod init;

pub use error::{Error, Result, Status};
pub use flags::{HostMapping, HostProtection, RuntimeMapping, RuntimeProtection};
pub use platform::Platform;
