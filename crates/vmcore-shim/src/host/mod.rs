//! Host capabilities consumed by the adapters.
//!
//! Each trait is one capability of the host operating system. Adapters borrow
//! an implementation instead of reaching for globals, so a custom kernel, the
//! native POSIX host below, or a test double can all sit underneath the same
//! translation code.

use crate::flags::{HostMapping, HostProtection};
use core::ptr::NonNull;

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(target_os = "linux")]
pub use linux as sys;

#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(target_os = "macos")]
pub use macos as sys;

#[cfg(any(target_os = "linux", target_os = "macos"))]
pub mod cache;
#[cfg(any(target_os = "linux", target_os = "macos"))]
mod native;
#[cfg(any(target_os = "linux", target_os = "macos"))]
pub use native::NativeHost;

/// General-purpose heap.
pub trait HostAllocator {
    /// Allocate `size` bytes. `size` is never zero.
    fn allocate(&self, size: usize) -> Option<NonNull<u8>>;

    /// Resize a block. On failure the original block must stay valid.
    ///
    /// # Safety
    /// `ptr` must come from `allocate`/`reallocate` on this host and not have
    /// been deallocated.
    unsafe fn reallocate(&self, ptr: NonNull<u8>, size: usize) -> Option<NonNull<u8>>;

    /// # Safety
    /// `ptr` must come from `allocate`/`reallocate` on this host and not have
    /// been deallocated.
    unsafe fn deallocate(&self, ptr: NonNull<u8>);
}

/// Virtual memory mapper and protector.
pub trait HostMemory {
    /// Page granularity. Always a power of two.
    fn page_size(&self) -> usize;

    /// Map `size` bytes (page-granular) near `hint`.
    ///
    /// # Safety
    /// With `HostMapping::FIXED` the host may replace whatever lives at `hint`.
    unsafe fn map(
        &self,
        hint: Option<NonNull<u8>>,
        size: usize,
        alignment: usize,
        protection: HostProtection,
        flags: HostMapping,
    ) -> Option<NonNull<u8>>;

    /// # Safety
    /// `addr`/`size` must describe memory obtained from `map`.
    unsafe fn unmap(&self, addr: NonNull<u8>, size: usize);

    /// # Safety
    /// `addr`/`size` must describe memory obtained from `map`.
    unsafe fn protect(&self, addr: NonNull<u8>, size: usize, protection: HostProtection) -> bool;
}

/// Blocking mutual exclusion primitive living in caller-provided storage.
pub trait HostMutex {
    /// Storage the runtime reserves for one mutex (`korp_mutex`).
    type Raw;

    /// # Safety
    /// `raw` must point to writable storage for `Self::Raw`.
    unsafe fn init(&self, raw: NonNull<Self::Raw>) -> bool;

    /// # Safety
    /// `raw` must have been initialized with `init` and not destroyed.
    unsafe fn destroy(&self, raw: NonNull<Self::Raw>) -> bool;

    /// Block until the mutex is held by the calling thread.
    ///
    /// # Safety
    /// `raw` must have been initialized with `init` and not destroyed.
    unsafe fn lock(&self, raw: NonNull<Self::Raw>) -> bool;

    /// # Safety
    /// `raw` must have been initialized with `init` and not destroyed.
    unsafe fn unlock(&self, raw: NonNull<Self::Raw>) -> bool;
}

/// Per-thread queries.
pub trait HostThread {
    fn current_thread_id(&self) -> usize;

    /// Lowest usable address of the calling thread's stack, if known.
    fn stack_limit(&self) -> Option<NonNull<u8>>;

    fn thread_cpu_time_us(&self) -> u64;
}

/// Boot-relative clock.
pub trait HostClock {
    fn boot_time_us(&self) -> u64;
}

/// Cache maintenance.
pub trait HostCache {
    fn flush_data_cache(&self);

    /// # Safety
    /// `start..start + len` must be mapped.
    unsafe fn flush_instruction_cache(&self, start: NonNull<u8>, len: usize);
}

/// Everything the platform layer needs from one host.
pub trait Host: HostAllocator + HostMemory + HostMutex + HostThread + HostClock + HostCache {}

impl<T> Host for T where
    T: ?Sized + HostAllocator + HostMemory + HostMutex + HostThread + HostClock + HostCache
{
}
