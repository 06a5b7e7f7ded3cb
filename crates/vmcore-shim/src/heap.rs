//! Heap allocation forwarded to the host allocator.

use core::ptr::NonNull;

use crate::error::{Error, Result};
use crate::host::HostAllocator;

/// Forwards allocate/reallocate/deallocate to a host allocator.
///
/// Zero-byte requests are rejected before reaching the host so that every
/// host sees the same behavior regardless of its own `malloc(0)` policy.
pub struct AllocatorBridge<'h, A: HostAllocator + ?Sized> {
    host: &'h A,
}

impl<'h, A: HostAllocator + ?Sized> AllocatorBridge<'h, A> {
    pub fn new(host: &'h A) -> Self {
        Self { host }
    }

    pub fn allocate(&self, size: usize) -> Result<NonNull<u8>> {
        if size == 0 {
            log::debug!("allocate: zero-size request rejected");
            return Err(Error::ZeroSize);
        }
        match self.host.allocate(size) {
            Some(ptr) => {
                log::trace!("allocate({size}) -> {:p}", ptr);
                Ok(ptr)
            }
            None => {
                log::warn!("allocate({size}) refused by host");
                Err(Error::OutOfMemory { size })
            }
        }
    }

    /// Resize `ptr` to `size` bytes. A missing `ptr` behaves like
    /// [`allocate`](Self::allocate). On failure the original block is left
    /// untouched and still owned by the caller.
    ///
    /// # Safety
    /// `ptr` must come from this bridge (same host) and still be live.
    pub unsafe fn reallocate(&self, ptr: Option<NonNull<u8>>, size: usize) -> Result<NonNull<u8>> {
        let Some(ptr) = ptr else {
            return self.allocate(size);
        };
        if size == 0 {
            log::debug!("reallocate({:p}, 0): zero-size request rejected", ptr);
            return Err(Error::ZeroSize);
        }
        match self.host.reallocate(ptr, size) {
            Some(new) => {
                log::trace!("reallocate({:p}, {size}) -> {:p}", ptr, new);
                Ok(new)
            }
            None => {
                log::warn!("reallocate({:p}, {size}) refused by host", ptr);
                Err(Error::OutOfMemory { size })
            }
        }
    }

    /// Release `ptr`. `None` is a no-op.
    ///
    /// # Safety
    /// `ptr` must come from this bridge (same host) and still be live.
    pub unsafe fn deallocate(&self, ptr: Option<NonNull<u8>>) {
        if let Some(ptr) = ptr {
            log::trace!("deallocate({:p})", ptr);
            self.host.deallocate(ptr);
        }
    }
}
