//! Cache maintenance for freshly written code.
//!
//! Loading code is a fixed sequence and both flushes are required on hosts
//! whose instruction fetch is not coherent with data stores:
//!
//! 1. write the code into a writable mapping
//! 2. [`CacheControl::flush_data_cache`]
//! 3. reprotect the mapping executable
//! 4. [`CacheControl::flush_instruction_cache`] over the written range
//! 5. jump in
//!
//! Skipping either flush can execute stale or half-written instructions.

use core::ptr::NonNull;

use crate::host::HostCache;

pub struct CacheControl<'h, C: HostCache + ?Sized> {
    host: &'h C,
}

impl<'h, C: HostCache + ?Sized> CacheControl<'h, C> {
    pub fn new(host: &'h C) -> Self {
        Self { host }
    }

    /// Push written code out of the data cache. Completes before returning.
    pub fn flush_data_cache(&self) {
        log::trace!("flush data cache");
        self.host.flush_data_cache();
    }

    /// Invalidate `start..start + len` in the instruction cache. Completes
    /// before returning; flushing a range twice is harmless. A null `start` or
    /// zero `len` does nothing.
    ///
    /// # Safety
    /// The range must be mapped.
    pub unsafe fn flush_instruction_cache(&self, start: *const u8, len: usize) {
        let Some(start) = NonNull::new(start as *mut u8) else {
            return;
        };
        if len == 0 {
            return;
        }
        log::trace!("flush instruction cache {:p}+{len:#x}", start);
        self.host.flush_instruction_cache(start, len);
    }
}
