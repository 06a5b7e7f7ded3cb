use core::ffi::{c_int, c_void};
use core::ptr::{self, NonNull};

use super::{cache, sys, HostAllocator, HostCache, HostClock, HostMemory, HostMutex, HostThread};
use crate::flags::{HostMapping, HostProtection};
use crate::sync::RawMutex;

/// The process's own POSIX environment presented as a host. This is what the
/// exported C symbols run on.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeHost;

fn prot_bits(protection: HostProtection) -> c_int {
    let mut prot = libc::PROT_NONE;
    if protection.contains(HostProtection::READ) {
        prot |= libc::PROT_READ;
    }
    if protection.contains(HostProtection::WRITE) {
        prot |= libc::PROT_WRITE;
    }
    if protection.contains(HostProtection::EXECUTE) {
        prot |= libc::PROT_EXEC;
    }
    prot
}

fn map_bits(flags: HostMapping) -> c_int {
    let mut bits = 0;
    if flags.contains(HostMapping::ANONYMOUS) {
        bits |= libc::MAP_ANON;
    }
    if flags.contains(HostMapping::PRIVATE) {
        bits |= libc::MAP_PRIVATE;
    }
    if flags.contains(HostMapping::FIXED) {
        bits |= libc::MAP_FIXED;
    }
    if flags.contains(HostMapping::ADDRESS_32_BIT) {
        bits |= sys::MAP_ADDRESS_32_BIT;
    }
    bits
}

impl HostAllocator for NativeHost {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        NonNull::new(unsafe { libc::malloc(size) } as *mut u8)
    }

    unsafe fn reallocate(&self, ptr: NonNull<u8>, size: usize) -> Option<NonNull<u8>> {
        NonNull::new(libc::realloc(ptr.as_ptr() as *mut c_void, size) as *mut u8)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        libc::free(ptr.as_ptr() as *mut c_void);
    }
}

impl HostMemory for NativeHost {
    fn page_size(&self) -> usize {
        sys::page_size()
    }

    unsafe fn map(
        &self,
        hint: Option<NonNull<u8>>,
        size: usize,
        alignment: usize,
        protection: HostProtection,
        flags: HostMapping,
    ) -> Option<NonNull<u8>> {
        // mmap only guarantees page alignment.
        if alignment > sys::page_size() {
            return None;
        }
        let hint = hint.map_or(ptr::null_mut(), NonNull::as_ptr);
        NonNull::new(sys::map(hint, size, prot_bits(protection), map_bits(flags)))
    }

    unsafe fn unmap(&self, addr: NonNull<u8>, size: usize) {
        sys::unmap(addr.as_ptr(), size);
    }

    unsafe fn protect(&self, addr: NonNull<u8>, size: usize, protection: HostProtection) -> bool {
        sys::protect(addr.as_ptr(), size, prot_bits(protection))
    }
}

impl HostMutex for NativeHost {
    type Raw = RawMutex;

    unsafe fn init(&self, raw: NonNull<RawMutex>) -> bool {
        raw.as_ptr().write(RawMutex::new());
        true
    }

    unsafe fn destroy(&self, raw: NonNull<RawMutex>) -> bool {
        // Destroying a held mutex is refused, mirroring EBUSY.
        !raw.as_ref().is_locked()
    }

    unsafe fn lock(&self, raw: NonNull<RawMutex>) -> bool {
        raw.as_ref().lock();
        true
    }

    unsafe fn unlock(&self, raw: NonNull<RawMutex>) -> bool {
        raw.as_ref().unlock()
    }
}

impl HostThread for NativeHost {
    fn current_thread_id(&self) -> usize {
        sys::thread_id()
    }

    fn stack_limit(&self) -> Option<NonNull<u8>> {
        NonNull::new(sys::stack_limit())
    }

    fn thread_cpu_time_us(&self) -> u64 {
        sys::thread_cpu_time_us()
    }
}

impl HostClock for NativeHost {
    fn boot_time_us(&self) -> u64 {
        sys::boot_time_us()
    }
}

impl HostCache for NativeHost {
    fn flush_data_cache(&self) {
        cache::flush_data_cache();
    }

    unsafe fn flush_instruction_cache(&self, start: NonNull<u8>, len: usize) {
        cache::flush_instruction_cache(start.as_ptr(), len);
    }
}
