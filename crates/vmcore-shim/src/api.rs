//! The vmcore platform API as C symbols, bound to the native host.
//!
//! This is the only place that collapses adapter results into the runtime's
//! two error domains: a null pointer, or a 0/1 status.

use crate::error::{Result, Status};
use crate::flags::{mapping_from_raw, protection_from_raw};
use crate::init;
use crate::mmap::BackingHandle;
use crate::sync::RawMutex;
use core::ffi::{c_int, c_uint, c_void};
use core::ptr::{self, NonNull};

/// `korp_mutex` of the native host.
pub type KorpMutex = RawMutex;

/// `korp_tid` of the native host.
pub type KorpTid = usize;

#[inline]
fn into_raw(result: Result<NonNull<u8>>) -> *mut c_void {
    result.map_or(ptr::null_mut(), |p| p.as_ptr() as *mut c_void)
}

#[inline]
fn status<T>(result: Result<T>) -> c_int {
    Status::from(result).code()
}

// ============================================================================
// Platform lifecycle
// ============================================================================

#[cfg_attr(feature = "export-symbols", no_mangle)]
pub extern "C" fn bh_platform_init() -> c_int {
    init::platform_init();
    Status::Success.code()
}

#[cfg_attr(feature = "export-symbols", no_mangle)]
pub extern "C" fn bh_platform_destroy() {
    init::platform_destroy();
}

// ============================================================================
// Heap
// ============================================================================

#[cfg_attr(feature = "export-symbols", no_mangle)]
pub extern "C" fn os_malloc(size: c_uint) -> *mut c_void {
    into_raw(init::platform().heap().allocate(size as usize))
}

/// # Safety
/// `ptr` must be null or come from `os_malloc`/`os_realloc`.
#[cfg_attr(feature = "export-symbols", no_mangle)]
pub unsafe extern "C" fn os_realloc(ptr: *mut c_void, size: c_uint) -> *mut c_void {
    into_raw(
        init::platform()
            .heap()
            .reallocate(NonNull::new(ptr as *mut u8), size as usize),
    )
}

/// # Safety
/// `ptr` must be null or come from `os_malloc`/`os_realloc`.
#[cfg_attr(feature = "export-symbols", no_mangle)]
pub unsafe extern "C" fn os_free(ptr: *mut c_void) {
    init::platform().heap().deallocate(NonNull::new(ptr as *mut u8));
}

// ============================================================================
// Virtual memory
// ============================================================================

/// # Safety
/// With `MMAP_MAP_FIXED` the caller must own the range at `hint`.
#[cfg_attr(feature = "export-symbols", no_mangle)]
pub unsafe extern "C" fn os_mmap(
    hint: *mut c_void,
    size: usize,
    prot: c_int,
    flags: c_int,
    file: BackingHandle,
) -> *mut c_void {
    init::platform()
        .mapping()
        .map(
            NonNull::new(hint as *mut u8),
            size,
            protection_from_raw(prot),
            mapping_from_raw(flags),
            Some(file),
        )
        .map_or(ptr::null_mut(), |region| region.as_ptr() as *mut c_void)
}

/// # Safety
/// `addr`/`size` must describe memory obtained from `os_mmap`/`os_mremap`.
#[cfg_attr(feature = "export-symbols", no_mangle)]
pub unsafe extern "C" fn os_munmap(addr: *mut c_void, size: usize) {
    if let Some(addr) = NonNull::new(addr as *mut u8) {
        let _ = init::platform().mapping().unmap(addr, size);
    }
}

/// # Safety
/// `addr`/`size` must lie inside memory obtained from `os_mmap`/`os_mremap`.
#[cfg_attr(feature = "export-symbols", no_mangle)]
pub unsafe extern "C" fn os_mprotect(addr: *mut c_void, size: usize, prot: c_int) -> c_int {
    let Some(addr) = NonNull::new(addr as *mut u8) else {
        return Status::Failure.code();
    };
    status(
        init::platform()
            .mapping()
            .reprotect(addr, size, protection_from_raw(prot)),
    )
}

#[cfg_attr(feature = "export-symbols", no_mangle)]
pub extern "C" fn os_getpagesize() -> c_int {
    c_int::try_from(init::platform().mapping().page_size()).unwrap_or(c_int::MAX)
}

/// Protection is not carried over: the result is read/write and
/// `os_mprotect` must be called afterwards.
///
/// # Safety
/// `old_addr`/`old_size` must describe a readable region obtained from
/// `os_mmap`/`os_mremap`; it must not be used after a non-null return.
#[cfg_attr(feature = "export-symbols", no_mangle)]
pub unsafe extern "C" fn os_mremap(old_addr: *mut c_void, old_size: usize, new_size: usize) -> *mut c_void {
    init::platform()
        .mapping()
        .grow(NonNull::new(old_addr as *mut u8), old_size, new_size)
        .map_or(ptr::null_mut(), |region| region.as_ptr() as *mut c_void)
}

// ============================================================================
// Mutex
// ============================================================================

/// # Safety
/// `mutex` must point to writable `korp_mutex` storage.
#[cfg_attr(feature = "export-symbols", no_mangle)]
pub unsafe extern "C" fn os_mutex_init(mutex: *mut KorpMutex) -> c_int {
    status(init::platform().mutex().init(mutex))
}

/// # Safety
/// `mutex` must have been initialized with `os_mutex_init`.
#[cfg_attr(feature = "export-symbols", no_mangle)]
pub unsafe extern "C" fn os_mutex_destroy(mutex: *mut KorpMutex) -> c_int {
    status(init::platform().mutex().destroy(mutex))
}

/// # Safety
/// `mutex` must have been initialized with `os_mutex_init`.
#[cfg_attr(feature = "export-symbols", no_mangle)]
pub unsafe extern "C" fn os_mutex_lock(mutex: *mut KorpMutex) -> c_int {
    status(init::platform().mutex().lock(mutex))
}

/// # Safety
/// `mutex` must have been initialized with `os_mutex_init`.
#[cfg_attr(feature = "export-symbols", no_mangle)]
pub unsafe extern "C" fn os_mutex_unlock(mutex: *mut KorpMutex) -> c_int {
    status(init::platform().mutex().unlock(mutex))
}

// ============================================================================
// Thread and time
// ============================================================================

#[cfg_attr(feature = "export-symbols", no_mangle)]
pub extern "C" fn os_self_thread() -> KorpTid {
    init::platform().thread().current_thread_id().as_raw()
}

#[cfg_attr(feature = "export-symbols", no_mangle)]
pub extern "C" fn os_thread_get_stack_boundary() -> *mut u8 {
    init::platform()
        .thread()
        .current_stack_boundary()
        .map_or(ptr::null_mut(), NonNull::as_ptr)
}

/// The host has no per-thread JIT write protection; accepted and ignored.
#[cfg_attr(feature = "export-symbols", no_mangle)]
pub extern "C" fn os_thread_jit_write_protect_np(_enabled: bool) {}

#[cfg_attr(feature = "export-symbols", no_mangle)]
pub extern "C" fn os_time_get_boot_us() -> u64 {
    init::platform().time().boot_time_us()
}

#[cfg_attr(feature = "export-symbols", no_mangle)]
pub extern "C" fn os_time_thread_cputime_us() -> u64 {
    init::platform().thread().thread_cpu_time_us()
}

// ============================================================================
// Cache
// ============================================================================

#[cfg_attr(feature = "export-symbols", no_mangle)]
pub extern "C" fn os_dcache_flush() {
    init::platform().cache().flush_data_cache();
}

/// # Safety
/// `start..start + len` must be mapped.
#[cfg_attr(feature = "export-symbols", no_mangle)]
pub unsafe extern "C" fn os_icache_flush(start: *mut c_void, len: usize) {
    init::platform()
        .cache()
        .flush_instruction_cache(start as *const u8, len);
}
