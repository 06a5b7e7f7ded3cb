use core::ffi::{c_int, c_void};
use core::ptr;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::cell::Cell;

use crate::util::FALLBACK_PAGE_SIZE;

/// Only x86_64 Linux can place mappings in the low 2 GiB; elsewhere the
/// request degrades to an unconstrained mapping.
#[cfg(target_arch = "x86_64")]
pub const MAP_ADDRESS_32_BIT: c_int = libc::MAP_32BIT;
#[cfg(not(target_arch = "x86_64"))]
pub const MAP_ADDRESS_32_BIT: c_int = 0;

/// Cached `sysconf(_SC_PAGESIZE)`; zero until first queried.
static PAGE_SIZE_CACHED: AtomicUsize = AtomicUsize::new(0);

pub fn page_size() -> usize {
    let cached = PAGE_SIZE_CACHED.load(Ordering::Relaxed);
    if cached != 0 {
        return cached;
    }
    let ps = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    let ps = if ps > 0 { ps as usize } else { FALLBACK_PAGE_SIZE };
    PAGE_SIZE_CACHED.store(ps, Ordering::Relaxed);
    ps
}

/// Map anonymous memory. Returns null on failure.
///
/// # Safety
/// `size` must be page-aligned and non-zero. With `MAP_FIXED` any existing
/// mapping at `hint` is replaced.
pub unsafe fn map(hint: *mut u8, size: usize, prot: c_int, flags: c_int) -> *mut u8 {
    let result = libc::mmap(hint as *mut c_void, size, prot, flags, -1, 0);
    if result == libc::MAP_FAILED {
        ptr::null_mut()
    } else {
        result as *mut u8
    }
}

/// # Safety
/// `ptr` must have been returned by `map` with the same `size`.
pub unsafe fn unmap(ptr: *mut u8, size: usize) {
    libc::munmap(ptr as *mut c_void, size);
}

/// # Safety
/// Region must be valid and page-aligned.
pub unsafe fn protect(ptr: *mut u8, size: usize, prot: c_int) -> bool {
    libc::mprotect(ptr as *mut c_void, size, prot) == 0
}

/// Kernel thread id, cached in TLS to avoid a syscall per query.
#[inline]
pub fn thread_id() -> usize {
    thread_local! {
        static CACHED_TID: Cell<usize> = const { Cell::new(0) };
    }

    CACHED_TID.with(|tid| {
        let cached = tid.get();
        if cached != 0 {
            return cached;
        }
        let new_tid = unsafe { libc::syscall(libc::SYS_gettid) as usize };
        tid.set(new_tid);
        new_tid
    })
}

/// Lowest usable stack address of the calling thread, or null if glibc/musl
/// cannot describe the stack. The reported range already excludes the guard
/// area.
pub fn stack_limit() -> *mut u8 {
    thread_local! {
        static CACHED_LIMIT: Cell<usize> = const { Cell::new(0) };
    }

    CACHED_LIMIT.with(|limit| {
        let cached = limit.get();
        if cached != 0 {
            return cached as *mut u8;
        }
        let found = unsafe { query_stack_limit() };
        limit.set(found as usize);
        found
    })
}

unsafe fn query_stack_limit() -> *mut u8 {
    let mut attr: libc::pthread_attr_t = core::mem::zeroed();
    if libc::pthread_getattr_np(libc::pthread_self(), &mut attr) != 0 {
        return ptr::null_mut();
    }

    let mut addr: *mut c_void = ptr::null_mut();
    let mut size: usize = 0;
    let described = libc::pthread_attr_getstack(&attr, &mut addr, &mut size) == 0;
    libc::pthread_attr_destroy(&mut attr);

    if !described || addr.is_null() || size == 0 {
        return ptr::null_mut();
    }
    addr as *mut u8
}

fn clock_us(clock: libc::clockid_t) -> u64 {
    let mut ts: libc::timespec = unsafe { core::mem::zeroed() };
    if unsafe { libc::clock_gettime(clock, &mut ts) } != 0 {
        return 0;
    }
    (ts.tv_sec as u64)
        .saturating_mul(1_000_000)
        .saturating_add(ts.tv_nsec as u64 / 1_000)
}

/// Microseconds since boot, counting time spent suspended.
pub fn boot_time_us() -> u64 {
    clock_us(libc::CLOCK_BOOTTIME)
}

pub fn thread_cpu_time_us() -> u64 {
    clock_us(libc::CLOCK_THREAD_CPUTIME_ID)
}
