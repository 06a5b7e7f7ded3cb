use core::ffi::{c_int, c_void};
use core::ptr;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::util::FALLBACK_PAGE_SIZE;

/// Darwin has no low-address mapping flag.
pub const MAP_ADDRESS_32_BIT: c_int = 0;

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

pub unsafe fn map(hint: *mut u8, size: usize, prot: c_int, flags: c_int) -> *mut u8 {
    let result = libc::mmap(hint as *mut c_void, size, prot, flags, -1, 0);
    if result == libc::MAP_FAILED {
        ptr::null_mut()
    } else {
        result as *mut u8
    }
}

pub unsafe fn unmap(ptr: *mut u8, size: usize) {
    libc::munmap(ptr as *mut c_void, size);
}

pub unsafe fn protect(ptr: *mut u8, size: usize, prot: c_int) -> bool {
    libc::mprotect(ptr as *mut c_void, size, prot) == 0
}

#[inline]
pub fn thread_id() -> usize {
    unsafe {
        let mut tid: u64 = 0;
        libc::pthread_threadid_np(libc::pthread_self(), &mut tid);
        tid as usize
    }
}

pub fn stack_limit() -> *mut u8 {
    unsafe {
        let this = libc::pthread_self();
        let top = libc::pthread_get_stackaddr_np(this) as usize;
        let size = libc::pthread_get_stacksize_np(this);
        if top == 0 || size == 0 || size > top {
            return ptr::null_mut();
        }
        (top - size) as *mut u8
    }
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

pub fn boot_time_us() -> u64 {
    clock_us(libc::CLOCK_MONOTONIC)
}

pub fn thread_cpu_time_us() -> u64 {
    clock_us(libc::CLOCK_THREAD_CPUTIME_ID)
}
